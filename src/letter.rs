//! DIN 5008 business letter coach: writing material and a format check of
//! the zones a student fills in.

use std::sync::OnceLock;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::util::slugify;

const BUILTIN: &str = include_str!("../data/letters.toml");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Guideline {
  pub id: String,
  pub title: String,
  pub description: String,
  pub position: String,
  pub checklist: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
  pub id: String,
  pub title: String,
  pub company: String,
  pub situation: String,
  pub objectives: Vec<String>,
  pub required_elements: Vec<String>,
  pub language_hints: Vec<String>,
  pub focus: String,
  pub tone: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
  #[default]
  Business,
  Private,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contact {
  pub phone: String,
  pub fax: String,
  pub mail: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct References {
  pub our_letter: String,
  pub their_letter: String,
  pub their_reference: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assignment {
  pub id: String,
  pub title: String,
  pub company: String,
  pub company_address: String,
  pub manager_name: String,
  pub sender_placeholder: String,
  pub context: Vec<String>,
  pub requirements: Vec<String>,
  pub recipient_type: RecipientType,
  pub recipient_pieces: Vec<String>,
  pub delivery_note: String,
  pub subject: String,
  /// Deliberately unformatted; the student rewrites it.
  pub body_draft: String,
  pub contact: Contact,
  pub references: References,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LetterCatalogue {
  pub guidelines: Vec<Guideline>,
  pub scenarios: Vec<Scenario>,
  pub assignments: Vec<Assignment>,
}

impl LetterCatalogue {
  pub fn builtin() -> Result<Self, toml::de::Error> {
    toml::from_str(BUILTIN)
  }

  pub fn random_scenario<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Scenario> {
    self.scenarios.choose(rng)
  }

  pub fn assignment(&self, id: &str) -> Option<&Assignment> {
    self.assignments.iter().find(|a| a.id == id)
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct InfoBlock {
  pub reference: String,
  pub client_message_date: String,
  pub our_reference: String,
  pub our_message_date: String,
  pub contact_name: String,
  pub phone: String,
  pub fax: String,
  pub mail: String,
  pub info_date: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
#[serde(default)]
pub struct LetterFields {
  pub recipient_lines: Vec<String>,
  pub recipient_additions: Vec<String>,
  pub recipient_type: RecipientType,
  pub subject: String,
  pub salutation: String,
  pub letter_text: String,
  /// Company line, blank line, greeting, three blank lines, signature.
  pub closing: String,
  pub attachments: String,
  pub info_block: InfoBlock,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  Ok,
  Warn,
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationItem {
  pub id: &'static str,
  pub label: &'static str,
  pub status: Status,
  pub message: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct LetterReport {
  pub items: Vec<ValidationItem>,
  pub info_complete: bool,
  pub text_length: usize,
  pub all_ok: bool,
}

fn item(id: &'static str, label: &'static str, ok: bool, good: &'static str, bad: &'static str) -> ValidationItem {
  ValidationItem {
    id,
    label,
    status: if ok { Status::Ok } else { Status::Warn },
    message: if ok { good } else { bad },
  }
}

fn signature_marker() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?i)(?:^|\s)i\.?\s*a\.?(?:\s|$)").expect("signature pattern compiles"))
}

fn full_name() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"[A-ZÄÖÜ][A-Za-zÄÖÜäöüß]+\s+[A-ZÄÖÜ][A-Za-zÄÖÜäöüß]+").expect("name pattern compiles")
  })
}

fn salutation_start() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"^\s*Sehr\s+").expect("salutation pattern compiles"))
}

fn filled(lines: &[String]) -> usize {
  lines.iter().filter(|l| !l.trim().is_empty()).count()
}

fn blank_between(lines: &[&str]) -> usize {
  lines.iter().filter(|l| l.trim().is_empty()).count()
}

pub fn validate_letter(fields: &LetterFields) -> LetterReport {
  let subject = fields.subject.trim();
  let subject_has_word = subject.to_lowercase().contains("betreff");
  let subject_ok = !subject_has_word && subject.chars().count() > 5;

  let salutation_ok = salutation_start().is_match(&fields.salutation) && fields.salutation.trim().ends_with(',');
  let attachments = fields.attachments.trim();
  let attachments_ok = attachments.is_empty() || attachments.to_lowercase().starts_with("anlage");

  let closing: Vec<&str> = fields.closing.split('\n').collect();
  let company = closing.first().map(|l| l.trim()).unwrap_or("");
  let greeting_idx = closing.iter().position(|l| l.to_lowercase().contains("grüße"));
  let greeting = greeting_idx.map(|i| closing[i].trim().to_lowercase()).unwrap_or_default();
  // signature is searched below the greeting so a company name cannot match
  let signature_from = greeting_idx.map(|i| i + 1).unwrap_or(1).min(closing.len());
  let signature_idx = closing[signature_from..]
    .iter()
    .position(|l| signature_marker().is_match(l))
    .map(|i| i + signature_from);
  let signature = signature_idx.map(|i| closing[i].trim()).unwrap_or("");

  let modern_greeting = greeting.contains("freundliche grüße");
  let classic_greeting = greeting.contains("mit freundlichen grüßen");
  let company_gap = match greeting_idx {
    Some(g) if g > 0 => blank_between(&closing[1..g]) >= 1,
    _ => false,
  };
  let signature_gap = match (greeting_idx, signature_idx) {
    (Some(g), Some(s)) if s > g => blank_between(&closing[g + 1..s]) >= 3,
    _ => false,
  };
  let signature_ok = signature_marker().is_match(signature) && full_name().is_match(signature);

  let greeting_item = ValidationItem {
    id: "greeting",
    label: "Grußformel (mit Leerzeile davor)",
    status: if modern_greeting && company_gap { Status::Ok } else { Status::Warn },
    message: if !company_gap {
      "Lasse eine Leerzeile nach dem Firmennamen."
    } else if modern_greeting {
      "Grußformel passt."
    } else if classic_greeting {
      "„Mit freundlichen Grüßen“ ist veraltet. Nutze „Freundliche Grüße“."
    } else {
      "Nutze „Freundliche Grüße“."
    },
  };

  let items = vec![
    item(
      "addition_zone",
      "Zusatz- & Vermerkzone (1 Zeile)",
      filled(&fields.recipient_additions) >= 1,
      "Absenderzeile steht korrekt über der Empfängeradresse.",
      "Trage deine Absenderadresse kompakt in Zeile 5 ein.",
    ),
    item(
      "recipient",
      "Empfängerzone (9 Zeilen)",
      filled(&fields.recipient_lines) >= 4,
      "Adresse wirkt vollständig.",
      "Nutze bis zu 9 Zeilen für Firma/Person, Straße/Postfach und PLZ Ort.",
    ),
    item(
      "subject",
      "Betreff ohne Wort „Betreff“",
      subject_ok,
      "Betreff ist prägnant.",
      if subject_has_word {
        "Lass das Wort „Betreff“ weg. Schreibe direkt das Thema."
      } else {
        "Der Betreff ist zu kurz."
      },
    ),
    item(
      "salutation",
      "Anrede korrekt mit Komma",
      salutation_ok,
      "Anrede passt.",
      "Beginne mit „Sehr …“ und schließe mit Komma.",
    ),
    item(
      "closing_company",
      "Firmenname (1. Zeile)",
      company.chars().count() >= 3,
      "Firmenname vorhanden.",
      "Beginne den Briefschluss mit dem Firmennamen.",
    ),
    greeting_item,
    item(
      "signature",
      "Unterschrift (i. A. + Name)",
      signature_ok,
      "Signatur korrekt.",
      "Nutze „i. A.“ gefolgt von Vor- und Nachnamen.",
    ),
    item(
      "closing_spacing",
      "3 Leerzeilen für Unterschrift",
      signature_gap,
      "Platz für Unterschrift vorhanden.",
      "Lasse 3 Leerzeilen zwischen Gruß und Name.",
    ),
    item(
      "attachments",
      "Anlage korrekt benannt",
      attachments_ok,
      "Anlage passt oder entfällt.",
      "Beginne mit „Anlage:“ oder lasse das Feld leer.",
    ),
  ];

  let info = &fields.info_block;
  let info_complete =
    !info.reference.trim().is_empty() && !info.contact_name.trim().is_empty() && !info.info_date.trim().is_empty();
  let all_ok = info_complete && items.iter().all(|i| i.status == Status::Ok);
  let report = LetterReport { items, info_complete, text_length: fields.letter_text.trim().chars().count(), all_ok };
  debug!(target: "exercise", all_ok = report.all_ok, text_length = report.text_length, "letter checked");
  report
}

/// ASCII file name for an exported letter, `geschaeftsbrief.pdf` as fallback.
pub fn export_file_name(subject: &str) -> String {
  let slug = slugify(subject);
  if slug.is_empty() {
    "geschaeftsbrief.pdf".to_string()
  } else {
    format!("{}.pdf", slug)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn good_letter() -> LetterFields {
    LetterFields {
      recipient_lines: vec![
        "Merkur & Söhne GmbH".into(),
        "Frau Elke Schnell".into(),
        "Postfach 11609".into(),
        "83425 Bad Reichenhall".into(),
      ],
      recipient_additions: vec!["Einschreiben".into()],
      recipient_type: RecipientType::Business,
      subject: "Spezialkatalog über Büromöbel".into(),
      salutation: "Sehr geehrte Frau Schnell,".into(),
      letter_text: "vielen Dank für Ihr Schreiben.".into(),
      closing: "MÖBELFABRIK Peter Jordan GmbH\n\nFreundliche Grüße\n\n\n\ni. A. Werner Volk".into(),
      attachments: "Anlage: Katalog".into(),
      info_block: InfoBlock {
        reference: "es-el".into(),
        contact_name: "Werner Volk".into(),
        info_date: "20.02.2025".into(),
        ..Default::default()
      },
    }
  }

  fn status(report: &LetterReport, id: &str) -> Status {
    report.items.iter().find(|i| i.id == id).map(|i| i.status).unwrap()
  }

  #[test]
  fn complete_letter_passes() {
    let report = validate_letter(&good_letter());
    assert!(report.all_ok, "{:?}", report.items);
    assert_eq!(report.items.len(), 9);
    assert_eq!(report.text_length, 30);
  }

  #[test]
  fn subject_and_salutation_rules() {
    let mut l = good_letter();
    l.subject = "Betreff: Katalog".into();
    l.salutation = "Hallo Frau Schnell".into();
    let r = validate_letter(&l);
    assert_eq!(status(&r, "subject"), Status::Warn);
    assert_eq!(status(&r, "salutation"), Status::Warn);
    l.subject = "Kat".into();
    l.salutation = "Sehr geehrte Frau Schnell".into();
    let r = validate_letter(&l);
    assert_eq!(status(&r, "subject"), Status::Warn);
    assert_eq!(status(&r, "salutation"), Status::Warn);
    assert!(!r.all_ok);
  }

  #[test]
  fn closing_layout() {
    let mut l = good_letter();
    l.closing = "MÖBELFABRIK Peter Jordan GmbH\nMit freundlichen Grüßen\n\ni. A. Werner Volk".into();
    let r = validate_letter(&l);
    assert_eq!(status(&r, "greeting"), Status::Warn);
    assert_eq!(status(&r, "closing_spacing"), Status::Warn);
    assert_eq!(status(&r, "signature"), Status::Ok);

    l.closing = "Media GmbH\n\nFreundliche Grüße\n\n\n\nWerner".into();
    let r = validate_letter(&l);
    assert_eq!(status(&r, "closing_company"), Status::Ok);
    assert_eq!(status(&r, "signature"), Status::Warn);

    l.closing = "AB".into();
    assert_eq!(status(&validate_letter(&l), "closing_company"), Status::Warn);
  }

  #[test]
  fn classic_greeting_gets_its_own_hint() {
    let mut l = good_letter();
    l.closing = "Jordan GmbH\n\nMit freundlichen Grüßen\n\n\n\ni. A. Werner Volk".into();
    let r = validate_letter(&l);
    let g = r.items.iter().find(|i| i.id == "greeting").unwrap();
    assert_eq!(g.status, Status::Warn);
    assert!(g.message.contains("veraltet"));
  }

  #[test]
  fn zones_and_info_block() {
    let mut l = good_letter();
    l.recipient_additions = vec!["  ".into()];
    l.recipient_lines.truncate(3);
    l.attachments = "Katalog".into();
    l.info_block.contact_name.clear();
    let r = validate_letter(&l);
    assert_eq!(status(&r, "addition_zone"), Status::Warn);
    assert_eq!(status(&r, "recipient"), Status::Warn);
    assert_eq!(status(&r, "attachments"), Status::Warn);
    assert!(!r.info_complete);
    l.attachments.clear();
    assert_eq!(status(&validate_letter(&l), "attachments"), Status::Ok);
  }

  #[test]
  fn file_names() {
    assert_eq!(export_file_name("Rückfrage Leasingangebot"), "rueckfrage-leasingangebot.pdf");
    assert_eq!(export_file_name("  !!! "), "geschaeftsbrief.pdf");
  }

  #[test]
  fn catalogue_loads() {
    let c = LetterCatalogue::builtin().unwrap();
    assert_eq!(c.guidelines.len(), 8);
    assert_eq!(c.scenarios.len(), 4);
    assert_eq!(c.assignments.len(), 18);
    let a = c.assignment("katalog-buero").unwrap();
    assert_eq!(a.recipient_pieces.len(), 4);
    assert_eq!(a.references.their_reference, "es-el");
  }
}
