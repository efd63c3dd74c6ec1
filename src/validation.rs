//! Shared answer checking: locale-aware number parsing, tolerance bounds and
//! unit matching. Every exercise family funnels its numeric answers through here.

use serde::{Deserialize, Serialize};

/// Slack for binary floating point noise at the exact tolerance edge.
const FLOAT_SLACK: f64 = 1e-9;

/// Accepted deviation: `max(absolute, |expected| * relative)`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Tolerance {
  #[serde(default)]
  pub absolute: f64,
  #[serde(default)]
  pub relative: f64,
}

impl Tolerance {
  pub const fn absolute(absolute: f64) -> Self {
    Self { absolute, relative: 0.0 }
  }

  pub const fn mixed(absolute: f64, relative: f64) -> Self {
    Self { absolute, relative }
  }

  pub fn bound(&self, expected: f64) -> f64 {
    self.absolute.max(expected.abs() * self.relative)
  }

  pub fn accepts(&self, given: f64, expected: f64) -> bool {
    (given - expected).abs() <= self.bound(expected) + FLOAT_SLACK
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Correct,
  WrongValue,
  WrongUnit,
  Unparsable,
  /// No expected value exists for this field, so no answer can be right.
  Unanswerable,
}

impl Verdict {
  pub fn is_correct(self) -> bool {
    matches!(self, Verdict::Correct)
  }

  /// Short German feedback line for the UI.
  pub fn message(self) -> &'static str {
    match self {
      Verdict::Correct => "Richtig!",
      Verdict::WrongValue => "Der Wert stimmt noch nicht.",
      Verdict::WrongUnit => "Die Einheit passt nicht.",
      Verdict::Unparsable => "Bitte eine gültige Zahl eingeben.",
      Verdict::Unanswerable => "Für dieses Feld gibt es keinen Sollwert.",
    }
  }
}

/// Verdict for one named answer box.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct FieldFeedback {
  pub key: String,
  pub verdict: Verdict,
  pub message: &'static str,
}

impl FieldFeedback {
  pub fn new(key: impl Into<String>, verdict: Verdict) -> Self {
    Self { key: key.into(), verdict, message: verdict.message() }
  }
}

/// Parse a user-typed decimal. Accepts `12,5`, `12.5`, and `1.234,50`.
/// Empty, non-numeric and non-finite input yields `None`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }
  let normalized = if trimmed.contains(',') && trimmed.contains('.') {
    trimmed.replace('.', "").replace(',', ".")
  } else {
    trimmed.replace(',', ".")
  };
  if !normalized.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+') {
    return None;
  }
  normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn check_value(raw: &str, expected: Option<f64>, tolerance: Tolerance) -> Verdict {
  let Some(expected) = expected else {
    return Verdict::Unanswerable;
  };
  match parse_decimal(raw) {
    None => Verdict::Unparsable,
    Some(given) if tolerance.accepts(given, expected) => Verdict::Correct,
    Some(_) => Verdict::WrongValue,
  }
}

/// Like [`check_value`], but a unit mismatch rejects the answer even when the
/// number is right. Units are compared after [`normalize_unit`].
pub fn check_with_unit(
  raw: &str,
  expected: Option<f64>,
  tolerance: Tolerance,
  chosen_unit: Option<&str>,
  expected_unit: &str,
) -> Verdict {
  if expected.is_none() {
    return Verdict::Unanswerable;
  }
  let unit_ok = chosen_unit
    .map(|u| normalize_unit(u) == normalize_unit(expected_unit))
    .unwrap_or(false);
  match check_value(raw, expected, tolerance) {
    Verdict::Unparsable => Verdict::Unparsable,
    _ if !unit_ok => Verdict::WrongUnit,
    v => v,
  }
}

/// `cm^2`, `cm2` and `cm²` are the same unit.
pub fn normalize_unit(unit: &str) -> String {
  unit
    .trim()
    .replace("^2", "²")
    .replace("^3", "³")
    .chars()
    .map(|c| match c {
      '2' => '²',
      '3' => '³',
      other => other,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_german_and_english_decimals() {
    assert_eq!(parse_decimal("12,5"), Some(12.5));
    assert_eq!(parse_decimal(" 12.50 "), Some(12.5));
    assert_eq!(parse_decimal("1.234,56"), Some(1234.56));
    assert_eq!(parse_decimal("-3,2"), Some(-3.2));
    assert_eq!(parse_decimal(""), None);
    assert_eq!(parse_decimal("abc"), None);
    assert_eq!(parse_decimal("12 cm"), None);
    assert_eq!(parse_decimal("inf"), None);
    assert_eq!(parse_decimal("NaN"), None);
  }

  #[test]
  fn tolerance_edges_are_symmetric() {
    let tol = Tolerance::absolute(0.05);
    assert!(tol.accepts(40.05, 40.0));
    assert!(tol.accepts(39.95, 40.0));
    assert!(!tol.accepts(40.06, 40.0));
    assert!(!tol.accepts(39.94, 40.0));

    // relative part dominates for large values: 2% of 500 = 10
    let tol = Tolerance::mixed(0.05, 0.02);
    assert!(tol.accepts(510.0, 500.0));
    assert!(tol.accepts(490.0, 500.0));
    assert!(!tol.accepts(510.01, 500.0));
    assert!(!tol.accepts(489.99, 500.0));
  }

  #[test]
  fn malformed_and_missing_are_soft_failures() {
    let tol = Tolerance::absolute(0.05);
    assert_eq!(check_value("vierzig", Some(40.0), tol), Verdict::Unparsable);
    assert_eq!(check_value("40", None, tol), Verdict::Unanswerable);
    assert_eq!(check_value("40,00", Some(40.0), tol), Verdict::Correct);
    assert_eq!(check_value("41", Some(40.0), tol), Verdict::WrongValue);
  }

  #[test]
  fn unit_must_match_regardless_of_value() {
    let tol = Tolerance::absolute(0.05);
    assert_eq!(check_with_unit("40", Some(40.0), tol, Some("m²"), "m²"), Verdict::Correct);
    assert_eq!(check_with_unit("40", Some(40.0), tol, Some("m^2"), "m²"), Verdict::Correct);
    assert_eq!(check_with_unit("40", Some(40.0), tol, Some("cm²"), "m²"), Verdict::WrongUnit);
    assert_eq!(check_with_unit("40", Some(40.0), tol, None, "m²"), Verdict::WrongUnit);
    assert_eq!(check_with_unit("x", Some(40.0), tol, Some("m²"), "m²"), Verdict::Unparsable);
  }
}
