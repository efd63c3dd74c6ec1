//! Buchungssätze: source documents (invoices, bank statements) and the
//! journal entry the student has to derive from them.

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::calculation::chain::round2;
use crate::util::format_money;
use crate::validation::{parse_decimal, Tolerance};

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Account {
    pub number: &'static str,
    pub name: &'static str,
}

const fn acc(number: &'static str, name: &'static str) -> Account {
    Account { number, name }
}

/// Industriekontenrahmen, the subset used by the exercises.
pub const IKR_ACCOUNTS: &[Account] = &[
    // Aktiva
    acc("0700", "Technische Anlagen und Maschinen"),
    acc("0840", "Fuhrpark"),
    acc("0860", "Büroausstattung"),
    acc("2000", "Rohstoffe"),
    acc("2010", "Fremdbauteile"),
    acc("2020", "Hilfsstoffe"),
    acc("2030", "Betriebsstoffe"),
    acc("2200", "Fertigerzeugnisse"),
    acc("2280", "Handelswaren"),
    acc("2400", "Forderungen a.LL."),
    acc("2600", "Vorsteuer"),
    acc("2800", "Bank"),
    acc("2880", "Kasse"),
    // Passiva
    acc("3000", "Eigenkapital"),
    acc("4250", "Langfristige Bankverbindlichkeiten"),
    acc("4400", "Verbindlichkeiten a.LL."),
    acc("4800", "Umsatzsteuer"),
    // Erträge
    acc("5000", "Umsatzerlöse für eigene Erzeugnisse"),
    acc("5100", "Umsatzerlöse für Handelswaren"),
    acc("5400", "Mieterträge"),
    acc("5710", "Zinserträge"),
    // Aufwendungen
    acc("6000", "Aufwendungen für Rohstoffe"),
    acc("6010", "Aufwendungen für Fremdbauteile"),
    acc("6020", "Aufwendungen für Hilfsstoffe"),
    acc("6030", "Aufwendungen für Betriebsstoffe"),
    acc("6080", "Aufwendungen für Handelswaren"),
    acc("6160", "Fremdinstandhaltung"),
    acc("6200", "Löhne"),
    acc("6300", "Gehälter"),
    acc("6400", "Arbeitgeberanteil zur Sozialversicherung"),
    acc("6520", "Abschreibungen auf Sachanlagen"),
    acc("6700", "Mietaufwendungen"),
    acc("6800", "Büromaterial"),
    acc("6950", "Abschreibungen auf Forderungen"),
    acc("7510", "Zinsaufwendungen"),
];

pub fn account_name(number: &str) -> &'static str {
    IKR_ACCOUNTS
        .iter()
        .find(|a| a.number == number.trim())
        .map(|a| a.name)
        .unwrap_or("Unbekanntes Konto")
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentType {
    Eingangsrechnung,
    Ausgangsrechnung,
    Kontoauszug,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Soll,
    Haben,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct BookingLine {
    pub account: String,
    pub amount: Decimal,
    pub side: Side,
}

impl BookingLine {
    fn new(account: &str, amount: Decimal, side: Side) -> Self {
        Self { account: account.to_string(), amount, side }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DocumentItem {
    pub description: String,
    pub amount: Decimal,
    pub tax_rate: Decimal,
}

/// One line on a bank statement, seen from the bank: `Haben` is money in.
#[derive(Clone, Debug, Serialize)]
pub struct StatementLine {
    pub date: String,
    pub description: String,
    pub amount: Decimal,
    pub side: Side,
}

#[derive(Clone, Debug, Serialize)]
pub struct Document {
    pub sender: String,
    pub receiver: String,
    pub date: String,
    pub number: String,
    pub items: Vec<DocumentItem>,
    pub net_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<StatementLine>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BookingTask {
    pub id: String,
    pub document_type: DocumentType,
    pub description: String,
    pub hint: String,
    pub document: Document,
    #[serde(skip_serializing)]
    pub solution: Vec<BookingLine>,
}

/// A journal line as typed by the student.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct EntryLine {
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub amount: String,
    pub side: Option<Side>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BookingCheck {
    pub correct: bool,
    pub matched: usize,
    pub expected_lines: usize,
    pub message: String,
}

const OWN_COMPANY: &str = "Büro-Design GmbH\nMusterstraße 1\n12345 Musterstadt";

const COMPANIES: &[&str] = &[
    "Müller & Söhne KG",
    "Schmidt GmbH",
    "TechnoParts AG",
    "Büro-Welt e.K.",
    "Logistik Express",
    "Metallbau Weber",
    "Elektro-Handel Nord",
    "Global Supplies Ltd.",
];

struct Item {
    desc: &'static str,
    account: &'static str,
    kind: &'static str,
}

const ITEMS_BUY: &[Item] = &[
    Item { desc: "Eichenholz Platten", account: "2000", kind: "Rohstoffe" },
    Item { desc: "Schrauben und Nägel", account: "2020", kind: "Hilfsstoffe" },
    Item { desc: "Schmieröl", account: "2030", kind: "Betriebsstoffe" },
    Item { desc: "Bürostühle (Handelsware)", account: "2280", kind: "Handelswaren" },
    Item { desc: "Elektronik-Module", account: "2010", kind: "Fremdbauteile" },
    Item { desc: "Neuer LKW", account: "0840", kind: "Fuhrpark" },
    Item { desc: "Schreibtische für Verwaltung", account: "0860", kind: "Büroausstattung" },
    Item { desc: "CNC-Fräse", account: "0700", kind: "Maschinen" },
];

const ITEMS_SELL: &[Item] = &[
    Item { desc: "Schreibtisch \"Executive\"", account: "5000", kind: "Eigene Erzeugnisse" },
    Item { desc: "Bürostuhl \"Ergo\" (Handelsware)", account: "5100", kind: "Handelswaren" },
];

fn vat_rate() -> Decimal {
    Decimal::new(19, 2)
}

fn random_date<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{:02}.{:02}.2025", rng.gen_range(1..=28u32), rng.gen_range(1..=12u32))
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BookingError {
    #[error("no {0} to draw a booking document from")]
    EmptyTable(&'static str),
}

fn pick<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T], table: &'static str) -> Result<&'a T, BookingError> {
    items.choose(rng).ok_or(BookingError::EmptyTable(table))
}

fn invoice(net: Decimal) -> (Decimal, Decimal) {
    let tax = round2(net * vat_rate());
    (tax, net + tax)
}

fn incoming_invoice<R: Rng + ?Sized>(rng: &mut R) -> Result<BookingTask, BookingError> {
    let item = pick(rng, ITEMS_BUY, "purchase items")?;
    let net = Decimal::from(rng.gen_range(500..=5000i64));
    let (tax, total) = invoice(net);
    let sender = pick(rng, COMPANIES, "companies")?;
    Ok(BookingTask {
        id: Uuid::new_v4().to_string(),
        document_type: DocumentType::Eingangsrechnung,
        description: format!("Wir kaufen {} auf Ziel.", item.kind),
        hint: format!(
            "Beim Einkauf von {} buchen wir auf das entsprechende Bestandskonto (Aktiva) im Soll. \
             Die Vorsteuer kommt ebenfalls ins Soll. Die Verbindlichkeit entsteht im Haben.",
            item.kind
        ),
        document: Document {
            sender: format!("{}\nIndustriestraße {}\n12345 Musterstadt", sender, rng.gen_range(1..=99)),
            receiver: OWN_COMPANY.into(),
            date: random_date(rng),
            number: format!("RE-{}", rng.gen_range(1000..=9999)),
            items: vec![DocumentItem { description: item.desc.into(), amount: net, tax_rate: vat_rate() }],
            net_amount: net,
            tax_amount: tax,
            total_amount: total,
            transactions: vec![],
        },
        solution: vec![
            BookingLine::new(item.account, net, Side::Soll),
            BookingLine::new("2600", tax, Side::Soll),
            BookingLine::new("4400", total, Side::Haben),
        ],
    })
}

fn outgoing_invoice<R: Rng + ?Sized>(rng: &mut R) -> Result<BookingTask, BookingError> {
    let item = pick(rng, ITEMS_SELL, "sales items")?;
    let net = Decimal::from(rng.gen_range(1000..=8000i64));
    let (tax, total) = invoice(net);
    let receiver = pick(rng, COMPANIES, "companies")?;
    Ok(BookingTask {
        id: Uuid::new_v4().to_string(),
        document_type: DocumentType::Ausgangsrechnung,
        description: format!("Wir verkaufen {} auf Ziel.", item.kind),
        hint: "Beim Verkauf entstehen Forderungen an den Kunden (Soll). \
               Die Erlöse (Haben) und die Umsatzsteuer (Haben) müssen gebucht werden."
            .into(),
        document: Document {
            sender: OWN_COMPANY.into(),
            receiver: format!("{}\nHandelsweg {}\n54321 Stadt", receiver, rng.gen_range(1..=99)),
            date: random_date(rng),
            number: format!("AR-{}", rng.gen_range(1000..=9999)),
            items: vec![DocumentItem { description: item.desc.into(), amount: net, tax_rate: vat_rate() }],
            net_amount: net,
            tax_amount: tax,
            total_amount: total,
            transactions: vec![],
        },
        solution: vec![
            BookingLine::new("2400", total, Side::Soll),
            BookingLine::new(item.account, net, Side::Haben),
            BookingLine::new("4800", tax, Side::Haben),
        ],
    })
}

struct StatementCase {
    description: &'static str,
    hint: &'static str,
    text: &'static str,
    statement_side: Side,
    debit: &'static str,
    credit: &'static str,
}

const STATEMENT_CASES: &[StatementCase] = &[
    StatementCase {
        description: "Ein Kunde begleicht eine offene Rechnung.",
        hint: "Wenn Geld auf dem Bankkonto eingeht (Haben auf dem Auszug), nimmt das Bankkonto zu (Soll). \
               Die Forderung an den Kunden erlischt (Haben).",
        text: "Gutschrift Kunde",
        statement_side: Side::Haben,
        debit: "2800",
        credit: "2400",
    },
    StatementCase {
        description: "Wir begleichen eine Lieferantenrechnung per Überweisung.",
        hint: "Geld fließt ab (Soll auf dem Auszug, Haben auf dem Bankkonto). \
               Unsere Verbindlichkeiten verringern sich (Soll).",
        text: "Überweisung an Lieferant",
        statement_side: Side::Soll,
        debit: "4400",
        credit: "2800",
    },
    StatementCase {
        description: "Die monatliche Büromiete wird abgebucht.",
        hint: "Miete ist ein Aufwand (Soll). Das Bankkonto nimmt ab (Haben).",
        text: "Miete Bürogebäude",
        statement_side: Side::Soll,
        debit: "6700",
        credit: "2800",
    },
];

fn bank_statement<R: Rng + ?Sized>(rng: &mut R) -> BookingTask {
    let roll: f64 = rng.gen();
    let case = if roll < 0.4 {
        &STATEMENT_CASES[0]
    } else if roll < 0.7 {
        &STATEMENT_CASES[1]
    } else {
        &STATEMENT_CASES[2]
    };
    let amount = Decimal::from(rng.gen_range(500..=5000i64));
    let date = random_date(rng);
    BookingTask {
        id: Uuid::new_v4().to_string(),
        document_type: DocumentType::Kontoauszug,
        description: case.description.into(),
        hint: case.hint.into(),
        document: Document {
            sender: "Volksbank".into(),
            receiver: "Büro-Design GmbH".into(),
            date: date.clone(),
            number: format!("KA-{}", rng.gen_range(1..=12)),
            items: vec![],
            net_amount: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            transactions: vec![StatementLine {
                date,
                description: case.text.into(),
                amount,
                side: case.statement_side,
            }],
        },
        solution: vec![
            BookingLine::new(case.debit, amount, Side::Soll),
            BookingLine::new(case.credit, amount, Side::Haben),
        ],
    }
}

/// 40 % incoming invoices, 30 % outgoing invoices, 30 % bank statements.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Result<BookingTask, BookingError> {
    let roll: f64 = rng.gen();
    let task = if roll < 0.4 {
        incoming_invoice(rng)?
    } else if roll < 0.7 {
        outgoing_invoice(rng)?
    } else {
        bank_statement(rng)
    };
    debug!(target: "exercise", id = %task.id, kind = ?task.document_type, "booking task generated");
    Ok(task)
}

/// Lines without an account, side or parseable amount are ignored. The rest
/// must pair up one-to-one with the solution, in any order.
pub fn check(task: &BookingTask, lines: &[EntryLine], tolerance: Tolerance) -> BookingCheck {
    let entered: Vec<(&str, f64, Side)> = lines
        .iter()
        .filter_map(|l| {
            let account = l.account.trim();
            if account.is_empty() {
                return None;
            }
            Some((account, parse_decimal(&l.amount)?, l.side?))
        })
        .collect();

    let expected_lines = task.solution.len();
    if entered.len() != expected_lines {
        return BookingCheck {
            correct: false,
            matched: 0,
            expected_lines,
            message: format!(
                "Es werden {} Buchungszeilen erwartet, eingegeben wurden {}.",
                expected_lines,
                entered.len()
            ),
        };
    }

    let mut used = vec![false; expected_lines];
    let mut matched = 0;
    for (account, amount, side) in entered {
        let hit = task.solution.iter().enumerate().position(|(i, s)| {
            !used[i]
                && s.account == account
                && s.side == side
                && tolerance.accepts(amount, s.amount.to_f64().unwrap_or(f64::NAN))
        });
        if let Some(i) = hit {
            used[i] = true;
            matched += 1;
        }
    }

    let correct = matched == expected_lines;
    BookingCheck {
        correct,
        matched,
        expected_lines,
        message: if correct {
            "Richtig! Der Buchungssatz stimmt.".into()
        } else {
            format!("{} von {} Zeilen stimmen. Prüfe Konten, Soll/Haben und Beträge.", matched, expected_lines)
        },
    }
}

/// Journal entry as text, debit lines first: "2000 Rohstoffe 1000,00€ an ...".
pub fn render_solution(task: &BookingTask) -> String {
    let side = |want: Side| {
        task.solution
            .iter()
            .filter(|l| l.side == want)
            .map(|l| format!("{} {} {}", l.account, account_name(&l.account), format_money(l.amount)))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!("{} an {}", side(Side::Soll), side(Side::Haben))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rust_decimal_macros::dec;

    fn line(account: &str, amount: &str, side: Side) -> EntryLine {
        EntryLine { account: account.into(), amount: amount.into(), side: Some(side) }
    }

    fn sample_incoming() -> BookingTask {
        let mut task = incoming_invoice(&mut StdRng::seed_from_u64(1)).unwrap();
        task.solution = vec![
            BookingLine::new("2000", dec!(1000), Side::Soll),
            BookingLine::new("2600", dec!(190), Side::Soll),
            BookingLine::new("4400", dec!(1190), Side::Haben),
        ];
        task
    }

    #[test]
    fn account_lookup() {
        assert_eq!(account_name("2600"), "Vorsteuer");
        assert_eq!(account_name(" 4400 "), "Verbindlichkeiten a.LL.");
        assert_eq!(account_name("9999"), "Unbekanntes Konto");
    }

    #[test]
    fn generated_entries_balance() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let task = generate(&mut rng).unwrap();
            let soll: Decimal = task.solution.iter().filter(|l| l.side == Side::Soll).map(|l| l.amount).sum();
            let haben: Decimal = task.solution.iter().filter(|l| l.side == Side::Haben).map(|l| l.amount).sum();
            assert_eq!(soll, haben, "{:?}", task.solution);
            for l in &task.solution {
                assert_ne!(account_name(&l.account), "Unbekanntes Konto");
            }
            if task.document_type != DocumentType::Kontoauszug {
                assert_eq!(task.document.tax_amount, round2(task.document.net_amount * dec!(0.19)));
            }
        }
    }

    #[test]
    fn drawing_from_an_empty_table_is_an_error() {
        let mut rng = StdRng::seed_from_u64(3);
        let empty: &[&str] = &[];
        assert_eq!(pick(&mut rng, empty, "companies"), Err(BookingError::EmptyTable("companies")));
        assert_eq!(pick(&mut rng, COMPANIES, "companies").map(|c| c.is_empty()), Ok(false));
    }

    #[test]
    fn order_insensitive_match() {
        let task = sample_incoming();
        let lines = vec![
            line("4400", "1.190,00", Side::Haben),
            line("2600", "190", Side::Soll),
            line("2000", "1000,004", Side::Soll),
            line("", "", Side::Soll),
        ];
        let res = check(&task, &lines, Tolerance::absolute(0.01));
        assert!(res.correct, "{}", res.message);
        assert_eq!(res.matched, 3);
    }

    #[test]
    fn wrong_side_or_count_fails() {
        let task = sample_incoming();
        let swapped = vec![
            line("4400", "1190", Side::Soll),
            line("2600", "190", Side::Soll),
            line("2000", "1000", Side::Soll),
        ];
        let res = check(&task, &swapped, Tolerance::absolute(0.01));
        assert!(!res.correct);
        assert_eq!(res.matched, 2);

        let short = vec![line("2000", "1000", Side::Soll), line("4400", "1190", Side::Haben)];
        let res = check(&task, &short, Tolerance::absolute(0.01));
        assert!(!res.correct);
        assert!(res.message.contains("3 Buchungszeilen"));
    }

    #[test]
    fn duplicate_lines_do_not_match_twice() {
        let mut task = sample_incoming();
        task.solution = vec![
            BookingLine::new("2800", dec!(700), Side::Soll),
            BookingLine::new("2400", dec!(700), Side::Haben),
        ];
        let lines = vec![line("2800", "700", Side::Soll), line("2800", "700", Side::Soll)];
        let res = check(&task, &lines, Tolerance::absolute(0.01));
        assert_eq!(res.matched, 1);
        assert!(!res.correct);
    }

    #[test]
    fn solution_text() {
        let task = sample_incoming();
        assert_eq!(
            render_solution(&task),
            "2000 Rohstoffe 1000,00€, 2600 Vorsteuer 190,00€ an 4400 Verbindlichkeiten a.LL. 1190,00€"
        );
    }
}
