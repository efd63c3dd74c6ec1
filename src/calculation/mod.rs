//! Percentage-chain calculator (Bezugs- and Handelskalkulation).
//!
//! The chain is a fixed list of [`Transition`]s. Each one turns a running
//! amount into the next, either via a rate "vom Hundert" (percentage of the
//! current base), "im Hundert" (percentage of the result) or a given amount
//! (shipping). Every intermediate value is rounded to cents before it becomes
//! the next base, so forward and backward runs reconcile on the cent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub mod chain;
pub mod explain;
pub mod task;

pub use chain::{forward, Values};
pub use task::{generate_task, CalcRanges, CalcTask};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalcError {
  #[error("rate {key:?} = {value}% is outside [0, 100)")]
  InvalidRate { key: RateKey, value: Decimal },
  #[error("division by zero while solving {0:?}")]
  DivisionByZero(StepKey),
  #[error("amount {key:?} must not be negative (got {value})")]
  NegativeAmount { key: StepKey, value: Decimal },
  #[error("{direction:?} is not available for {schema:?}")]
  UnsupportedDirection { schema: Schema, direction: Direction },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
  /// List price down to Bezugspreis (7 rows).
  Bezugskalkulation,
  /// Full trade chain up to Bruttoverkaufspreis (17 rows).
  Handelskalkulation,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
  Vorwaerts,
  Rueckwaerts,
  Differenz,
}

/// Row keys in chain order. The derived `Ord` follows the chain.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepKey {
  Lep,
  LRabatt,
  Zep,
  LSkonto,
  Bep,
  Bezugskosten,
  Bp,
  Hkz,
  Sk,
  Gewinn,
  Bvp,
  KSkonto,
  Zvp,
  KRabatt,
  Nvp,
  Ust,
  Brutto,
}

impl StepKey {
  pub const ALL: [StepKey; 17] = [
    StepKey::Lep,
    StepKey::LRabatt,
    StepKey::Zep,
    StepKey::LSkonto,
    StepKey::Bep,
    StepKey::Bezugskosten,
    StepKey::Bp,
    StepKey::Hkz,
    StepKey::Sk,
    StepKey::Gewinn,
    StepKey::Bvp,
    StepKey::KSkonto,
    StepKey::Zvp,
    StepKey::KRabatt,
    StepKey::Nvp,
    StepKey::Ust,
    StepKey::Brutto,
  ];

  /// Wire name, same as the serde representation.
  pub fn as_str(self) -> &'static str {
    match self {
      StepKey::Lep => "lep",
      StepKey::LRabatt => "l_rabatt",
      StepKey::Zep => "zep",
      StepKey::LSkonto => "l_skonto",
      StepKey::Bep => "bep",
      StepKey::Bezugskosten => "bezugskosten",
      StepKey::Bp => "bp",
      StepKey::Hkz => "hkz",
      StepKey::Sk => "sk",
      StepKey::Gewinn => "gewinn",
      StepKey::Bvp => "bvp",
      StepKey::KSkonto => "k_skonto",
      StepKey::Zvp => "zvp",
      StepKey::KRabatt => "k_rabatt",
      StepKey::Nvp => "nvp",
      StepKey::Ust => "ust",
      StepKey::Brutto => "brutto",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      StepKey::Lep => "Listeneinkaufspreis",
      StepKey::LRabatt => "Liefererrabatt",
      StepKey::Zep => "Zieleinkaufspreis",
      StepKey::LSkonto => "Liefererskonto",
      StepKey::Bep => "Bareinkaufspreis",
      StepKey::Bezugskosten => "Bezugskosten",
      StepKey::Bp => "Bezugspreis",
      StepKey::Hkz => "Handlungskosten",
      StepKey::Sk => "Selbstkosten",
      StepKey::Gewinn => "Gewinn",
      StepKey::Bvp => "Barverkaufspreis",
      StepKey::KSkonto => "Kundenskonto",
      StepKey::Zvp => "Zielverkaufspreis",
      StepKey::KRabatt => "Kundenrabatt",
      StepKey::Nvp => "Nettoverkaufspreis",
      StepKey::Ust => "Umsatzsteuer",
      StepKey::Brutto => "Bruttoverkaufspreis",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RateKey {
  LRabattP,
  LSkontoP,
  HkzP,
  GewinnP,
  KSkontoP,
  KRabattP,
  UstP,
}

/// Percentages of one task, e.g. `10` for 10 %.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rates {
  pub l_rabatt_p: Decimal,
  pub l_skonto_p: Decimal,
  pub hkz_p: Decimal,
  pub gewinn_p: Decimal,
  pub k_skonto_p: Decimal,
  pub k_rabatt_p: Decimal,
  pub ust_p: Decimal,
}

impl Rates {
  pub fn get(&self, key: RateKey) -> Decimal {
    match key {
      RateKey::LRabattP => self.l_rabatt_p,
      RateKey::LSkontoP => self.l_skonto_p,
      RateKey::HkzP => self.hkz_p,
      RateKey::GewinnP => self.gewinn_p,
      RateKey::KSkontoP => self.k_skonto_p,
      RateKey::KRabattP => self.k_rabatt_p,
      RateKey::UstP => self.ust_p,
    }
  }

  /// Rates must lie in `[0, 100)`; only those the given transitions use are checked.
  pub fn validate_for(&self, transitions: &[Transition]) -> Result<(), CalcError> {
    for t in transitions {
      if let Some(key) = t.rate {
        let value = self.get(key);
        if value < Decimal::ZERO || value >= Decimal::ONE_HUNDRED {
          return Err(CalcError::InvalidRate { key, value });
        }
      }
    }
    Ok(())
  }
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
  Subtract,
  Add,
}

impl Operator {
  pub fn symbol(self) -> &'static str {
    match self {
      Operator::Subtract => "-",
      Operator::Add => "+",
    }
  }
}

/// How the amount of a step relates to its neighbours.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
  /// Percentage of the preceding (base) value.
  VomHundert,
  /// Percentage of the resulting value.
  ImHundert,
  /// Absolute amount, no rate.
  Given,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
  pub base: StepKey,
  pub amount: StepKey,
  pub result: StepKey,
  pub operator: Operator,
  pub basis: Basis,
  pub rate: Option<RateKey>,
}

const fn step(
  base: StepKey,
  amount: StepKey,
  result: StepKey,
  operator: Operator,
  basis: Basis,
  rate: Option<RateKey>,
) -> Transition {
  Transition { base, amount, result, operator, basis, rate }
}

/// The full trade chain. Bezugskalkulation uses the first three transitions.
pub const TRANSITIONS: [Transition; 8] = [
  step(StepKey::Lep, StepKey::LRabatt, StepKey::Zep, Operator::Subtract, Basis::VomHundert, Some(RateKey::LRabattP)),
  step(StepKey::Zep, StepKey::LSkonto, StepKey::Bep, Operator::Subtract, Basis::VomHundert, Some(RateKey::LSkontoP)),
  step(StepKey::Bep, StepKey::Bezugskosten, StepKey::Bp, Operator::Add, Basis::Given, None),
  step(StepKey::Bp, StepKey::Hkz, StepKey::Sk, Operator::Add, Basis::VomHundert, Some(RateKey::HkzP)),
  step(StepKey::Sk, StepKey::Gewinn, StepKey::Bvp, Operator::Add, Basis::VomHundert, Some(RateKey::GewinnP)),
  step(StepKey::Bvp, StepKey::KSkonto, StepKey::Zvp, Operator::Add, Basis::ImHundert, Some(RateKey::KSkontoP)),
  step(StepKey::Zvp, StepKey::KRabatt, StepKey::Nvp, Operator::Add, Basis::ImHundert, Some(RateKey::KRabattP)),
  step(StepKey::Nvp, StepKey::Ust, StepKey::Brutto, Operator::Add, Basis::VomHundert, Some(RateKey::UstP)),
];

/// Index of the profit transition; difference mode meets here.
pub const PROFIT_STEP: usize = 4;

impl Schema {
  pub fn transitions(self) -> &'static [Transition] {
    match self {
      Schema::Bezugskalkulation => &TRANSITIONS[..3],
      Schema::Handelskalkulation => &TRANSITIONS[..],
    }
  }

  pub fn end_key(self) -> StepKey {
    match self {
      Schema::Bezugskalkulation => StepKey::Bp,
      Schema::Handelskalkulation => StepKey::Brutto,
    }
  }

  pub fn title(self) -> &'static str {
    match self {
      Schema::Bezugskalkulation => "Bezugskalkulation",
      Schema::Handelskalkulation => "Handelskalkulation",
    }
  }

  /// Rows as printed on the sheet: the start value, then amount/result pairs.
  pub fn rows(self) -> Vec<Row> {
    let mut rows = vec![Row { key: StepKey::Lep, label: StepKey::Lep.label(), operator: None, rate: None }];
    for t in self.transitions() {
      rows.push(Row { key: t.amount, label: t.amount.label(), operator: Some(t.operator), rate: t.rate });
      rows.push(Row { key: t.result, label: t.result.label(), operator: None, rate: None });
    }
    rows
  }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Row {
  pub key: StepKey,
  pub label: &'static str,
  pub operator: Option<Operator>,
  pub rate: Option<RateKey>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use rust_decimal_macros::dec;

  #[test]
  fn row_counts_match_the_sheets() {
    assert_eq!(Schema::Bezugskalkulation.rows().len(), 7);
    assert_eq!(Schema::Handelskalkulation.rows().len(), 17);
    let keys: Vec<StepKey> = Schema::Handelskalkulation.rows().iter().map(|r| r.key).collect();
    assert_eq!(keys, StepKey::ALL.to_vec());
  }

  #[test]
  fn customer_steps_are_im_hundert() {
    let im: Vec<StepKey> = TRANSITIONS.iter().filter(|t| t.basis == Basis::ImHundert).map(|t| t.amount).collect();
    assert_eq!(im, vec![StepKey::KSkonto, StepKey::KRabatt]);
    assert_eq!(TRANSITIONS[PROFIT_STEP].amount, StepKey::Gewinn);
  }

  #[test]
  fn rates_at_or_above_hundred_are_rejected() {
    let mut rates = Rates {
      l_rabatt_p: dec!(10),
      l_skonto_p: dec!(2),
      hkz_p: dec!(25),
      gewinn_p: dec!(10),
      k_skonto_p: dec!(2),
      k_rabatt_p: dec!(10),
      ust_p: dec!(19),
    };
    assert!(rates.validate_for(&TRANSITIONS).is_ok());
    rates.k_rabatt_p = dec!(100);
    assert_eq!(
      rates.validate_for(&TRANSITIONS),
      Err(CalcError::InvalidRate { key: RateKey::KRabattP, value: dec!(100) })
    );
    rates.k_rabatt_p = dec!(-1);
    assert!(rates.validate_for(&TRANSITIONS).is_err());
  }

  #[test]
  fn keys_serialize_snake_case() {
    assert_eq!(serde_json::to_string(&StepKey::LRabatt).unwrap(), "\"l_rabatt\"");
    for key in StepKey::ALL {
      assert_eq!(serde_json::to_string(&key).unwrap(), format!("\"{}\"", key.as_str()));
    }
    assert_eq!(serde_json::to_string(&RateKey::KSkontoP).unwrap(), "\"k_skonto_p\"");
    assert_eq!(serde_json::to_string(&Direction::Rueckwaerts).unwrap(), "\"rueckwaerts\"");
  }
}
