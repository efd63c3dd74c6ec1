//! "Wie rechnet man das?" lines for single rows of a calculation sheet.
//! Formulas are derived from the transition that produces the row, with the
//! task's own numbers filled in.

use rust_decimal::Decimal;

use super::task::CalcTask;
use super::{Basis, Direction, Operator, Rates, StepKey, Transition, PROFIT_STEP, TRANSITIONS};
use crate::util::{format_money, format_percent};

fn shown(values: &super::Values, key: StepKey) -> String {
  format!("{} ({})", key.label(), format_money(values.get(&key).copied().unwrap_or_default()))
}

fn rate(t: &Transition, rates: &Rates) -> String {
  format_percent(t.rate.map(|k| rates.get(k)).unwrap_or(Decimal::ZERO))
}

/// Going downstream: the row is either a step's amount or its result.
fn forward_formula(t: &Transition, key: StepKey, task: &CalcTask) -> Option<String> {
  let v = &task.values;
  if key == t.amount {
    return Some(match t.basis {
      Basis::Given => "Gegebener Wert".to_string(),
      Basis::VomHundert => format!("{} × {} ÷ 100", shown(v, t.base), rate(t, &task.rates)),
      Basis::ImHundert => format!("{} – {}", shown(v, t.result), shown(v, t.base)),
    });
  }
  if key == t.result {
    return Some(match t.basis {
      Basis::ImHundert => format!("{} ÷ (100 - {}) × 100", shown(v, t.base), rate(t, &task.rates)),
      _ => {
        let op = match t.operator {
          Operator::Add => "+",
          Operator::Subtract => "–",
        };
        format!("{} {} {}", shown(v, t.base), op, shown(v, t.amount))
      }
    });
  }
  None
}

/// Going upstream: the row is either a step's amount or its base.
fn backward_formula(t: &Transition, key: StepKey, task: &CalcTask) -> Option<String> {
  let v = &task.values;
  if key == t.amount {
    return Some(match t.basis {
      Basis::Given => "Gegebener Wert".to_string(),
      Basis::VomHundert => {
        let p = rate(t, &task.rates);
        format!("{} ÷ (100 {} {}) × {}", shown(v, t.result), t.operator.symbol(), p, p)
      }
      Basis::ImHundert => format!("{} × {} ÷ 100", shown(v, t.result), rate(t, &task.rates)),
    });
  }
  if key == t.base {
    let op = match t.operator {
      Operator::Add => "–",
      Operator::Subtract => "+",
    };
    return Some(format!("{} {} {}", shown(v, t.result), op, shown(v, t.amount)));
  }
  None
}

pub fn explain(task: &CalcTask, key: StepKey) -> Option<String> {
  let transitions = task.schema.transitions();
  match task.direction {
    Direction::Vorwaerts => transitions.iter().find_map(|t| forward_formula(t, key, task)),
    Direction::Rueckwaerts => transitions.iter().find_map(|t| backward_formula(t, key, task)),
    Direction::Differenz => {
      if key == StepKey::Gewinn {
        return Some(format!("{} – {}", shown(&task.values, StepKey::Bvp), shown(&task.values, StepKey::Sk)));
      }
      TRANSITIONS[..PROFIT_STEP]
        .iter()
        .find_map(|t| forward_formula(t, key, task))
        .or_else(|| TRANSITIONS[PROFIT_STEP + 1..].iter().find_map(|t| backward_formula(t, key, task)))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::calculation::chain::{backward, forward};
  use crate::calculation::{Rates, Schema};
  use rust_decimal_macros::dec;

  fn task(schema: Schema, direction: Direction) -> CalcTask {
    let rates = Rates {
      l_rabatt_p: dec!(10),
      l_skonto_p: dec!(2),
      hkz_p: dec!(25),
      gewinn_p: dec!(10),
      k_skonto_p: dec!(2),
      k_rabatt_p: dec!(10),
      ust_p: dec!(19),
    };
    let values = match direction {
      Direction::Rueckwaerts => backward(schema, dec!(1729), dec!(50), &rates).unwrap(),
      _ => forward(schema, dec!(1000), dec!(50), &rates).unwrap(),
    };
    CalcTask {
      id: "t".into(),
      schema,
      direction,
      rates,
      values,
      given: vec![],
      description: String::new(),
    }
  }

  #[test]
  fn forward_lines() {
    let t = task(Schema::Handelskalkulation, Direction::Vorwaerts);
    assert_eq!(explain(&t, StepKey::LRabatt).unwrap(), "Listeneinkaufspreis (1000,00€) × 10% ÷ 100");
    assert_eq!(explain(&t, StepKey::Zep).unwrap(), "Listeneinkaufspreis (1000,00€) – Liefererrabatt (100,00€)");
    assert_eq!(explain(&t, StepKey::Bezugskosten).unwrap(), "Gegebener Wert");
    assert_eq!(explain(&t, StepKey::Zvp).unwrap(), "Barverkaufspreis (1281,50€) ÷ (100 - 2%) × 100");
    assert_eq!(explain(&t, StepKey::KSkonto).unwrap(), "Zielverkaufspreis (1307,65€) – Barverkaufspreis (1281,50€)");
    assert_eq!(explain(&t, StepKey::Lep), None);
  }

  #[test]
  fn backward_lines() {
    let t = task(Schema::Handelskalkulation, Direction::Rueckwaerts);
    assert_eq!(explain(&t, StepKey::Ust).unwrap(), "Bruttoverkaufspreis (1729,00€) ÷ (100 + 19%) × 19%");
    assert_eq!(explain(&t, StepKey::Nvp).unwrap(), "Bruttoverkaufspreis (1729,00€) – Umsatzsteuer (276,06€)");
    assert_eq!(explain(&t, StepKey::KRabatt).unwrap(), "Nettoverkaufspreis (1452,94€) × 10% ÷ 100");
    assert_eq!(explain(&t, StepKey::LRabatt).unwrap(), "Zieleinkaufspreis (900,00€) ÷ (100 - 10%) × 10%");
    assert_eq!(explain(&t, StepKey::Lep).unwrap(), "Zieleinkaufspreis (900,00€) + Liefererrabatt (100,00€)");
    assert_eq!(explain(&t, StepKey::Brutto), None);
  }

  #[test]
  fn difference_meets_at_profit() {
    let t = task(Schema::Handelskalkulation, Direction::Differenz);
    assert_eq!(explain(&t, StepKey::Gewinn).unwrap(), "Barverkaufspreis (1281,50€) – Selbstkosten (1165,00€)");
    assert!(explain(&t, StepKey::Hkz).unwrap().starts_with("Bezugspreis (932,00€) ×"));
    assert!(explain(&t, StepKey::KSkonto).unwrap().starts_with("Zielverkaufspreis"));
  }
}
