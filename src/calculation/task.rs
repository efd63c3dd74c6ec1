//! Random calculation tasks: rates, start values, German task text and the
//! row-by-row answer check.

use std::collections::BTreeMap;

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::chain::{backward, difference, forward, round2, Values};
use super::{CalcError, Direction, Rates, Schema, StepKey};
use crate::util::{fill_template, format_money, format_percent};
use crate::validation::{check_value, Tolerance, Verdict};

/// Inclusive integer ranges used when drawing a task.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CalcRanges {
  pub list_price: (i64, i64),
  pub shipping: (i64, i64),
  pub l_rabatt_p: (i64, i64),
  pub l_skonto_p: (i64, i64),
  pub hkz_p: (i64, i64),
  pub gewinn_p: (i64, i64),
  pub k_skonto_p: (i64, i64),
  pub k_rabatt_p: (i64, i64),
  pub ust_p: i64,
  /// Target profit window for difference tasks.
  pub target_profit_p: (i64, i64),
}

impl Default for CalcRanges {
  fn default() -> Self {
    Self {
      list_price: (100, 1000),
      shipping: (10, 50),
      l_rabatt_p: (5, 20),
      l_skonto_p: (1, 3),
      hkz_p: (20, 40),
      gewinn_p: (5, 20),
      k_skonto_p: (1, 3),
      k_rabatt_p: (5, 15),
      ust_p: 19,
      target_profit_p: (5, 25),
    }
  }
}

fn draw<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (i64, i64)) -> i64 {
  if lo >= hi { lo } else { rng.gen_range(lo..=hi) }
}

/// Euros plus random cents.
fn draw_money<R: Rng + ?Sized>(rng: &mut R, range: (i64, i64)) -> Decimal {
  Decimal::from(draw(rng, range)) + Decimal::new(rng.gen_range(0..=99), 2)
}

impl CalcRanges {
  pub fn draw_rates<R: Rng + ?Sized>(&self, rng: &mut R) -> Rates {
    Rates {
      l_rabatt_p: Decimal::from(draw(rng, self.l_rabatt_p)),
      l_skonto_p: Decimal::from(draw(rng, self.l_skonto_p)),
      hkz_p: Decimal::from(draw(rng, self.hkz_p)),
      gewinn_p: Decimal::from(draw(rng, self.gewinn_p)),
      k_skonto_p: Decimal::from(draw(rng, self.k_skonto_p)),
      k_rabatt_p: Decimal::from(draw(rng, self.k_rabatt_p)),
      ust_p: Decimal::from(self.ust_p),
    }
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct CalcTask {
  pub id: String,
  pub schema: Schema,
  pub direction: Direction,
  pub rates: Rates,
  pub values: Values,
  /// Rows prefilled on the sheet.
  pub given: Vec<StepKey>,
  pub description: String,
}

impl CalcTask {
  pub fn value(&self, key: StepKey) -> Option<Decimal> {
    self.values.get(&key).copied()
  }

  /// Rows the learner has to fill in.
  pub fn open_rows(&self) -> Vec<StepKey> {
    self
      .schema
      .rows()
      .into_iter()
      .map(|r| r.key)
      .filter(|k| !self.given.contains(k))
      .collect()
  }

  /// Per-row verdicts; blank inputs and prefilled rows are skipped.
  pub fn check(&self, inputs: &BTreeMap<StepKey, String>, tolerance: Tolerance) -> Vec<(StepKey, Verdict)> {
    self
      .open_rows()
      .into_iter()
      .filter_map(|key| {
        let raw = inputs.get(&key)?;
        if raw.trim().is_empty() {
          return None;
        }
        let expected = self.value(key).and_then(|d| d.to_f64());
        Some((key, check_value(raw, expected, tolerance)))
      })
      .collect()
  }
}

fn given_rows(schema: Schema, direction: Direction) -> Vec<StepKey> {
  match direction {
    Direction::Vorwaerts => vec![StepKey::Lep, StepKey::Bezugskosten],
    Direction::Rueckwaerts => vec![schema.end_key(), StepKey::Bezugskosten],
    Direction::Differenz => vec![StepKey::Lep, StepKey::Bezugskosten, StepKey::Brutto],
  }
}

/// Build a fresh task. Backward tasks are solved from the forward end price,
/// difference tasks from a gross price implied by a random target profit.
#[instrument(level = "debug", skip(rng, ranges))]
pub fn generate_task<R: Rng + ?Sized>(
  rng: &mut R,
  schema: Schema,
  direction: Direction,
  ranges: &CalcRanges,
) -> Result<CalcTask, CalcError> {
  if schema == Schema::Bezugskalkulation && direction == Direction::Differenz {
    return Err(CalcError::UnsupportedDirection { schema, direction });
  }

  let mut rates = ranges.draw_rates(rng);
  let list_price = draw_money(rng, ranges.list_price);
  let shipping = draw_money(rng, ranges.shipping);

  let values = match direction {
    Direction::Vorwaerts => forward(schema, list_price, shipping, &rates)?,
    Direction::Rueckwaerts => {
      let fwd = forward(schema, list_price, shipping, &rates)?;
      let end = fwd.get(&schema.end_key()).copied().unwrap_or_default();
      backward(schema, end, shipping, &rates)?
    }
    Direction::Differenz => {
      rates.gewinn_p = Decimal::from(draw(rng, ranges.target_profit_p)) + Decimal::new(rng.gen_range(0..=99), 2);
      let fwd = forward(schema, list_price, shipping, &rates)?;
      let gross = fwd.get(&StepKey::Brutto).copied().unwrap_or_default();
      let outcome = difference(list_price, round2(gross), shipping, &rates)?;
      rates.gewinn_p = outcome.profit_rate;
      outcome.values
    }
  };

  let given = given_rows(schema, direction);
  let description = describe(schema, direction, &rates, &values);
  let task = CalcTask {
    id: Uuid::new_v4().to_string(),
    schema,
    direction,
    rates,
    values,
    given,
    description,
  };
  debug!(target: "exercise", id = %task.id, ?schema, ?direction, "Calculation task generated");
  Ok(task)
}

fn money(values: &Values, key: StepKey) -> String {
  format_money(values.get(&key).copied().unwrap_or_default())
}

/// German task text shown above the sheet.
pub fn describe(schema: Schema, direction: Direction, rates: &Rates, values: &Values) -> String {
  let supplier = fill_template(
    "Der Lieferer gewährt {rabatt} Rabatt und {skonto} Skonto. Die Bezugskosten betragen {bk}.",
    &[
      ("rabatt", &format_percent(rates.l_rabatt_p)),
      ("skonto", &format_percent(rates.l_skonto_p)),
      ("bk", &money(values, StepKey::Bezugskosten)),
    ],
  );
  let trade = fill_template(
    "Es wird mit {hkz} Handlungskosten kalkuliert. Dem Kunden werden {ks} Skonto und {kr} Rabatt eingeräumt, die Umsatzsteuer beträgt {ust}.",
    &[
      ("hkz", &format_percent(rates.hkz_p)),
      ("ks", &format_percent(rates.k_skonto_p)),
      ("kr", &format_percent(rates.k_rabatt_p)),
      ("ust", &format_percent(rates.ust_p)),
    ],
  );
  let profit = format!("Der Gewinnzuschlag beträgt {}.", format_percent(rates.gewinn_p));

  match (schema, direction) {
    (Schema::Bezugskalkulation, Direction::Vorwaerts) => format!(
      "Ein Großhändler bestellt Ware zum Listeneinkaufspreis von {}. {} Ermittle den Bezugspreis.",
      money(values, StepKey::Lep),
      supplier
    ),
    (Schema::Bezugskalkulation, _) => format!(
      "Der Bezugspreis einer Ware soll {} betragen. {} Wie hoch darf der Listeneinkaufspreis höchstens sein?",
      money(values, StepKey::Bp),
      supplier
    ),
    (Schema::Handelskalkulation, Direction::Vorwaerts) => format!(
      "Eine Ware wird zum Listeneinkaufspreis von {} eingekauft. {} {} {} Berechne den Bruttoverkaufspreis.",
      money(values, StepKey::Lep),
      supplier,
      trade,
      profit
    ),
    (Schema::Handelskalkulation, Direction::Rueckwaerts) => format!(
      "Der Markt lässt einen Bruttoverkaufspreis von {} zu. {} {} {} Wie hoch darf der Listeneinkaufspreis sein?",
      money(values, StepKey::Brutto),
      supplier,
      trade,
      profit
    ),
    (Schema::Handelskalkulation, Direction::Differenz) => format!(
      "Eine Ware kostet im Einkauf {} (Listeneinkaufspreis) und wird für {} brutto verkauft. {} {} Ermittle den Gewinn in Euro und Prozent.",
      money(values, StepKey::Lep),
      money(values, StepKey::Brutto),
      supplier,
      trade
    ),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::StdRng, SeedableRng};
  use rust_decimal_macros::dec;

  #[test]
  fn forward_task_rates_stay_in_ranges() {
    let mut rng = StdRng::seed_from_u64(1);
    let ranges = CalcRanges::default();
    for _ in 0..50 {
      let t = generate_task(&mut rng, Schema::Handelskalkulation, Direction::Vorwaerts, &ranges).unwrap();
      assert!(t.rates.l_rabatt_p >= dec!(5) && t.rates.l_rabatt_p <= dec!(20));
      assert!(t.rates.hkz_p >= dec!(20) && t.rates.hkz_p <= dec!(40));
      assert_eq!(t.rates.ust_p, dec!(19));
      let lep = t.value(StepKey::Lep).unwrap();
      assert!(lep >= dec!(100) && lep < dec!(1001));
      assert_eq!(t.values.len(), 17);
      assert_eq!(t.open_rows().len(), 15);
    }
  }

  #[test]
  fn backward_task_shows_consistent_end_price() {
    let mut rng = StdRng::seed_from_u64(2);
    let t = generate_task(&mut rng, Schema::Bezugskalkulation, Direction::Rueckwaerts, &CalcRanges::default()).unwrap();
    assert_eq!(t.given, vec![StepKey::Bp, StepKey::Bezugskosten]);
    let bp = t.value(StepKey::Bp).unwrap();
    assert!(t.description.contains(&format_money(bp)));
    let v = |k| t.value(k).unwrap();
    assert_eq!(v(StepKey::Lep) - v(StepKey::LRabatt), v(StepKey::Zep));
    assert_eq!(v(StepKey::Zep) - v(StepKey::LSkonto), v(StepKey::Bep));
    assert_eq!(v(StepKey::Bep) + v(StepKey::Bezugskosten), bp);
  }

  #[test]
  fn difference_task_profit_rate_is_solved() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..30 {
      let t = generate_task(&mut rng, Schema::Handelskalkulation, Direction::Differenz, &CalcRanges::default()).unwrap();
      let sk = t.value(StepKey::Sk).unwrap();
      let bvp = t.value(StepKey::Bvp).unwrap();
      assert_eq!(t.value(StepKey::Gewinn).unwrap(), bvp - sk);
      // target window 5..=25.99 survives the cent rounding of the gross price
      assert!(t.rates.gewinn_p > dec!(4.9) && t.rates.gewinn_p < dec!(26.1), "{}", t.rates.gewinn_p);
    }
  }

  #[test]
  fn procurement_difference_is_unsupported() {
    let mut rng = StdRng::seed_from_u64(4);
    let err = generate_task(&mut rng, Schema::Bezugskalkulation, Direction::Differenz, &CalcRanges::default()).unwrap_err();
    assert!(matches!(err, CalcError::UnsupportedDirection { .. }));
  }

  #[test]
  fn check_skips_blank_and_given_rows() {
    let mut rng = StdRng::seed_from_u64(5);
    let t = generate_task(&mut rng, Schema::Bezugskalkulation, Direction::Vorwaerts, &CalcRanges::default()).unwrap();
    let zep = t.value(StepKey::Zep).unwrap().to_string().replace('.', ",");
    let mut inputs = BTreeMap::new();
    inputs.insert(StepKey::Zep, zep);
    inputs.insert(StepKey::Bep, "".to_string());
    inputs.insert(StepKey::Lep, "1".to_string());
    inputs.insert(StepKey::Bp, "kein Plan".to_string());
    let verdicts = t.check(&inputs, Tolerance::absolute(0.05));
    assert_eq!(verdicts, vec![(StepKey::Zep, Verdict::Correct), (StepKey::Bp, Verdict::Unparsable)]);
  }
}
