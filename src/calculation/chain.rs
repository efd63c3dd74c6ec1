//! Forward, backward and difference runs over the transition table.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{debug, instrument};

use super::{Basis, CalcError, Operator, Rates, Schema, StepKey, Transition, PROFIT_STEP, TRANSITIONS};

pub type Values = BTreeMap<StepKey, Decimal>;

/// Commercial rounding to cents (half away from zero).
pub fn round2(value: Decimal) -> Decimal {
  value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn sign(op: Operator) -> Decimal {
  match op {
    Operator::Add => Decimal::ONE,
    Operator::Subtract => Decimal::NEGATIVE_ONE,
  }
}

fn fraction(t: &Transition, rates: &Rates) -> Decimal {
  t.rate.map(|k| rates.get(k) / Decimal::ONE_HUNDRED).unwrap_or(Decimal::ZERO)
}

fn divide(value: Decimal, divisor: Decimal, solving: StepKey) -> Result<Decimal, CalcError> {
  if divisor <= Decimal::ZERO {
    return Err(CalcError::DivisionByZero(solving));
  }
  value.checked_div(divisor).ok_or(CalcError::DivisionByZero(solving))
}

fn non_negative(key: StepKey, value: Decimal) -> Result<(), CalcError> {
  if value.is_sign_negative() && !value.is_zero() {
    return Err(CalcError::NegativeAmount { key, value });
  }
  Ok(())
}

/// One step downstream: returns `(amount, result)`.
fn step_forward(t: &Transition, base: Decimal, shipping: Decimal, rates: &Rates) -> Result<(Decimal, Decimal), CalcError> {
  let s = sign(t.operator);
  let p = fraction(t, rates);
  match t.basis {
    Basis::Given => {
      let amount = round2(shipping);
      Ok((amount, round2(base + s * amount)))
    }
    Basis::VomHundert => {
      let amount = round2(base * p);
      Ok((amount, round2(base + s * amount)))
    }
    Basis::ImHundert => {
      // base is (100 - p)% of the result
      let result = round2(divide(base, Decimal::ONE - s * p, t.result)?);
      Ok((round2(s * (result - base)), result))
    }
  }
}

/// One step upstream: returns `(amount, base)`.
fn step_backward(t: &Transition, result: Decimal, shipping: Decimal, rates: &Rates) -> Result<(Decimal, Decimal), CalcError> {
  let s = sign(t.operator);
  let p = fraction(t, rates);
  match t.basis {
    Basis::Given => {
      let amount = round2(shipping);
      Ok((amount, round2(result - s * amount)))
    }
    Basis::VomHundert => {
      let base = round2(divide(result, Decimal::ONE + s * p, t.base)?);
      Ok((round2(s * (result - base)), base))
    }
    Basis::ImHundert => {
      let amount = round2(result * p);
      Ok((amount, round2(result - s * amount)))
    }
  }
}

fn run_forward(
  transitions: &[Transition],
  start: Decimal,
  shipping: Decimal,
  rates: &Rates,
  values: &mut Values,
) -> Result<Decimal, CalcError> {
  let mut current = start;
  for t in transitions {
    let (amount, result) = step_forward(t, current, shipping, rates)?;
    values.insert(t.amount, amount);
    values.insert(t.result, result);
    current = result;
  }
  Ok(current)
}

/// Cents searched on either side of the divided-out estimate.
const SEARCH_CENTS: i64 = 3;

/// Undo a run of consecutive vom-Hundert steps. Cent rounding can send
/// several bases to the same result, so every base near the estimate that
/// reproduces `target` going forward is collected and the middle one wins.
fn invert_percent_run(
  run: &[Transition],
  target: Decimal,
  shipping: Decimal,
  rates: &Rates,
  values: &mut Values,
) -> Result<Decimal, CalcError> {
  let mut estimate = target;
  for t in run.iter().rev() {
    estimate = step_backward(t, estimate, shipping, rates)?.1;
  }

  let cent = Decimal::new(1, 2);
  let mut hits = Vec::new();
  for offset in -SEARCH_CENTS..=SEARCH_CENTS {
    let candidate = estimate + cent * Decimal::from(offset);
    if candidate.is_sign_negative() {
      continue;
    }
    if run_forward(run, candidate, shipping, rates, &mut Values::new())? == target {
      hits.push(candidate);
    }
  }

  let Some(&start) = hits.get(hits.len() / 2) else {
    // target is not reachable on the cent; fall back to plain division
    let mut current = target;
    for t in run.iter().rev() {
      let (amount, base) = step_backward(t, current, shipping, rates)?;
      values.insert(t.amount, amount);
      values.insert(t.base, base);
      current = base;
    }
    return Ok(current);
  };
  values.insert(run[0].base, start);
  run_forward(run, start, shipping, rates, values)?;
  Ok(start)
}

fn run_backward(
  transitions: &[Transition],
  end: Decimal,
  shipping: Decimal,
  rates: &Rates,
  values: &mut Values,
) -> Result<Decimal, CalcError> {
  let mut current = end;
  let mut upper = transitions.len();
  while upper > 0 {
    let t = &transitions[upper - 1];
    if t.basis == Basis::VomHundert {
      let lower = transitions[..upper]
        .iter()
        .rposition(|t| t.basis != Basis::VomHundert)
        .map_or(0, |i| i + 1);
      current = invert_percent_run(&transitions[lower..upper], current, shipping, rates, values)?;
      non_negative(transitions[lower].base, current)?;
      upper = lower;
    } else {
      let (amount, base) = step_backward(t, current, shipping, rates)?;
      non_negative(t.base, base)?;
      values.insert(t.amount, amount);
      values.insert(t.base, base);
      current = base;
      upper -= 1;
    }
  }
  Ok(current)
}

/// Walk the chain from the list price down to the schema's end price.
#[instrument(level = "debug", skip_all, fields(?schema, %list_price, %shipping))]
pub fn forward(schema: Schema, list_price: Decimal, shipping: Decimal, rates: &Rates) -> Result<Values, CalcError> {
  rates.validate_for(schema.transitions())?;
  non_negative(StepKey::Lep, list_price)?;
  non_negative(StepKey::Bezugskosten, shipping)?;

  let mut values = Values::new();
  let start = round2(list_price);
  values.insert(StepKey::Lep, start);
  let end = run_forward(schema.transitions(), start, shipping, rates, &mut values)?;
  debug!(target: "exercise", %end, "Forward chain solved");
  Ok(values)
}

/// Invert the chain from the end price (Bezugspreis or Bruttoverkaufspreis).
#[instrument(level = "debug", skip_all, fields(?schema, %end_price, %shipping))]
pub fn backward(schema: Schema, end_price: Decimal, shipping: Decimal, rates: &Rates) -> Result<Values, CalcError> {
  rates.validate_for(schema.transitions())?;
  non_negative(schema.end_key(), end_price)?;
  non_negative(StepKey::Bezugskosten, shipping)?;

  let mut values = Values::new();
  let end = round2(end_price);
  values.insert(schema.end_key(), end);
  let start = run_backward(schema.transitions(), end, shipping, rates, &mut values)?;
  debug!(target: "exercise", %start, "Backward chain solved");
  Ok(values)
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DifferenceOutcome {
  pub values: Values,
  /// Negative when the sales price does not cover the Selbstkosten.
  pub profit: Decimal,
  pub profit_rate: Decimal,
}

/// Both ends are given; the profit is whatever bridges Selbstkosten and
/// Barverkaufspreis.
#[instrument(level = "debug", skip_all, fields(%list_price, %gross_price, %shipping))]
pub fn difference(
  list_price: Decimal,
  gross_price: Decimal,
  shipping: Decimal,
  rates: &Rates,
) -> Result<DifferenceOutcome, CalcError> {
  let lower = &TRANSITIONS[..PROFIT_STEP];
  let upper = &TRANSITIONS[PROFIT_STEP + 1..];
  rates.validate_for(lower)?;
  rates.validate_for(upper)?;
  non_negative(StepKey::Lep, list_price)?;
  non_negative(StepKey::Brutto, gross_price)?;
  non_negative(StepKey::Bezugskosten, shipping)?;

  let mut values = Values::new();
  let start = round2(list_price);
  let end = round2(gross_price);
  values.insert(StepKey::Lep, start);
  values.insert(StepKey::Brutto, end);

  let sk = run_forward(lower, start, shipping, rates, &mut values)?;
  let bvp = run_backward(upper, end, shipping, rates, &mut values)?;

  let profit = round2(bvp - sk);
  values.insert(StepKey::Gewinn, profit);
  let profit_rate = round2(divide(profit, sk, StepKey::Gewinn)? * Decimal::ONE_HUNDRED);
  debug!(target: "exercise", %sk, %bvp, %profit, %profit_rate, "Difference chain solved");

  Ok(DifferenceOutcome { values, profit, profit_rate })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::calculation::RateKey;
  use rand::{rngs::StdRng, Rng, SeedableRng};
  use rust_decimal_macros::dec;

  fn rates() -> Rates {
    Rates {
      l_rabatt_p: dec!(10),
      l_skonto_p: dec!(2),
      hkz_p: dec!(25),
      gewinn_p: dec!(10),
      k_skonto_p: dec!(2),
      k_rabatt_p: dec!(10),
      ust_p: dec!(19),
    }
  }

  #[test]
  fn procurement_scenario_forward() {
    let v = forward(Schema::Bezugskalkulation, dec!(1000), dec!(50), &rates()).unwrap();
    assert_eq!(v[&StepKey::LRabatt], dec!(100));
    assert_eq!(v[&StepKey::Zep], dec!(900));
    assert_eq!(v[&StepKey::LSkonto], dec!(18));
    assert_eq!(v[&StepKey::Bep], dec!(882));
    assert_eq!(v[&StepKey::Bezugskosten], dec!(50));
    assert_eq!(v[&StepKey::Bp], dec!(932));
    assert_eq!(v.len(), 7);
  }

  #[test]
  fn procurement_scenario_backward_reaches_list_price() {
    let v = backward(Schema::Bezugskalkulation, dec!(932), dec!(50), &rates()).unwrap();
    assert!((v[&StepKey::Lep] - dec!(1000)).abs() <= dec!(0.01));
    assert_eq!(v[&StepKey::Bep], dec!(882));
    assert_eq!(v[&StepKey::LSkonto], dec!(18));
    assert_eq!(v[&StepKey::LRabatt], dec!(100));
  }

  #[test]
  fn trade_chain_forward_uses_im_hundert_for_customer_terms() {
    let v = forward(Schema::Handelskalkulation, dec!(1000), dec!(50), &rates()).unwrap();
    assert_eq!(v[&StepKey::Hkz], dec!(233));
    assert_eq!(v[&StepKey::Sk], dec!(1165));
    assert_eq!(v[&StepKey::Gewinn], dec!(116.50));
    assert_eq!(v[&StepKey::Bvp], dec!(1281.50));
    // 1281.50 / 0.98
    assert_eq!(v[&StepKey::Zvp], dec!(1307.65));
    assert_eq!(v[&StepKey::KSkonto], dec!(26.15));
    // 1307.65 / 0.90
    assert_eq!(v[&StepKey::Nvp], dec!(1452.94));
    assert_eq!(v[&StepKey::KRabatt], dec!(145.29));
    assert_eq!(v[&StepKey::Ust], dec!(276.06));
    assert_eq!(v[&StepKey::Brutto], dec!(1729.00));
    assert_eq!(v.len(), 17);
  }

  #[test]
  fn trade_chain_round_trip_is_exact_for_fixed_rates() {
    let fwd = forward(Schema::Handelskalkulation, dec!(1000), dec!(50), &rates()).unwrap();
    let back = backward(Schema::Handelskalkulation, fwd[&StepKey::Brutto], dec!(50), &rates()).unwrap();
    for key in StepKey::ALL {
      let d = (fwd[&key] - back[&key]).abs();
      assert!(d <= dec!(0.01), "{:?}: {} vs {}", key, fwd[&key], back[&key]);
    }
  }

  #[test]
  fn random_round_trips_stay_within_one_cent() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
      let r = Rates {
        l_rabatt_p: Decimal::from(rng.gen_range(5..=20)),
        l_skonto_p: Decimal::from(rng.gen_range(1..=3)),
        hkz_p: Decimal::from(rng.gen_range(20..=40)),
        gewinn_p: Decimal::from(rng.gen_range(5..=20)),
        k_skonto_p: Decimal::from(rng.gen_range(1..=3)),
        k_rabatt_p: Decimal::from(rng.gen_range(5..=15)),
        ust_p: dec!(19),
      };
      let lep = Decimal::from(rng.gen_range(100..=1000)) + Decimal::new(rng.gen_range(0..=99), 2);
      let ship = Decimal::from(rng.gen_range(10..=50)) + Decimal::new(rng.gen_range(0..=99), 2);
      let fwd = forward(Schema::Handelskalkulation, lep, ship, &r).unwrap();
      let back = backward(Schema::Handelskalkulation, fwd[&StepKey::Brutto], ship, &r).unwrap();
      for key in StepKey::ALL {
        let d = (fwd[&key] - back[&key]).abs();
        assert!(d <= dec!(0.01), "{:?}: {} vs {} (lep {})", key, fwd[&key], back[&key], lep);
      }
      // from Bezugspreis upwards the inversion is exact
      for key in [StepKey::Bp, StepKey::Sk, StepKey::Bvp, StepKey::Zvp, StepKey::Nvp] {
        assert_eq!(fwd[&key], back[&key], "{:?}", key);
      }
    }
  }

  #[test]
  fn supplier_deductions_pick_the_middle_list_price() {
    // 591.96, 591.97 and 591.98 all reach Bareinkaufspreis 474.70
    let mut r = rates();
    r.l_rabatt_p = dec!(19);
    r.l_skonto_p = dec!(1);
    let fwd = forward(Schema::Bezugskalkulation, dec!(591.98), dec!(31.01), &r).unwrap();
    assert_eq!(fwd[&StepKey::Bep], dec!(474.70));
    let back = backward(Schema::Bezugskalkulation, fwd[&StepKey::Bp], dec!(31.01), &r).unwrap();
    assert_eq!(back[&StepKey::Lep], dec!(591.97));
    assert_eq!(back[&StepKey::Bep], dec!(474.70));
    for (key, value) in &fwd {
      assert!((*value - back[key]).abs() <= dec!(0.01), "{:?}: {} vs {}", key, value, back[key]);
    }
  }

  #[test]
  fn procurement_round_trips_stay_within_one_cent() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..2000 {
      let mut r = rates();
      r.l_rabatt_p = Decimal::from(rng.gen_range(0..=30));
      r.l_skonto_p = Decimal::from(rng.gen_range(0..=3));
      let lep = Decimal::from(rng.gen_range(50..=2000)) + Decimal::new(rng.gen_range(0..=99), 2);
      let ship = Decimal::from(rng.gen_range(0..=60)) + Decimal::new(rng.gen_range(0..=99), 2);
      let fwd = forward(Schema::Bezugskalkulation, lep, ship, &r).unwrap();
      let back = backward(Schema::Bezugskalkulation, fwd[&StepKey::Bp], ship, &r).unwrap();
      for (key, value) in &fwd {
        let d = (*value - back[key]).abs();
        assert!(d <= dec!(0.01), "{:?}: {} vs {} (lep {}, ship {})", key, value, back[key], lep, ship);
      }
    }
  }

  #[test]
  fn end_price_below_shipping_is_rejected() {
    assert_eq!(
      backward(Schema::Bezugskalkulation, dec!(30), dec!(50), &rates()),
      Err(CalcError::NegativeAmount { key: StepKey::Bep, value: dec!(-20) })
    );
    assert!(matches!(
      backward(Schema::Handelskalkulation, dec!(40), dec!(50), &rates()),
      Err(CalcError::NegativeAmount { key: StepKey::Bep, .. })
    ));
  }

  #[test]
  fn difference_reports_profit_and_loss() {
    let r = rates();
    let gain = difference(dec!(1000), dec!(1729), dec!(50), &r).unwrap();
    assert_eq!(gain.values[&StepKey::Sk], dec!(1165));
    assert_eq!(gain.values[&StepKey::Bvp], dec!(1281.50));
    assert_eq!(gain.profit, dec!(116.50));
    assert_eq!(gain.profit_rate, dec!(10));
    assert!(gain.profit > Decimal::ZERO);

    let loss = difference(dec!(1000), dec!(1300), dec!(50), &r).unwrap();
    assert_eq!(loss.values[&StepKey::Nvp], dec!(1092.44));
    assert_eq!(loss.values[&StepKey::Bvp], dec!(963.54));
    assert_eq!(loss.profit, dec!(-201.46));
    assert!(loss.profit_rate < Decimal::ZERO);
  }

  #[test]
  fn difference_ignores_the_profit_rate() {
    let mut r = rates();
    r.gewinn_p = dec!(250);
    assert!(difference(dec!(1000), dec!(1729), dec!(50), &r).is_ok());
    assert!(forward(Schema::Handelskalkulation, dec!(1000), dec!(50), &r).is_err());
  }

  #[test]
  fn invalid_inputs_are_errors_not_infinities() {
    let mut r = rates();
    r.l_rabatt_p = dec!(100);
    assert_eq!(
      backward(Schema::Bezugskalkulation, dec!(932), dec!(50), &r),
      Err(CalcError::InvalidRate { key: RateKey::LRabattP, value: dec!(100) })
    );
    assert_eq!(
      forward(Schema::Bezugskalkulation, dec!(-1), dec!(50), &rates()),
      Err(CalcError::NegativeAmount { key: StepKey::Lep, value: dec!(-1) })
    );
    assert_eq!(
      difference(Decimal::ZERO, dec!(100), Decimal::ZERO, &rates()),
      Err(CalcError::DivisionByZero(StepKey::Gewinn))
    );
  }

  #[test]
  fn rounding_is_half_away_from_zero() {
    assert_eq!(round2(dec!(0.125)), dec!(0.13));
    assert_eq!(round2(dec!(-0.125)), dec!(-0.13));
    assert_eq!(round2(dec!(2.344)), dec!(2.34));
  }
}
