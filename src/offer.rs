//! Angebotsvergleich: three supplier offers for one product. The student
//! computes each Bezugspreis and then weighs qualitative criteria.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::calculation::{forward, CalcError, Rates, Schema, StepKey, Values};
use crate::validation::{check_value, FieldFeedback, Tolerance};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Product {
  Drucker,
  Smartphone,
  #[serde(rename = "PC")]
  Pc,
}

impl Product {
  pub const ALL: [Product; 3] = [Product::Drucker, Product::Smartphone, Product::Pc];

  fn base_price(self) -> i64 {
    match self {
      Product::Drucker => 300,
      Product::Smartphone => 600,
      Product::Pc => 1200,
    }
  }
}

struct Supplier {
  name: &'static str,
  description: &'static str,
  /// Price modifier in percent of the base price.
  price_mod: i64,
  quality: Option<u8>,
  environment: Option<u8>,
  service: Option<u8>,
}

const SUPPLIERS: [Supplier; 6] = [
  Supplier {
    name: "TechGiant GmbH",
    description: "Marktführer, bekannt für sehr hohe Qualität und exzellenten 24/7 Support. Setzt allerdings noch teilweise auf ältere Verpackungsmaterialien.",
    price_mod: 130,
    quality: Some(10),
    environment: None,
    service: Some(9),
  },
  Supplier {
    name: "EcoTech Solutions",
    description: "Junges Unternehmen mit Fokus auf Nachhaltigkeit. CO2-neutrale Lieferung und Recycling-Programm. Der Support ist nur per E-Mail erreichbar.",
    price_mod: 110,
    quality: None,
    environment: Some(10),
    service: None,
  },
  Supplier {
    name: "BudgetHardware24",
    description: "Discounter mit sehr günstigen Preisen. Die Geräte sind solide, aber der Service ist minimal. Lange Wartezeiten bei Reklamationen.",
    price_mod: 80,
    quality: Some(4),
    environment: None,
    service: Some(2),
  },
  Supplier {
    name: "Office Partner AG",
    description: "Spezialist für Büroausstattung. Bietet solide Qualität und gute Garantieleistungen. Solides Mittelmaß in allen Bereichen.",
    price_mod: 100,
    quality: None,
    environment: None,
    service: None,
  },
  Supplier {
    name: "GreenGadgets",
    description: "Verwendet recycelte Materialien. Die Technik ist nicht immer die allerneueste, aber sehr langlebig. Sehr umweltbewusst.",
    price_mod: 110,
    quality: None,
    environment: Some(10),
    service: None,
  },
  Supplier {
    name: "SpeedyDelivery",
    description: "Fokus auf extrem schnelle Lieferung. Die Preise sind etwas höher. Qualität ist gut, aber nicht Premium.",
    price_mod: 100,
    quality: None,
    environment: None,
    service: None,
  },
];

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Criterion {
  pub id: &'static str,
  pub name: &'static str,
}

pub const CRITERIA: [Criterion; 6] = [
  Criterion { id: "price", name: "Bezugspreis (Niedriger ist besser)" },
  Criterion { id: "quality", name: "Qualität / Verarbeitung" },
  Criterion { id: "env", name: "Umweltschutz / Nachhaltigkeit" },
  Criterion { id: "service", name: "Service / Support" },
  Criterion { id: "delivery", name: "Lieferzeit (Kürzer ist besser)" },
  Criterion { id: "warranty", name: "Garantiezeit (Länger ist besser)" },
];

#[derive(Clone, Debug, Serialize)]
pub struct Offer {
  pub id: String,
  pub supplier: &'static str,
  pub supplier_description: &'static str,
  pub list_price: Decimal,
  pub discount_p: Decimal,
  pub cash_discount_p: Decimal,
  pub shipping: Decimal,
  pub delivery_days: u32,
  pub warranty_years: u32,
  #[serde(skip_serializing)]
  pub quality_score: u8,
  #[serde(skip_serializing)]
  pub environment_score: u8,
  #[serde(skip_serializing)]
  pub service_score: u8,
  /// Lep down to Bezugspreis.
  #[serde(skip_serializing)]
  pub values: Values,
}

impl Offer {
  pub fn final_price(&self) -> Option<Decimal> {
    self.values.get(&StepKey::Bp).copied()
  }
}

#[derive(Clone, Debug, Serialize)]
pub struct OfferTask {
  pub id: String,
  pub product: Product,
  pub offers: Vec<Offer>,
  pub criteria: &'static [Criterion],
}

#[derive(Clone, Debug, Serialize)]
pub struct OfferSolution {
  pub offer_id: String,
  pub supplier: &'static str,
  pub values: Values,
}

fn purchase_rates(discount_p: Decimal, cash_discount_p: Decimal) -> Rates {
  Rates {
    l_rabatt_p: discount_p,
    l_skonto_p: cash_discount_p,
    hkz_p: Decimal::ZERO,
    gewinn_p: Decimal::ZERO,
    k_skonto_p: Decimal::ZERO,
    k_rabatt_p: Decimal::ZERO,
    ust_p: Decimal::ZERO,
  }
}

pub fn build_offer(
  index: usize,
  supplier_index: usize,
  list_price: Decimal,
  discount_p: Decimal,
  cash_discount_p: Decimal,
  shipping: Decimal,
) -> Result<Offer, CalcError> {
  let s = &SUPPLIERS[supplier_index % SUPPLIERS.len()];
  let values = forward(Schema::Bezugskalkulation, list_price, shipping, &purchase_rates(discount_p, cash_discount_p))?;
  Ok(Offer {
    id: format!("offer-{}", index),
    supplier: s.name,
    supplier_description: s.description,
    list_price,
    discount_p,
    cash_discount_p,
    shipping,
    delivery_days: 7,
    warranty_years: 2,
    quality_score: s.quality.unwrap_or(7),
    environment_score: s.environment.unwrap_or(6),
    service_score: s.service.unwrap_or(6),
    values,
  })
}

/// Three distinct suppliers; list price is base price times supplier
/// modifier times a random 90..110 % factor, rounded to whole euros.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Result<OfferTask, CalcError> {
  let product = *Product::ALL.choose(rng).unwrap_or(&Product::Drucker);
  let mut order: Vec<usize> = (0..SUPPLIERS.len()).collect();
  order.shuffle(rng);

  let mut offers = Vec::with_capacity(3);
  for (index, &si) in order.iter().take(3).enumerate() {
    let s = &SUPPLIERS[si];
    let jitter: i64 = rng.gen_range(90..=110);
    let list_price = (Decimal::from(product.base_price() * s.price_mod * jitter) / Decimal::from(10_000))
      .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let discount = Decimal::from(rng.gen_range(0..=15i64));
    let cash_discount = Decimal::from(rng.gen_range(0..=3i64));
    let shipping = Decimal::from(rng.gen_range(0..=8i64) * 5);
    let mut offer = build_offer(index, si, list_price, discount, cash_discount, shipping)?;
    offer.delivery_days = rng.gen_range(1..=14);
    offer.warranty_years = rng.gen_range(1..=3);
    offer.quality_score = s.quality.unwrap_or_else(|| rng.gen_range(5..=9));
    offer.environment_score = s.environment.unwrap_or_else(|| rng.gen_range(4..=8));
    offer.service_score = s.service.unwrap_or_else(|| rng.gen_range(4..=8));
    offers.push(offer);
  }

  let task = OfferTask { id: Uuid::new_v4().to_string(), product, offers, criteria: &CRITERIA };
  debug!(target: "exercise", id = %task.id, ?product, "offer comparison generated");
  Ok(task)
}

/// Answers keyed by offer id; unknown ids are ignored.
pub fn check_prices(task: &OfferTask, answers: &HashMap<String, String>, tolerance: Tolerance) -> Vec<FieldFeedback> {
  task
    .offers
    .iter()
    .filter_map(|o| {
      let raw = answers.get(&o.id)?;
      let expected = o.final_price().and_then(|p| p.to_f64());
      Some(FieldFeedback::new(o.id.clone(), check_value(raw, expected, tolerance)))
    })
    .collect()
}

pub fn solution(task: &OfferTask) -> Vec<OfferSolution> {
  task
    .offers
    .iter()
    .map(|o| OfferSolution { offer_id: o.id.clone(), supplier: o.supplier, values: o.values.clone() })
    .collect()
}

#[derive(Debug, Error, PartialEq)]
pub enum OfferError {
  #[error("weight for {criterion} must be 1..=5, got {weight}")]
  WeightOutOfRange { criterion: String, weight: u32 },
  #[error("score for {criterion}/{offer} must be 0..=10, got {score}")]
  ScoreOutOfRange { criterion: String, offer: String, score: u32 },
  #[error("unknown criterion {0}")]
  UnknownCriterion(String),
  #[error("unknown offer {0}")]
  UnknownOffer(String),
}

/// One row of the decision matrix.
#[derive(Clone, Debug, Deserialize)]
pub struct Rating {
  pub criterion: String,
  pub weight: u32,
  #[serde(default)]
  pub scores: HashMap<String, u32>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct OfferTotal {
  pub offer_id: String,
  pub supplier: &'static str,
  pub total: u32,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Ranking {
  pub totals: Vec<OfferTotal>,
  /// More than one on a tie; empty when nothing was scored.
  pub winners: Vec<String>,
}

/// Weighted sum per offer: sum over criteria of weight × score. Missing
/// scores count as zero.
pub fn rank(task: &OfferTask, ratings: &[Rating]) -> Result<Ranking, OfferError> {
  let mut totals: Vec<OfferTotal> = task
    .offers
    .iter()
    .map(|o| OfferTotal { offer_id: o.id.clone(), supplier: o.supplier, total: 0 })
    .collect();

  for r in ratings {
    if !CRITERIA.iter().any(|c| c.id == r.criterion) {
      return Err(OfferError::UnknownCriterion(r.criterion.clone()));
    }
    if !(1..=5).contains(&r.weight) {
      return Err(OfferError::WeightOutOfRange { criterion: r.criterion.clone(), weight: r.weight });
    }
    for (offer, &score) in &r.scores {
      if score > 10 {
        return Err(OfferError::ScoreOutOfRange { criterion: r.criterion.clone(), offer: offer.clone(), score });
      }
      let slot = totals
        .iter_mut()
        .find(|t| &t.offer_id == offer)
        .ok_or_else(|| OfferError::UnknownOffer(offer.clone()))?;
      slot.total += r.weight * score;
    }
  }

  let best = totals.iter().map(|t| t.total).max().unwrap_or(0);
  let winners = if best == 0 {
    vec![]
  } else {
    totals.iter().filter(|t| t.total == best).map(|t| t.offer_id.clone()).collect()
  };
  Ok(Ranking { totals, winners })
}
