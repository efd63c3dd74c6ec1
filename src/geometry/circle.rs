//! Circle: one of radius, area or circumference is given, the other two are asked.

use std::f64::consts::PI;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{round_to, AnswerField, GeometrySettings, GeometryTask, Given, Sketch, Topic, Unit};
use crate::util::format_de;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CircleGiven {
  Radius,
  Area,
  Circumference,
}

/// The shown value is rounded to one decimal and the answers are derived
/// from that shown value.
pub fn build(given: CircleGiven, radius: f64, settings: &GeometrySettings) -> GeometryTask {
  let unit = Unit::Cm;
  let tol = settings.tolerance;
  let (shown, r) = match given {
    CircleGiven::Radius => {
      let r = round_to(radius, 1);
      (r, r)
    }
    CircleGiven::Area => {
      let a = round_to(PI * radius * radius, 1);
      (a, (a / PI).sqrt())
    }
    CircleGiven::Circumference => {
      let u = round_to(2.0 * PI * radius, 1);
      (u, u / (2.0 * PI))
    }
  };
  let area = PI * r * r;
  let circumference = 2.0 * PI * r;
  let radius_field = AnswerField::length("radius", "Radius r", Some(r), unit, tol);
  let area_field = AnswerField::area(Some(area), unit, tol);
  let circ_field = AnswerField::length("circumference", "Umfang U", Some(circumference), unit, tol);

  let (prompt, given_row, fields, formula, steps) = match given {
    CircleGiven::Radius => (
      format!("Ein Kreis hat den Radius r = {} cm. Berechne seinen Umfang U und den Flächeninhalt A.", format_de(shown, 1)),
      Given::new("Radius r", format!("{} cm", format_de(shown, 1))),
      vec![area_field, circ_field],
      "A = π · r²; U = 2 · π · r",
      vec![
        format!("A = π · {}² ≈ {} cm²", format_de(r, 1), format_de(area, 2)),
        format!("U = 2 · π · {} ≈ {} cm", format_de(r, 1), format_de(circumference, 2)),
      ],
    ),
    CircleGiven::Area => (
      format!("Der Flächeninhalt eines Kreises beträgt A = {} cm². Berechne Radius r und Umfang U.", format_de(shown, 1)),
      Given::new("Flächeninhalt A", format!("{} cm²", format_de(shown, 1))),
      vec![radius_field, circ_field],
      "r = √(A / π); U = 2 · π · r",
      vec![
        format!("r = √({} / π) ≈ {} cm", format_de(shown, 1), format_de(r, 2)),
        format!("U = 2 · π · {} ≈ {} cm", format_de(r, 2), format_de(circumference, 2)),
      ],
    ),
    CircleGiven::Circumference => (
      format!("Der Umfang eines Kreises beträgt U = {} cm. Berechne Radius r und Flächeninhalt A.", format_de(shown, 1)),
      Given::new("Umfang U", format!("{} cm", format_de(shown, 1))),
      vec![radius_field, area_field],
      "r = U / (2 · π); A = π · r²",
      vec![
        format!("r = {} / (2 · π) ≈ {} cm", format_de(shown, 1), format_de(r, 2)),
        format!("A = π · {}² ≈ {} cm²", format_de(r, 2), format_de(area, 2)),
      ],
    ),
  };

  GeometryTask {
    id: Uuid::new_v4().to_string(),
    topic: Topic::Circle,
    title: "Kreis".into(),
    prompt,
    givens: vec![given_row],
    fields,
    classification: None,
    formula: formula.into(),
    tip: Some("Rechne mit π aus dem Taschenrechner und runde erst am Ende.".into()),
    steps,
    sketch: Sketch::Circle { radius: r, unit },
  }
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, settings: &GeometrySettings) -> GeometryTask {
  let given = *[CircleGiven::Radius, CircleGiven::Area, CircleGiven::Circumference]
    .choose(rng)
    .unwrap_or(&CircleGiven::Radius);
  let radius = rng.gen_range(3.0..=12.0);
  build(given, radius, settings)
}
