//! Rectangle: area and perimeter with unit choice.

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use super::{AnswerField, GeometrySettings, GeometryTask, Given, Sketch, Topic, Unit};
use crate::util::format_de;

fn half_steps<R: Rng + ?Sized>(rng: &mut R, lo: u32, hi: u32) -> f64 {
  rng.gen_range(lo * 2..=hi * 2) as f64 / 2.0
}

pub fn build(width: f64, height: f64, unit: Unit, settings: &GeometrySettings) -> GeometryTask {
  let area = width * height;
  let perimeter = 2.0 * (width + height);
  let w = format_de(width, 1);
  let h = format_de(height, 1);

  GeometryTask {
    id: Uuid::new_v4().to_string(),
    topic: Topic::Rectangle,
    title: "Rechteck".into(),
    prompt: format!(
      "Ein Rechteck ist {} {} lang und {} {} breit. Berechne Flächeninhalt und Umfang und wähle jeweils die passende Einheit.",
      w, unit, h, unit
    ),
    givens: vec![Given::new("Länge a", format!("{} {}", w, unit)), Given::new("Breite b", format!("{} {}", h, unit))],
    fields: vec![
      AnswerField::area(Some(area), unit, settings.tolerance),
      AnswerField::perimeter(Some(perimeter), unit, settings.tolerance),
    ],
    classification: None,
    formula: "A = a · b; u = 2 · (a + b)".into(),
    tip: Some("Flächen haben Quadrat-Einheiten, Umfänge einfache Längeneinheiten.".into()),
    steps: vec![
      format!("A = {} · {} = {} {}", w, h, format_de(area, 2), unit.squared()),
      format!("u = 2 · ({} + {}) = {} {}", w, h, format_de(perimeter, 2), unit),
    ],
    sketch: Sketch::Rectangle { width, height, unit },
  }
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, settings: &GeometrySettings) -> GeometryTask {
  let unit = *[Unit::Cm, Unit::M].choose(rng).unwrap_or(&Unit::Cm);
  let width = half_steps(rng, 4, 20);
  let height = half_steps(rng, 2, 12).min(width);
  build(width, height, unit, settings)
}
