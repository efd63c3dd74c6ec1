//! Plane geometry exercises: rectangles, triangles, circles and composite
//! areas. Every generator returns a [`GeometryTask`] that carries its own
//! expected answers, units and tolerance; the sketch is derived from the same
//! parameters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::validation::{check_with_unit, FieldFeedback, Tolerance, Verdict};

pub mod circle;
pub mod composite;
pub mod rectangle;
pub mod sketch;
pub mod triangle;
pub mod units;

pub use sketch::Sketch;
pub use units::Unit;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GenerationError {
  #[error("no valid {shape} found after {attempts} attempts")]
  Exhausted { shape: &'static str, attempts: u32 },
}

/// Knobs shared by all geometry generators.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct GeometrySettings {
  pub tolerance: Tolerance,
  /// Composite tasks ask for answers rounded to two decimals.
  pub composite_tolerance: Tolerance,
  pub max_retries: u32,
}

impl Default for GeometrySettings {
  fn default() -> Self {
    Self {
      tolerance: Tolerance::mixed(0.05, 0.02),
      composite_tolerance: Tolerance::absolute(0.01),
      max_retries: 50,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
  Rectangle,
  Triangle,
  Circle,
  MixedArea,
}

#[derive(Clone, Debug, Serialize)]
pub struct Given {
  pub label: String,
  pub value: String,
}

impl Given {
  pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
    Self { label: label.into(), value: value.into() }
  }
}

/// One numeric answer box with its unit picker. Expected value, unit and
/// tolerance stay on the server.
#[derive(Clone, Debug, Serialize)]
pub struct AnswerField {
  pub key: String,
  pub label: String,
  #[serde(skip_serializing)]
  pub expected: Option<f64>,
  #[serde(skip_serializing)]
  pub unit: Unit,
  pub unit_choices: Vec<Unit>,
  #[serde(skip_serializing)]
  pub tolerance: Tolerance,
  pub decimals: u8,
}

impl AnswerField {
  pub fn area(expected: Option<f64>, length: Unit, tolerance: Tolerance) -> Self {
    Self {
      key: "area".into(),
      label: "Flächeninhalt A".into(),
      expected,
      unit: length.squared(),
      unit_choices: Unit::area_choices(length),
      tolerance,
      decimals: 2,
    }
  }

  pub fn perimeter(expected: Option<f64>, length: Unit, tolerance: Tolerance) -> Self {
    Self {
      key: "perimeter".into(),
      label: "Umfang u".into(),
      expected,
      unit: length,
      unit_choices: Unit::length_choices(length),
      tolerance,
      decimals: 2,
    }
  }

  pub fn length(key: &str, label: &str, expected: Option<f64>, length: Unit, tolerance: Tolerance) -> Self {
    Self {
      key: key.into(),
      label: label.into(),
      expected,
      unit: length,
      unit_choices: Unit::length_choices(length),
      tolerance,
      decimals: 2,
    }
  }
}

/// Multiple choice part (triangle type).
#[derive(Clone, Debug, Serialize)]
pub struct Classification {
  pub options: Vec<String>,
  #[serde(skip_serializing)]
  pub expected: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct GeometryTask {
  pub id: String,
  pub topic: Topic,
  pub title: String,
  pub prompt: String,
  pub givens: Vec<Given>,
  pub fields: Vec<AnswerField>,
  pub classification: Option<Classification>,
  #[serde(skip_serializing)]
  pub formula: String,
  pub tip: Option<String>,
  #[serde(skip_serializing)]
  pub steps: Vec<String>,
  pub sketch: Sketch,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FieldAnswer {
  #[serde(default)]
  pub value: String,
  #[serde(default)]
  pub unit: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct FieldSolution {
  pub key: String,
  pub label: String,
  pub value: Option<f64>,
  pub unit: Unit,
}

#[derive(Clone, Debug, Serialize)]
pub struct GeometrySolution {
  pub fields: Vec<FieldSolution>,
  pub classification: Option<String>,
  pub formula: String,
  pub steps: Vec<String>,
}

impl GeometryTask {
  /// Check every field plus the classification (if any). Missing answers
  /// count as unparsable.
  pub fn evaluate(&self, answers: &HashMap<String, FieldAnswer>, choice: Option<&str>) -> Vec<FieldFeedback> {
    let mut out: Vec<FieldFeedback> = self
      .fields
      .iter()
      .map(|f| {
        let answer = answers.get(&f.key).cloned().unwrap_or_default();
        let verdict = check_with_unit(&answer.value, f.expected, f.tolerance, answer.unit.as_deref(), f.unit.symbol());
        FieldFeedback::new(&f.key, verdict)
      })
      .collect();

    if let Some(c) = &self.classification {
      let verdict = match choice.map(str::trim) {
        Some(picked) if picked.eq_ignore_ascii_case(&c.expected) => Verdict::Correct,
        Some(_) => Verdict::WrongValue,
        None => Verdict::Unparsable,
      };
      out.push(FieldFeedback::new("type", verdict));
    }
    out
  }

  pub fn solution(&self) -> GeometrySolution {
    GeometrySolution {
      fields: self
        .fields
        .iter()
        .map(|f| FieldSolution { key: f.key.clone(), label: f.label.clone(), value: f.expected, unit: f.unit })
        .collect(),
      classification: self.classification.as_ref().map(|c| c.expected.clone()),
      formula: self.formula.clone(),
      steps: self.steps.clone(),
    }
  }
}

/// Round for display and for the expected value shown to learners.
pub fn round_to(value: f64, decimals: u32) -> f64 {
  let f = 10f64.powi(decimals as i32);
  (value * f).round() / f
}
