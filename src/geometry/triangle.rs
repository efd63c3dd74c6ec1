//! Triangles: classify by sides, or compute area and perimeter.
//!
//! Side lengths are drawn with bounded rejection sampling. Sides are rounded
//! to one decimal before any check so that what the learner sees is exactly
//! what was validated.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::{round_to, AnswerField, Classification, GenerationError, GeometrySettings, GeometryTask, Given, Sketch, Topic, Unit};
use crate::util::format_de;

const VERTEX_LETTERS: [&str; 7] = ["A", "B", "C", "D", "E", "F", "G"];
/// Legs of an isosceles triangle differ from its base at least by this.
const MIN_LEG_GAP: f64 = 0.5;
/// Pairwise gap between the sides of a scalene triangle.
const MIN_SCALENE_GAP: f64 = 1.5;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriangleKind {
  Gleichseitig,
  Gleichschenklig,
  Allgemein,
}

impl TriangleKind {
  pub const ALL: [TriangleKind; 3] = [TriangleKind::Gleichseitig, TriangleKind::Gleichschenklig, TriangleKind::Allgemein];

  pub fn label(self) -> &'static str {
    match self {
      TriangleKind::Gleichseitig => "gleichseitig",
      TriangleKind::Gleichschenklig => "gleichschenklig",
      TriangleKind::Allgemein => "allgemein",
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriangleMode {
  Klassifizieren,
  Flaeche,
}

/// `base` runs from the first to the second vertex, `side_b` from the first
/// to the apex, `side_a` from the second to the apex.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sides {
  pub kind: TriangleKind,
  pub base: f64,
  pub side_a: f64,
  pub side_b: f64,
}

impl Sides {
  /// Horizontal offset of the apex above the base.
  pub fn apex_x(&self) -> f64 {
    (self.side_b.powi(2) + self.base.powi(2) - self.side_a.powi(2)) / (2.0 * self.base)
  }

  pub fn height(&self) -> f64 {
    let x = self.apex_x();
    (self.side_b.powi(2) - x * x).max(0.0).sqrt()
  }

  pub fn perimeter(&self) -> f64 {
    self.base + self.side_a + self.side_b
  }
}

/// Strict triangle inequality on all three pairs.
pub fn is_triangle(a: f64, b: f64, c: f64) -> bool {
  a + b > c && a + c > b && b + c > a
}

fn between<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
  round_to(rng.gen_range(lo..=hi), 1)
}

pub fn sample_sides<R: Rng + ?Sized>(rng: &mut R, kind: TriangleKind, max_retries: u32) -> Result<Sides, GenerationError> {
  match kind {
    TriangleKind::Gleichseitig => {
      let s = between(rng, 8.0, 14.0);
      Ok(Sides { kind, base: s, side_a: s, side_b: s })
    }
    TriangleKind::Gleichschenklig => {
      for _ in 0..max_retries {
        let base = between(rng, 10.0, 16.0);
        let leg = between(rng, 10.0, 16.0);
        if is_triangle(leg, leg, base) && (leg - base).abs() >= MIN_LEG_GAP {
          return Ok(Sides { kind, base, side_a: leg, side_b: leg });
        }
      }
      Err(GenerationError::Exhausted { shape: "isosceles triangle", attempts: max_retries })
    }
    TriangleKind::Allgemein => {
      for _ in 0..max_retries {
        let base = between(rng, 10.0, 16.0);
        let side_a = between(rng, 9.0, 16.0);
        let side_b = between(rng, 9.0, 16.0);
        let distinct = (side_a - side_b).abs() >= MIN_SCALENE_GAP
          && (side_a - base).abs() >= MIN_SCALENE_GAP
          && (side_b - base).abs() >= MIN_SCALENE_GAP;
        if is_triangle(side_a, side_b, base) && distinct {
          return Ok(Sides { kind, base, side_a, side_b });
        }
      }
      Err(GenerationError::Exhausted { shape: "scalene triangle", attempts: max_retries })
    }
  }
}

/// Three distinct vertex letters; side names are the lower-case letter of the
/// opposite vertex.
pub fn pick_vertices<R: Rng + ?Sized>(rng: &mut R) -> [String; 3] {
  let picked: Vec<String> = VERTEX_LETTERS.choose_multiple(rng, 3).map(|s| s.to_string()).collect();
  match picked.as_slice() {
    [a, b, c] => [a.clone(), b.clone(), c.clone()],
    _ => ["A".into(), "B".into(), "C".into()],
  }
}

pub fn build(sides: Sides, vertices: [String; 3], mode: TriangleMode, settings: &GeometrySettings) -> GeometryTask {
  let [v1, v2, v3] = &vertices;
  let base_name = v3.to_lowercase();
  let a_name = v1.to_lowercase();
  let b_name = v2.to_lowercase();
  let height_label = format!("h_{}", base_name);
  let height = round_to(sides.height(), 1);
  let unit = Unit::Cm;

  let givens = vec![
    Given::new(format!("{} = {}{}", base_name, v1, v2), format!("{} cm", format_de(sides.base, 1))),
    Given::new(format!("{} = {}{}", a_name, v2, v3), format!("{} cm", format_de(sides.side_a, 1))),
    Given::new(format!("{} = {}{}", b_name, v1, v3), format!("{} cm", format_de(sides.side_b, 1))),
  ];

  let sketch = Sketch::Triangle {
    vertices: vertices.clone(),
    points: [(0.0, 0.0), (sides.base, 0.0), (sides.apex_x(), height)],
    side_labels: [a_name.clone(), b_name.clone(), base_name.clone()],
    height_label: Some(height_label.clone()),
  };

  match mode {
    TriangleMode::Klassifizieren => GeometryTask {
      id: Uuid::new_v4().to_string(),
      topic: Topic::Triangle,
      title: "Dreiecksart bestimmen".into(),
      prompt: format!("Betrachte das Dreieck {}{}{}. Welche Dreiecksart liegt vor?", v1, v2, v3),
      givens,
      fields: vec![],
      classification: Some(Classification {
        options: TriangleKind::ALL.iter().map(|k| k.label().to_string()).collect(),
        expected: sides.kind.label().to_string(),
      }),
      formula: "Gleichseitig: drei gleiche Seiten; gleichschenklig: zwei gleiche Seiten; allgemein: alle Seiten verschieden.".into(),
      tip: Some("Vergleiche die drei Seitenlängen miteinander.".into()),
      steps: vec![format!(
        "{} = {} cm, {} = {} cm, {} = {} cm ⇒ {}",
        base_name,
        format_de(sides.base, 1),
        a_name,
        format_de(sides.side_a, 1),
        b_name,
        format_de(sides.side_b, 1),
        sides.kind.label()
      )],
      sketch,
    },
    TriangleMode::Flaeche => {
      let area = 0.5 * sides.base * height;
      let perimeter = sides.perimeter();
      let mut givens = givens;
      givens.push(Given::new(height_label.clone(), format!("{} cm", format_de(height, 1))));
      GeometryTask {
        id: Uuid::new_v4().to_string(),
        topic: Topic::Triangle,
        title: "Dreieck: Fläche und Umfang".into(),
        prompt: format!(
          "Im Dreieck {}{}{} gilt {} = {} cm, {} = {} cm, {} = {} cm und Höhe {} = {} cm. Berechne Flächeninhalt A und Umfang U.",
          v1,
          v2,
          v3,
          a_name,
          format_de(sides.side_a, 1),
          b_name,
          format_de(sides.side_b, 1),
          base_name,
          format_de(sides.base, 1),
          height_label,
          format_de(height, 1)
        ),
        givens,
        fields: vec![
          AnswerField::area(Some(area), unit, settings.tolerance),
          AnswerField::perimeter(Some(perimeter), unit, settings.tolerance),
        ],
        classification: None,
        formula: format!("A = {} · {} / 2; U = {} + {} + {}", base_name, height_label, a_name, b_name, base_name),
        tip: Some("Die Höhe steht senkrecht auf der Grundseite.".into()),
        steps: vec![
          format!("A = {} · {} / 2 = {} cm²", format_de(sides.base, 1), format_de(height, 1), format_de(area, 2)),
          format!(
            "U = {} + {} + {} = {} cm",
            format_de(sides.side_a, 1),
            format_de(sides.side_b, 1),
            format_de(sides.base, 1),
            format_de(perimeter, 2)
          ),
        ],
        sketch,
      }
    }
  }
}

pub fn generate<R: Rng + ?Sized>(
  rng: &mut R,
  mode: Option<TriangleMode>,
  settings: &GeometrySettings,
) -> Result<GeometryTask, GenerationError> {
  let mode = mode.unwrap_or_else(|| if rng.gen_bool(0.5) { TriangleMode::Klassifizieren } else { TriangleMode::Flaeche });
  let kind = *TriangleKind::ALL.choose(rng).unwrap_or(&TriangleKind::Allgemein);
  let vertices = pick_vertices(rng);
  let sides = sample_sides(rng, kind, settings.max_retries)?;
  debug!(target: "exercise", ?kind, ?mode, base = sides.base, a = sides.side_a, b = sides.side_b, "Triangle sampled");
  Ok(build(sides, vertices, mode, settings))
}
