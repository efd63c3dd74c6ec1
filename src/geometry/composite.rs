//! Mixed area exercises: a fixed catalogue of everyday shapes, most of them
//! composed from rectangles, triangles and circle parts.

use std::f64::consts::PI;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{round_to, AnswerField, GeometrySettings, GeometryTask, Given, Sketch, Topic, Unit};
use crate::util::format_de;

const ROUNDING_NOTE: &str = " Wähle die passende Einheit und runde auf zwei Nachkommastellen.";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
  Rectangle { w: f64, h: f64 },
  Square { a: f64 },
  Triangle { b: f64, h: f64, sides: Option<[f64; 3]> },
  Trapezoid { a: f64, b: f64, h: f64, legs: Option<[f64; 2]> },
  Parallelogram { b: f64, h: f64, side: f64 },
  Rhombus { d1: f64, d2: f64, side: f64 },
  Circle { r: f64 },
  #[serde(rename = "lshape")]
  LShape { w1: f64, h1: f64, w2: f64, h2: f64 },
  RectPlusTriangle { w: f64, h: f64, b: f64, t_height: f64 },
  SemiCircleRect { w: f64, h: f64, r: f64 },
  RectCutCircle { w: f64, h: f64, r: f64 },
  RectCutRect { w: f64, h: f64, cut_w: f64, cut_h: f64 },
  RectPlusCircle { w: f64, h: f64, r: f64 },
  RectFrame { outer_w: f64, outer_h: f64, inner_w: f64, inner_h: f64 },
  Ring { outer_r: f64, inner_r: f64 },
  Stadium { w: f64, h: f64, r: f64 },
  #[serde(rename = "tshape")]
  TShape { stem_w: f64, stem_h: f64, top_w: f64, top_h: f64 },
  RectCutCorner { w: f64, h: f64, cut_w: f64, cut_h: f64 },
  RectCutTwoCircles { w: f64, h: f64, r1: f64, r2: f64 },
  RectPlusSector { w: f64, h: f64, r: f64, angle: f64 },
}

impl Shape {
  /// Sum of the parts minus the cut-outs.
  pub fn area(&self) -> f64 {
    match *self {
      Shape::Rectangle { w, h } => w * h,
      Shape::Square { a } => a * a,
      Shape::Triangle { b, h, .. } => 0.5 * b * h,
      Shape::Trapezoid { a, b, h, .. } => 0.5 * (a + b) * h,
      Shape::Parallelogram { b, h, .. } => b * h,
      Shape::Rhombus { d1, d2, .. } => 0.5 * d1 * d2,
      Shape::Circle { r } => PI * r * r,
      Shape::LShape { w1, h1, w2, h2 } => w1 * h1 + w2 * h2,
      Shape::RectPlusTriangle { w, h, b, t_height } => {
        let roof = if b > 0.0 && t_height > 0.0 { 0.5 * b * t_height } else { 0.0 };
        w * h + roof
      }
      Shape::SemiCircleRect { w, h, r } => w * h + 0.5 * PI * r * r,
      Shape::RectCutCircle { w, h, r } => w * h - PI * r * r,
      Shape::RectCutRect { w, h, cut_w, cut_h } => w * h - cut_w * cut_h,
      Shape::RectPlusCircle { w, h, r } => w * h + PI * r * r,
      Shape::RectFrame { outer_w, outer_h, inner_w, inner_h } => outer_w * outer_h - inner_w * inner_h,
      Shape::Ring { outer_r, inner_r } => PI * (outer_r * outer_r - inner_r * inner_r),
      // two half circles make one full circle
      Shape::Stadium { w, h, r } => w * h + PI * r * r,
      Shape::TShape { stem_w, stem_h, top_w, top_h } => stem_w * stem_h + top_w * top_h,
      Shape::RectCutCorner { w, h, cut_w, cut_h } => w * h - 0.5 * cut_w * cut_h,
      Shape::RectCutTwoCircles { w, h, r1, r2 } => w * h - PI * (r1 * r1 + r2 * r2),
      Shape::RectPlusSector { w, h, r, angle } => w * h + angle / 360.0 * PI * r * r,
    }
  }

  /// Only the basic shapes have a perimeter formula here.
  pub fn perimeter(&self) -> Option<f64> {
    match *self {
      Shape::Rectangle { w, h } => Some(2.0 * (w + h)),
      Shape::Square { a } => Some(4.0 * a),
      Shape::Triangle { sides, .. } => sides.map(|s| s.iter().sum()),
      Shape::Trapezoid { a, b, legs, .. } => legs.map(|[l1, l2]| a + b + l1 + l2),
      Shape::Parallelogram { b, side, .. } => Some(2.0 * (b + side)),
      Shape::Rhombus { side, .. } => Some(4.0 * side),
      Shape::Circle { r } => Some(2.0 * PI * r),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Ask {
  Area,
  Perimeter,
  Both,
}

#[derive(Clone, Debug)]
pub struct CompositeDef {
  pub title: &'static str,
  pub question: &'static str,
  pub ask: Ask,
  pub unit: Unit,
  pub shape: Shape,
}

fn def(title: &'static str, ask: Ask, unit: Unit, shape: Shape, question: &'static str) -> CompositeDef {
  CompositeDef { title, question, ask, unit, shape }
}

/// Built-in task bank.
pub fn catalogue() -> Vec<CompositeDef> {
  use Ask::*;
  use Unit::{Cm, M};
  vec![
    def("Holzplatte mit Kreisausschnitt", Area, Cm, Shape::RectCutCircle { w: 240.0, h: 160.0, r: 20.0 },
      "Eine rechteckige Holzplatte ist 240 cm × 160 cm groß. Mittig wird ein Kreis mit Radius 20 cm ausgeschnitten. Berechne die verbleibende Fläche."),
    def("Bühnenboden mit rundem Loch", Area, M, Shape::RectCutCircle { w: 9.0, h: 6.0, r: 1.5 },
      "Ein Bühnenboden misst 9 m × 6 m. Ein rundes Loch mit Radius 1,5 m wird entfernt. Wie groß ist die Restfläche?"),
    def("Deckplatte mit Fenster", Area, Cm, Shape::RectCutRect { w: 180.0, h: 120.0, cut_w: 50.0, cut_h: 35.0 },
      "Eine Platte ist 180 cm × 120 cm groß. Ein rechteckiges Fenster von 50 cm × 35 cm wird ausgeschnitten. Berechne die resultierende Fläche."),
    def("Grundplatte mit Technikschacht", Area, M, Shape::RectCutRect { w: 12.0, h: 8.0, cut_w: 3.0, cut_h: 2.5 },
      "Eine Grundplatte misst 12 m × 8 m. Ein Schacht von 3 m × 2,5 m wird herausgetrennt. Bestimme die verbleibende Fläche."),
    def("L-förmige Terrasse", Area, M, Shape::LShape { w1: 9.0, h1: 6.0, w2: 4.0, h2: 3.0 },
      "Eine Terrasse ist L-förmig (9 m × 6 m plus 4 m × 3 m angesetzt). Berechne die Gesamtfläche."),
    def("Lagerfläche in L-Form", Area, M, Shape::LShape { w1: 11.0, h1: 7.0, w2: 3.5, h2: 3.0 },
      "Ein Lagerbereich hat zwei rechteckige Teile: 11 m × 7 m und 3,5 m × 3 m als L-Form. Wie groß ist die Fläche?"),
    def("Dach mit Dreiecksgiebel", Area, M, Shape::RectPlusTriangle { w: 10.0, h: 6.0, b: 10.0, t_height: 3.5 },
      "Ein Dach besteht aus einem Rechteck 10 m × 6 m mit aufgesetztem Dreieck (Grundseite 10 m, Höhe 3,5 m). Berechne die Gesamtfläche."),
    def("Werbebanner mit Spitze", Area, M, Shape::RectPlusTriangle { w: 6.0, h: 3.0, b: 6.0, t_height: 2.5 },
      "Ein Banner besteht aus einem Rechteck 6 m × 3 m und einem Dreieck (Grundseite 6 m, Höhe 2,5 m) obenauf. Bestimme den Flächeninhalt."),
    def("Halbrunder Vorbau", Area, M, Shape::SemiCircleRect { w: 8.0, h: 5.0, r: 4.0 },
      "Ein Vorbau kombiniert ein Rechteck 8 m × 5 m mit einem halbrunden Abschluss (Radius 4 m). Berechne die Gesamtfläche."),
    def("Fenster mit Rundbogen", Area, M, Shape::SemiCircleRect { w: 2.4, h: 1.6, r: 1.2 },
      "Ein Fenster besteht aus einem Rechteck 2,4 m × 1,6 m und einem halbrunden Aufsatz (Radius 1,2 m). Bestimme die Fläche."),
    def("Steg mit Kreisausschnitt", Area, M, Shape::RectCutCircle { w: 12.0, h: 4.0, r: 1.0 },
      "Ein Steg ist 12 m × 4 m groß. Für eine Leiter wird ein Kreis mit Radius 1 m ausgeschnitten. Wie groß bleibt die Fläche?"),
    def("Plattform mit rechteckigem Ausschnitt", Area, Cm, Shape::RectCutRect { w: 320.0, h: 180.0, cut_w: 80.0, cut_h: 50.0 },
      "Eine Plattform misst 320 cm × 180 cm. Ein Ausschnitt von 80 cm × 50 cm wird entfernt. Berechne die Restfläche."),
    def("Terrasse mit Rundung", Area, M, Shape::RectPlusCircle { w: 7.0, h: 5.0, r: 2.0 },
      "Eine Terrasse besteht aus einem Rechteck 7 m × 5 m und einem angesetzten Kreis (Radius 2 m). Wie groß ist die Gesamtfläche?"),
    def("Gartenfläche mit Halbkreis", Area, M, Shape::SemiCircleRect { w: 10.0, h: 6.0, r: 5.0 },
      "Eine Gartenfläche setzt sich aus 10 m × 6 m Rechteck und einem Halbkreis (Radius 5 m) an der Breitseite zusammen. Berechne die Fläche."),
    def("Rahmen aus Brettern", Area, M, Shape::RectFrame { outer_w: 12.0, outer_h: 9.0, inner_w: 8.0, inner_h: 5.0 },
      "Ein rechteckiger Rahmen hat Außenmaße 12 m × 9 m und eine Öffnung von 8 m × 5 m. Wie groß ist die Holzfläche?"),
    def("Bilderrahmen", Area, Cm, Shape::RectFrame { outer_w: 50.0, outer_h: 40.0, inner_w: 36.0, inner_h: 24.0 },
      "Ein Bilderrahmen ist außen 50 cm × 40 cm und hat ein Innenfenster 36 cm × 24 cm. Berechne die Rahmenfläche."),
    def("Laufbahn (Rundrechteck)", Area, M, Shape::Stadium { w: 40.0, h: 10.0, r: 5.0 },
      "Eine Trainingsbahn besteht aus einem 40 m langen Rechteck (Breite 10 m) mit halbrunden Enden Radius 5 m. Berechne die Fläche der Bahn."),
    def("Sandkasten-Stadion", Area, M, Shape::Stadium { w: 6.0, h: 2.0, r: 1.0 },
      "Ein Sandkasten hat ein Mittelteil 6 m × 2 m und an beiden Enden Halbkreise Radius 1 m. Wie groß ist die Fläche?"),
    def("Zierteich als Ring", Area, M, Shape::Ring { outer_r: 6.0, inner_r: 2.5 },
      "Ein Teich besteht aus einem äußeren Kreis Radius 6 m; mittig ist eine Insel Kreis Radius 2,5 m. Berechne die Wasserfläche (Ring)."),
    def("Lichtkranz", Area, Cm, Shape::Ring { outer_r: 120.0, inner_r: 50.0 },
      "Ein runder Lichtkranz hat äußeren Radius 120 cm und inneren Radius 50 cm. Wie groß ist die leuchtende Fläche?"),
    def("T-förmige Bühne", Area, M, Shape::TShape { stem_w: 4.0, stem_h: 8.0, top_w: 10.0, top_h: 3.0 },
      "Eine Bühne ist T-förmig: ein Steg 4 m × 8 m und oben quer 10 m × 3 m. Bestimme die Gesamtfläche."),
    def("T-förmiger Steg", Area, M, Shape::TShape { stem_w: 2.5, stem_h: 6.0, top_w: 6.0, top_h: 2.5 },
      "Ein Steg ins Wasser ist T-förmig: ein Stegteil 2,5 m × 6 m, am Ende ein Querpodest 6 m × 2,5 m. Wie groß ist die Fläche?"),
    def("Eckige Platte mit Abkappung", Area, Cm, Shape::RectCutCorner { w: 220.0, h: 180.0, cut_w: 30.0, cut_h: 30.0 },
      "Eine Platte misst 220 cm × 180 cm. An einer Ecke wird ein rechtwinkliges Dreieck 30 cm × 30 cm abgeschnitten. Wie groß bleibt die Fläche?"),
    def("Bauplatte mit zwei Bohrungen", Area, Cm, Shape::RectCutTwoCircles { w: 300.0, h: 140.0, r1: 14.0, r2: 10.0 },
      "Eine Bauplatte ist 300 cm × 140 cm. Zwei runde Öffnungen Radius 14 cm und 10 cm werden gebohrt. Berechne die Restfläche."),
    def("Werbefläche mit Sektor", Area, M, Shape::RectPlusSector { w: 5.0, h: 3.0, r: 2.0, angle: 90.0 },
      "Ein Werbeschild besteht aus einem Rechteck 5 m × 3 m und einem angesetzten Kreissektor (Radius 2 m, 90°). Wie groß ist die Gesamtfläche?"),
    def("Terrassenbogen", Area, M, Shape::RectPlusSector { w: 8.0, h: 4.0, r: 3.0, angle: 120.0 },
      "Eine Terrasse wird um einen Kreissektor (Radius 3 m, Winkel 120°) erweitert, der an einer 8 m × 4 m Fläche anliegt. Bestimme die Fläche."),
    def("Quadratisches Beet", Both, M, Shape::Square { a: 4.5 },
      "Ein quadratisches Beet hat die Seitenlänge 4,5 m. Berechne Fläche und Umfang der Einfassung."),
    def("Trapezförmiges Grundstück", Both, M, Shape::Trapezoid { a: 30.0, b: 18.0, h: 12.0, legs: Some([13.0, 15.0]) },
      "Ein Grundstück ist trapezförmig: parallele Seiten 30 m und 18 m, Abstand 12 m, Schenkel 13 m und 15 m. Berechne Fläche und Umfang."),
    def("Raute als Fliese", Both, Cm, Shape::Rhombus { d1: 24.0, d2: 18.0, side: 15.0 },
      "Eine rautenförmige Fliese hat die Diagonalen 24 cm und 18 cm, jede Seite ist 15 cm lang. Berechne Fläche und Umfang."),
    def("Dreieckiges Segel", Both, M, Shape::Triangle { b: 4.0, h: 3.0, sides: Some([4.0, 3.0, 5.0]) },
      "Ein rechtwinkliges Segel hat die Katheten 4 m und 3 m, die längste Seite misst 5 m. Berechne Fläche und Umfang."),
  ]
}

pub fn build(def: &CompositeDef, settings: &GeometrySettings) -> GeometryTask {
  let tol = settings.composite_tolerance;
  let area = round_to(def.shape.area(), 2);
  let perimeter = def.shape.perimeter().map(|p| round_to(p, 2));
  let mut fields = Vec::new();
  let mut steps = Vec::new();
  if matches!(def.ask, Ask::Area | Ask::Both) {
    fields.push(AnswerField::area(Some(area), def.unit, tol));
    steps.push(format!("A ≈ {} {}", format_de(area, 2), def.unit.squared()));
  }
  if matches!(def.ask, Ask::Perimeter | Ask::Both) {
    fields.push(AnswerField::perimeter(perimeter, def.unit, tol));
    if let Some(p) = perimeter {
      steps.push(format!("u ≈ {} {}", format_de(p, 2), def.unit));
    }
  }

  GeometryTask {
    id: Uuid::new_v4().to_string(),
    topic: Topic::MixedArea,
    title: def.title.to_string(),
    prompt: format!("{}{}", def.question, ROUNDING_NOTE),
    givens: vec![Given::new("Einheit", def.unit.symbol())],
    fields,
    classification: None,
    formula: "Zerlege die Figur in Rechtecke, Dreiecke und Kreisteile; addiere Anbauten, ziehe Ausschnitte ab.".into(),
    tip: Some("Skizze ist schematisch und nicht maßstabsgerecht.".into()),
    steps,
    sketch: Sketch::Composite { shape: def.shape.clone(), unit: def.unit },
  }
}

pub fn generate<R: Rng + ?Sized>(rng: &mut R, settings: &GeometrySettings) -> GeometryTask {
  let bank = catalogue();
  match bank.choose(rng) {
    Some(d) => build(d, settings),
    None => build(&def("Rechteck", Ask::Both, Unit::M, Shape::Rectangle { w: 8.0, h: 5.0 }, "Ein Rechteck misst 8 m × 5 m."), settings),
  }
}
