//! Schematic sketches. The JSON form goes to the client; `render_svg` draws a
//! self-contained SVG from the same parameters (not to scale for composites).

use std::fmt::Write as _;

use serde::Serialize;

use super::composite::Shape;
use super::Unit;
use crate::util::format_de;

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "figure", rename_all = "snake_case")]
pub enum Sketch {
  Rectangle {
    width: f64,
    height: f64,
    unit: Unit,
  },
  Triangle {
    vertices: [String; 3],
    /// First vertex at the origin, second on the x axis, apex above.
    points: [(f64, f64); 3],
    side_labels: [String; 3],
    height_label: Option<String>,
  },
  Circle {
    radius: f64,
    unit: Unit,
  },
  Composite {
    shape: Shape,
    unit: Unit,
  },
}

const STROKE: &str = "#0f172a";
const FILL: &str = "#e0f2fe";
const HOLE: &str = "#ffffff";

/// Collects primitives in model coordinates (y grows downwards) and tracks
/// the bounding box for the viewBox.
struct Canvas {
  body: String,
  min: (f64, f64),
  max: (f64, f64),
}

impl Canvas {
  fn new() -> Self {
    Self { body: String::new(), min: (f64::MAX, f64::MAX), max: (f64::MIN, f64::MIN) }
  }

  fn grow(&mut self, x: f64, y: f64) {
    self.min = (self.min.0.min(x), self.min.1.min(y));
    self.max = (self.max.0.max(x), self.max.1.max(y));
  }

  fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: &str) {
    self.grow(x, y);
    self.grow(x + w, y + h);
    let _ = write!(
      self.body,
      r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{fill}" stroke="{STROKE}" vector-effect="non-scaling-stroke"/>"#
    );
  }

  fn circle(&mut self, cx: f64, cy: f64, r: f64, fill: &str) {
    self.grow(cx - r, cy - r);
    self.grow(cx + r, cy + r);
    let _ = write!(
      self.body,
      r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{fill}" stroke="{STROKE}" vector-effect="non-scaling-stroke"/>"#
    );
  }

  fn polygon(&mut self, points: &[(f64, f64)], fill: &str) {
    let mut pts = String::new();
    for &(x, y) in points {
      self.grow(x, y);
      let _ = write!(pts, "{:.2},{:.2} ", x, y);
    }
    let _ = write!(
      self.body,
      r#"<polygon points="{}" fill="{fill}" stroke="{STROKE}" vector-effect="non-scaling-stroke"/>"#,
      pts.trim_end()
    );
  }

  /// Circle sector around (cx, cy) from angle `from` to `to` (degrees, clockwise on screen).
  fn sector(&mut self, cx: f64, cy: f64, r: f64, from: f64, to: f64, fill: &str) {
    let (a0, a1) = (from.to_radians(), to.to_radians());
    let (x0, y0) = (cx + r * a0.cos(), cy + r * a0.sin());
    let (x1, y1) = (cx + r * a1.cos(), cy + r * a1.sin());
    let large = if (to - from).abs() > 180.0 { 1 } else { 0 };
    self.grow(cx - r, cy - r);
    self.grow(cx + r, cy + r);
    let _ = write!(
      self.body,
      r#"<path d="M {cx:.2} {cy:.2} L {x0:.2} {y0:.2} A {r:.2} {r:.2} 0 {large} 1 {x1:.2} {y1:.2} Z" fill="{fill}" stroke="{STROKE}" vector-effect="non-scaling-stroke"/>"#
    );
  }

  fn dashed(&mut self, from: (f64, f64), to: (f64, f64)) {
    let _ = write!(
      self.body,
      r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{STROKE}" stroke-dasharray="4 3" vector-effect="non-scaling-stroke"/>"#,
      from.0, from.1, to.0, to.1
    );
  }

  fn text(&mut self, x: f64, y: f64, label: &str) {
    let _ = write!(
      self.body,
      r#"<text x="{x:.2}" y="{y:.2}" font-size="{{FS}}" text-anchor="middle" font-family="sans-serif">{}</text>"#,
      escape(label)
    );
  }

  fn finish(self) -> String {
    let (w, h) = ((self.max.0 - self.min.0).max(1.0), (self.max.1 - self.min.1).max(1.0));
    let pad = w.max(h) * 0.15;
    let font = w.max(h) * 0.06;
    let body = self.body.replace("{FS}", &format!("{:.2}", font));
    format!(
      r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{:.2} {:.2} {:.2} {:.2}" width="360" height="{:.0}">{}</svg>"#,
      self.min.0 - pad,
      self.min.1 - pad,
      w + 2.0 * pad,
      h + 2.0 * pad,
      360.0 * (h + 2.0 * pad) / (w + 2.0 * pad),
      body
    )
  }
}

fn escape(s: &str) -> String {
  s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn dim(value: f64, unit: Unit) -> String {
  let text = format_de(value, 2);
  let text = text.trim_end_matches('0').trim_end_matches(',');
  format!("{} {}", text, unit)
}

pub fn render_svg(sketch: &Sketch) -> String {
  let mut c = Canvas::new();
  match sketch {
    Sketch::Rectangle { width, height, unit } => {
      c.rect(0.0, 0.0, *width, *height, FILL);
      c.text(width / 2.0, height + height.max(*width) * 0.1, &format!("a = {}", dim(*width, *unit)));
      c.text(width + width.max(*height) * 0.12, height / 2.0, &format!("b = {}", dim(*height, *unit)));
    }
    Sketch::Triangle { vertices, points, side_labels, height_label } => {
      // flip y so the apex points up
      let p: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x, -y)).collect();
      c.polygon(&p, FILL);
      let span = points[1].0.max(points[2].1);
      let off = span * 0.06;
      c.text(p[0].0 - off, p[0].1 + off, &vertices[0]);
      c.text(p[1].0 + off, p[1].1 + off, &vertices[1]);
      c.text(p[2].0, p[2].1 - off, &vertices[2]);
      c.text((p[1].0 + p[2].0) / 2.0 + off, (p[1].1 + p[2].1) / 2.0, &side_labels[0]);
      c.text((p[0].0 + p[2].0) / 2.0 - off, (p[0].1 + p[2].1) / 2.0, &side_labels[1]);
      c.text((p[0].0 + p[1].0) / 2.0, p[0].1 + off * 1.5, &side_labels[2]);
      if let Some(h) = height_label {
        c.dashed(p[2], (p[2].0, 0.0));
        c.text(p[2].0 + off, p[2].1 / 2.0, h);
      }
    }
    Sketch::Circle { radius, unit } => {
      c.circle(0.0, 0.0, *radius, FILL);
      c.dashed((0.0, 0.0), (*radius, 0.0));
      c.text(radius / 2.0, -radius * 0.08, &format!("r = {}", dim(*radius, *unit)));
    }
    Sketch::Composite { shape, unit } => draw_composite(&mut c, shape, *unit),
  }
  c.finish()
}

fn draw_composite(c: &mut Canvas, shape: &Shape, unit: Unit) {
  match *shape {
    Shape::Rectangle { w, h } => c.rect(0.0, 0.0, w, h, FILL),
    Shape::Square { a } => c.rect(0.0, 0.0, a, a, FILL),
    Shape::Triangle { b, h, .. } => c.polygon(&[(0.0, h), (b, h), (b * 0.4, 0.0)], FILL),
    Shape::Trapezoid { a, b, h, .. } => {
      let inset = (a - b) / 2.0;
      c.polygon(&[(0.0, h), (a, h), (a - inset, 0.0), (inset, 0.0)], FILL);
    }
    Shape::Parallelogram { b, h, .. } => c.polygon(&[(0.0, h), (b, h), (b + h * 0.4, 0.0), (h * 0.4, 0.0)], FILL),
    Shape::Rhombus { d1, d2, .. } => c.polygon(&[(0.0, d2 / 2.0), (d1 / 2.0, 0.0), (d1, d2 / 2.0), (d1 / 2.0, d2)], FILL),
    Shape::Circle { r } => c.circle(0.0, 0.0, r, FILL),
    Shape::LShape { w1, h1, w2, h2 } => {
      c.polygon(&[(0.0, 0.0), (w1, 0.0), (w1, h1), (w2, h1), (w2, h1 + h2), (0.0, h1 + h2)], FILL);
    }
    Shape::RectPlusTriangle { w, h, b, t_height } => {
      c.rect(0.0, t_height, w, h, FILL);
      if b > 0.0 && t_height > 0.0 {
        let x0 = (w - b) / 2.0;
        c.polygon(&[(x0, t_height), (x0 + b, t_height), (w / 2.0, 0.0)], FILL);
      }
    }
    Shape::SemiCircleRect { w, h, r } => {
      c.rect(0.0, r, w, h, FILL);
      c.sector(w / 2.0, r, r, 180.0, 360.0, FILL);
    }
    Shape::RectCutCircle { w, h, r } => {
      c.rect(0.0, 0.0, w, h, FILL);
      c.circle(w / 2.0, h / 2.0, r, HOLE);
    }
    Shape::RectCutRect { w, h, cut_w, cut_h } => {
      c.rect(0.0, 0.0, w, h, FILL);
      c.rect((w - cut_w) / 2.0, (h - cut_h) / 2.0, cut_w, cut_h, HOLE);
    }
    Shape::RectPlusCircle { w, h, r } => {
      c.circle(w, h / 2.0, r, FILL);
      c.rect(0.0, 0.0, w, h, FILL);
    }
    Shape::RectFrame { outer_w, outer_h, inner_w, inner_h } => {
      c.rect(0.0, 0.0, outer_w, outer_h, FILL);
      c.rect((outer_w - inner_w) / 2.0, (outer_h - inner_h) / 2.0, inner_w, inner_h, HOLE);
    }
    Shape::Ring { outer_r, inner_r } => {
      c.circle(0.0, 0.0, outer_r, FILL);
      c.circle(0.0, 0.0, inner_r, HOLE);
    }
    Shape::Stadium { w, h, r } => {
      c.sector(0.0, h / 2.0, r, 90.0, 270.0, FILL);
      c.sector(w, h / 2.0, r, -90.0, 90.0, FILL);
      c.rect(0.0, 0.0, w, h, FILL);
    }
    Shape::TShape { stem_w, stem_h, top_w, top_h } => {
      let x0 = (top_w - stem_w) / 2.0;
      c.polygon(
        &[(0.0, 0.0), (top_w, 0.0), (top_w, top_h), (x0 + stem_w, top_h), (x0 + stem_w, top_h + stem_h), (x0, top_h + stem_h), (x0, top_h), (0.0, top_h)],
        FILL,
      );
    }
    Shape::RectCutCorner { w, h, cut_w, cut_h } => {
      c.polygon(&[(0.0, 0.0), (w - cut_w, 0.0), (w, cut_h), (w, h), (0.0, h)], FILL);
    }
    Shape::RectCutTwoCircles { w, h, r1, r2 } => {
      c.rect(0.0, 0.0, w, h, FILL);
      c.circle(w / 3.0, h / 2.0, r1, HOLE);
      c.circle(2.0 * w / 3.0, h / 2.0, r2, HOLE);
    }
    Shape::RectPlusSector { w, h, r, angle } => {
      c.rect(0.0, 0.0, w, h, FILL);
      c.sector(w, h, r, -angle, 0.0, FILL);
    }
  }
  let (x, y) = (c.min.0 + (c.max.0 - c.min.0) / 2.0, c.max.1 + (c.max.1 - c.min.1) * 0.1);
  c.text(x, y, &format!("Maße in {}", unit));
  // keep the caption inside the viewBox
  c.grow(x, y);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rectangle_svg_has_labels() {
    let svg = render_svg(&Sketch::Rectangle { width: 8.0, height: 5.0, unit: Unit::M });
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("a = 8 m"));
    assert!(svg.contains("b = 5 m"));
    assert!(!svg.contains("{FS}"));
  }

  #[test]
  fn triangle_svg_draws_height() {
    let svg = render_svg(&Sketch::Triangle {
      vertices: ["A".into(), "B".into(), "C".into()],
      points: [(0.0, 0.0), (12.0, 0.0), (6.0, 8.0)],
      side_labels: ["a".into(), "b".into(), "c".into()],
      height_label: Some("h_c".into()),
    });
    assert!(svg.contains("<polygon"));
    assert!(svg.contains("stroke-dasharray"));
    assert!(svg.contains(">h_c<"));
  }

  #[test]
  fn composite_cut_outs_are_drawn_as_holes() {
    let svg = render_svg(&Sketch::Composite { shape: Shape::RectCutCircle { w: 9.0, h: 6.0, r: 1.5 }, unit: Unit::M });
    assert!(svg.contains(HOLE));
    assert!(svg.contains("Maße in m"));
    let ring = render_svg(&Sketch::Composite { shape: Shape::Ring { outer_r: 6.0, inner_r: 2.5 }, unit: Unit::M });
    assert_eq!(ring.matches("<circle").count(), 2);
  }

  #[test]
  fn composite_json_keeps_shape_data() {
    let sketch = Sketch::Composite { shape: Shape::Ring { outer_r: 6.0, inner_r: 2.5 }, unit: Unit::M };
    let v = serde_json::to_value(&sketch).unwrap();
    assert_eq!(v["figure"], "composite");
    assert_eq!(v["shape"]["kind"], "ring");
    assert_eq!(v["unit"], "m");
  }

  #[test]
  fn dimensions_drop_trailing_zeros() {
    assert_eq!(dim(2.5, Unit::Cm), "2,5 cm");
    assert_eq!(dim(12.0, Unit::M), "12 m");
  }
}
