//! Length and area units offered in the unit pickers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Unit {
  #[serde(rename = "mm")]
  Mm,
  #[serde(rename = "cm")]
  Cm,
  #[serde(rename = "dm")]
  Dm,
  #[serde(rename = "m")]
  M,
  #[serde(rename = "mm²")]
  Mm2,
  #[serde(rename = "cm²")]
  Cm2,
  #[serde(rename = "dm²")]
  Dm2,
  #[serde(rename = "m²")]
  M2,
}

impl Unit {
  pub fn symbol(self) -> &'static str {
    match self {
      Unit::Mm => "mm",
      Unit::Cm => "cm",
      Unit::Dm => "dm",
      Unit::M => "m",
      Unit::Mm2 => "mm²",
      Unit::Cm2 => "cm²",
      Unit::Dm2 => "dm²",
      Unit::M2 => "m²",
    }
  }

  /// Square of a length unit; area units map to themselves.
  pub fn squared(self) -> Unit {
    match self {
      Unit::Mm => Unit::Mm2,
      Unit::Cm => Unit::Cm2,
      Unit::Dm => Unit::Dm2,
      Unit::M => Unit::M2,
      other => other,
    }
  }

  /// Picker for an area answer: the right unit plus typical mix-ups.
  pub fn area_choices(length: Unit) -> Vec<Unit> {
    match length {
      Unit::M => vec![Unit::M2, Unit::M, Unit::Cm2, Unit::Dm2],
      _ => vec![Unit::Cm2, Unit::Cm, Unit::Mm2, Unit::M2],
    }
  }

  /// Picker for a length answer.
  pub fn length_choices(length: Unit) -> Vec<Unit> {
    match length {
      Unit::M => vec![Unit::M, Unit::Mm, Unit::M2, Unit::Cm],
      _ => vec![Unit::Cm, Unit::Mm, Unit::M, Unit::Cm2],
    }
  }
}

impl fmt::Display for Unit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.symbol())
  }
}

impl FromStr for Unit {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let norm = crate::validation::normalize_unit(s).to_lowercase();
    match norm.as_str() {
      "mm" => Ok(Unit::Mm),
      "cm" => Ok(Unit::Cm),
      "dm" => Ok(Unit::Dm),
      "m" => Ok(Unit::M),
      "mm²" => Ok(Unit::Mm2),
      "cm²" => Ok(Unit::Cm2),
      "dm²" => Ok(Unit::Dm2),
      "m²" => Ok(Unit::M2),
      _ => Err(format!("unknown unit: {}", s)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_common_spellings() {
    assert_eq!("cm²".parse::<Unit>(), Ok(Unit::Cm2));
    assert_eq!("cm2".parse::<Unit>(), Ok(Unit::Cm2));
    assert_eq!(" M^2 ".parse::<Unit>(), Ok(Unit::M2));
    assert!("km".parse::<Unit>().is_err());
  }

  #[test]
  fn choices_contain_the_right_unit() {
    for len in [Unit::Cm, Unit::M] {
      assert!(Unit::area_choices(len).contains(&len.squared()));
      assert!(Unit::length_choices(len).contains(&len));
    }
    assert_eq!(serde_json::to_string(&Unit::M2).unwrap(), "\"m²\"");
  }
}
