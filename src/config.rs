//! Trainer configuration from TOML (store limits, tolerances, random ranges,
//! extra address exercises). Every section is optional.
//!
//! ```toml
//! [store]
//! max_tasks = 1000
//!
//! [tolerance.money]
//! absolute = 0.05
//!
//! [calculation]
//! list_price = [200, 2000]
//! ```

use serde::Deserialize;
use tracing::{error, info};

use crate::address::AddressExercise;
use crate::calculation::CalcRanges;
use crate::validation::Tolerance;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub store: StoreConfig,
  #[serde(default)]
  pub tolerance: ToleranceConfig,
  #[serde(default)]
  pub generation: GenerationConfig,
  #[serde(default)]
  pub calculation: CalcRanges,
  #[serde(default)]
  pub address_tasks: Vec<AddressExercise>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// Oldest tasks are evicted beyond this.
  pub max_tasks: usize,
  pub max_exams: usize,
}

impl Default for StoreConfig {
  fn default() -> Self {
    Self { max_tasks: 1000, max_exams: 200 }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
  pub geometry: Tolerance,
  pub money: Tolerance,
  pub composite: Tolerance,
  pub booking: Tolerance,
}

impl Default for ToleranceConfig {
  fn default() -> Self {
    Self {
      geometry: Tolerance::mixed(0.05, 0.02),
      money: Tolerance::absolute(0.05),
      composite: Tolerance::absolute(0.01),
      booking: Tolerance::absolute(0.01),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
  /// Rejection sampling budget for triangle sides.
  pub max_retries: u32,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self { max_retries: 50 }
  }
}

pub fn parse_config(text: &str) -> Result<AppConfig, toml::de::Error> {
  toml::from_str(text)
}

/// Load `AppConfig` from TRAINER_CONFIG_PATH. Unset path, IO or parse errors
/// yield `None` and the caller falls back to defaults.
pub fn load_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("TRAINER_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "uebungsfirma_backend", %path, extra_address_tasks = cfg.address_tasks.len(), "Loaded trainer config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "uebungsfirma_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "uebungsfirma_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_config_uses_defaults() {
    let cfg = parse_config("").unwrap();
    assert_eq!(cfg.store.max_tasks, 1000);
    assert_eq!(cfg.store.max_exams, 200);
    assert_eq!(cfg.generation.max_retries, 50);
    assert_eq!(cfg.tolerance.geometry, Tolerance::mixed(0.05, 0.02));
    assert_eq!(cfg.calculation.ust_p, 19);
    assert!(cfg.address_tasks.is_empty());
  }

  #[test]
  fn partial_sections_override() {
    let cfg = parse_config(
      r#"
        [store]
        max_tasks = 5

        [tolerance.money]
        absolute = 0.1

        [calculation]
        list_price = [200, 2000]

        [[address_tasks]]
        id = "x-1"
        category = "business"
        title = "Test"
        task = "Firma Test, Weg 1, 12345 Ort"
        lines = ["Firma Test", "Weg 1", "12345 Ort"]
      "#,
    )
    .unwrap();
    assert_eq!(cfg.store.max_tasks, 5);
    assert_eq!(cfg.store.max_exams, 200);
    assert_eq!(cfg.tolerance.money, Tolerance::absolute(0.1));
    assert_eq!(cfg.tolerance.booking, Tolerance::absolute(0.01));
    assert_eq!(cfg.calculation.list_price, (200, 2000));
    assert_eq!(cfg.calculation.shipping, (10, 50));
    assert_eq!(cfg.address_tasks.len(), 1);
  }

  #[test]
  fn bad_toml_is_an_error() {
    assert!(parse_config("[store\nmax_tasks = ").is_err());
  }
}
