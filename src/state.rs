//! Application state: bounded in-memory stores and the read-only exercise banks.
//!
//! This module owns:
//!   - the task store (every generated exercise, keyed by id, oldest evicted first)
//!   - the exam store (running and finished address exams)
//!   - the address bank and the letter catalogue
//!   - tolerances and generator settings derived from the config

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

use crate::address::{AddressBank, Exam};
use crate::config::{load_config_from_env, AppConfig, ToleranceConfig};
use crate::calculation::CalcRanges;
use crate::domain::Exercise;
use crate::geometry::GeometrySettings;
use crate::letter::LetterCatalogue;

/// Map with a fixed capacity that forgets the oldest insert first.
#[derive(Debug)]
pub struct BoundedStore<T> {
    items: HashMap<String, T>,
    order: VecDeque<String>,
    capacity: usize,
}

impl<T> BoundedStore<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert under `id`; returns the evicted id, if any. Re-inserting an
    /// existing id replaces the value and keeps its position.
    pub fn insert(&mut self, id: String, value: T) -> Option<String> {
        if self.items.insert(id.clone(), value).is_some() {
            return None;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.items.remove(&old);
                return Some(old);
            }
        }
        None
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<RwLock<BoundedStore<Exercise>>>,
    pub exams: Arc<RwLock<BoundedStore<Exam>>>,
    pub address_bank: Arc<AddressBank>,
    pub letters: Arc<LetterCatalogue>,
    pub calc_ranges: CalcRanges,
    pub geometry: GeometrySettings,
    pub tolerance: ToleranceConfig,
}

impl AppState {
    /// Build state from env: load config (or defaults), then the built-in banks.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_config_from_env().unwrap_or_else(|| {
            info!(target: "uebungsfirma_backend", "No trainer config loaded. Using defaults.");
            AppConfig::default()
        });
        Self::with_config(cfg)
    }

    pub fn with_config(cfg: AppConfig) -> Self {
        let mut address_bank = AddressBank::builtin().unwrap_or_else(|e| {
            error!(target: "uebungsfirma_backend", error = %e, "Built-in address bank failed to parse");
            AddressBank::default()
        });
        address_bank.extend(cfg.address_tasks);

        let letters = LetterCatalogue::builtin().unwrap_or_else(|e| {
            error!(target: "uebungsfirma_backend", error = %e, "Built-in letter catalogue failed to parse");
            LetterCatalogue::default()
        });

        let geometry = GeometrySettings {
            tolerance: cfg.tolerance.geometry,
            composite_tolerance: cfg.tolerance.composite,
            max_retries: cfg.generation.max_retries,
        };

        info!(
            target: "exercise",
            address_tasks = address_bank.len(),
            letter_scenarios = letters.scenarios.len(),
            letter_assignments = letters.assignments.len(),
            max_tasks = cfg.store.max_tasks,
            max_exams = cfg.store.max_exams,
            "Startup exercise inventory"
        );

        Self {
            tasks: Arc::new(RwLock::new(BoundedStore::new(cfg.store.max_tasks))),
            exams: Arc::new(RwLock::new(BoundedStore::new(cfg.store.max_exams))),
            address_bank: Arc::new(address_bank),
            letters: Arc::new(letters),
            calc_ranges: cfg.calculation,
            geometry,
            tolerance: cfg.tolerance,
        }
    }

    /// Store a generated exercise; the oldest one goes when the store is full.
    #[instrument(level = "debug", skip(self, ex), fields(id = %ex.id(), kind = ?ex.kind()))]
    pub async fn insert_task(&self, ex: Exercise) {
        let mut tasks = self.tasks.write().await;
        if let Some(old) = tasks.insert(ex.id().to_string(), ex) {
            debug!(target: "exercise", evicted = %old, "Task store full; evicted oldest task");
        }
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_task(&self, id: &str) -> Option<Exercise> {
        self.tasks.read().await.get(id).cloned()
    }

    #[instrument(level = "debug", skip(self, exam), fields(id = %exam.id))]
    pub async fn insert_exam(&self, exam: Exam) {
        let mut exams = self.exams.write().await;
        if let Some(old) = exams.insert(exam.id.clone(), exam) {
            debug!(target: "exam", evicted = %old, "Exam store full; evicted oldest exam");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_store_evicts_oldest() {
        let mut s = BoundedStore::new(2);
        assert_eq!(s.insert("a".into(), 1), None);
        assert_eq!(s.insert("b".into(), 2), None);
        assert_eq!(s.insert("c".into(), 3), Some("a".to_string()));
        assert!(s.get("a").is_none());
        assert_eq!(s.get("c"), Some(&3));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn reinsert_replaces_without_eviction() {
        let mut s = BoundedStore::new(2);
        s.insert("a".into(), 1);
        s.insert("b".into(), 2);
        assert_eq!(s.insert("a".into(), 10), None);
        assert_eq!(s.get("a"), Some(&10));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn config_feeds_state() {
        let cfg = crate::config::parse_config(
            r#"
            [store]
            max_tasks = 3

            [generation]
            max_retries = 7
            "#,
        )
        .unwrap();
        let state = AppState::with_config(cfg);
        assert_eq!(state.geometry.max_retries, 7);
        assert!(state.address_bank.len() >= 10);
        assert!(!state.letters.scenarios.is_empty());
    }
}
