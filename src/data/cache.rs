use crate::types::SimulatedScenario;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

type Slot = Arc<OnceLock<Arc<SimulatedScenario>>>;

/// Scenario memo keyed by chromosome content hash.
///
/// Lookups take the read lock only. A miss installs an empty slot and the
/// first caller to reach it runs the computation; concurrent callers for the
/// same key block on the slot instead of computing a duplicate.
pub struct ScenarioCache {
    slots: RwLock<HashMap<u64, Slot>>,
    capacity: usize,
    computations: AtomicUsize,
}

impl ScenarioCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            computations: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: u64) -> Option<Arc<SimulatedScenario>> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.get(&key).and_then(|slot| slot.get().cloned())
    }

    pub fn get_or_compute<F>(&self, key: u64, compute: F) -> Arc<SimulatedScenario>
    where
        F: FnOnce() -> SimulatedScenario,
    {
        let slot = self.slot(key);
        slot.get_or_init(|| {
            self.computations.fetch_add(1, Ordering::Relaxed);
            Arc::new(compute())
        })
        .clone()
    }

    fn slot(&self, key: u64) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if slots.len() >= self.capacity && !slots.contains_key(&key) {
            // A simple eviction strategy: clear the cache when full.
            log::debug!("Scenario cache full ({} entries), clearing", slots.len());
            slots.clear();
        }
        Arc::clone(slots.entry(key).or_default())
    }

    pub fn len(&self) -> usize {
        self.slots.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of scenarios actually computed (cache misses).
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }
}
