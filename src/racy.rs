//! A map that is memory safe but not linearizable under concurrent writers.
//!
//! Contents live in an immutable table that is swapped wholesale on every
//! insertion, next to an entry counter that is maintained on the side. An
//! insertion loads both, builds a modified copy and publishes it with plain
//! stores. Nothing orders the load against the publish, so two writers racing
//! through the same window overwrite each other: one table replaces the other
//! (a lost write) and one counter value replaces the other (a length that
//! disagrees with iteration).

use crate::{
    loom::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            PoisonError, RwLock,
        },
        thread,
    },
    map::{Entries, ProbeMap},
};
use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

type Table = Arc<HashMap<String, String>>;

pub struct RacyMap {
    table: RwLock<Table>,
    len: AtomicUsize,
    stall: Duration,
}

impl RacyMap {
    pub fn new() -> Self {
        Self::with_stall(Duration::ZERO)
    }

    /// Pauses every insertion for `stall` between loading the current
    /// contents and publishing the new ones.
    pub fn with_stall(stall: Duration) -> Self {
        Self {
            table: RwLock::new(Arc::new(HashMap::new())),
            len: AtomicUsize::new(0),
            stall,
        }
    }

    pub fn stall(&self) -> Duration {
        self.stall
    }

    fn load(&self) -> Table {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*table)
    }

    fn publish(&self, table: HashMap<String, String>) {
        *self.table.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
    }

    fn insert(&self, key: String, value: String) -> Option<String> {
        let current = self.load();
        let len = self.len.load(Ordering::Acquire);

        let mut next = (*current).clone();
        let prev = next.insert(key, value);
        thread::stall(self.stall);

        self.publish(next);
        if prev.is_none() {
            self.len.store(len + 1, Ordering::Release);
        }
        prev
    }
}

impl Default for RacyMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RacyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RacyMap")
            .field("len", &self.len.load(Ordering::Relaxed))
            .field("stall", &self.stall)
            .finish()
    }
}

impl ProbeMap for RacyMap {
    fn clear(&self) {
        self.publish(HashMap::new());
        self.len.store(0, Ordering::Release);
    }

    fn put(&self, key: String, value: String) -> Option<String> {
        self.insert(key, value)
    }

    fn put_all(&self, batch: &Entries) {
        for (key, value) in batch {
            self.insert(key.clone(), value.clone());
        }
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    fn visit_keys(&self, visit: &mut dyn FnMut(&str)) {
        for key in self.load().keys() {
            visit(key);
        }
    }

    fn contains_key(&self, key: &str) -> bool {
        self.load().contains_key(key)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.load().get(key).cloned()
    }
}
