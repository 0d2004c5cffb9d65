use crate::{
    loom::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    map::{Entries, ProbeMap},
};
use std::{collections::HashMap, fmt};

/// A map that serializes every operation behind a reader/writer lock.
///
/// Batches are applied under a single write lock and key iteration holds the
/// read lock for its whole walk, so the reported length and the iterable keys
/// always agree.
pub struct LockedMap {
    inner: RwLock<HashMap<String, String>>,
}

impl LockedMap {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LockedMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LockedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedMap").field("len", &self.len()).finish()
    }
}

impl ProbeMap for LockedMap {
    fn clear(&self) {
        self.write().clear();
    }

    fn put(&self, key: String, value: String) -> Option<String> {
        self.write().insert(key, value)
    }

    fn put_all(&self, batch: &Entries) {
        let mut map = self.write();
        map.reserve(batch.len());
        map.extend(batch.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn visit_keys(&self, visit: &mut dyn FnMut(&str)) {
        for key in self.read().keys() {
            visit(key);
        }
    }

    fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }
}
