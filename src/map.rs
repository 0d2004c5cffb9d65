use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// An ordered batch of string entries.
///
/// Used both as the disruptor payload and as the expected contents after a
/// trial. Ordered so that diagnostics name keys in a stable order.
pub type Entries = BTreeMap<String, String>;

/// For each key that must be present after a trial, every value it may
/// validly hold.
///
/// A key written by both writers may end up with either value, since the
/// writers are unordered.
pub type Expected = BTreeMap<String, BTreeSet<String>>;

/// The mapping under test.
///
/// Implementations make no promise about thread safety; that is the property
/// being probed. Every method takes `&self` so that two writers can share one
/// instance through an `Arc`.
pub trait ProbeMap: Send + Sync {
    /// Removes every entry.
    fn clear(&self);

    /// Inserts or overwrites a single entry, returning the previous value.
    fn put(&self, key: String, value: String) -> Option<String>;

    /// Inserts or overwrites every entry in `batch` in one call.
    fn put_all(&self, batch: &Entries);

    /// The number of entries the map reports holding.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calls `visit` once for every key the map can produce by iteration.
    ///
    /// This must walk the keys themselves rather than consult any cached
    /// counter behind [`len`](ProbeMap::len).
    fn visit_keys(&self, visit: &mut dyn FnMut(&str));

    fn contains_key(&self, key: &str) -> bool;

    fn get(&self, key: &str) -> Option<String>;
}

macro_rules! forward_probe_map {
    ($($ptr:ident),*) => {$(
        impl<M: ProbeMap + ?Sized> ProbeMap for $ptr<M> {
            fn clear(&self) {
                (**self).clear()
            }

            fn put(&self, key: String, value: String) -> Option<String> {
                (**self).put(key, value)
            }

            fn put_all(&self, batch: &Entries) {
                (**self).put_all(batch)
            }

            fn len(&self) -> usize {
                (**self).len()
            }

            fn is_empty(&self) -> bool {
                (**self).is_empty()
            }

            fn visit_keys(&self, visit: &mut dyn FnMut(&str)) {
                (**self).visit_keys(visit)
            }

            fn contains_key(&self, key: &str) -> bool {
                (**self).contains_key(key)
            }

            fn get(&self, key: &str) -> Option<String> {
                (**self).get(key)
            }
        }
    )*};
}

forward_probe_map!(Arc, Box);

/// Counts the keys produced by walking `map`, one at a time.
pub fn count_keys<M: ProbeMap + ?Sized>(map: &M) -> usize {
    let mut count = 0;
    map.visit_keys(&mut |_| count += 1);
    count
}
