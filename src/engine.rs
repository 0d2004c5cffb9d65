//! One trial: reset the map, race two writers against it, then check that
//! what the map reports still agrees with what it holds.

use crate::{
    config::{Payload, ProbeConfig},
    error::ProbeError,
    join::JoinPair,
    map::{count_keys, Expected, ProbeMap},
    pool::TaskPool,
};
use std::{collections::BTreeSet, sync::Arc};
use tracing::{trace, warn};

/// The outcome of a single trial.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialVerdict {
    /// Set when the key count found by iteration differs from the map's
    /// reported length.
    pub size_corrupt: bool,
    pub key_count: usize,
    pub reported_len: usize,
    /// Expected keys the map no longer contains.
    pub lost_keys: BTreeSet<String>,
    /// Expected keys present with the wrong value. Only filled in when value
    /// checking is enabled.
    pub mismatched_keys: BTreeSet<String>,
}

impl TrialVerdict {
    pub fn success(&self) -> bool {
        !self.size_corrupt && self.lost_keys.is_empty() && self.mismatched_keys.is_empty()
    }
}

/// Runs trials against one map on a borrowed pool.
#[derive(Debug)]
pub struct Experiment<'p, M> {
    map: Arc<M>,
    pool: &'p TaskPool,
    payload: Payload,
    check_values: bool,
}

impl<'p, M> Experiment<'p, M>
where
    M: ProbeMap + 'static,
{
    pub fn new(map: Arc<M>, pool: &'p TaskPool, config: &ProbeConfig) -> Self {
        Self {
            map,
            pool,
            payload: config.payload.clone(),
            check_values: config.check_values,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Runs one complete trial.
    ///
    /// A fault in either writer is returned as `Err` untouched; corruption is
    /// reported through the verdict.
    pub fn run_trial(&self) -> Result<TrialVerdict, ProbeError> {
        self.map.clear();

        let batch = self.payload.disruptor_batch();
        let (key, value) = self.payload.singleton();
        let (key, value) = (key.to_owned(), value.to_owned());

        let batch_map = Arc::clone(&self.map);
        let single_map = Arc::clone(&self.map);
        JoinPair::spawn(
            self.pool,
            ("put_all", move || batch_map.put_all(&batch)),
            ("put", move || {
                single_map.put(key, value);
            }),
        )?
        .join()?;

        let expected = self.payload.expected_entries();
        let verdict = inspect(&*self.map, &expected, self.check_values);
        trace!(success = verdict.success(), "trial complete");
        Ok(verdict)
    }
}

/// Checks `map` after the writers have finished.
///
/// Every key in `expected` must be present, and walking the keys must yield
/// as many as [`ProbeMap::len`] reports. With `check_values` set, present
/// keys must also hold one of the values a writer put there.
pub fn inspect<M>(map: &M, expected: &Expected, check_values: bool) -> TrialVerdict
where
    M: ProbeMap + ?Sized,
{
    let key_count = count_keys(map);
    let reported_len = map.len();
    let size_corrupt = key_count != reported_len;
    if size_corrupt {
        warn!(key_count, reported_len, "trial failed: size has become corrupt");
    }

    let mut lost_keys = BTreeSet::new();
    let mut mismatched_keys = BTreeSet::new();
    for (key, want) in expected {
        if !map.contains_key(key) {
            warn!(key = %key, "trial failed: put has been lost");
            lost_keys.insert(key.clone());
            continue;
        }
        if check_values {
            let got = map.get(key);
            if !got.as_ref().is_some_and(|value| want.contains(value)) {
                warn!(
                    key = %key,
                    expected = ?want,
                    found = ?got,
                    "trial failed: value is incorrect"
                );
                mismatched_keys.insert(key.clone());
            }
        }
    }

    TrialVerdict {
        size_corrupt,
        key_count,
        reported_len,
        lost_keys,
        mismatched_keys,
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::{map::Entries, LockedMap};
    use std::{collections::BTreeMap, sync::Mutex};

    /// A map with test-controlled faults around a plain mutex.
    #[derive(Default)]
    struct StubMap {
        inner: Mutex<BTreeMap<String, String>>,
        len_skew: isize,
        drop_key: Option<&'static str>,
        rewrite_value: Option<&'static str>,
        panic_on: Option<&'static str>,
    }

    impl ProbeMap for StubMap {
        fn clear(&self) {
            self.inner.lock().unwrap().clear();
        }

        fn put(&self, key: String, value: String) -> Option<String> {
            if self.panic_on == Some(key.as_str()) {
                panic!("stub refused key {}", key);
            }
            if self.drop_key == Some(key.as_str()) {
                return None;
            }
            let value = self.rewrite_value.map(str::to_owned).unwrap_or(value);
            self.inner.lock().unwrap().insert(key, value)
        }

        fn put_all(&self, batch: &Entries) {
            for (k, v) in batch {
                self.put(k.clone(), v.clone());
            }
        }

        fn len(&self) -> usize {
            let len = self.inner.lock().unwrap().len() as isize;
            (len + self.len_skew) as usize
        }

        fn visit_keys(&self, visit: &mut dyn FnMut(&str)) {
            for key in self.inner.lock().unwrap().keys() {
                visit(key);
            }
        }

        fn contains_key(&self, key: &str) -> bool {
            self.inner.lock().unwrap().contains_key(key)
        }

        fn get(&self, key: &str) -> Option<String> {
            self.inner.lock().unwrap().get(key).cloned()
        }
    }

    fn trial(map: StubMap, config: &ProbeConfig) -> Result<TrialVerdict, ProbeError> {
        let pool = TaskPool::new();
        Experiment::new(Arc::new(map), &pool, config).run_trial()
    }

    #[test]
    fn consistent_map_passes() {
        for _ in 0..100 {
            let verdict = trial(StubMap::default(), &ProbeConfig::default()).unwrap();
            assert!(verdict.success(), "{:?}", verdict);
            assert_eq!(verdict.key_count, 3);
            assert_eq!(verdict.reported_len, 3);
        }
    }

    #[test]
    fn skewed_len_is_size_corruption() {
        let map = StubMap {
            len_skew: 1,
            ..StubMap::default()
        };
        let verdict = trial(map, &ProbeConfig::default()).unwrap();
        assert!(verdict.size_corrupt);
        assert_eq!((verdict.key_count, verdict.reported_len), (3, 4));
        assert!(verdict.lost_keys.is_empty());
        assert!(!verdict.success());
    }

    #[test]
    fn dropped_single_write_is_lost() {
        let map = StubMap {
            drop_key: Some("a"),
            ..StubMap::default()
        };
        let verdict = trial(map, &ProbeConfig::default()).unwrap();
        assert_eq!(verdict.lost_keys.iter().collect::<Vec<_>>(), ["a"]);
        assert!(!verdict.size_corrupt);
        assert!(!verdict.success());
    }

    #[test]
    fn wrong_values_need_opt_in() {
        let config = ProbeConfig::default();
        let map = || StubMap {
            rewrite_value: Some("garbage"),
            ..StubMap::default()
        };

        let verdict = trial(map(), &config).unwrap();
        assert!(verdict.success(), "{:?}", verdict);

        let verdict = trial(map(), &config.with_check_values(true)).unwrap();
        assert_eq!(verdict.mismatched_keys.len(), 3);
        assert!(verdict.lost_keys.is_empty());
        assert!(!verdict.success());
    }

    #[test]
    fn shared_key_may_hold_either_write() {
        let payload = Payload::new(vec![("k", "batch"), ("j", "j")], ("k", "single"));
        let expected = payload.expected_entries();

        for last in ["batch", "single"] {
            let map = LockedMap::new();
            map.put("j".into(), "j".into());
            map.put("k".into(), last.into());
            let verdict = inspect(&map, &expected, true);
            assert!(verdict.success(), "{}: {:?}", last, verdict);
        }

        let map = LockedMap::new();
        map.put("j".into(), "j".into());
        map.put("k".into(), "neither".into());
        let verdict = inspect(&map, &expected, true);
        assert_eq!(verdict.mismatched_keys.iter().collect::<Vec<_>>(), ["k"]);
    }

    #[test]
    fn overlapping_writers_pass_on_locked_map() {
        let payload = Payload::new(vec![("k", "batch")], ("k", "single"));
        let config = ProbeConfig::default()
            .with_payload(payload)
            .with_check_values(true);
        let pool = TaskPool::new();
        let experiment = Experiment::new(Arc::new(LockedMap::new()), &pool, &config);

        for _ in 0..2_000 {
            let verdict = experiment.run_trial().unwrap();
            assert!(verdict.success(), "{:?}", verdict);
            assert_eq!(verdict.key_count, 1);
        }
    }

    #[test]
    fn writer_panic_propagates() {
        let map = StubMap {
            panic_on: Some("1"),
            ..StubMap::default()
        };
        match trial(map, &ProbeConfig::default()) {
            Err(ProbeError::TaskPanicked { task, message }) => {
                assert_eq!(task, "put_all");
                assert_eq!(message, "stub refused key 1");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn every_trial_starts_empty() {
        let pool = TaskPool::new();
        let map = Arc::new(LockedMap::new());
        map.put("stale".into(), "entry".into());
        let experiment = Experiment::new(Arc::clone(&map), &pool, &ProbeConfig::default());

        for _ in 0..50 {
            let verdict = experiment.run_trial().unwrap();
            assert!(verdict.success(), "{:?}", verdict);
            assert!(!map.contains_key("stale"));
            assert_eq!(count_keys(&*map), 3);

            map.clear();
            assert!(map.is_empty());
            assert_eq!(count_keys(&*map), 0);
            map.put("stale".into(), "entry".into());
        }
    }

    #[test]
    fn inspect_reports_both_symptoms() {
        let map = StubMap {
            len_skew: -1,
            drop_key: Some("0"),
            ..StubMap::default()
        };
        map.put_all(&Payload::default().disruptor_batch());
        let verdict = inspect(&map, &Payload::default().expected_entries(), false);
        assert!(verdict.size_corrupt);
        assert_eq!(verdict.lost_keys.len(), 2);
        assert!(verdict.lost_keys.contains("0") && verdict.lost_keys.contains("a"));
    }
}
