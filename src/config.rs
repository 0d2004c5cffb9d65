use crate::{
    error::ProbeError,
    map::{Entries, Expected},
    pool::DEFAULT_KEEP_ALIVE,
};
use std::time::Duration;

/// Trials attempted against one map unless configured otherwise.
pub const DEFAULT_MAX_TRIES: u64 = 1_000_000;

/// What the two concurrent writers put into the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    disruptor: Entries,
    singleton: (String, String),
}

/// Settings for a run of trials against one map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub max_tries: u64,
    pub payload: Payload,
    /// Also fail a trial when an expected key holds the wrong value.
    ///
    /// Off by default: a trial then only checks that each expected key is
    /// present.
    pub check_values: bool,
    /// Idle time after which a pool worker exits.
    pub keep_alive: Duration,
}

impl Payload {
    pub fn new<K, V>(
        disruptor: impl IntoIterator<Item = (K, V)>,
        singleton: (impl Into<String>, impl Into<String>),
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            disruptor: disruptor
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            singleton: (singleton.0.into(), singleton.1.into()),
        }
    }

    /// A fresh copy of the batch applied in a single `put_all`.
    pub fn disruptor_batch(&self) -> Entries {
        self.disruptor.clone()
    }

    pub fn singleton(&self) -> (&str, &str) {
        (&self.singleton.0, &self.singleton.1)
    }

    /// Everything that must be present once both writes have completed.
    ///
    /// A key shared by the batch and the single write accepts either value.
    pub fn expected_entries(&self) -> Expected {
        let mut expected = Expected::new();
        let writes = self
            .disruptor
            .iter()
            .chain([(&self.singleton.0, &self.singleton.1)]);
        for (key, value) in writes {
            expected.entry(key.clone()).or_default().insert(value.clone());
        }
        expected
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self::new(vec![("0", "0"), ("1", "1")], ("a", "a"))
    }
}

impl ProbeConfig {
    pub fn with_max_tries(self, max_tries: u64) -> Self {
        Self { max_tries, ..self }
    }

    pub fn with_payload(self, payload: Payload) -> Self {
        Self { payload, ..self }
    }

    pub fn with_check_values(self, check_values: bool) -> Self {
        Self {
            check_values,
            ..self
        }
    }

    pub fn with_keep_alive(self, keep_alive: Duration) -> Self {
        Self { keep_alive, ..self }
    }

    pub fn validate(&self) -> Result<(), ProbeError> {
        if self.max_tries == 0 {
            return Err(ProbeError::config("trial budget must be at least one trial"));
        }
        if self.payload.disruptor.is_empty() {
            return Err(ProbeError::config("disruptor batch must not be empty"));
        }
        Ok(())
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            payload: Payload::default(),
            check_values: false,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}
