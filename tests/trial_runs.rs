#![cfg(not(loom))]

use hypothesizer::{
    map::count_keys, run_experiments, Experiment, LockedMap, Payload, ProbeConfig, ProbeMap,
    RacyMap, RunReport, TaskPool,
};
use proptest::prelude::*;
use std::{sync::Arc, time::Duration};

#[test]
fn locked_map_survives_a_thousand_trials() {
    let report = run_experiments(
        Arc::new(LockedMap::new()),
        ProbeConfig::default().with_max_tries(1_000),
    )
    .unwrap();
    assert_eq!(report, RunReport::Clean { trials: 1_000 });
    assert_eq!(report.to_string(), "completed without error for 1000 trials");
}

#[test]
fn racy_map_halts_before_budget() {
    let map = Arc::new(RacyMap::with_stall(Duration::from_millis(1)));
    let report = run_experiments(map, ProbeConfig::default().with_max_tries(1_000)).unwrap();
    match report {
        RunReport::Corrupted { trial, verdict } => {
            assert!(trial < 1_000);
            assert!(!verdict.success());
            assert!(verdict.size_corrupt || !verdict.lost_keys.is_empty());
        }
        other => panic!("racy map was never caught: {}", other),
    }
}

#[test]
fn default_budget_is_one_million() {
    assert_eq!(ProbeConfig::default().max_tries, 1_000_000);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn locked_map_accepts_any_payload(
        disruptor in proptest::collection::btree_map("[a-z0-9]{1,4}", "[a-z]{0,3}", 1..8),
        singleton in ("[a-z0-9]{1,4}", "[a-z]{0,3}"),
    ) {
        let payload = Payload::new(disruptor, singleton);
        let expected = payload.expected_entries();
        let config = ProbeConfig::default()
            .with_payload(payload)
            .with_check_values(true);

        let pool = TaskPool::new();
        let map = Arc::new(LockedMap::new());
        let experiment = Experiment::new(Arc::clone(&map), &pool, &config);
        for _ in 0..5 {
            let verdict = experiment.run_trial().unwrap();
            prop_assert!(verdict.success(), "{:?}", verdict);
            prop_assert_eq!(verdict.key_count, expected.len());
            prop_assert_eq!(count_keys(&*map), map.len());
        }
    }
}
