//! Probes whether a key-value map stays consistent under two concurrent
//! writers.
//!
//! Each trial clears the map, races a batch write against a single write on
//! a worker pool, and then checks that the keys produced by iteration agree
//! with the reported length and that no accepted write has gone missing. A
//! [`TrialRunner`] repeats trials until one fails or the budget runs out.
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
mod error;
pub mod join;
pub mod locked;
pub(crate) mod loom;
pub mod map;
pub mod pool;
pub mod racy;
pub mod runner;
pub(crate) mod shared;

#[doc(inline)]
pub use self::{
    config::{Payload, ProbeConfig},
    engine::{inspect, Experiment, TrialVerdict},
    error::ProbeError,
    join::JoinPair,
    locked::LockedMap,
    map::{Entries, Expected, ProbeMap},
    pool::{TaskHandle, TaskPool},
    racy::RacyMap,
    runner::{run_experiments, RunReport, TrialRunner},
};
