use crate::{
    config::ProbeConfig,
    engine::{Experiment, TrialVerdict},
    error::ProbeError,
    map::ProbeMap,
    pool::TaskPool,
};
use std::{fmt, sync::Arc};
use tracing::{info, warn};

/// How a run of trials against one map ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    /// Trial `trial` (counted from zero) was the first to observe corruption.
    Corrupted { trial: u64, verdict: TrialVerdict },
    /// Every trial in the budget passed. This is evidence, not proof, that
    /// the map is safe.
    Clean { trials: u64 },
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        matches!(self, RunReport::Clean { .. })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunReport::Corrupted { trial, .. } => write!(f, "failed after {} tries", trial),
            RunReport::Clean { trials } => {
                write!(f, "completed without error for {} trials", trials)
            }
        }
    }
}

/// Repeats trials against one map until one fails or the budget runs out.
///
/// The runner owns the pool the trials run on and shuts it down when the run
/// ends, however it ends.
#[derive(Debug)]
pub struct TrialRunner<M> {
    map: Arc<M>,
    config: ProbeConfig,
    pool: TaskPool,
}

impl<M> TrialRunner<M>
where
    M: ProbeMap + 'static,
{
    pub fn new(map: Arc<M>, config: ProbeConfig) -> Result<Self, ProbeError> {
        config.validate()?;
        let pool = TaskPool::with_keep_alive(config.keep_alive);
        Ok(Self { map, config, pool })
    }

    pub fn run(self) -> Result<RunReport, ProbeError> {
        info!(max_tries = self.config.max_tries, "starting trials");
        let outcome = self.trials();
        self.pool.shutdown();
        outcome
    }

    fn trials(&self) -> Result<RunReport, ProbeError> {
        let experiment = Experiment::new(Arc::clone(&self.map), &self.pool, &self.config);
        for trial in 0..self.config.max_tries {
            let verdict = experiment.run_trial()?;
            if !verdict.success() {
                warn!(trial, "corruption observed, stopping");
                return Ok(RunReport::Corrupted { trial, verdict });
            }
        }

        info!(trials = self.config.max_tries, "run completed without error");
        Ok(RunReport::Clean {
            trials: self.config.max_tries,
        })
    }
}

/// Runs trials against `map` as configured by `config`.
pub fn run_experiments<M>(map: Arc<M>, config: ProbeConfig) -> Result<RunReport, ProbeError>
where
    M: ProbeMap + 'static,
{
    TrialRunner::new(map, config)?.run()
}
