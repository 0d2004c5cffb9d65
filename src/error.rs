use std::io;
use thiserror::Error;

/// Infrastructure faults raised while running trials.
///
/// Corruption is not an error: a corrupt trial is reported through
/// [`TrialVerdict`](crate::TrialVerdict). These variants cover the cases where
/// the trial itself could not be carried out.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to spawn pool worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("task pool has been shut down")]
    PoolClosed,

    /// A write task panicked, usually because the map under test did.
    #[error("task `{task}` panicked: {message}")]
    TaskPanicked { task: &'static str, message: String },

    /// The task's result channel closed with no result in it.
    ///
    /// Panics inside a task are caught and queued tasks are drained on
    /// shutdown, so this only happens if the worker thread itself dies
    /// between taking the task and reporting on it.
    #[error("task `{task}` was dropped before it completed")]
    TaskDropped { task: &'static str },

    #[error("invalid probe configuration: {0}")]
    Config(String),
}

impl ProbeError {
    pub(crate) fn config(detail: impl Into<String>) -> Self {
        Self::Config(detail.into())
    }
}
