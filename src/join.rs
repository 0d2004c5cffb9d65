use crate::{
    error::ProbeError,
    pool::{TaskHandle, TaskPool},
};

/// Two tasks submitted back to back and joined together.
///
/// Nothing orders the two tasks relative to each other once submitted: they
/// may run one after the other or overlap at any granularity the pool's
/// workers allow.
#[derive(Debug)]
pub struct JoinPair<A, B> {
    first: TaskHandle<A>,
    second: TaskHandle<B>,
}

impl<A, B> JoinPair<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    pub fn spawn<F, G>(
        pool: &TaskPool,
        (first_name, first): (&'static str, F),
        (second_name, second): (&'static str, G),
    ) -> Result<Self, ProbeError>
    where
        F: FnOnce() -> A + Send + 'static,
        G: FnOnce() -> B + Send + 'static,
    {
        let first = pool.submit(first_name, first)?;
        let second = pool.submit(second_name, second)?;
        Ok(Self { first, second })
    }

    /// Waits for the first task, then the second.
    ///
    /// The first fault encountered is returned as is. If the first task
    /// fails, the second is left to finish on its own.
    pub fn join(self) -> Result<(A, B), ProbeError> {
        let a = self.first.join()?;
        let b = self.second.join()?;
        Ok((a, b))
    }
}
