use crate::{
    error::ProbeError,
    shared::{Next, Shared},
};
use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{mpsc, Arc},
    thread,
    time::Duration,
};
use tracing::{debug, warn};

/// How long an idle worker waits for new work before exiting.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// An elastic worker pool.
///
/// The pool has no fixed size. A submitted task goes to a parked worker if
/// one is available and otherwise to a freshly spawned one, so tasks
/// submitted back to back run in parallel. Workers that stay idle for the
/// keep-alive period exit on their own.
pub struct TaskPool {
    shared: Arc<Shared>,
}

/// The pending result of a task submitted to a [`TaskPool`].
#[derive(Debug)]
pub struct TaskHandle<T> {
    name: &'static str,
    rx: mpsc::Receiver<thread::Result<T>>,
}

impl TaskPool {
    pub fn new() -> Self {
        Self::with_keep_alive(DEFAULT_KEEP_ALIVE)
    }

    pub fn with_keep_alive(keep_alive: Duration) -> Self {
        Self {
            shared: Arc::new(Shared::new(keep_alive)),
        }
    }

    /// Schedules `f` on a worker.
    ///
    /// A panic inside `f` is caught on the worker and handed to whoever joins
    /// the returned handle.
    pub fn submit<T, F>(&self, name: &'static str, f: F) -> Result<TaskHandle<T>, ProbeError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(1);
        let job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            // The joiner may have given up on this task already.
            let _ = tx.send(outcome);
        });

        let mut state = self.shared.lock();
        if state.closed {
            return Err(ProbeError::PoolClosed);
        }
        state.queue.push_back(job);
        if !self.shared.wake(&state) {
            // The lock is held until the handle is registered, so the new
            // worker cannot observe its slot empty.
            let id = state.workers.vacant_key();
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("hypothesizer-worker-{}", id))
                .spawn(move || work(&shared, id));
            match spawned {
                Ok(handle) => {
                    let key = state.workers.insert(handle);
                    debug_assert_eq!(key, id);
                    debug!(worker = id, task = name, "pool: spawned worker");
                }
                Err(e) => {
                    drop(state.queue.pop_back());
                    return Err(ProbeError::Spawn(e));
                }
            }
        }

        Ok(TaskHandle { name, rx })
    }

    /// Stops accepting tasks, lets queued tasks finish, and joins every
    /// worker. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        let workers = {
            let mut state = self.shared.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            self.shared.wake_all();
            state.workers.drain().collect::<Vec<_>>()
        };

        debug!(workers = workers.len(), "pool: shutting down");
        for worker in workers {
            if worker.join().is_err() {
                warn!("pool: worker thread panicked outside of a task");
            }
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().closed
    }

    /// Workers currently registered with the pool, busy or parked.
    pub fn live_workers(&self) -> usize {
        self.shared.lock().workers.len()
    }

    /// Workers parked waiting for a task.
    pub fn idle_workers(&self) -> usize {
        self.shared.lock().idle
    }

    pub fn keep_alive(&self) -> Duration {
        self.shared.keep_alive
    }
}

impl Default for TaskPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("TaskPool")
            .field("workers", &state.workers.len())
            .field("idle", &state.idle)
            .field("queued", &state.queue.len())
            .field("closed", &state.closed)
            .field("keep_alive", &self.shared.keep_alive)
            .finish()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn work(shared: &Shared, id: usize) {
    while let Next::Run(job) = shared.next_job(id) {
        job();
    }
    debug!(worker = id, "pool: worker exiting");
}

impl<T> TaskHandle<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Blocks until the task has run.
    pub fn join(self) -> Result<T, ProbeError> {
        match self.rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => Err(ProbeError::TaskPanicked {
                task: self.name,
                message: panic_message(payload.as_ref()),
            }),
            Err(mpsc::RecvError) => Err(ProbeError::TaskDropped { task: self.name }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
