use slab::Slab;
use std::{
    collections::VecDeque,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    thread::JoinHandle,
    time::{Duration, Instant},
};

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// State shared between a [`TaskPool`](crate::TaskPool) and its workers.
pub(crate) struct Shared {
    state: Mutex<State>,
    cv: Condvar,
    pub(crate) keep_alive: Duration,
}

pub(crate) struct State {
    pub(crate) queue: VecDeque<Job>,
    /// Workers currently parked on the condvar.
    pub(crate) idle: usize,
    pub(crate) closed: bool,
    pub(crate) workers: Slab<JoinHandle<()>>,
}

/// What a worker should do after it parks.
pub(crate) enum Next {
    Run(Job),
    Exit,
}

impl Shared {
    pub(crate) fn new(keep_alive: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                idle: 0,
                closed: false,
                workers: Slab::new(),
            }),
            cv: Condvar::new(),
            keep_alive,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wakes one parked worker if there are at least as many of them as
    /// queued jobs. Returns `false` when the caller must add a worker.
    pub(crate) fn wake(&self, state: &State) -> bool {
        if state.idle >= state.queue.len() {
            self.cv.notify_one();
            true
        } else {
            false
        }
    }

    pub(crate) fn wake_all(&self) {
        self.cv.notify_all();
    }

    /// Blocks worker `id` until there is a job for it, the pool closes, or it
    /// has been idle for the keep-alive period.
    ///
    /// The keep-alive runs from the call, not from the latest wakeup, so a
    /// worker woken for a job someone else took still expires on time.
    /// Queued jobs are always drained before a worker exits, so closing the
    /// pool lets submitted tasks finish. An exiting worker removes its own
    /// handle from the registry.
    pub(crate) fn next_job(&self, id: usize) -> Next {
        let deadline = Instant::now() + self.keep_alive;
        let mut state = self.lock();
        loop {
            if let Some(job) = state.queue.pop_front() {
                return Next::Run(job);
            }
            if state.closed {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            state.idle += 1;
            let (guard, _) = self
                .cv
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            state.idle -= 1;
        }

        if state.workers.contains(id) {
            // Dropping the handle detaches this thread, which is about to return.
            drop(state.workers.remove(id));
        }
        Next::Exit
    }
}
