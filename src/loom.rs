pub(crate) use self::inner::*;

#[cfg(loom)]
mod inner {
    pub(crate) mod sync {
        pub(crate) use loom::sync::*;
        pub(crate) use std::sync::PoisonError;
    }

    pub(crate) mod thread {
        pub(crate) use loom::thread::*;

        /// Under the model checker a stall is a preemption point.
        pub(crate) fn stall(_: std::time::Duration) {
            loom::thread::yield_now();
        }
    }
}

#[cfg(not(loom))]
mod inner {
    pub(crate) mod sync {
        pub(crate) use std::sync::*;
    }

    pub(crate) mod thread {
        pub(crate) fn stall(d: std::time::Duration) {
            if !d.is_zero() {
                std::thread::sleep(d);
            }
        }
    }
}
