use chrono::{DateTime, SubsecRound, Utc};
use std::fmt::Debug;

/// Source of the current time for every timestamp the queue stores.
///
/// Timestamps are always bound from the clock rather than taken from the
/// database `now()`, so every worker agrees on what "due" and "expired" mean
/// under a simulated clock too.
pub trait Clock: Send + Sync + Debug {
    /// Current UTC time, truncated to whole seconds.
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Default, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(0)
    }
}

pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex, PoisonError};

    /// A clock that only moves when told to. Clones share the same time.
    #[derive(Clone, Debug)]
    pub struct MockClock {
        current_time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MockClock {
        pub fn new(initial_time: DateTime<Utc>) -> Self {
            Self {
                current_time: Arc::new(Mutex::new(initial_time.trunc_subsecs(0))),
            }
        }

        pub fn set_time(&self, time: DateTime<Utc>) {
            *self
                .current_time
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = time.trunc_subsecs(0);
        }

        pub fn advance(&self, duration: chrono::Duration) {
            let mut time = self
                .current_time
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *time = (*time + duration).trunc_subsecs(0);
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .current_time
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
        }
    }
}
