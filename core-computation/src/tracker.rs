//! Lifetime bookkeeping for computations.
//!
//! A [`Tracker`] is an explicit, instance-scoped set of counters. Computations
//! opt in through [`Builder::tracker`](crate::Builder::tracker); nothing is
//! recorded process-wide, so independent tests and runtimes never see each
//! other's numbers.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counters {
    live: AtomicUsize,
    created: AtomicUsize,
    suspensions: AtomicUsize,
    resumes: AtomicUsize,
}

/// Shared handle to a set of lifetime counters. Cloning shares the counters.
#[derive(Clone, Default)]
pub struct Tracker {
    counters: Arc<Counters>,
}

/// Point-in-time copy of a [`Tracker`]'s counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackerSnapshot {
    /// Computations whose storage has not been released yet.
    pub live: usize,
    /// Computations ever started.
    pub created: usize,
    /// Times a computation yielded because something it awaited was pending.
    pub suspensions: usize,
    /// Times a suspended computation was resumed.
    pub resumes: usize,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::Acquire)
    }

    pub fn created(&self) -> usize {
        self.counters.created.load(Ordering::Acquire)
    }

    pub fn suspensions(&self) -> usize {
        self.counters.suspensions.load(Ordering::Acquire)
    }

    pub fn resumes(&self) -> usize {
        self.counters.resumes.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            live: self.live(),
            created: self.created(),
            suspensions: self.suspensions(),
            resumes: self.resumes(),
        }
    }

    pub(crate) fn on_created(&self) {
        self.counters.created.fetch_add(1, Ordering::AcqRel);
        self.counters.live.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn on_released(&self) {
        self.counters.live.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn on_suspended(&self) {
        self.counters.suspensions.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn on_resumed(&self) {
        self.counters.resumes.fetch_add(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.snapshot(), f)
    }
}
