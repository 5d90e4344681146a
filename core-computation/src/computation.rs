//! The computation state machine.
//!
//! A computation is started eagerly: [`start`] polls its body right away on
//! the calling thread. When the body awaits something that is not ready yet,
//! the computation goes idle and hands out its waker as the continuation.
//! Waking it runs the body again inline on the waking thread, which is how a
//! result produced on a foreign thread flows up the chain without any
//! scheduler.
//!
//! Two atomics keep this sound:
//!
//! - `run` makes sure only one thread polls the body at a time. A wake that
//!   arrives mid-poll is recorded as `NOTIFIED` and the polling thread goes
//!   around again instead of going idle.
//! - `lifecycle` arbitrates between the handle detaching the computation
//!   (fire-and-forget) and the computation finishing, so the self-reference
//!   that keeps a detached computation alive is released exactly once.

use std::cell::UnsafeCell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Wake, Waker};

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::Result;
use crate::slot::Slot;
use crate::task::Task;
use crate::tracker::Tracker;

// run states
const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const NOTIFIED: u8 = 2;
const DONE: u8 = 3;

// lifecycle bits
const DETACHED: u8 = 0b01;
const FINISHED: u8 = 0b10;

/// What happens when a [`Task`] is dropped before its computation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbandonPolicy {
    /// Keep the computation alive until it completes if anything can still
    /// resume it (a pending callback, a timer, another thread mid-poll).
    /// Computations nothing can resume are dropped right away.
    #[default]
    KeepAlive,
    /// Drop the handle's reference immediately. A late completion of whatever
    /// the computation awaited finds it gone and does nothing.
    Release,
}

/// Configures and starts a computation.
///
/// # Examples
///
/// ```rust
/// use core_computation::{AbandonPolicy, Builder, Error, Tracker};
///
/// let tracker = Tracker::new();
/// let mut task = Builder::new()
///     .name("answer")
///     .policy(AbandonPolicy::Release)
///     .tracker(&tracker)
///     .start(async { Ok::<_, Error>(42) });
///
/// assert_eq!(task.try_take().unwrap(), 42);
/// drop(task);
/// assert_eq!(tracker.live(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    name: Option<String>,
    policy: AbandonPolicy,
    tracker: Option<Tracker>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name reported in log fields.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn policy(mut self, policy: AbandonPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn tracker(mut self, tracker: &Tracker) -> Self {
        self.tracker = Some(tracker.clone());
        self
    }

    /// Starts the computation on the current thread and returns its handle.
    ///
    /// The body runs until it completes or first awaits something pending.
    pub fn start<T, F>(self, future: F) -> Task<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let computation = Computation::new(self, future.boxed());
        debug!(
            computation.id = %computation.id,
            computation.name = computation.name(),
            "computation started"
        );
        computation.drive();
        Task::from_computation(computation)
    }
}

/// Starts a computation with default settings.
///
/// # Examples
///
/// ```rust
/// use core_computation::{start, Error};
///
/// let leaf = start(async { Ok::<_, Error>(41) });
/// let mut sum = start(async move {
///     let x = leaf.await?;
///     Ok::<_, Error>(x + 1)
/// });
///
/// assert_eq!(sum.try_take().unwrap(), 42);
/// ```
pub fn start<T, F>(future: F) -> Task<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    Builder::new().start(future)
}

/// Type-erased resume entry point reached through a computation's waker.
trait Resume: Send + Sync {
    fn resume(self: Arc<Self>);
}

/// Non-owning back-reference used as a computation's waker.
struct ResumeRef {
    target: Weak<dyn Resume>,
}

impl Wake for ResumeRef {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        match self.target.upgrade() {
            Some(target) => target.resume(),
            None => trace!("resume target already released"),
        }
    }
}

pub(crate) struct Computation<T> {
    id: Uuid,
    name: Option<String>,
    policy: AbandonPolicy,
    tracker: Option<Tracker>,
    pub(crate) slot: Slot<T>,
    body: UnsafeCell<Option<BoxFuture<'static, Result<T>>>>,
    run: AtomicU8,
    lifecycle: AtomicU8,
    /// Self-reference held while detached.
    pin: UnsafeCell<Option<Arc<Computation<T>>>>,
    /// Shared by every waker handed out; extra strong counts mean somebody
    /// can still resume this computation.
    resume_ref: Arc<ResumeRef>,
}

// SAFETY: `body` is only touched by the thread holding the RUNNING state,
// `pin` only by the side that wins the `lifecycle` exchange, and `slot`
// carries its own protocol.
unsafe impl<T: Send> Send for Computation<T> {}
unsafe impl<T: Send> Sync for Computation<T> {}

impl<T> Computation<T> {
    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn has_pending_resume(&self) -> bool {
        self.run.load(Ordering::Acquire) != IDLE || Arc::strong_count(&self.resume_ref) > 1
    }

    /// Applies the abandonment policy when the owning handle goes away.
    pub(crate) fn abandon(self: Arc<Self>) {
        if self.slot.is_complete() {
            // SAFETY: completion observed, and the dropping handle was the
            // only consumer.
            if unsafe { self.slot.holds_error() } {
                debug!(
                    computation.id = %self.id,
                    computation.name = self.name(),
                    "dropping error that was never retrieved"
                );
            }
            return;
        }

        match self.policy {
            AbandonPolicy::KeepAlive if self.has_pending_resume() => {
                debug!(
                    computation.id = %self.id,
                    computation.name = self.name(),
                    "handle dropped, keeping computation alive until it completes"
                );
                self.detach();
            }
            AbandonPolicy::KeepAlive => {
                debug!(
                    computation.id = %self.id,
                    computation.name = self.name(),
                    "handle dropped, nothing can resume the computation, releasing it"
                );
            }
            AbandonPolicy::Release => {
                debug!(
                    computation.id = %self.id,
                    computation.name = self.name(),
                    "handle dropped, releasing unfinished computation"
                );
            }
        }
    }

    /// Pins the computation through a self-reference until it finishes.
    pub(crate) fn detach(self: Arc<Self>) {
        // SAFETY: until DETACHED is published nobody else reads `pin`.
        unsafe { *self.pin.get() = Some(Arc::clone(&self)) };

        let previous = self.lifecycle.fetch_or(DETACHED, Ordering::AcqRel);
        if previous & FINISHED != 0 {
            // The computation finished before it could see DETACHED, so it
            // will never release the pin itself.
            // SAFETY: the finishing side is done with `lifecycle`.
            drop(unsafe { (*self.pin.get()).take() });
        }
    }

    fn finish(&self, outcome: Result<T>) {
        debug!(
            computation.id = %self.id,
            computation.name = self.name(),
            failed = outcome.is_err(),
            "computation completed"
        );

        // SAFETY: only the driving thread finishes, exactly once.
        let resumed = unsafe { self.slot.complete(outcome) };
        if resumed {
            trace!(computation.id = %self.id, "resumed awaiting party");
        }

        let previous = self.lifecycle.fetch_or(FINISHED, Ordering::AcqRel);
        if previous & DETACHED != 0 {
            trace!(computation.id = %self.id, "releasing detached computation");
            // SAFETY: the detaching handle published the pin before DETACHED
            // and never touches it again.
            drop(unsafe { (*self.pin.get()).take() });
        }
    }
}

impl<T: Send + 'static> Computation<T> {
    fn new(builder: Builder, body: BoxFuture<'static, Result<T>>) -> Arc<Self> {
        if let Some(tracker) = &builder.tracker {
            tracker.on_created();
        }

        Arc::new_cyclic(|weak: &Weak<Self>| {
            let target: Weak<dyn Resume> = weak.clone();
            Self {
                id: Uuid::new_v4(),
                name: builder.name,
                policy: builder.policy,
                tracker: builder.tracker,
                slot: Slot::new(),
                body: UnsafeCell::new(Some(body)),
                run: AtomicU8::new(RUNNING),
                lifecycle: AtomicU8::new(0),
                pin: UnsafeCell::new(None),
                resume_ref: Arc::new(ResumeRef { target }),
            }
        })
    }

    /// Polls the body until it completes or suspends. The caller must hold
    /// the RUNNING state.
    fn drive(self: &Arc<Self>) {
        loop {
            // SAFETY: holding RUNNING grants exclusive access to the body.
            let body = unsafe { &mut *self.body.get() };
            let Some(future) = body.as_mut() else {
                return;
            };

            let polled = {
                let waker = Waker::from(Arc::clone(&self.resume_ref));
                let mut cx = Context::from_waker(&waker);
                panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)))
            };

            let outcome = match polled {
                Ok(Poll::Pending) => {
                    match self
                        .run
                        .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                    {
                        Ok(_) => {
                            if let Some(tracker) = &self.tracker {
                                tracker.on_suspended();
                            }
                            trace!(computation.id = %self.id, "computation suspended");
                            return;
                        }
                        Err(_) => {
                            // Woken while polling: go around again.
                            self.run.store(RUNNING, Ordering::Release);
                            continue;
                        }
                    }
                }
                Ok(Poll::Ready(outcome)) => outcome,
                Err(payload) => Err(crate::error::Error::from_panic(payload)),
            };

            *body = None;
            self.run.store(DONE, Ordering::Release);
            self.finish(outcome);
            return;
        }
    }
}

impl<T: Send + 'static> Resume for Computation<T> {
    fn resume(self: Arc<Self>) {
        let mut current = self.run.load(Ordering::Acquire);
        loop {
            let next = match current {
                IDLE => RUNNING,
                RUNNING => NOTIFIED,
                _ => return,
            };
            match self
                .run
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) if next == RUNNING => {
                    if let Some(tracker) = &self.tracker {
                        tracker.on_resumed();
                    }
                    trace!(computation.id = %self.id, "computation resumed");
                    self.drive();
                    return;
                }
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

impl<T> Drop for Computation<T> {
    fn drop(&mut self) {
        if let Some(tracker) = &self.tracker {
            tracker.on_released();
        }
    }
}
