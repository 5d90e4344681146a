//! Single-assignment result storage with race arbitration.
//!
//! A [`Slot`] is written once by a producer and read once by a consumer. The
//! two sides meet through one atomic exchange on the `claimed` flag: each side
//! records its half of the handshake (the result, or the continuation) and
//! then swaps the flag to true. Whoever sees the flag already set is the one
//! that resumes the consumer, and the exchange's acquire/release pairing makes
//! the other side's writes visible to it.
//!
//! The continuation lives in an [`AtomicWaker`], so a consumer polled again
//! with a different waker replaces the stored one while the producer may be
//! completing concurrently.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use futures::task::AtomicWaker;

use crate::awaitable::{Continuation, Registration};
use crate::error::Result;

const RUNNING: u8 = 0;
const VALUE: u8 = 1;
const ERROR: u8 = 2;

/// What the completion signal currently says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotStatus {
    Running,
    Value,
    Error,
}

pub(crate) struct Slot<T> {
    outcome: UnsafeCell<Option<Result<T>>>,
    continuation: AtomicWaker,
    /// Completion signal, stored after `outcome` is written.
    status: AtomicU8,
    /// Race-arbitration flag.
    claimed: AtomicBool,
}

// SAFETY: `outcome` is written by the single producer before `status` is
// published and read only by the single consumer after observing it.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            outcome: UnsafeCell::new(None),
            continuation: AtomicWaker::new(),
            status: AtomicU8::new(RUNNING),
            claimed: AtomicBool::new(false),
        }
    }

    pub(crate) fn status(&self) -> SlotStatus {
        match self.status.load(Ordering::Acquire) {
            RUNNING => SlotStatus::Running,
            VALUE => SlotStatus::Value,
            _ => SlotStatus::Error,
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.status.load(Ordering::Acquire) != RUNNING
    }

    /// Stores the outcome and resumes the continuation if the consumer
    /// registered first. Returns true when this call performed the resume.
    ///
    /// # Safety
    ///
    /// Must be called at most once, by the single producer.
    pub(crate) unsafe fn complete(&self, outcome: Result<T>) -> bool {
        let status = if outcome.is_ok() { VALUE } else { ERROR };
        *self.outcome.get() = Some(outcome);
        self.status.store(status, Ordering::Release);

        if !self.claimed.swap(true, Ordering::AcqRel) {
            return false;
        }

        // The consumer's exchange came first, so a continuation is stored.
        // `None` means a re-registration is in flight; that side sees the
        // completion and proceeds inline.
        match self.continuation.take() {
            Some(waker) => {
                waker.wake();
                true
            }
            None => false,
        }
    }

    /// Records the continuation to resume on completion. Only the first
    /// registration takes part in the exchange; see [`Slot::reregister`].
    pub(crate) fn register(&self, continuation: Continuation) -> Registration {
        self.continuation.register(continuation.waker());

        if !self.claimed.swap(true, Ordering::AcqRel) {
            return Registration::Suspended;
        }

        // The producer finished first and never looked at the continuation;
        // the consumer resumes itself by proceeding inline.
        drop(self.continuation.take());
        Registration::Ready
    }

    /// Replaces the continuation recorded by an earlier [`Slot::register`]
    /// that returned [`Registration::Suspended`].
    pub(crate) fn reregister(&self, continuation: Continuation) -> Registration {
        self.continuation.register(continuation.waker());

        if !self.is_complete() {
            return Registration::Suspended;
        }

        // Completed around the replacement: whichever waker the producer
        // took, the consumer proceeds inline.
        drop(self.continuation.take());
        Registration::Ready
    }

    /// Moves the outcome out. `None` means it was already taken.
    ///
    /// # Safety
    ///
    /// The caller must be the single consumer and must have observed
    /// [`Slot::is_complete`].
    pub(crate) unsafe fn take(&self) -> Option<Result<T>> {
        (*self.outcome.get()).take()
    }

    /// Returns true when an error is stored and nobody took it.
    ///
    /// # Safety
    ///
    /// Same contract as [`Slot::take`].
    pub(crate) unsafe fn holds_error(&self) -> bool {
        matches!(&*self.outcome.get(), Some(Err(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::task::{Wake, Waker};
    use std::thread;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingWaker {
        wakes: AtomicUsize,
    }

    impl Wake for CountingWaker {
        fn wake(self: Arc<Self>) {
            self.wakes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting_continuation() -> (Arc<CountingWaker>, Continuation) {
        let counter = Arc::new(CountingWaker::default());
        let continuation = Continuation::new(Waker::from(Arc::clone(&counter)));
        (counter, continuation)
    }

    fn jitter() -> Duration {
        let mut byte = [0u8; 1];
        getrandom::getrandom(&mut byte).expect("random source available");
        Duration::from_micros(u64::from(byte[0] % 64))
    }

    #[test]
    fn test_producer_first_consumer_resumes_itself() {
        let slot = Slot::new();
        let (counter, continuation) = counting_continuation();

        assert!(!unsafe { slot.complete(Ok(7)) });
        assert_eq!(slot.status(), SlotStatus::Value);
        assert_eq!(slot.register(continuation), Registration::Ready);
        assert_eq!(counter.wakes.load(Ordering::SeqCst), 0);
        assert_eq!(unsafe { slot.take() }.unwrap().unwrap(), 7);
    }

    #[test]
    fn test_consumer_first_producer_resumes() {
        let slot = Slot::new();
        let (counter, continuation) = counting_continuation();

        assert_eq!(slot.register(continuation), Registration::Suspended);
        assert!(!slot.is_complete());
        assert!(unsafe { slot.complete(Ok(7)) });
        assert_eq!(counter.wakes.load(Ordering::SeqCst), 1);
        assert_eq!(unsafe { slot.take() }.unwrap().unwrap(), 7);
    }

    #[test]
    fn test_reregistration_replaces_waker() {
        let slot = Slot::new();
        let (first, continuation) = counting_continuation();
        assert_eq!(slot.register(continuation), Registration::Suspended);

        let (second, continuation) = counting_continuation();
        assert_eq!(slot.reregister(continuation), Registration::Suspended);

        assert!(unsafe { slot.complete(Ok(3)) });
        assert_eq!(first.wakes.load(Ordering::SeqCst), 0);
        assert_eq!(second.wakes.load(Ordering::SeqCst), 1);
        assert_eq!(unsafe { slot.take() }.unwrap().unwrap(), 3);
    }

    #[test]
    fn test_reregistration_after_completion_is_ready() {
        let slot = Slot::new();
        let (first, continuation) = counting_continuation();
        assert_eq!(slot.register(continuation), Registration::Suspended);
        assert!(unsafe { slot.complete(Ok(3)) });

        let (second, continuation) = counting_continuation();
        assert_eq!(slot.reregister(continuation), Registration::Ready);
        assert_eq!(first.wakes.load(Ordering::SeqCst), 1);
        assert_eq!(second.wakes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_error_outcome_sets_error_status() {
        let slot: Slot<u8> = Slot::new();
        unsafe { slot.complete(Err(Error::msg("TestException"))) };

        assert_eq!(slot.status(), SlotStatus::Error);
        assert!(unsafe { slot.holds_error() });
        let err = unsafe { slot.take() }.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "TestException");
        assert!(!unsafe { slot.holds_error() });
        assert!(unsafe { slot.take() }.is_none());
    }

    #[test]
    fn test_concurrent_handshake_resumes_exactly_once() {
        for _ in 0..500 {
            let slot = Arc::new(Slot::new());
            let (counter, continuation) = counting_continuation();

            let producer = {
                let slot = Arc::clone(&slot);
                let delay = jitter();
                thread::spawn(move || {
                    thread::sleep(delay);
                    unsafe { slot.complete(Ok(42_u32)) }
                })
            };
            let consumer = {
                let slot = Arc::clone(&slot);
                let delay = jitter();
                thread::spawn(move || {
                    thread::sleep(delay);
                    slot.register(continuation)
                })
            };

            let producer_resumed = producer.join().unwrap();
            let registration = consumer.join().unwrap();
            let consumer_resumed = registration == Registration::Ready;

            assert!(
                producer_resumed ^ consumer_resumed,
                "exactly one party must own the resume"
            );
            assert_eq!(
                counter.wakes.load(Ordering::SeqCst),
                usize::from(producer_resumed)
            );
            assert!(slot.is_complete());
            assert_eq!(unsafe { slot.take() }.unwrap().unwrap(), 42);
        }
    }

    #[test]
    fn test_concurrent_reregistration_reaches_consumer() {
        for _ in 0..500 {
            let slot = Arc::new(Slot::new());
            let (first, continuation) = counting_continuation();
            assert_eq!(slot.register(continuation), Registration::Suspended);

            let producer = {
                let slot = Arc::clone(&slot);
                let delay = jitter();
                thread::spawn(move || {
                    thread::sleep(delay);
                    unsafe { slot.complete(Ok(42_u32)) }
                })
            };

            thread::sleep(jitter());
            let (second, continuation) = counting_continuation();
            let registration = slot.reregister(continuation);
            producer.join().unwrap();

            // Either the consumer proceeds inline or the latest waker fires.
            let second_woken = second.wakes.load(Ordering::SeqCst) > 0;
            assert!(registration == Registration::Ready || second_woken);
            assert!(first.wakes.load(Ordering::SeqCst) <= 1);
            assert_eq!(unsafe { slot.take() }.unwrap().unwrap(), 42);
        }
    }
}
