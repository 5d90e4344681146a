//! The await/resume protocol.
//!
//! Anything a computation can depend on exposes three operations: check
//! whether the result is already there, register the party to resume, and
//! extract the result. [`poll_awaitable`] runs that protocol from inside
//! `Future::poll`, taking the synchronous fast path whenever the result is
//! already available so chains of completed work never suspend.

use std::task::{Context, Poll, Waker};

use crate::error::Result;

/// The party to resume once a result is available.
///
/// For a computation this wraps a waker holding only a weak reference back to
/// it, so registering a continuation never extends anybody's lifetime.
/// Waking runs the awaiting computation inline on the calling thread.
#[derive(Debug, Clone)]
pub struct Continuation {
    waker: Waker,
}

impl Continuation {
    pub fn new(waker: Waker) -> Self {
        Self { waker }
    }

    pub fn from_context(cx: &Context<'_>) -> Self {
        Self::new(cx.waker().clone())
    }

    pub(crate) fn waker(&self) -> &Waker {
        &self.waker
    }

    /// Resumes the registered party on the current thread.
    pub fn resume(self) {
        self.waker.wake();
    }
}

/// Outcome of registering a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The result is not there yet; the producer will resume the continuation.
    Suspended,
    /// The producer finished first; the registering party resumes itself.
    Ready,
}

/// Something a computation can `.await` on.
pub trait Awaitable {
    type Output;

    /// Returns true when the result can be taken without suspending.
    fn is_ready(&self) -> bool;

    /// Records the party to resume on completion.
    ///
    /// A later registration replaces the earlier one, so only the most
    /// recent continuation is resumed.
    fn register(&mut self, continuation: Continuation) -> Registration;

    /// Takes the result, re-raising a captured error.
    fn take_result(&mut self) -> Result<Self::Output>;
}

/// Drives one [`Awaitable`] from within `Future::poll`.
pub fn poll_awaitable<A>(awaitable: &mut A, cx: &mut Context<'_>) -> Poll<Result<A::Output>>
where
    A: Awaitable + ?Sized,
{
    if awaitable.is_ready() {
        return Poll::Ready(awaitable.take_result());
    }

    match awaitable.register(Continuation::from_context(cx)) {
        Registration::Ready => Poll::Ready(awaitable.take_result()),
        Registration::Suspended => Poll::Pending,
    }
}
