//! Bridge from one-shot callback APIs into computations.
//!
//! Any function that accepts a handler and invokes it exactly once, possibly
//! later and possibly from another thread, can be awaited through
//! [`from_callback`]:
//!
//! ```rust
//! use core_computation::{from_callback, start, Callback, Error};
//! use std::thread;
//!
//! fn fetch_answer(callback: Callback<i32>) {
//!     thread::spawn(move || callback.complete(41));
//! }
//!
//! let task = start(async {
//!     let x = from_callback(fetch_answer).await?;
//!     Ok::<_, Error>(x + 1)
//! });
//! assert_eq!(task.wait().unwrap(), 42);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tracing::warn;

use crate::awaitable::{poll_awaitable, Awaitable, Continuation, Registration};
use crate::error::{Error, InvalidState, Result};
use crate::slot::Slot;

type CallbackApi<T> = Box<dyn FnOnce(Callback<T>) + Send + 'static>;

/// The handler handed to an external API. Invoking it consumes it, so it can
/// only ever deliver one result.
///
/// Dropping it without delivering completes the awaiting side with
/// [`Error::CallbackDropped`].
#[must_use = "dropping a callback completes the awaiting side with an error"]
pub struct Callback<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Callback<T> {
    fn new(slot: Arc<Slot<T>>) -> Self {
        Self { slot: Some(slot) }
    }

    /// Delivers the value and resumes the awaiting party on this thread.
    pub fn complete(mut self, value: T) {
        self.deliver(Ok(value));
    }

    /// Delivers a producer error instead of a value.
    pub fn fail<E>(mut self, error: E)
    where
        E: Into<anyhow::Error>,
    {
        self.deliver(Err(Error::Producer(error.into())));
    }

    /// Converts the callback into a plain closure for APIs that expect one.
    pub fn into_handler(self) -> impl FnOnce(T) + Send + 'static
    where
        T: Send + 'static,
    {
        move |value| self.complete(value)
    }

    fn deliver(&mut self, outcome: Result<T>) {
        if let Some(slot) = self.slot.take() {
            // SAFETY: `slot` is taken out of the only callback, so this is
            // the single completion.
            unsafe { slot.complete(outcome) };
        }
    }
}

impl<T> Drop for Callback<T> {
    fn drop(&mut self) {
        if self.slot.is_some() {
            warn!("callback dropped without being invoked");
            self.deliver(Err(Error::CallbackDropped));
        }
    }
}

impl<T> fmt::Debug for Callback<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("delivered", &self.slot.is_none())
            .finish()
    }
}

/// Awaitable produced by [`from_callback`].
///
/// It is never ready on the first check. The first poll hands a
/// [`Callback`] to the wrapped API and registers the awaiting party; the
/// callback may fire before, during or after that registration.
pub struct CallbackAwaiter<T> {
    api: Option<CallbackApi<T>>,
    slot: Arc<Slot<T>>,
    registered: bool,
}

/// Wraps a one-shot callback API so it can be awaited.
pub fn from_callback<T, F>(api: F) -> CallbackAwaiter<T>
where
    F: FnOnce(Callback<T>) + Send + 'static,
{
    CallbackAwaiter {
        api: Some(Box::new(api)),
        slot: Arc::new(Slot::new()),
        registered: false,
    }
}

impl<T> Awaitable for CallbackAwaiter<T> {
    type Output = T;

    fn is_ready(&self) -> bool {
        self.api.is_none() && self.slot.is_complete()
    }

    fn register(&mut self, continuation: Continuation) -> Registration {
        if let Some(api) = self.api.take() {
            api(Callback::new(Arc::clone(&self.slot)));
        }

        if self.registered {
            return self.slot.reregister(continuation);
        }

        self.registered = true;
        self.slot.register(continuation)
    }

    fn take_result(&mut self) -> Result<T> {
        if !self.slot.is_complete() {
            return Err(InvalidState::NotComplete.into());
        }
        // SAFETY: completion observed; `&mut self` makes this the only consumer.
        unsafe { self.slot.take() }.unwrap_or_else(|| Err(InvalidState::AlreadyRetrieved.into()))
    }
}

impl<T> Future for CallbackAwaiter<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        poll_awaitable(self.get_mut(), cx)
    }
}

impl<T> fmt::Debug for CallbackAwaiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackAwaiter")
            .field("invoked", &self.api.is_none())
            .field("complete", &self.slot.is_complete())
            .finish()
    }
}
