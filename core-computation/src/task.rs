//! Task handles.
//!
//! A [`Task`] is the single owner of one computation. It is move-only: there
//! is no `Clone`, and moving it out with [`std::mem::take`] leaves an empty
//! handle behind that reports [`ComputationState::NotStarted`].
//!
//! # Awaiting
//!
//! `Task<T>` is a [`Future`] with output `Result<T>`. Awaiting a completed
//! task returns immediately without suspending; awaiting a pending one
//! registers the awaiting party as the task's only continuation.
//!
//! ```rust
//! use core_computation::{start, Error, Task};
//!
//! fn leaf() -> Task<i32> {
//!     start(async { Ok::<_, Error>(41) })
//! }
//!
//! let mut level1 = start(async {
//!     let x = leaf().await?;
//!     Ok::<_, Error>(x + 1)
//! });
//! assert_eq!(level1.try_take().unwrap(), 42);
//! ```
//!
//! # Dropping
//!
//! Dropping a completed task releases it. Dropping an unfinished one follows
//! the computation's [`AbandonPolicy`](crate::AbandonPolicy).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use uuid::Uuid;

use crate::awaitable::{poll_awaitable, Awaitable, Continuation, Registration};
use crate::computation::{self, Computation};
use crate::error::{Error, InvalidState, Result};
use crate::slot::SlotStatus;

/// Observable state of the computation behind a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationState {
    NotStarted,
    Running,
    CompletedValue,
    CompletedError,
}

impl ComputationState {
    pub fn is_complete(self) -> bool {
        matches!(self, Self::CompletedValue | Self::CompletedError)
    }
}

/// Move-only handle owning one computation.
pub struct Task<T> {
    computation: Option<Arc<Computation<T>>>,
    registered: bool,
}

impl<T> Task<T> {
    pub(crate) fn from_computation(computation: Arc<Computation<T>>) -> Self {
        Self {
            computation: Some(computation),
            registered: false,
        }
    }

    /// Returns false for an empty handle.
    pub fn is_started(&self) -> bool {
        self.computation.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.computation
            .as_ref()
            .is_some_and(|computation| computation.slot.is_complete())
    }

    pub fn state(&self) -> ComputationState {
        match &self.computation {
            None => ComputationState::NotStarted,
            Some(computation) => match computation.slot.status() {
                SlotStatus::Running => ComputationState::Running,
                SlotStatus::Value => ComputationState::CompletedValue,
                SlotStatus::Error => ComputationState::CompletedError,
            },
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.computation.as_ref().map(|computation| computation.id())
    }

    pub fn name(&self) -> Option<&str> {
        self.computation
            .as_ref()
            .and_then(|computation| computation.name())
    }

    /// Retrieves the result without waiting.
    ///
    /// # Errors
    ///
    /// - [`InvalidState::NotStarted`] for an empty handle
    /// - [`InvalidState::NotComplete`] while the computation is still running
    /// - [`InvalidState::AlreadyRetrieved`] on a second retrieval
    /// - the captured producer error, if the computation failed
    pub fn try_take(&mut self) -> Result<T> {
        let Some(computation) = self.computation.as_ref() else {
            return Err(InvalidState::NotStarted.into());
        };
        if !computation.slot.is_complete() {
            return Err(InvalidState::NotComplete.into());
        }

        // SAFETY: completion was observed and `&mut self` makes this handle
        // the only consumer.
        unsafe { computation.slot.take() }
            .unwrap_or_else(|| Err(InvalidState::AlreadyRetrieved.into()))
    }

    /// Gives up the handle while letting the computation run to completion.
    ///
    /// Unlike a plain drop this ignores the abandonment policy: the
    /// computation stays alive until it finishes, and its result is dropped.
    pub fn detach(mut self) {
        if let Some(computation) = self.computation.take() {
            if !computation.slot.is_complete() {
                computation.detach();
            }
        }
    }
}

impl<T: Send + 'static> Task<T> {
    /// A task that is already complete with `value`.
    pub fn ready(value: T) -> Self {
        computation::start(async move { Ok(value) })
    }

    /// A task that is already complete with `error`.
    pub fn failed(error: Error) -> Self {
        computation::start(async move { Err(error) })
    }

    /// Blocks the current thread until the result is available.
    ///
    /// Meant for top-level drivers such as `main` or tests; never call it
    /// from inside a computation.
    pub fn wait(self) -> Result<T> {
        crate::runtime::block_on(self)
    }
}

impl<T> Default for Task<T> {
    fn default() -> Self {
        Self {
            computation: None,
            registered: false,
        }
    }
}

impl<T> Awaitable for Task<T> {
    type Output = T;

    fn is_ready(&self) -> bool {
        match &self.computation {
            None => true,
            Some(computation) => computation.slot.is_complete(),
        }
    }

    fn register(&mut self, continuation: Continuation) -> Registration {
        let Some(computation) = self.computation.as_ref() else {
            return Registration::Ready;
        };
        if self.registered {
            return computation.slot.reregister(continuation);
        }

        self.registered = true;
        computation.slot.register(continuation)
    }

    fn take_result(&mut self) -> Result<T> {
        self.try_take()
    }
}

impl<T> Future for Task<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        poll_awaitable(self.get_mut(), cx)
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        if let Some(computation) = self.computation.take() {
            computation.abandon();
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
