//! Error channel shared by every computation.
//!
//! Errors raised while producing a result are captured where they happen and
//! stored in the computation's result slot. They surface exactly once, at the
//! point a consumer retrieves the result, and keep propagating through `?`
//! until some level handles them.

use std::any::Any;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The producer returned an error. Displayed unmodified.
    #[error(transparent)]
    Producer(#[from] anyhow::Error),

    #[error("computation panicked: {0}")]
    Panicked(String),

    #[error("callback was dropped without being invoked")]
    CallbackDropped,

    #[error("invalid computation state: {0}")]
    InvalidState(#[from] InvalidState),
}

/// Logic errors in how a result is retrieved, as opposed to failures of the
/// work itself.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidState {
    #[error("computation was never started")]
    NotStarted,

    #[error("computation has not completed yet")]
    NotComplete,

    #[error("result was already retrieved")]
    AlreadyRetrieved,
}

impl Error {
    /// Builds a producer error from a plain message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use core_computation::Error;
    ///
    /// let err = Error::msg("TestException");
    /// assert_eq!(err.to_string(), "TestException");
    /// ```
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::Producer(anyhow::Error::msg(message))
    }

    /// Wraps any standard error as a producer error.
    pub fn producer<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Producer(error.into())
    }

    /// Returns true for failures raised by the work itself.
    pub fn is_producer(&self) -> bool {
        !self.is_invalid_state()
    }

    /// Returns true for retrieval logic errors.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Returns the retrieval logic error, if this is one.
    pub fn invalid_state(&self) -> Option<InvalidState> {
        match self {
            Self::InvalidState(state) => Some(*state),
            _ => None,
        }
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&'static str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_message_is_unmodified() {
        let err = Error::msg("TestException");
        assert_eq!(err.to_string(), "TestException");
        assert!(err.is_producer());
        assert!(!err.is_invalid_state());
    }

    #[test]
    fn test_producer_from_std_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = Error::producer(io);
        assert_eq!(err.to_string(), "disk on fire");
    }

    #[test]
    fn test_invalid_state_is_distinct() {
        let err: Error = InvalidState::AlreadyRetrieved.into();
        assert!(err.is_invalid_state());
        assert!(!err.is_producer());
        assert_eq!(err.invalid_state(), Some(InvalidState::AlreadyRetrieved));
        assert_eq!(
            err.to_string(),
            "invalid computation state: result was already retrieved"
        );
    }

    #[test]
    fn test_from_panic_payloads() {
        let err = Error::from_panic(Box::new("static message"));
        assert_eq!(err.to_string(), "computation panicked: static message");

        let err = Error::from_panic(Box::new(String::from("owned message")));
        assert_eq!(err.to_string(), "computation panicked: owned message");

        let err = Error::from_panic(Box::new(17_u32));
        assert!(matches!(err, Error::Panicked(_)));
    }
}
