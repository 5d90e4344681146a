//! Single-assignment deferred results for composing sync and async work.
//!
//! A computation is a unit of work that produces exactly one result, either a
//! value or an error. Callers depend on that result through a [`Task`]
//! handle, whether it is already available or will arrive later, maybe from
//! another thread, without blocking and without a scheduler.
//!
//! # Architecture
//!
//! - `slot`: single-assignment result storage plus the atomic race flag that
//!   decides whether the producer or the consumer performs the resume
//! - `computation`: the eagerly started state machine driving a body inline
//!   on whichever thread starts or resumes it
//! - `task`: the move-only handle and its abandonment policy
//! - `awaitable`: the check/register/take protocol with its synchronous fast
//!   path
//! - `callback`: the bridge from one-shot callback APIs
//! - `error`: the capture-here, rethrow-there error channel
//!
//! # Modules
//!
//! - `runtime`: top-level driver for `main` and tests
//! - `tracker`: opt-in lifetime counters
//!
//! # Examples
//!
//! ```rust
//! use core_computation::{computation, from_callback, Callback, Result, Task};
//! use std::thread;
//!
//! fn api_async(callback: Callback<i32>) {
//!     thread::spawn(move || callback.complete(41));
//! }
//!
//! #[computation]
//! async fn level1() -> Result<i32> {
//!     let x = from_callback(api_async).await?;
//!     Ok(x + 1)
//! }
//!
//! #[computation]
//! async fn level2() -> Result<f64> {
//!     let x = level1().await?;
//!     Ok(f64::from(x) + 1.0)
//! }
//!
//! let task: Task<f64> = level2();
//! assert_eq!(task.wait().unwrap(), 43.0);
//! ```

// The attribute macros expand to `core_computation::...` paths, which must
// also resolve inside this crate's own tests.
extern crate self as core_computation;

pub use core_computation_macros::{computation, main, test};

pub mod awaitable;
pub mod callback;
pub mod computation;
pub mod error;
pub mod runtime;
pub mod task;
pub mod tracker;

mod slot;

pub use awaitable::{poll_awaitable, Awaitable, Continuation, Registration};
pub use callback::{from_callback, Callback, CallbackAwaiter};
pub use computation::{start, AbandonPolicy, Builder};
pub use error::{Error, InvalidState, Result};
pub use task::{ComputationState, Task};
pub use tracker::{Tracker, TrackerSnapshot};
