//! Workspace facade crate.
//!
//! Re-exports the computation primitive and, with the default `runtime`
//! feature, the host-facing runtime so applications can depend on a single
//! crate.
//!
//! ```
//! use continuation_workspace::{start, Error};
//!
//! let mut task = start(async { Ok::<_, Error>(42) });
//! assert_eq!(task.try_take().unwrap(), 42);
//! ```

pub use core_computation::*;

#[cfg(feature = "runtime")]
pub use core_runtime;
