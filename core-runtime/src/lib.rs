//! # Core Runtime Module
//!
//! Provides the host-facing infrastructure around `core-computation`:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - A runtime handle that starts computations with the configured policy,
//!   name prefix and lifetime tracker
//!
//! ## Overview
//!
//! Computations themselves need nothing from this crate. It exists so that
//! applications configure logging and abandonment behavior once, in one
//! place, instead of on every computation they start.

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use runtime::CoreRuntime;
