//! Host-facing entry point tying configuration, logging and computations
//! together.

use std::future::Future;

use core_computation::{Builder, Result as ComputationResult, Task, Tracker};
use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::error::Result;
use crate::logging::init_logging;

/// Starts computations with the settings of a [`CoreConfig`]. Clones share
/// the tracker.
///
/// # Examples
///
/// ```
/// use core_runtime::{CoreConfig, CoreRuntime};
///
/// let runtime = CoreRuntime::new(
///     CoreConfig::builder().track_lifetimes(true).build().unwrap(),
/// )
/// .unwrap();
///
/// let mut task = runtime.start("answer", async { Ok(41 + 1) });
/// assert_eq!(task.try_take().unwrap(), 42);
/// drop(task);
///
/// assert_eq!(runtime.tracker().unwrap().live(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct CoreRuntime {
    config: CoreConfig,
    tracker: Option<Tracker>,
}

impl CoreRuntime {
    /// Validates the configuration and installs logging if configured.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the configuration is
    /// invalid or a global subscriber is already installed.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        if let Some(logging) = &config.logging {
            init_logging(logging.clone())?;
        }

        let tracker = config.track_lifetimes.then(Tracker::new);
        info!(
            abandon_policy = ?config.abandon_policy,
            track_lifetimes = config.track_lifetimes,
            name_prefix = config.name_prefix.as_deref(),
            "core runtime initialized"
        );

        Ok(Self { config, tracker })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The tracker recording this runtime's computations, if lifetime
    /// tracking is enabled.
    pub fn tracker(&self) -> Option<&Tracker> {
        self.tracker.as_ref()
    }

    /// A computation builder preconfigured with this runtime's settings.
    pub fn builder(&self, name: &str) -> Builder {
        let builder = Builder::new()
            .name(self.config.qualified_name(name))
            .policy(self.config.abandon_policy);
        match &self.tracker {
            Some(tracker) => builder.tracker(tracker),
            None => builder,
        }
    }

    /// Starts a named computation on the current thread.
    pub fn start<T, F>(&self, name: &str, future: F) -> Task<T>
    where
        T: Send + 'static,
        F: Future<Output = ComputationResult<T>> + Send + 'static,
    {
        self.builder(name).start(future)
    }

    /// Blocks the current thread until `future` completes.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        debug!("blocking on top-level future");
        core_computation::runtime::block_on(future)
    }
}
