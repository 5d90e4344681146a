//! # Core Configuration Module
//!
//! Provides configuration for hosts that start computations through a
//! [`CoreRuntime`](crate::CoreRuntime).
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance. Every setting has a default, so an empty builder is valid;
//! `build()` still validates what was provided and fails fast with an
//! actionable message.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//! use core_runtime::logging::{LogLevel, LoggingConfig};
//! use core_computation::AbandonPolicy;
//!
//! let config = CoreConfig::builder()
//!     .abandon_policy(AbandonPolicy::Release)
//!     .track_lifetimes(true)
//!     .name_prefix("player")
//!     .logging(LoggingConfig::default().with_level(LogLevel::Debug))
//!     .build()
//!     .expect("Failed to build config");
//!
//! assert!(config.track_lifetimes);
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // An empty prefix is rejected
//! let config = CoreConfig::builder()
//!     .name_prefix("")
//!     .build()
//!     .expect("Should fail - empty name prefix");
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use core_computation::AbandonPolicy;

/// Settings applied to every computation started through a runtime.
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    /// What happens to an unfinished computation whose handle is dropped
    pub abandon_policy: AbandonPolicy,

    /// Record every computation in the runtime's tracker
    pub track_lifetimes: bool,

    /// Prepended to computation names in log fields (`prefix::name`)
    pub name_prefix: Option<String>,

    /// Logging to install when the runtime is created. `None` leaves any
    /// existing subscriber alone.
    pub logging: Option<LoggingConfig>,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder();
    /// ```
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The name prefix, when set, is not empty and contains no whitespace
    /// - The logging filter, when set, parses
    pub fn validate(&self) -> Result<()> {
        if let Some(prefix) = &self.name_prefix {
            if prefix.is_empty() {
                return Err(Error::Config(
                    "Name prefix cannot be empty. Omit .name_prefix() to disable it.".to_string(),
                ));
            }
            if prefix.chars().any(char::is_whitespace) {
                return Err(Error::Config(format!(
                    "Name prefix '{}' must not contain whitespace",
                    prefix
                )));
            }
        }

        if let Some(logging) = &self.logging {
            logging.validate()?;
        }

        Ok(())
    }

    /// Applies the prefix to a computation name.
    pub fn qualified_name(&self, name: &str) -> String {
        match &self.name_prefix {
            Some(prefix) => format!("{}::{}", prefix, name),
            None => name.to_string(),
        }
    }
}

/// Builder for [`CoreConfig`].
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    abandon_policy: Option<AbandonPolicy>,
    track_lifetimes: bool,
    name_prefix: Option<String>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the abandonment policy.
    ///
    /// Default: [`AbandonPolicy::KeepAlive`]
    pub fn abandon_policy(mut self, policy: AbandonPolicy) -> Self {
        self.abandon_policy = Some(policy);
        self
    }

    /// Enables lifetime tracking.
    ///
    /// Default: `false`
    pub fn track_lifetimes(mut self, enabled: bool) -> Self {
        self.track_lifetimes = enabled;
        self
    }

    /// Sets the prefix for computation names.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let config = CoreConfig::builder().name_prefix("sync").build().unwrap();
    /// assert_eq!(config.qualified_name("fetch"), "sync::fetch");
    /// ```
    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Sets the logging configuration installed by the runtime.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if validation fails.
    pub fn build(self) -> Result<CoreConfig> {
        let config = CoreConfig {
            abandon_policy: self.abandon_policy.unwrap_or_default(),
            track_lifetimes: self.track_lifetimes,
            name_prefix: self.name_prefix,
            logging: self.logging,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn test_build_with_defaults() {
        let config = CoreConfig::builder().build().unwrap();
        assert_eq!(config.abandon_policy, AbandonPolicy::KeepAlive);
        assert!(!config.track_lifetimes);
        assert!(config.name_prefix.is_none());
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_builder_with_all_fields() {
        let config = CoreConfig::builder()
            .abandon_policy(AbandonPolicy::Release)
            .track_lifetimes(true)
            .name_prefix("player")
            .logging(LoggingConfig::default().with_format(LogFormat::Compact))
            .build()
            .unwrap();

        assert_eq!(config.abandon_policy, AbandonPolicy::Release);
        assert!(config.track_lifetimes);
        assert_eq!(config.name_prefix.as_deref(), Some("player"));
        assert_eq!(config.logging.unwrap().format, LogFormat::Compact);
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let result = CoreConfig::builder().name_prefix("").build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_validate_rejects_whitespace_in_prefix() {
        let result = CoreConfig::builder().name_prefix("my player").build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("whitespace"));
    }

    #[test]
    fn test_validate_rejects_invalid_log_filter() {
        let result = CoreConfig::builder()
            .logging(LoggingConfig::default().with_filter("core_computation=loudest"))
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_qualified_name() {
        let plain = CoreConfig::default();
        assert_eq!(plain.qualified_name("fetch"), "fetch");

        let prefixed = CoreConfig::builder().name_prefix("sync").build().unwrap();
        assert_eq!(prefixed.qualified_name("fetch"), "sync::fetch");
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = CoreConfig::builder().track_lifetimes(true).build().unwrap();
        let cloned = config.clone();
        assert_eq!(cloned.track_lifetimes, config.track_lifetimes);
    }
}
