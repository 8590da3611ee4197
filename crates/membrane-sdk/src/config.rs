//! SDK configuration.
//!
//! Configuration is read once from the environment when the process-wide
//! manager is first touched, or supplied explicitly for tests.

use crate::error::SdkError;

/// Environment variable naming the membrane server endpoint.
pub const ENV_ADDRESS: &str = "MEMBRANE_ADDRESS";

/// Environment variable selecting the run mode.
pub const ENV_MODE: &str = "MEMBRANE_MODE";

const DEFAULT_ADDRESS: &str = "ws://127.0.0.1:50051";

/// How the process is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Normal operation: workers serve live traffic.
    #[default]
    Run,
    /// Build/discovery mode: the process only declares resources and the
    /// server hangs up on each worker right after registration.
    Build,
}

impl RunMode {
    /// Whether this is a build/discovery run.
    #[must_use]
    pub const fn is_build(self) -> bool {
        matches!(self, Self::Build)
    }
}

/// SDK configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkConfig {
    /// WebSocket URL of the membrane server, e.g. `ws://127.0.0.1:50051`.
    pub endpoint: String,
    /// Run mode.
    pub mode: RunMode,
}

impl SdkConfig {
    /// Create a config for the given endpoint in normal run mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a WebSocket URL.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SdkError> {
        let config = Self {
            endpoint: endpoint.into(),
            mode: RunMode::Run,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment.
    ///
    /// `MEMBRANE_ADDRESS` defaults to `ws://127.0.0.1:50051`;
    /// `MEMBRANE_MODE=build` selects build/discovery mode, any other value
    /// (or none) selects normal operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured endpoint is invalid.
    pub fn from_env() -> Result<Self, SdkError> {
        let endpoint =
            std::env::var(ENV_ADDRESS).unwrap_or_else(|_| DEFAULT_ADDRESS.to_string());
        let mode = match std::env::var(ENV_MODE) {
            Ok(v) if v.eq_ignore_ascii_case("build") => RunMode::Build,
            _ => RunMode::Run,
        };

        let config = Self { endpoint, mode };
        config.validate()?;
        Ok(config)
    }

    /// Switch the run mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or not `ws://`/`wss://`.
    pub fn validate(&self) -> Result<(), SdkError> {
        if self.endpoint.is_empty() {
            return Err(SdkError::Config("endpoint cannot be empty".to_string()));
        }

        if !self.endpoint.starts_with("ws://") && !self.endpoint.starts_with("wss://") {
            return Err(SdkError::Config(format!(
                "endpoint must be a ws:// or wss:// URL, got '{}'",
                self.endpoint
            )));
        }

        Ok(())
    }
}
