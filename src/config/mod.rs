//! Application configuration module
//!
//! Configuration is read from environment variables with the `VALUECHART`
//! prefix; nested values are separated by double underscores. Every value
//! has a default, so an empty environment yields a runnable server.
//!
//! # Example
//!
//! ```no_run
//! use valuechart::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod error;
mod server;
mod session;

pub use error::{ConfigError, ValidationError};
pub use server::{Environment, LogFormat, ServerConfig};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from the environment
    ///
    /// - `VALUECHART__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `VALUECHART__SESSION__IDLE_TIMEOUT_SECS=90` -> `session.idle_timeout_secs = 90`
    ///
    /// A `.env` file is read first when present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("VALUECHART")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.session.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("VALUECHART__SERVER__PORT");
        env::remove_var("VALUECHART__SERVER__ENVIRONMENT");
        env::remove_var("VALUECHART__SESSION__IDLE_TIMEOUT_SECS");
    }

    #[test]
    fn test_load_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.session, SessionConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("VALUECHART__SERVER__PORT", "3000");
        env::set_var("VALUECHART__SERVER__ENVIRONMENT", "production");
        env::set_var("VALUECHART__SESSION__IDLE_TIMEOUT_SECS", "90");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert_eq!(config.session.idle_timeout_secs, 90);
    }
}
