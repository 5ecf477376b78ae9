//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("Heartbeat interval must be at least one second")]
    InvalidHeartbeatInterval,

    #[error("Idle timeout ({idle}s) must exceed the heartbeat interval ({heartbeat}s)")]
    IdleTimeoutTooShort { idle: u64, heartbeat: u64 },

    #[error("Channel capacity must be positive")]
    InvalidChannelCapacity,
}
