//! Live session configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Heartbeat, idle and buffering settings for chart sessions
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// How often participants send `keep_connection`
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,

    /// Silence after which a connection is closed
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Buffer size of session and connection channels
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl SessionConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(ValidationError::InvalidHeartbeatInterval);
        }
        if self.idle_timeout_secs <= self.heartbeat_interval_secs {
            return Err(ValidationError::IdleTimeoutTooShort {
                idle: self.idle_timeout_secs,
                heartbeat: self.heartbeat_interval_secs,
            });
        }
        if self.channel_capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval(),
            idle_timeout_secs: default_idle_timeout(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_heartbeat_interval() -> u64 {
    20
}

fn default_idle_timeout() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    128
}
