//! Session configuration.

use std::time::Duration;

/// Configuration for a [`crate::WsSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between outbound pings
    /// Default: 10 seconds
    pub ping_interval: Duration,

    /// Maximum tolerated gap without any inbound traffic (including pongs)
    /// before the socket is treated as dead
    /// Default: 30 seconds
    pub silence_timeout: Duration,

    /// Timeout for establishing a connection and completing the handshake
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Reconnect attempts before the session gives up and reports failure
    /// Default: 5
    pub max_reconnect_attempts: u32,

    /// Base delay for exponential reconnect backoff
    /// Default: 1 second
    pub backoff_base: Duration,

    /// Ceiling for the reconnect backoff delay
    /// Default: 30 seconds
    pub backoff_cap: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(10),
            silence_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
            max_reconnect_attempts: 5,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(30),
        }
    }
}

impl SessionConfig {
    /// Create a SessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.ping_interval.is_zero() {
            return Err("Ping interval must be greater than 0".to_string());
        }

        if self.silence_timeout <= self.ping_interval {
            return Err(
                "Silence timeout must be greater than the ping interval".to_string(),
            );
        }

        if self.backoff_base.is_zero() {
            return Err("Backoff base must be greater than 0".to_string());
        }

        if self.backoff_cap < self.backoff_base {
            return Err("Backoff cap must be at least the backoff base".to_string());
        }

        if self.max_reconnect_attempts == 0 {
            return Err("Max reconnect attempts must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    pub fn with_silence_timeout(mut self, timeout: Duration) -> Self {
        self.silence_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }
}
