//! Controller configuration.

use std::net::IpAddr;
use std::time::Duration;

use milo_discovery::Browser;
use milo_stream::SessionConfig;

/// Configuration for a [`crate::MiloController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Device-name tokens matched against advertised instance names
    /// Default: ["milo", "oakos"]
    pub device_tokens: Vec<String>,

    /// Address used only when a matching advertisement resolves without a
    /// usable IPv4 address
    /// Default: none
    pub fallback_host: Option<IpAddr>,

    /// Port for the device's HTTP control API
    /// Default: 80
    pub http_port: u16,

    /// Port for the device's WebSocket endpoint
    /// Default: 80
    pub ws_port: u16,

    /// Delay between probe attempts against a discovered device
    /// Default: 2 seconds
    pub probe_interval: Duration,

    /// Probe attempts before the device is given up and discovery resumes
    /// Default: 20
    pub max_probe_attempts: u32,

    /// Delay before discovery restarts after an mDNS daemon failure
    /// Default: 5 seconds
    pub discovery_restart_delay: Duration,

    /// WebSocket session configuration
    pub session: SessionConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_tokens: Browser::default_tokens(),
            fallback_host: None,
            http_port: 80,
            ws_port: 80,
            probe_interval: Duration::from_secs(2),
            max_probe_attempts: 20,
            discovery_restart_delay: Duration::from_secs(5),
            session: SessionConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Create a ControllerConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<(), String> {
        if self.device_tokens.is_empty() {
            return Err("At least one device-name token is required".to_string());
        }

        if self.http_port == 0 || self.ws_port == 0 {
            return Err("Ports must be non-zero".to_string());
        }

        if self.probe_interval.is_zero() {
            return Err("Probe interval must be greater than 0".to_string());
        }

        if self.max_probe_attempts == 0 {
            return Err("Max probe attempts must be greater than 0".to_string());
        }

        self.session.validate()
    }

    pub fn with_device_tokens(mut self, tokens: Vec<String>) -> Self {
        self.device_tokens = tokens;
        self
    }

    pub fn with_fallback_host(mut self, host: IpAddr) -> Self {
        self.fallback_host = Some(host);
        self
    }

    pub fn with_ports(mut self, http_port: u16, ws_port: u16) -> Self {
        self.http_port = http_port;
        self.ws_port = ws_port;
        self
    }

    pub fn with_probe(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.probe_interval = interval;
        self.max_probe_attempts = max_attempts;
        self
    }

    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}
