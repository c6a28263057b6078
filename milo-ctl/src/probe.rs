//! HTTP readiness probing.
//!
//! The supervisor probes a discovered device's control API until it answers,
//! since mDNS advertisements routinely appear before the firmware's HTTP
//! server is ready to serve.

use std::net::IpAddr;

use async_trait::async_trait;
use milo_api::{ApiClient, ApiError};

/// Probes a device's HTTP API for readiness.
///
/// The supervisor talks to this trait rather than to [`ApiClient`] directly
/// so tests can script probe outcomes.
#[async_trait]
pub trait ApiProbe: Send + Sync {
    /// Check whether the device at `host:port` answers its state endpoint.
    async fn probe(&self, host: IpAddr, port: u16) -> Result<(), ApiError>;
}

/// Production probe over the device's REST API.
pub struct HttpProbe;

#[async_trait]
impl ApiProbe for HttpProbe {
    async fn probe(&self, host: IpAddr, port: u16) -> Result<(), ApiError> {
        ApiClient::new(host, port)?.probe().await
    }
}
