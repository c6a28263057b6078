//! Milo/oakOS device discovery library
//!
//! This crate browses `_http._tcp` service advertisements on the local
//! network via mDNS and reports Milo devices as they appear and disappear.
//! Matching is a case-insensitive substring check of the advertised instance
//! name against a list of device-name tokens ("milo", "oakos" by default).
//!
//! # Quick Start
//!
//! ```no_run
//! use milo_discovery::{Browser, DiscoveryEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (browser, mut events) = Browser::spawn(Browser::default_tokens(), None);
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             DiscoveryEvent::Found(device) => {
//!                 println!("Found {} at {}:{}", device.name, device.host, device.port);
//!             }
//!             DiscoveryEvent::Lost { name } => {
//!                 println!("Lost {}", name);
//!             }
//!         }
//!     }
//!
//!     browser.stop();
//! }
//! ```

mod browser;
mod error;
mod tracker;

pub use browser::Browser;
pub use error::{DiscoveryError, Result};
pub use tracker::DeviceTracker;

use std::net::IpAddr;

/// Service type browsed on the local network.
pub const SERVICE_TYPE: &str = "_http._tcp.local.";

/// A resolved candidate device on the local network.
///
/// Carries everything the connection supervisor needs to start probing the
/// device's HTTP API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Advertised instance name, e.g. "Milo Living Room"
    pub name: String,
    /// Resolved address from the advertisement
    pub host: IpAddr,
    /// Advertised port
    pub port: u16,
}

/// Events emitted during device discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A matching device appeared and is now tracked
    Found(Device),
    /// The tracked device's advertisement was removed
    Lost {
        /// Instance name of the device that disappeared
        name: String,
    },
}
