//! Sync-first Milo/oakOS controller
//!
//! Ties the discovery, API, and streaming crates together into a single
//! connection lifecycle: browse the local network for a Milo device, probe
//! its HTTP API until the firmware is ready, then hold a WebSocket session
//! open with ping/silence supervision and automatic reconnection.
//!
//! The async machinery runs on a background thread; [`MiloController`]
//! exposes a fully synchronous API suitable for embedding in GUI frontends.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use milo_ctl::{ControllerEvent, MiloController};
//!
//! let controller = MiloController::new()?;
//!
//! for event in controller.iter() {
//!     match event {
//!         ControllerEvent::Connected { host, .. } => {
//!             println!("Connected to {host}");
//!             if let Some(api) = controller.api() {
//!                 // issue control calls from any async runtime
//!             }
//!         }
//!         ControllerEvent::StateUpdate(state) => {
//!             println!("Source: {:?}", state.active_source);
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! Applications that already run a tokio runtime can skip the facade and
//! drive [`Supervisor`] directly.

pub mod config;
pub mod error;
pub mod event;
pub mod iter;
pub mod logging;
pub mod manager;
pub mod probe;
pub mod supervisor;

mod worker;

pub use config::ControllerConfig;
pub use error::{ControllerError, Result};
pub use event::{ConnectionState, ControllerEvent};
pub use iter::ControllerEventIter;
pub use manager::MiloController;
pub use probe::{ApiProbe, HttpProbe};
pub use supervisor::{DiscoverySource, DiscoveryStop, MdnsDiscovery, Supervisor, SupervisorHandle};

// Re-export the member crates' core types so most applications only need
// this crate.
pub use milo_api::{ApiClient, ApiError, AudioSource, DeviceState, VolumeState};
pub use milo_discovery::{Device, DiscoveryEvent};
pub use milo_stream::{DropReason, SessionConfig};

/// Commonly used types for controller applications.
pub mod prelude {
    pub use crate::config::ControllerConfig;
    pub use crate::error::{ControllerError, Result};
    pub use crate::event::{ConnectionState, ControllerEvent};
    pub use crate::manager::MiloController;
    pub use milo_api::{ApiClient, AudioSource, DeviceState, VolumeState};
}
