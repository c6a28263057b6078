//! HTTP control API client for Milo/oakOS devices
//!
//! This crate wraps the device's fixed REST API and defines the typed state
//! snapshots shared by the REST and WebSocket paths. Snapshots are immutable
//! and replace-on-update: every poll response or push event produces a
//! complete new [`DeviceState`] or [`VolumeState`], never a partial merge.
//!
//! Network and decode errors here are expected transient conditions on a
//! flaky local network. They are returned to the caller and logged, never
//! escalated; the client keeps a consecutive-failure count so its owner can
//! decide when to force a fresh connection cycle.
//!
//! # Example
//!
//! ```no_run
//! use milo_api::{ApiClient, AudioSource};
//!
//! # async fn example() -> milo_api::Result<()> {
//! let client = ApiClient::new("192.168.1.50".parse().unwrap(), 80)?;
//!
//! let state = client.get_audio_state().await?;
//! println!("Active source: {:?}", state.active_source);
//!
//! client.set_source(AudioSource::Bluetooth).await?;
//! client.set_volume(40, true).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod state;

pub use client::ApiClient;
pub use error::{ApiError, Result};
pub use state::{AudioSource, DeviceState, VolumeState};
