//! WebSocket event session for Milo/oakOS devices
//!
//! This crate maintains a persistent WebSocket session against a device's
//! `/ws` endpoint. The session:
//!
//! - sends periodic pings and tracks the last time any inbound traffic was
//!   seen, force-closing sockets that are transport-open but dead end-to-end
//! - parses inbound JSON frames into typed state and volume snapshots
//! - reconnects automatically with exponential backoff, bounded by a
//!   configurable attempt budget
//! - reports its lifecycle (`Opened`, `Dropped`, `Failed`) over an event
//!   channel, firing `Dropped` exactly once per genuine disconnection no
//!   matter how many failure signals race
//!
//! The socket layer is behind the [`Connector`]/[`Socket`] traits so the
//! session loop can be exercised in tests with scripted sockets.
//!
//! # Example
//!
//! ```no_run
//! use milo_stream::{SessionConfig, SessionEvent, WsSession};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> milo_stream::Result<()> {
//! let session = WsSession::new("192.168.1.50".parse().unwrap(), 80, SessionConfig::default())?;
//! let (event_tx, mut event_rx) = mpsc::channel(64);
//! let (_stop_tx, stop_rx) = mpsc::channel(1);
//!
//! tokio::spawn(session.run(event_tx, stop_rx));
//!
//! while let Some(event) = event_rx.recv().await {
//!     match event {
//!         SessionEvent::Opened => println!("connected"),
//!         SessionEvent::Volume(v) => println!("volume {}", v.volume),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod frame;
mod session;
mod socket;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use frame::{parse_frame, FrameError, PushEvent};
pub use session::{backoff_delay, WsSession};
pub use socket::{Connector, Message, Socket, TungsteniteConnector};

use milo_api::{DeviceState, VolumeState};

/// Events emitted by a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The socket opened and the session is live
    Opened,
    /// The session lost its socket and will retry (subject to the backoff
    /// and attempt budget)
    Dropped(DropReason),
    /// The reconnect budget is exhausted; the session has stopped
    Failed,
    /// A device state snapshot arrived
    State(DeviceState),
    /// A volume snapshot arrived
    Volume(VolumeState),
}

/// Why a live session lost its socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The peer closed the socket or the stream ended
    SocketClosed,
    /// A ping could not be sent
    PingFailed,
    /// No inbound traffic within the silence window
    SilenceTimeout,
    /// A receive error from the transport
    Receive(String),
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::SocketClosed => write!(f, "socket closed"),
            DropReason::PingFailed => write!(f, "ping failed"),
            DropReason::SilenceTimeout => write!(f, "silence timeout"),
            DropReason::Receive(e) => write!(f, "receive error: {e}"),
        }
    }
}
