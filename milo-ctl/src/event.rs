//! Controller events and connection state.

use std::net::IpAddr;

use milo_api::{DeviceState, VolumeState};

/// Where the controller currently is in the connection lifecycle.
///
/// Published through a watch channel, so observers always see the latest
/// state without draining an event queue.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Browsing the local network for a matching device
    #[default]
    Discovering,
    /// A device was found; its HTTP API is being probed
    Probing {
        host: IpAddr,
        port: u16,
        attempt: u32,
    },
    /// The WebSocket session is up
    Connected { host: IpAddr, port: u16 },
    /// The session dropped; reconnection is in progress
    Disconnected,
}

impl ConnectionState {
    /// The connected device's address, if any.
    pub fn connected_host(&self) -> Option<IpAddr> {
        match self {
            ConnectionState::Connected { host, .. } => Some(*host),
            _ => None,
        }
    }
}

/// Events emitted by the connection supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// A matching device appeared on the network
    Found { name: String, host: IpAddr },
    /// The tracked device's advertisement disappeared
    Lost { name: String },
    /// The WebSocket session opened; fires once per established connection
    Connected { host: IpAddr, port: u16 },
    /// The session dropped; fires exactly once per genuine disconnection
    Disconnected,
    /// The device pushed a full state snapshot
    StateUpdate(DeviceState),
    /// The device pushed a volume snapshot
    VolumeUpdate(VolumeState),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_discovering() {
        assert_eq!(ConnectionState::default(), ConnectionState::Discovering);
    }

    #[test]
    fn connected_host_is_only_set_while_connected() {
        let host: IpAddr = "192.168.1.50".parse().unwrap();

        assert_eq!(ConnectionState::Discovering.connected_host(), None);
        assert_eq!(
            ConnectionState::Probing {
                host,
                port: 80,
                attempt: 1
            }
            .connected_host(),
            None
        );
        assert_eq!(
            ConnectionState::Connected { host, port: 80 }.connected_host(),
            Some(host)
        );
        assert_eq!(ConnectionState::Disconnected.connected_host(), None);
    }
}
