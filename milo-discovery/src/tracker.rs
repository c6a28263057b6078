//! Device tracking logic, separated from the mDNS plumbing.
//!
//! The tracker decides which advertisement events are interesting: it filters
//! by name token, tracks at most one device at a time, and translates raw
//! resolved/removed events into `Found`/`Lost` discovery events.

use std::net::IpAddr;

use crate::{Device, DiscoveryEvent};

/// Tracks the single device the controller cares about.
///
/// Invariant: the tracked name is non-`None` iff a matching advertisement has
/// arrived and no removal for it has since arrived.
#[derive(Debug)]
pub struct DeviceTracker {
    tokens: Vec<String>,
    tracked: Option<String>,
}

impl DeviceTracker {
    /// Create a tracker matching against the given name tokens.
    ///
    /// Tokens are compared case-insensitively as substrings of the advertised
    /// instance name.
    pub fn new(tokens: Vec<String>) -> Self {
        let tokens = tokens.into_iter().map(|t| t.to_lowercase()).collect();
        Self {
            tokens,
            tracked: None,
        }
    }

    /// Name of the currently tracked device, if any.
    pub fn tracked(&self) -> Option<&str> {
        self.tracked.as_deref()
    }

    /// Whether an instance name matches any configured token.
    pub fn matches(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.tokens.iter().any(|token| lower.contains(token))
    }

    /// Handle a resolved advertisement.
    ///
    /// Returns `Found` for the first qualifying match while nothing is
    /// tracked. Repeated resolutions of the tracked device (TTL refreshes,
    /// address changes) and non-matching devices produce nothing.
    pub fn on_resolved(&mut self, name: &str, host: IpAddr, port: u16) -> Option<DiscoveryEvent> {
        if !self.matches(name) {
            return None;
        }
        if self.tracked.is_some() {
            return None;
        }

        self.tracked = Some(name.to_string());
        Some(DiscoveryEvent::Found(Device {
            name: name.to_string(),
            host,
            port,
        }))
    }

    /// Handle a removed advertisement.
    ///
    /// Returns `Lost` and clears tracking when the removed name is the
    /// tracked device; anything else is ignored.
    pub fn on_removed(&mut self, name: &str) -> Option<DiscoveryEvent> {
        if self.tracked.as_deref() != Some(name) {
            return None;
        }

        self.tracked = None;
        Some(DiscoveryEvent::Lost {
            name: name.to_string(),
        })
    }

    /// Forget the tracked device without emitting an event.
    ///
    /// Used when the supervisor resumes discovery after a failed probe or a
    /// dead session and wants the next advertisement to count as a fresh find.
    pub fn reset(&mut self) {
        self.tracked = None;
    }
}
