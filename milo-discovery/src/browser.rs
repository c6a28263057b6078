//! Continuous mDNS browsing.
//!
//! This module owns the mDNS daemon and feeds its advertisement events
//! through a [`DeviceTracker`], forwarding the resulting discovery events to
//! an mpsc channel. Browsing restarts automatically after a fixed delay when
//! the daemon or its event channel fails.

use std::net::IpAddr;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::DiscoveryError;
use crate::tracker::DeviceTracker;
use crate::{DiscoveryEvent, SERVICE_TYPE};

/// Default delay before browsing restarts after a daemon failure.
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);

/// Handle to a background browsing task.
///
/// The task runs until [`Browser::stop`] is called or the event receiver is
/// dropped. Each `Browser` performs a fresh browse of the local network, so
/// devices whose advertisements are already cached are reported again; the
/// connection supervisor relies on this when it resumes discovery.
pub struct Browser {
    task: JoinHandle<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl Browser {
    /// The default device-name tokens for Milo devices.
    pub fn default_tokens() -> Vec<String> {
        vec!["milo".to_string(), "oakos".to_string()]
    }

    /// Spawn a browsing task with the default restart delay.
    ///
    /// `fallback_host` is used only when a matching advertisement resolves
    /// without a usable IPv4 address.
    pub fn spawn(
        tokens: Vec<String>,
        fallback_host: Option<IpAddr>,
    ) -> (Self, mpsc::Receiver<DiscoveryEvent>) {
        Self::spawn_with(tokens, fallback_host, DEFAULT_RESTART_DELAY)
    }

    /// Spawn a browsing task with a custom restart delay.
    pub fn spawn_with(
        tokens: Vec<String>,
        fallback_host: Option<IpAddr>,
        restart_delay: Duration,
    ) -> (Self, mpsc::Receiver<DiscoveryEvent>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let task = tokio::spawn(browse_loop(
            tokens,
            fallback_host,
            restart_delay,
            event_tx,
            shutdown_rx,
        ));

        (Self { task, shutdown_tx }, event_rx)
    }

    /// Stop browsing and abort the background task.
    pub fn stop(self) {
        let _ = self.shutdown_tx.try_send(());
        self.task.abort();
    }
}

/// Outer loop: (re)create the daemon and browse until shutdown.
async fn browse_loop(
    tokens: Vec<String>,
    fallback_host: Option<IpAddr>,
    restart_delay: Duration,
    event_tx: mpsc::Sender<DiscoveryEvent>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut tracker = DeviceTracker::new(tokens);

    loop {
        match browse_once(&mut tracker, fallback_host, &event_tx, &mut shutdown_rx).await {
            BrowseExit::Shutdown => return,
            BrowseExit::Failed(reason) => {
                tracing::warn!("mDNS browse failed ({reason}), restarting in {restart_delay:?}");
                // The fresh browse re-resolves everything, so the tracked
                // device must count as a fresh find.
                tracker.reset();
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(restart_delay) => {}
            _ = shutdown_rx.recv() => return,
        }
    }
}

enum BrowseExit {
    Shutdown,
    Failed(DiscoveryError),
}

/// Run a single browse session until it fails or shutdown is requested.
async fn browse_once(
    tracker: &mut DeviceTracker,
    fallback_host: Option<IpAddr>,
    event_tx: &mpsc::Sender<DiscoveryEvent>,
    shutdown_rx: &mut mpsc::Receiver<()>,
) -> BrowseExit {
    let daemon = match ServiceDaemon::new() {
        Ok(daemon) => daemon,
        Err(e) => return BrowseExit::Failed(DiscoveryError::Daemon(e.to_string())),
    };

    let receiver = match daemon.browse(SERVICE_TYPE) {
        Ok(receiver) => receiver,
        Err(e) => {
            let _ = daemon.shutdown();
            return BrowseExit::Failed(DiscoveryError::Browse(e.to_string()));
        }
    };

    tracing::debug!("Browsing {SERVICE_TYPE} for Milo devices");

    let exit = loop {
        tokio::select! {
            event = receiver.recv_async() => {
                match event {
                    Ok(event) => {
                        if let Some(discovery_event) = handle_service_event(tracker, fallback_host, event) {
                            if event_tx.send(discovery_event).await.is_err() {
                                tracing::debug!("Discovery event receiver dropped, stopping browse");
                                break BrowseExit::Shutdown;
                            }
                        }
                    }
                    Err(e) => break BrowseExit::Failed(DiscoveryError::Browse(e.to_string())),
                }
            }
            _ = shutdown_rx.recv() => break BrowseExit::Shutdown,
        }
    };

    let _ = daemon.stop_browse(SERVICE_TYPE);
    let _ = daemon.shutdown();
    exit
}

/// Translate a raw mDNS event through the tracker.
fn handle_service_event(
    tracker: &mut DeviceTracker,
    fallback_host: Option<IpAddr>,
    event: ServiceEvent,
) -> Option<DiscoveryEvent> {
    match event {
        ServiceEvent::ServiceResolved(info) => {
            let name = instance_name(info.get_fullname());
            if !tracker.matches(&name) {
                return None;
            }

            // Prefer the address the advertisement actually resolved to. The
            // configured fallback covers advertisements with no usable IPv4.
            let host = info
                .get_addresses()
                .iter()
                .find(|addr| addr.is_ipv4())
                .copied()
                .or(fallback_host);

            let Some(host) = host else {
                tracing::warn!("Matching device {name} resolved without a usable address");
                return None;
            };

            let event = tracker.on_resolved(&name, host, info.get_port());
            if event.is_some() {
                tracing::info!("Discovered {name} at {host}:{}", info.get_port());
            }
            event
        }
        ServiceEvent::ServiceRemoved(_ty, fullname) => {
            let name = instance_name(&fullname);
            let event = tracker.on_removed(&name);
            if event.is_some() {
                tracing::info!("Lost {name}");
            }
            event
        }
        // Found-but-unresolved and search lifecycle notifications carry no
        // address information.
        _ => None,
    }
}

/// Strip the service-type suffix from an mDNS fullname.
///
/// "Milo Living Room._http._tcp.local." -> "Milo Living Room"
fn instance_name(fullname: &str) -> String {
    fullname
        .strip_suffix(SERVICE_TYPE)
        .map(|name| name.trim_end_matches('.'))
        .unwrap_or(fullname)
        .to_string()
}
