//! Sync-first Milo controller
//!
//! Provides a fully synchronous API over the async connection supervisor.
//! All async machinery is hidden in a background worker thread.

use std::net::IpAddr;
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use milo_api::ApiClient;
use tokio::sync::watch;

use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::event::{ConnectionState, ControllerEvent};
use crate::iter::ControllerEventIter;
use crate::worker::{spawn_worker, Command};

/// Sync-first controller for a Milo device.
///
/// Owns the whole connection lifecycle in a background thread and exposes a
/// blocking API: query the connection state, iterate events, issue control
/// calls through [`api`](Self::api). All methods are non-async.
///
/// # Example
///
/// ```rust,ignore
/// use milo_ctl::{ControllerEvent, MiloController};
///
/// // Create controller (sync - no .await!)
/// let controller = MiloController::new()?;
///
/// // Iterate over lifecycle events (blocking)
/// for event in controller.iter() {
///     match event {
///         ControllerEvent::Connected { host, .. } => println!("Connected to {host}"),
///         ControllerEvent::VolumeUpdate(volume) => println!("Volume: {}", volume.volume),
///         _ => {}
///     }
/// }
/// ```
#[derive(Debug)]
pub struct MiloController {
    /// Configuration the worker was started with
    config: ControllerConfig,

    /// Send commands to the background worker
    command_tx: mpsc::Sender<Command>,

    /// Receive events from the background worker
    event_rx: Arc<Mutex<mpsc::Receiver<ControllerEvent>>>,

    /// Latest connection state, mirrored from the supervisor
    state_rx: watch::Receiver<ConnectionState>,

    /// Cached REST client for the connected host
    api_client: Mutex<Option<(IpAddr, ApiClient)>>,

    /// Background worker handle (kept alive)
    _worker: JoinHandle<()>,
}

impl MiloController {
    /// Create a controller with default configuration.
    ///
    /// This is a synchronous operation - no `.await` required. Discovery
    /// starts immediately on the background thread.
    pub fn new() -> Result<Self> {
        Self::with_config(ControllerConfig::default())
    }

    /// Create a controller with custom configuration.
    pub fn with_config(config: ControllerConfig) -> Result<Self> {
        config
            .validate()
            .map_err(ControllerError::InvalidConfig)?;

        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Discovering);

        let worker = spawn_worker(config.clone(), command_rx, event_tx, state_tx);

        Ok(Self {
            config,
            command_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            state_rx,
            api_client: Mutex::new(None),
            _worker: worker,
        })
    }

    /// Snapshot of the current connection state (sync).
    pub fn state(&self) -> ConnectionState {
        self.state_rx.borrow().clone()
    }

    /// Address of the connected device, if a session is up (sync).
    pub fn connected_host(&self) -> Option<IpAddr> {
        self.state().connected_host()
    }

    /// REST client for the connected device, if a session is up (sync).
    ///
    /// The client targets the configured HTTP port on the connected host.
    /// Returns `None` while no device is connected. The client is cached per
    /// host, so clones handed out here share one consecutive-failure counter
    /// and the reset-session heuristic can accumulate across calls.
    pub fn api(&self) -> Option<ApiClient> {
        let host = self.connected_host()?;
        self.cached_api(host)
    }

    fn cached_api(&self, host: IpAddr) -> Option<ApiClient> {
        let mut cached = self.api_client.lock().ok()?;
        if let Some((cached_host, client)) = cached.as_ref() {
            if *cached_host == host {
                return Some(client.clone());
            }
        }

        let client = ApiClient::new(host, self.config.http_port).ok()?;
        *cached = Some((host, client.clone()));
        Some(client)
    }

    /// Tear down the current session and force a fresh probe/connect cycle
    /// (sync).
    ///
    /// Used when the device looks wedged, for example after repeated REST
    /// failures reported by [`ApiClient::consecutive_failures`].
    pub fn reset_session(&self) -> Result<()> {
        self.command_tx
            .send(Command::ResetSession)
            .map_err(|_| ControllerError::WorkerDisconnected)
    }

    /// Get a blocking iterator over controller events.
    ///
    /// Returns an iterator that blocks on `next()` until an event is
    /// available. Use `try_recv()` for non-blocking access.
    pub fn iter(&self) -> ControllerEventIter {
        ControllerEventIter::new(Arc::clone(&self.event_rx))
    }

    /// Shutdown the background worker.
    ///
    /// Called automatically on drop, but can be called manually for graceful
    /// shutdown.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }
}

impl Drop for MiloController {
    fn drop(&mut self) {
        let _ = self.command_tx.send(Command::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        let config = ControllerConfig::default().with_device_tokens(vec![]);
        let err = MiloController::with_config(config).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
    }

    #[test]
    fn controller_starts_in_discovering_state() {
        let controller = MiloController::new().unwrap();
        assert_eq!(controller.state(), ConnectionState::Discovering);
        assert_eq!(controller.connected_host(), None);
        assert!(controller.api().is_none());
        assert!(controller.iter().try_recv().is_none());
    }

    #[test]
    fn reset_is_accepted_while_discovering() {
        let controller = MiloController::new().unwrap();
        controller.reset_session().unwrap();
        controller.shutdown();
    }

    #[tokio::test]
    async fn api_clients_share_one_failure_counter_per_host() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/audio/state")
            .with_status(500)
            .create_async()
            .await;

        let url = url::Url::parse(&server.url()).unwrap();
        let port = url.port().unwrap_or(80);
        let host: IpAddr = "127.0.0.1".parse().unwrap();

        let config = ControllerConfig::default().with_ports(port, port);
        let controller = MiloController::with_config(config).unwrap();

        let client = controller.cached_api(host).unwrap();
        assert_eq!(client.consecutive_failures(), 0);
        let _ = client.probe().await;
        assert_eq!(client.consecutive_failures(), 1);

        // A later retrieval sees the accumulated count, not a fresh client.
        let again = controller.cached_api(host).unwrap();
        assert_eq!(again.consecutive_failures(), 1);

        controller.shutdown();
    }
}
