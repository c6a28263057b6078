//! The connection supervisor.
//!
//! Drives the whole lifecycle against a single device: browse the network
//! until a matching device appears, probe its HTTP API until the firmware is
//! ready, then hold a WebSocket session open. Every phase transition is
//! published as a [`ControllerEvent`] and mirrored into a watch channel as
//! the current [`ConnectionState`].

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use milo_discovery::{Browser, Device, DiscoveryEvent};
use milo_stream::{Connector, SessionEvent, TungsteniteConnector, WsSession};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::ControllerConfig;
use crate::error::{ControllerError, Result};
use crate::event::{ConnectionState, ControllerEvent};
use crate::probe::{ApiProbe, HttpProbe};

/// Commands accepted by a running supervisor.
#[derive(Debug)]
enum Command {
    ResetSession,
    Shutdown,
}

/// Starts device discovery.
///
/// The supervisor talks to this trait rather than to [`Browser`] directly so
/// tests can script advertisement sequences.
pub trait DiscoverySource: Send + Sync {
    /// Begin browsing; returns a stop handle and the event stream.
    fn start(&self) -> (Box<dyn DiscoveryStop>, mpsc::Receiver<DiscoveryEvent>);
}

/// Stops a running discovery browse.
pub trait DiscoveryStop: Send {
    fn stop(self: Box<Self>);
}

impl DiscoveryStop for Browser {
    fn stop(self: Box<Self>) {
        Browser::stop(*self);
    }
}

/// Production discovery over mDNS.
pub struct MdnsDiscovery {
    tokens: Vec<String>,
    fallback_host: Option<IpAddr>,
    restart_delay: Duration,
}

impl MdnsDiscovery {
    pub fn new(
        tokens: Vec<String>,
        fallback_host: Option<IpAddr>,
        restart_delay: Duration,
    ) -> Self {
        Self {
            tokens,
            fallback_host,
            restart_delay,
        }
    }
}

impl DiscoverySource for MdnsDiscovery {
    fn start(&self) -> (Box<dyn DiscoveryStop>, mpsc::Receiver<DiscoveryEvent>) {
        let (browser, events) = Browser::spawn_with(
            self.tokens.clone(),
            self.fallback_host,
            self.restart_delay,
        );
        (Box::new(browser), events)
    }
}

/// The connection supervisor task.
///
/// Spawned onto the current tokio runtime; controlled through the returned
/// [`SupervisorHandle`].
pub struct Supervisor;

impl Supervisor {
    /// Spawn a supervisor with production discovery, probing, and transport.
    pub fn spawn(
        config: ControllerConfig,
    ) -> Result<(SupervisorHandle, mpsc::Receiver<ControllerEvent>)> {
        let connector: Arc<dyn Connector> =
            Arc::new(TungsteniteConnector::new(config.session.connect_timeout));
        let discovery = Arc::new(MdnsDiscovery::new(
            config.device_tokens.clone(),
            config.fallback_host,
            config.discovery_restart_delay,
        ));
        Self::spawn_with(config, Arc::new(HttpProbe), connector, discovery)
    }

    /// Spawn a supervisor with explicit dependencies (used by tests).
    pub fn spawn_with(
        config: ControllerConfig,
        probe: Arc<dyn ApiProbe>,
        connector: Arc<dyn Connector>,
        discovery: Arc<dyn DiscoverySource>,
    ) -> Result<(SupervisorHandle, mpsc::Receiver<ControllerEvent>)> {
        config
            .validate()
            .map_err(ControllerError::InvalidConfig)?;

        let (event_tx, event_rx) = mpsc::channel(64);
        let (command_tx, command_rx) = mpsc::channel(8);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Discovering);

        let task = tokio::spawn(run_supervisor(
            config, probe, connector, discovery, event_tx, command_rx, state_tx,
        ));

        Ok((
            SupervisorHandle {
                commands: command_tx,
                state: state_rx,
                task,
            },
            event_rx,
        ))
    }
}

/// Handle to a running supervisor task.
pub struct SupervisorHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Snapshot of the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// A watch receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Tear down the current session and force a fresh probe/connect cycle.
    pub fn reset_session(&self) -> Result<()> {
        self.commands
            .try_send(Command::ResetSession)
            .map_err(|_| ControllerError::WorkerDisconnected)
    }

    /// Stop the supervisor and wait for it to wind down.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

async fn run_supervisor(
    config: ControllerConfig,
    probe: Arc<dyn ApiProbe>,
    connector: Arc<dyn Connector>,
    discovery: Arc<dyn DiscoverySource>,
    events: mpsc::Sender<ControllerEvent>,
    mut commands: mpsc::Receiver<Command>,
    state: watch::Sender<ConnectionState>,
) {
    loop {
        let (stopper, mut disc_rx) = discovery.start();
        state.send_replace(ConnectionState::Discovering);
        tracing::info!("Discovering devices");

        // Wait for a matching device.
        let device = loop {
            tokio::select! {
                event = disc_rx.recv() => match event {
                    Some(DiscoveryEvent::Found(device)) => {
                        let found = ControllerEvent::Found {
                            name: device.name.clone(),
                            host: device.host,
                        };
                        if events.send(found).await.is_err() {
                            stopper.stop();
                            return;
                        }
                        break device;
                    }
                    Some(DiscoveryEvent::Lost { .. }) => {}
                    None => {
                        tracing::warn!("Discovery stream ended, stopping supervisor");
                        return;
                    }
                },
                command = commands.recv() => match command {
                    // Nothing to reset before a device is found.
                    Some(Command::ResetSession) => {}
                    Some(Command::Shutdown) | None => {
                        stopper.stop();
                        return;
                    }
                },
            }
        };

        // Probe with the browser still running so a Lost advertisement can
        // abort the attempt loop.
        let mut outcome =
            probe_device(&config, &probe, &events, &state, &mut commands, &mut disc_rx, &device)
                .await;
        stopper.stop();

        loop {
            match outcome {
                ProbeOutcome::Success => {}
                ProbeOutcome::DeviceLost | ProbeOutcome::Exhausted => break,
                ProbeOutcome::Shutdown => return,
            }

            match run_session(&config, &connector, &events, &state, &mut commands, &device).await
            {
                SessionOutcome::Failed => break,
                SessionOutcome::Shutdown => return,
                SessionOutcome::Reset => {
                    // Reprobe the same device before reconnecting. Discovery
                    // stays down; the device is presumed still present.
                    outcome = probe_device(
                        &config,
                        &probe,
                        &events,
                        &state,
                        &mut commands,
                        &mut disc_rx,
                        &device,
                    )
                    .await;
                }
            }
        }
    }
}

enum ProbeOutcome {
    /// The device answered; hand over to the session
    Success,
    /// The device's advertisement disappeared mid-probe
    DeviceLost,
    /// The attempt budget is spent; resume discovery
    Exhausted,
    Shutdown,
}

/// Probe a device's HTTP API until it answers or the attempt budget is spent.
///
/// Exactly one probe request is in flight at a time: the next attempt starts
/// only after the previous one resolves and the probe interval elapses.
async fn probe_device(
    config: &ControllerConfig,
    probe: &Arc<dyn ApiProbe>,
    events: &mpsc::Sender<ControllerEvent>,
    state: &watch::Sender<ConnectionState>,
    commands: &mut mpsc::Receiver<Command>,
    disc_rx: &mut mpsc::Receiver<DiscoveryEvent>,
    device: &Device,
) -> ProbeOutcome {
    let host = device.host;
    let port = config.http_port;
    let mut discovery_open = true;

    for attempt in 1..=config.max_probe_attempts {
        state.send_replace(ConnectionState::Probing {
            host,
            port,
            attempt,
        });

        let probing = probe.probe(host, port);
        tokio::pin!(probing);

        let result = loop {
            tokio::select! {
                result = &mut probing => break result,
                event = disc_rx.recv(), if discovery_open => match event {
                    Some(DiscoveryEvent::Lost { name }) => {
                        tracing::info!("Device {name} disappeared while probing");
                        let _ = events.send(ControllerEvent::Lost { name }).await;
                        return ProbeOutcome::DeviceLost;
                    }
                    Some(DiscoveryEvent::Found(_)) => {}
                    None => discovery_open = false,
                },
                command = commands.recv() => match command {
                    Some(Command::ResetSession) => {}
                    Some(Command::Shutdown) | None => return ProbeOutcome::Shutdown,
                },
            }
        };

        match result {
            Ok(()) => {
                tracing::info!("Device at {host}:{port} answered probe attempt {attempt}");
                return ProbeOutcome::Success;
            }
            Err(e) => {
                tracing::debug!(
                    "Probe attempt {attempt}/{} against {host}:{port} failed: {e}",
                    config.max_probe_attempts
                );
            }
        }

        if attempt < config.max_probe_attempts {
            let pause = tokio::time::sleep(config.probe_interval);
            tokio::pin!(pause);

            loop {
                tokio::select! {
                    _ = &mut pause => break,
                    event = disc_rx.recv(), if discovery_open => match event {
                        Some(DiscoveryEvent::Lost { name }) => {
                            tracing::info!("Device {name} disappeared while probing");
                            let _ = events.send(ControllerEvent::Lost { name }).await;
                            return ProbeOutcome::DeviceLost;
                        }
                        Some(DiscoveryEvent::Found(_)) => {}
                        None => discovery_open = false,
                    },
                    command = commands.recv() => match command {
                        Some(Command::ResetSession) => {}
                        Some(Command::Shutdown) | None => return ProbeOutcome::Shutdown,
                    },
                }
            }
        }
    }

    tracing::warn!(
        "Device at {host}:{port} never answered after {} probes, resuming discovery",
        config.max_probe_attempts
    );
    ProbeOutcome::Exhausted
}

enum SessionOutcome {
    /// The session spent its reconnect budget; resume discovery
    Failed,
    /// A reset was requested; reprobe the device
    Reset,
    Shutdown,
}

/// Hold a WebSocket session against the device, translating session events
/// into controller events.
///
/// `Connected` fires once per established connection and `Disconnected`
/// exactly once per genuine disconnection; the session's internal reconnect
/// attempts produce no events until one succeeds or the budget is spent.
async fn run_session(
    config: &ControllerConfig,
    connector: &Arc<dyn Connector>,
    events: &mpsc::Sender<ControllerEvent>,
    state: &watch::Sender<ConnectionState>,
    commands: &mut mpsc::Receiver<Command>,
    device: &Device,
) -> SessionOutcome {
    let host = device.host;
    let port = config.ws_port;

    let url = match Url::parse(&format!("ws://{host}:{port}/ws")) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Invalid WebSocket URL for {host}:{port}: {e}");
            return SessionOutcome::Failed;
        }
    };

    let session = WsSession::with_connector(url, config.session.clone(), Arc::clone(connector));
    let (session_tx, mut session_rx) = mpsc::channel(64);
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let task = tokio::spawn(session.run(session_tx, stop_rx));

    let mut connected = false;
    let outcome = loop {
        tokio::select! {
            event = session_rx.recv() => match event {
                Some(SessionEvent::Opened) => {
                    connected = true;
                    state.send_replace(ConnectionState::Connected { host, port });
                    if events
                        .send(ControllerEvent::Connected { host, port })
                        .await
                        .is_err()
                    {
                        break SessionOutcome::Shutdown;
                    }
                }
                Some(SessionEvent::Dropped(reason)) => {
                    tracing::warn!("Session to {host} dropped: {reason}");
                    if connected {
                        connected = false;
                        state.send_replace(ConnectionState::Disconnected);
                        if events.send(ControllerEvent::Disconnected).await.is_err() {
                            break SessionOutcome::Shutdown;
                        }
                    }
                }
                Some(SessionEvent::State(snapshot)) => {
                    if events
                        .send(ControllerEvent::StateUpdate(snapshot))
                        .await
                        .is_err()
                    {
                        break SessionOutcome::Shutdown;
                    }
                }
                Some(SessionEvent::Volume(volume)) => {
                    if events
                        .send(ControllerEvent::VolumeUpdate(volume))
                        .await
                        .is_err()
                    {
                        break SessionOutcome::Shutdown;
                    }
                }
                Some(SessionEvent::Failed) | None => {
                    tracing::warn!("Session to {host} gave up, resuming discovery");
                    break SessionOutcome::Failed;
                }
            },
            command = commands.recv() => match command {
                Some(Command::ResetSession) => {
                    tracing::info!("Session reset requested");
                    if connected {
                        state.send_replace(ConnectionState::Disconnected);
                        let _ = events.send(ControllerEvent::Disconnected).await;
                    }
                    break SessionOutcome::Reset;
                }
                Some(Command::Shutdown) | None => break SessionOutcome::Shutdown,
            },
        }
    };

    let _ = stop_tx.try_send(());
    task.abort();
    outcome
}
