//! Background worker thread for the sync facade.
//!
//! Spawns a thread with its own tokio runtime to run the async connection
//! supervisor while exposing sync channels to the parent [`crate::MiloController`].

use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::watch;

use crate::config::ControllerConfig;
use crate::event::{ConnectionState, ControllerEvent};
use crate::supervisor::Supervisor;

/// Commands sent from the sync MiloController to the background worker.
#[derive(Debug)]
pub(crate) enum Command {
    /// Tear down the session and force a fresh probe/connect cycle
    ResetSession,
    /// Shutdown the worker
    Shutdown,
}

/// Spawns the background worker thread.
///
/// The worker owns its own tokio runtime and bridges the supervisor's async
/// channels to the facade's sync ones.
pub(crate) fn spawn_worker(
    config: ControllerConfig,
    command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<ControllerEvent>,
    state_tx: watch::Sender<ConnectionState>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Failed to create tokio runtime for controller worker: {e}");
                return;
            }
        };

        rt.block_on(run_bridge(config, command_rx, event_tx, state_tx));
    })
}

/// Main bridge loop running inside the tokio runtime.
async fn run_bridge(
    config: ControllerConfig,
    command_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<ControllerEvent>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let (handle, mut events) = match Supervisor::spawn(config) {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!("Failed to start connection supervisor: {e}");
            return;
        }
    };

    let mut supervisor_state = handle.watch_state();
    let mut state_open = true;

    tracing::info!("Controller worker started");

    'bridge: loop {
        tokio::select! {
            // Forward supervisor events to the sync channel.
            event = events.recv() => match event {
                Some(event) => {
                    if event_tx.send(event).is_err() {
                        tracing::debug!("Event receiver dropped, shutting down worker");
                        break 'bridge;
                    }
                }
                None => {
                    tracing::info!("Supervisor ended, shutting down worker");
                    break 'bridge;
                }
            },

            // Mirror state transitions into the facade's watch channel.
            changed = supervisor_state.changed(), if state_open => {
                match changed {
                    Ok(()) => {
                        let state = supervisor_state.borrow_and_update().clone();
                        let _ = state_tx.send(state);
                    }
                    Err(_) => state_open = false,
                }
            },

            // Process commands (poll periodically).
            _ = tokio::time::sleep(Duration::from_millis(10)) => {
                loop {
                    match command_rx.try_recv() {
                        Ok(Command::ResetSession) => {
                            if handle.reset_session().is_err() {
                                tracing::warn!("Supervisor gone, shutting down worker");
                                break 'bridge;
                            }
                        }
                        Ok(Command::Shutdown) | Err(mpsc::TryRecvError::Disconnected) => {
                            break 'bridge;
                        }
                        Err(mpsc::TryRecvError::Empty) => break,
                    }
                }
            }
        }
    }

    handle.shutdown().await;
    tracing::info!("Controller worker shut down");
}
