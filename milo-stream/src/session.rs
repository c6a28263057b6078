//! The session loop: connect, supervise, reconnect.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use url::Url;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::frame::{parse_frame, PushEvent};
use crate::socket::{Connector, Message, Socket, TungsteniteConnector};
use crate::{DropReason, SessionEvent};

/// Compute the reconnect delay for a failed attempt.
///
/// Doubles from `base` per attempt and saturates at `cap`, so the delay is
/// monotonically non-decreasing across consecutive failures. `attempt`
/// starts at 1.
pub fn backoff_delay(base: Duration, cap: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.saturating_mul(1u32 << exponent).min(cap)
}

/// A persistent WebSocket session against a device.
///
/// `run` owns the socket for its whole life: it connects, drives the open
/// socket (pings, silence checks, frame parsing), and reconnects with
/// exponential backoff until the attempt budget is spent or a stop signal
/// arrives. All outcomes are reported as [`SessionEvent`]s.
pub struct WsSession {
    url: Url,
    config: SessionConfig,
    connector: Arc<dyn Connector>,
}

enum DriveExit {
    /// Stop requested or the event receiver is gone
    Stop,
    /// The socket died; carries the single winning reason
    Dropped(DropReason),
}

impl WsSession {
    /// Create a session against `ws://host:port/ws` with the production
    /// connector.
    pub fn new(host: IpAddr, port: u16, config: SessionConfig) -> Result<Self> {
        let url = Url::parse(&format!("ws://{host}:{port}/ws"))
            .map_err(|e| SessionError::InvalidUrl(e.to_string()))?;
        let connector = Arc::new(TungsteniteConnector::new(config.connect_timeout));
        Ok(Self::with_connector(url, config, connector))
    }

    /// Create a session with an explicit connector (used by tests).
    pub fn with_connector(url: Url, config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            url,
            config,
            connector,
        }
    }

    /// Run the session until the reconnect budget is spent or `stop` fires.
    ///
    /// Emits `Opened` after each successful handshake, `Dropped(reason)`
    /// exactly once per genuine disconnection, and `Failed` when
    /// `max_reconnect_attempts` consecutive attempts have failed. A
    /// successful open resets the attempt counter.
    pub async fn run(self, events: mpsc::Sender<SessionEvent>, mut stop: mpsc::Receiver<()>) {
        let mut attempt: u32 = 0;

        loop {
            let connected = tokio::select! {
                connected = self.connector.connect(&self.url) => connected,
                _ = stop.recv() => return,
            };

            match connected {
                Ok(mut socket) => {
                    attempt = 0;
                    tracing::info!("WebSocket session open: {}", self.url);
                    if events.send(SessionEvent::Opened).await.is_err() {
                        socket.close().await;
                        return;
                    }

                    let exit = drive(socket.as_mut(), &self.config, &events, &mut stop).await;
                    socket.close().await;

                    match exit {
                        DriveExit::Stop => return,
                        DriveExit::Dropped(reason) => {
                            tracing::warn!("WebSocket session dropped: {reason}");
                            if events.send(SessionEvent::Dropped(reason)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!("WebSocket connect failed: {e}");
                }
            }

            attempt += 1;
            if attempt > self.config.max_reconnect_attempts {
                tracing::warn!(
                    "Giving up after {} reconnect attempts",
                    self.config.max_reconnect_attempts
                );
                let _ = events.send(SessionEvent::Failed).await;
                return;
            }

            let delay = backoff_delay(self.config.backoff_base, self.config.backoff_cap, attempt);
            tracing::debug!(
                "Reconnecting in {delay:?} (attempt {attempt}/{})",
                self.config.max_reconnect_attempts
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.recv() => return,
            }
        }
    }
}

/// Drive an open socket until it dies or a stop signal arrives.
///
/// Returns exactly one exit value, so concurrent failure signals (ping
/// failure, receive failure, silence timeout) can never double-report a
/// disconnection: whichever select arm wins decides the reason.
async fn drive(
    socket: &mut dyn Socket,
    config: &SessionConfig,
    events: &mpsc::Sender<SessionEvent>,
    stop: &mut mpsc::Receiver<()>,
) -> DriveExit {
    // Intervals start one period out; an immediate first tick would ping or
    // silence-check a socket that just opened.
    let mut ping = interval_at(Instant::now() + config.ping_interval, config.ping_interval);
    let silence_check = (config.silence_timeout / 4).max(Duration::from_secs(1));
    let mut silence = interval_at(Instant::now() + silence_check, silence_check);
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            message = socket.next_message() => {
                match message {
                    Some(Ok(message)) => {
                        last_seen = Instant::now();
                        if let Message::Text(text) = message {
                            match parse_frame(&text) {
                                Ok(PushEvent::State(state)) => {
                                    if events.send(SessionEvent::State(state)).await.is_err() {
                                        return DriveExit::Stop;
                                    }
                                }
                                Ok(PushEvent::Volume(volume)) => {
                                    if events.send(SessionEvent::Volume(volume)).await.is_err() {
                                        return DriveExit::Stop;
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!("Skipping unparseable frame: {e}");
                                }
                            }
                        }
                    }
                    Some(Err(e)) => {
                        return DriveExit::Dropped(DropReason::Receive(e.to_string()));
                    }
                    None => {
                        return DriveExit::Dropped(DropReason::SocketClosed);
                    }
                }
            }
            _ = ping.tick() => {
                if socket.send_ping().await.is_err() {
                    return DriveExit::Dropped(DropReason::PingFailed);
                }
            }
            _ = silence.tick() => {
                // Transport-open but dead end-to-end: no traffic (not even
                // pongs) within the window.
                if last_seen.elapsed() >= config.silence_timeout {
                    return DriveExit::Dropped(DropReason::SilenceTimeout);
                }
            }
            _ = stop.recv() => return DriveExit::Stop,
        }
    }
}
