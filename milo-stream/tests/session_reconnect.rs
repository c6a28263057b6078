//! Session lifecycle tests against scripted sockets.
//!
//! Time is paused (`start_paused`) so the ping, silence, and backoff timers
//! run deterministically without wall-clock waits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use milo_api::{AudioSource, VolumeState};
use milo_stream::{
    Connector, DropReason, Message, SessionConfig, SessionError, SessionEvent, Socket, WsSession,
};
use tokio::sync::mpsc;
use url::Url;

/// What a scripted socket does after its queued messages run out.
enum After {
    /// Report end-of-stream (peer closed)
    Close,
    /// Never yield another message
    Pend,
    /// Yield a pong after every interval
    Tick(Duration),
}

struct ScriptedSocket {
    messages: VecDeque<Message>,
    after: After,
    ping_ok: bool,
}

impl ScriptedSocket {
    fn closing(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into(),
            after: After::Close,
            ping_ok: true,
        }
    }

    fn silent(ping_ok: bool) -> Self {
        Self {
            messages: VecDeque::new(),
            after: After::Pend,
            ping_ok,
        }
    }

    fn live(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into(),
            after: After::Pend,
            ping_ok: true,
        }
    }

    fn ticking(every: Duration) -> Self {
        Self {
            messages: VecDeque::new(),
            after: After::Tick(every),
            ping_ok: true,
        }
    }
}

#[async_trait]
impl Socket for ScriptedSocket {
    async fn next_message(&mut self) -> Option<Result<Message, SessionError>> {
        if let Some(message) = self.messages.pop_front() {
            return Some(Ok(message));
        }
        match self.after {
            After::Close => None,
            After::Pend => std::future::pending().await,
            After::Tick(every) => {
                tokio::time::sleep(every).await;
                Some(Ok(Message::Pong))
            }
        }
    }

    async fn send_ping(&mut self) -> Result<(), SessionError> {
        if self.ping_ok {
            Ok(())
        } else {
            Err(SessionError::Socket("ping rejected".to_string()))
        }
    }

    async fn close(&mut self) {}
}

enum Outcome {
    Fail,
    Open(ScriptedSocket),
}

/// Connector that plays back a fixed sequence of connect outcomes.
struct ScriptedConnector {
    outcomes: Mutex<VecDeque<Outcome>>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    fn new(outcomes: Vec<Outcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            connects: AtomicUsize::new(0),
        }
    }

    fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, _url: &Url) -> Result<Box<dyn Socket>, SessionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(Outcome::Open(socket)) => Ok(Box::new(socket)),
            Some(Outcome::Fail) | None => {
                Err(SessionError::Connect("connection refused".to_string()))
            }
        }
    }
}

fn test_config() -> SessionConfig {
    SessionConfig::default()
        .with_ping_interval(Duration::from_secs(10))
        .with_silence_timeout(Duration::from_secs(30))
        .with_max_reconnect_attempts(3)
        .with_backoff(Duration::from_secs(1), Duration::from_secs(30))
}

fn test_url() -> Url {
    Url::parse("ws://192.168.1.50:80/ws").unwrap()
}

async fn run_to_completion(
    connector: std::sync::Arc<ScriptedConnector>,
    config: SessionConfig,
) -> Vec<SessionEvent> {
    let session = WsSession::with_connector(test_url(), config, connector);
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (_stop_tx, stop_rx) = mpsc::channel(1);

    tokio::spawn(session.run(event_tx, stop_rx));

    let mut events = Vec::new();
    while let Some(event) = event_rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_max_reconnect_attempts() {
    let connector = std::sync::Arc::new(ScriptedConnector::new(vec![]));
    let events = run_to_completion(connector.clone(), test_config()).await;

    assert_eq!(events, vec![SessionEvent::Failed]);
    // Initial connect plus three retries.
    assert_eq!(connector.connect_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn dropped_fires_exactly_once_per_disconnection() {
    let connector = std::sync::Arc::new(ScriptedConnector::new(vec![
        Outcome::Open(ScriptedSocket::closing(vec![])),
        Outcome::Open(ScriptedSocket::closing(vec![])),
    ]));
    let config = test_config().with_max_reconnect_attempts(1);
    let events = run_to_completion(connector, config).await;

    assert_eq!(
        events,
        vec![
            SessionEvent::Opened,
            SessionEvent::Dropped(DropReason::SocketClosed),
            SessionEvent::Opened,
            SessionEvent::Dropped(DropReason::SocketClosed),
            SessionEvent::Failed,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn attempt_counter_resets_after_successful_open() {
    let connector = std::sync::Arc::new(ScriptedConnector::new(vec![
        Outcome::Fail,
        Outcome::Fail,
        Outcome::Open(ScriptedSocket::closing(vec![])),
        Outcome::Fail,
        Outcome::Fail,
    ]));
    let config = test_config().with_max_reconnect_attempts(2);
    let events = run_to_completion(connector.clone(), config).await;

    // Two failures fit inside the budget before the open. The open resets
    // the counter, so the drop (attempt 1) plus two more failed connects are
    // needed to exceed the budget again.
    assert_eq!(
        events,
        vec![
            SessionEvent::Opened,
            SessionEvent::Dropped(DropReason::SocketClosed),
            SessionEvent::Failed,
        ]
    );
    assert_eq!(connector.connect_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn silent_socket_is_dropped_after_silence_timeout() {
    let connector = std::sync::Arc::new(ScriptedConnector::new(vec![Outcome::Open(
        ScriptedSocket::silent(true),
    )]));
    let config = test_config().with_max_reconnect_attempts(1);
    let events = run_to_completion(connector, config).await;

    // Pings succeed but nothing ever comes back, so the silence check wins.
    assert_eq!(
        events,
        vec![
            SessionEvent::Opened,
            SessionEvent::Dropped(DropReason::SilenceTimeout),
            SessionEvent::Failed,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn inbound_pongs_defer_the_silence_timeout() {
    // A pong every 20s keeps the 30s silence window from ever elapsing.
    let connector = std::sync::Arc::new(ScriptedConnector::new(vec![Outcome::Open(
        ScriptedSocket::ticking(Duration::from_secs(20)),
    )]));

    let session = WsSession::with_connector(test_url(), test_config(), connector);
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let handle = tokio::spawn(session.run(event_tx, stop_rx));

    assert_eq!(event_rx.recv().await, Some(SessionEvent::Opened));

    // Several silence windows pass without a drop.
    assert!(
        tokio::time::timeout(Duration::from_secs(120), event_rx.recv())
            .await
            .is_err()
    );

    stop_tx.send(()).await.unwrap();
    handle.await.unwrap();
    assert_eq!(event_rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn ping_failure_drops_the_socket() {
    let connector = std::sync::Arc::new(ScriptedConnector::new(vec![Outcome::Open(
        ScriptedSocket::silent(false),
    )]));
    let config = test_config().with_max_reconnect_attempts(1);
    let events = run_to_completion(connector, config).await;

    assert_eq!(
        events,
        vec![
            SessionEvent::Opened,
            SessionEvent::Dropped(DropReason::PingFailed),
            SessionEvent::Failed,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn inbound_frames_are_forwarded_as_typed_events() {
    let volume_frame = r#"{
        "category": "volume",
        "type": "volume_changed",
        "data": {"volume": 42, "mode": "normal", "multiroom_enabled": true}
    }"#;
    let state_frame = r#"{
        "category": "system",
        "type": "state_changed",
        "data": {"full_state": {"active_source": "bluetooth"}}
    }"#;

    let connector = std::sync::Arc::new(ScriptedConnector::new(vec![Outcome::Open(
        ScriptedSocket::live(vec![
            Message::Text(volume_frame.to_string()),
            Message::Text("garbage".to_string()),
            Message::Text(state_frame.to_string()),
        ]),
    )]));

    let session = WsSession::with_connector(test_url(), test_config(), connector);
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let handle = tokio::spawn(session.run(event_tx, stop_rx));

    assert_eq!(event_rx.recv().await, Some(SessionEvent::Opened));

    let volume = event_rx.recv().await.unwrap();
    assert_eq!(
        volume,
        SessionEvent::Volume(VolumeState {
            volume: 42,
            mode: "normal".to_string(),
            multiroom_enabled: true,
        })
    );

    // The garbage frame is skipped; the next event is the state snapshot.
    let state = event_rx.recv().await.unwrap();
    let SessionEvent::State(state) = state else {
        panic!("Expected a state event, got {state:?}");
    };
    assert_eq!(state.active_source, AudioSource::Bluetooth);

    stop_tx.send(()).await.unwrap();
    handle.await.unwrap();
    assert_eq!(event_rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn stop_signal_ends_the_session_silently() {
    let connector = std::sync::Arc::new(ScriptedConnector::new(vec![Outcome::Open(
        ScriptedSocket::silent(true),
    )]));

    let session = WsSession::with_connector(test_url(), test_config(), connector);
    let (event_tx, mut event_rx) = mpsc::channel(64);
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let handle = tokio::spawn(session.run(event_tx, stop_rx));

    assert_eq!(event_rx.recv().await, Some(SessionEvent::Opened));

    stop_tx.send(()).await.unwrap();
    handle.await.unwrap();

    // No Dropped or Failed after a requested stop.
    assert_eq!(event_rx.recv().await, None);
}
