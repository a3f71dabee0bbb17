use async_trait::async_trait;
use coindcx_connect::coindcx::{
    shutdown_channel, CoindcxCodec, CoindcxSigner, EventDispatcher, InboundEvent, SessionConfig,
    SessionState, StreamingSession, POSITION_UPDATE_EVENT,
};
use coindcx_connect::core::errors::ExchangeError;
use coindcx_connect::core::kernel::WsSession;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

const TEST_KEY: &str = "test-key";
const TEST_SECRET: &str = "test-secret";

/// Compute the join signature independently of the crate's signer.
fn expected_signature(secret: &str, body: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// One scripted inbound item on a mock connection.
enum StreamItem {
    Event(InboundEvent),
    DecodeError,
    TransportError,
    Eof,
}

fn position_event(data: &str) -> StreamItem {
    StreamItem::Event(InboundEvent {
        name: POSITION_UPDATE_EVENT.to_string(),
        payload: json!({ "data": data }),
    })
}

#[derive(Default)]
struct MockScript {
    /// Leading connect attempts that fail before one succeeds
    connect_failures: u32,
    /// Inbound items per successful connection, in connect order
    connections: VecDeque<Vec<StreamItem>>,
}

#[derive(Default)]
struct MockLog {
    connect_calls: u32,
    sent: Vec<(String, Value)>,
    closed: bool,
}

/// Scripted in-memory transport. After its script for the current
/// connection is exhausted the stream stays open (pending) until the
/// session is stopped.
struct MockWs {
    script: Arc<Mutex<MockScript>>,
    log: Arc<Mutex<MockLog>>,
    current: VecDeque<StreamItem>,
    connected: bool,
}

impl MockWs {
    fn new(script: MockScript) -> (Self, Arc<Mutex<MockLog>>) {
        let log = Arc::new(Mutex::new(MockLog::default()));
        let transport = Self {
            script: Arc::new(Mutex::new(script)),
            log: Arc::clone(&log),
            current: VecDeque::new(),
            connected: false,
        };
        (transport, log)
    }
}

#[async_trait]
impl WsSession<CoindcxCodec> for MockWs {
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        self.log.lock().unwrap().connect_calls += 1;

        let mut script = self.script.lock().unwrap();
        if script.connect_failures > 0 {
            script.connect_failures -= 1;
            return Err(ExchangeError::NetworkError(
                "scripted connect failure".to_string(),
            ));
        }

        self.current = script.connections.pop_front().unwrap_or_default().into();
        self.connected = true;
        Ok(())
    }

    async fn send_event(&mut self, event: &str, payload: &Value) -> Result<(), ExchangeError> {
        self.log
            .lock()
            .unwrap()
            .sent
            .push((event.to_string(), payload.clone()));
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<InboundEvent, ExchangeError>> {
        match self.current.pop_front() {
            Some(StreamItem::Event(event)) => Some(Ok(event)),
            Some(StreamItem::DecodeError) => Some(Err(ExchangeError::DeserializationError(
                "scripted malformed frame".to_string(),
            ))),
            Some(StreamItem::TransportError) => {
                self.connected = false;
                Some(Err(ExchangeError::NetworkError(
                    "scripted transport error".to_string(),
                )))
            }
            Some(StreamItem::Eof) => {
                self.connected = false;
                None
            }
            None => {
                // Connection stays open with nothing to deliver.
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }

    async fn close(&mut self) -> Result<(), ExchangeError> {
        self.connected = false;
        self.log.lock().unwrap().closed = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn make_session(
    script: MockScript,
    config: SessionConfig,
    dispatcher: EventDispatcher,
) -> (
    StreamingSession<MockWs>,
    Arc<Mutex<MockLog>>,
    watch::Sender<bool>,
) {
    let (transport, log) = MockWs::new(script);
    let signer = Arc::new(CoindcxSigner::new(TEST_KEY.to_string(), TEST_SECRET.to_string()).unwrap());
    let (stop, stop_rx) = shutdown_channel();
    let session = StreamingSession::new(transport, signer, dispatcher, config, stop_rx);
    (session, log, stop)
}

async fn wait_for_state(rx: &mut watch::Receiver<SessionState>, target: SessionState) {
    timeout(Duration::from_secs(5), async {
        loop {
            if *rx.borrow() == target {
                return;
            }
            rx.changed().await.expect("session state channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for state {:?}", target));
}

async fn wait_for_send_count(log: &Arc<Mutex<MockLog>>, count: usize) {
    timeout(Duration::from_secs(5), async {
        loop {
            if log.lock().unwrap().sent.len() >= count {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {} sent messages", count));
}

#[tokio::test]
async fn test_connect_drives_session_to_subscribed_with_one_join() {
    let seen_updates = Arc::new(Mutex::new(Vec::new()));
    let seen_unhandled = Arc::new(Mutex::new(Vec::new()));

    let updates = Arc::clone(&seen_updates);
    let unhandled = Arc::clone(&seen_unhandled);
    let dispatcher = EventDispatcher::new()
        .on_position_update(move |update| updates.lock().unwrap().push(update))
        .on_unhandled(move |event, payload| {
            unhandled.lock().unwrap().push((event.to_string(), payload.clone()));
        });

    let script = MockScript {
        connect_failures: 0,
        connections: VecDeque::from([vec![
            position_event("{\"pnl\": 12.5, \"updated_at\": 1700000000000}"),
            StreamItem::Event(InboundEvent {
                name: "exotic-event".to_string(),
                payload: json!({"raw": [1, 2, 3]}),
            }),
        ]]),
    };

    let (mut session, log, stop) = make_session(script, SessionConfig::default(), dispatcher);
    let mut state_rx = session.state_watch();
    let handle = tokio::spawn(async move { session.run().await });

    wait_for_state(&mut state_rx, SessionState::Subscribed).await;
    wait_for_send_count(&log, 1).await;

    {
        let log = log.lock().unwrap();
        assert_eq!(log.connect_calls, 1);
        assert_eq!(log.sent.len(), 1, "exactly one join emission expected");

        let (event, payload) = &log.sent[0];
        assert_eq!(event, "join");
        assert_eq!(payload["channelName"], "coindcx");
        assert_eq!(payload["apiKey"], TEST_KEY);
        assert_eq!(
            payload["authSignature"],
            expected_signature(TEST_SECRET, r#"{"channel":"coindcx"}"#)
        );
    }

    // Inbound events flow through the dispatcher in delivery order.
    timeout(Duration::from_secs(5), async {
        while seen_updates.lock().unwrap().is_empty() || seen_unhandled.lock().unwrap().is_empty() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for dispatched events");

    assert_eq!(seen_updates.lock().unwrap()[0].pnl, Some(12.5));
    let unhandled = seen_unhandled.lock().unwrap();
    assert_eq!(unhandled[0].0, "exotic-event");
    assert_eq!(unhandled[0].1, json!({"raw": [1, 2, 3]}));
    drop(unhandled);

    stop.send(true).unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(*state_rx.borrow(), SessionState::Stopped);
    assert!(log.lock().unwrap().closed);
}

#[tokio::test]
async fn test_disconnect_triggers_delayed_reconnect_and_rejoin() {
    let delay = Duration::from_millis(50);
    let config = SessionConfig::default().with_reconnect_delay(delay);

    let script = MockScript {
        connect_failures: 0,
        connections: VecDeque::from([vec![StreamItem::Eof], vec![]]),
    };

    let (mut session, log, stop) = make_session(script, config, EventDispatcher::new());
    let mut state_rx = session.state_watch();
    let started = Instant::now();
    let handle = tokio::spawn(async move { session.run().await });

    wait_for_send_count(&log, 2).await;
    wait_for_state(&mut state_rx, SessionState::Subscribed).await;

    assert!(
        started.elapsed() >= delay,
        "second join must come after the reconnect delay"
    );

    {
        let log = log.lock().unwrap();
        assert_eq!(log.connect_calls, 2);
        assert_eq!(log.sent.len(), 2, "one fresh join per connection");
        assert_eq!(log.sent[0].0, "join");
        assert_eq!(log.sent[1].0, "join");
        // Same channel, same body, so the re-signed value matches too.
        assert_eq!(log.sent[1].1, log.sent[0].1);
    }

    stop.send(true).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connect_failure_is_retried_not_propagated() {
    let config = SessionConfig::default().with_reconnect_delay(Duration::from_millis(10));

    let script = MockScript {
        connect_failures: 1,
        connections: VecDeque::from([vec![]]),
    };

    let (mut session, log, stop) = make_session(script, config, EventDispatcher::new());
    let mut state_rx = session.state_watch();
    let handle = tokio::spawn(async move { session.run().await });

    wait_for_state(&mut state_rx, SessionState::Subscribed).await;

    {
        let log = log.lock().unwrap();
        assert_eq!(log.connect_calls, 2);
        assert_eq!(log.sent.len(), 1, "no join on the failed attempt");
    }

    stop.send(true).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_stop_during_reconnect_delay_suppresses_reconnect() {
    // Long delay so the stop lands while the reconnect is pending.
    let config = SessionConfig::default().with_reconnect_delay(Duration::from_secs(30));

    let script = MockScript {
        connect_failures: 0,
        connections: VecDeque::from([vec![StreamItem::Eof]]),
    };

    let (mut session, log, stop) = make_session(script, config, EventDispatcher::new());
    let mut state_rx = session.state_watch();
    let handle = tokio::spawn(async move { session.run().await });

    wait_for_state(&mut state_rx, SessionState::Disconnected).await;
    stop.send(true).unwrap();

    timeout(Duration::from_secs(1), handle)
        .await
        .expect("stop must end the session without waiting out the delay")
        .unwrap()
        .unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.connect_calls, 1, "no reconnect after stop");
    assert!(log.closed);
    assert_eq!(*state_rx.borrow(), SessionState::Stopped);
}

#[tokio::test]
async fn test_reconnect_attempt_cap_is_enforced() {
    let config = SessionConfig::default()
        .with_reconnect_delay(Duration::from_millis(1))
        .with_max_reconnect_attempts(2);

    let script = MockScript {
        connect_failures: 100,
        connections: VecDeque::new(),
    };

    let (mut session, log, _stop) = make_session(script, config, EventDispatcher::new());
    let result = timeout(Duration::from_secs(5), session.run())
        .await
        .expect("capped session must terminate");

    assert!(matches!(result, Err(ExchangeError::NetworkError(_))));
    // Initial attempt plus two reconnects.
    assert_eq!(log.lock().unwrap().connect_calls, 3);
    assert_eq!(session.state(), SessionState::Stopped);
}

#[tokio::test]
async fn test_undecodable_frame_is_skipped_without_reconnect() {
    let seen_updates = Arc::new(Mutex::new(Vec::new()));
    let updates = Arc::clone(&seen_updates);
    let dispatcher =
        EventDispatcher::new().on_position_update(move |update| updates.lock().unwrap().push(update));

    let script = MockScript {
        connect_failures: 0,
        connections: VecDeque::from([vec![
            StreamItem::DecodeError,
            position_event("{\"available_wallet_balance\": 950.0}"),
        ]]),
    };

    let (mut session, log, stop) = make_session(script, SessionConfig::default(), dispatcher);
    let handle = tokio::spawn(async move { session.run().await });

    timeout(Duration::from_secs(5), async {
        while seen_updates.lock().unwrap().is_empty() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("event after the bad frame must still be dispatched");

    {
        let log = log.lock().unwrap();
        assert_eq!(log.connect_calls, 1, "decode errors must not reconnect");
    }
    assert_eq!(
        seen_updates.lock().unwrap()[0].available_wallet_balance,
        Some(950.0)
    );

    stop.send(true).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_transport_error_mid_stream_reconnects() {
    let config = SessionConfig::default().with_reconnect_delay(Duration::from_millis(10));

    let script = MockScript {
        connect_failures: 0,
        connections: VecDeque::from([vec![StreamItem::TransportError], vec![]]),
    };

    let (mut session, log, stop) = make_session(script, config, EventDispatcher::new());
    let mut state_rx = session.state_watch();
    let handle = tokio::spawn(async move { session.run().await });

    wait_for_send_count(&log, 2).await;
    wait_for_state(&mut state_rx, SessionState::Subscribed).await;
    assert_eq!(log.lock().unwrap().connect_calls, 2);

    stop.send(true).unwrap();
    handle.await.unwrap().unwrap();
}
