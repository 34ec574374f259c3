//! Integration tests: reconnect policy, keepalive cadence and the frame
//! pipeline end to end, over in-memory WebSocket pairs with paused time,
//! plus one run against a real localhost WebSocket server.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::io::DuplexStream;
use tokio::time::Instant;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::Role;

use framecast_core::{
    ClientError, ClientStatus, ConnectOutcome, ConnectionSession, Connector, DecodedImage,
    FrameIngest, FrameSink, ImageFrameDecoder, Liveness, ReconnectPolicy, ReconnectSupervisor,
    SessionEnd, WsConnector, ZstdFrameDecoder, encode_frame,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

// ── Helpers ──────────────────────────────────────────────────────

type Duplex = WebSocketStream<DuplexStream>;
type Publisher = Box<dyn FnOnce(Duplex) -> BoxFuture<'static, ()> + Send>;

/// What the scripted connector does on one attempt.
enum Step {
    Fail,
    Accept(Publisher),
}

fn accept<F, Fut>(publisher: F) -> Step
where
    F: FnOnce(Duplex) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Step::Accept(Box::new(move |ws| Box::pin(publisher(ws))))
}

/// Plays back a list of steps, then refuses every further attempt.
struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    attempts: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedConnector {
    fn new(steps: Vec<Step>) -> (Self, Arc<Mutex<Vec<Instant>>>) {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let connector = Self {
            steps: Mutex::new(steps.into()),
            attempts: Arc::clone(&attempts),
        };
        (connector, attempts)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Stream = Duplex;

    fn target(&self) -> &str {
        "scripted://publisher"
    }

    async fn connect(&self) -> Result<Duplex, ClientError> {
        self.attempts.lock().unwrap().push(Instant::now());
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Fail);
        match step {
            Step::Fail => Err(tokio_tungstenite::tungstenite::Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
            .into()),
            Step::Accept(publisher) => {
                let (client, server) = tokio::io::duplex(1 << 20);
                let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
                let server = WebSocketStream::from_raw_socket(server, Role::Server, None).await;
                tokio::spawn(publisher(server));
                Ok(client)
            }
        }
    }
}

struct Harness {
    supervisor: ReconnectSupervisor<ScriptedConnector>,
    attempts: Arc<Mutex<Vec<Instant>>>,
    sink: Arc<FrameSink>,
    status: ClientStatus,
    liveness: Liveness,
}

fn harness(steps: Vec<Step>) -> Harness {
    let (connector, attempts) = ScriptedConnector::new(steps);
    let sink = Arc::new(FrameSink::new(5));
    let status = ClientStatus::new();
    let liveness = Liveness::new();
    let ingest = FrameIngest::new(
        Box::new(ZstdFrameDecoder::new()),
        Arc::clone(&sink),
        status.clone(),
    );
    let session = ConnectionSession::new(
        ingest,
        status.clone(),
        liveness.clone(),
        Duration::from_secs(30),
    );
    Harness {
        supervisor: ReconnectSupervisor::new(connector, session, ReconnectPolicy::default()),
        attempts,
        sink,
        status,
        liveness,
    }
}

fn frame_message(value: u8) -> Message {
    let image = DecodedImage {
        width: 2,
        height: 1,
        data: vec![value; DecodedImage::byte_len(2, 1)],
    };
    let data = STANDARD.encode(encode_frame(&image, 1).unwrap());
    Message::text(format!(r#"{{"type":"frame","data":"{data}"}}"#))
}

/// A frame message carrying a base64 JPEG, as camera publishers send.
fn jpeg_frame_message(value: u8) -> Message {
    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([value, value, value])))
        .write_to(&mut std::io::Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .unwrap();
    let data = STANDARD.encode(jpeg);
    Message::text(format!(r#"{{"type":"frame","data":"{data}"}}"#))
}

/// Close from the publisher side and wait for the client's close reply.
async fn close(mut ws: Duplex) {
    let _ = ws.close(None).await;
    while let Some(Ok(_)) = ws.next().await {}
}

fn gaps(attempts: &[Instant]) -> Vec<Duration> {
    attempts.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Paused time advances in whole timer ticks; allow for rounding.
fn near(actual: Duration, expected: Duration) -> bool {
    actual >= expected && actual - expected < Duration::from_millis(5)
}

// ── Bounded retries ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn five_failures_stop_the_client() {
    let mut h = harness(Vec::new());
    let start = Instant::now();

    tokio::time::timeout(Duration::from_secs(600), h.supervisor.run())
        .await
        .expect("supervisor must stop on its own");

    let attempts = h.attempts.lock().unwrap().clone();
    assert_eq!(attempts.len(), 5, "no sixth attempt");
    assert!(gaps(&attempts).iter().all(|g| near(*g, Duration::from_secs(3))));
    // The last failure is followed by one more retry delay before giving up.
    assert!(near(start.elapsed(), Duration::from_secs(15)));
    assert!(!h.liveness.is_alive());
    assert!(!h.status.is_connected());
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_final_delay_is_not_exhaustion() {
    let mut h = harness(Vec::new());
    let trigger = h.liveness.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(13)).await;
        trigger.shutdown();
    });

    let outcome = h.supervisor.connect_with_retry().await;
    assert!(matches!(outcome, ConnectOutcome::Cancelled));
    assert_eq!(h.attempts.lock().unwrap().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn connect_with_retry_reports_exhaustion() {
    let mut h = harness(Vec::new());
    let outcome = h.supervisor.connect_with_retry().await;
    assert!(matches!(outcome, ConnectOutcome::Exhausted { attempts: 5 }));
    assert!(!h.liveness.is_alive());
}

#[tokio::test(start_paused = true)]
async fn recovers_before_the_limit() {
    let mut h = harness(vec![
        Step::Fail,
        Step::Fail,
        Step::Fail,
        Step::Fail,
        accept(close),
    ]);
    let outcome = h.supervisor.connect_with_retry().await;
    assert!(matches!(
        outcome,
        ConnectOutcome::SessionEnded(SessionEnd::Closed)
    ));
    assert!(h.liveness.is_alive());
    assert_eq!(h.attempts.lock().unwrap().len(), 5);
}

// ── Outer loop ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn dropped_session_gets_a_fresh_retry_budget() {
    let mut h = harness(vec![Step::Fail, Step::Fail, Step::Fail, accept(close)]);

    tokio::time::timeout(Duration::from_secs(600), h.supervisor.run())
        .await
        .expect("supervisor must stop on its own");

    let attempts = h.attempts.lock().unwrap().clone();
    // 3 failures + 1 session, then a full fresh round of 5 failures.
    assert_eq!(attempts.len(), 9);

    let gaps = gaps(&attempts);
    assert!(gaps[..3].iter().all(|g| near(*g, Duration::from_secs(3))));
    // Session ended immediately; the outer loop waits 5s.
    assert!(near(gaps[3], Duration::from_secs(5)));
    assert!(gaps[4..].iter().all(|g| near(*g, Duration::from_secs(3))));
    assert!(!h.liveness.is_alive());
}

#[tokio::test(start_paused = true)]
async fn repeated_sessions_never_exhaust() {
    let steps = (0..8).map(|_| accept(close)).collect();
    let mut h = harness(steps);

    tokio::time::timeout(Duration::from_secs(600), h.supervisor.run())
        .await
        .unwrap();

    // 8 sessions, then the first round of failures that finally stops it.
    assert_eq!(h.attempts.lock().unwrap().len(), 8 + 5);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_backoff_stops_promptly() {
    let mut h = harness(Vec::new());
    let trigger = h.liveness.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(4)).await;
        trigger.shutdown();
    });

    let start = Instant::now();
    h.supervisor.run().await;

    assert!(near(start.elapsed(), Duration::from_secs(4)));
    assert_eq!(h.attempts.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_session_stops_without_reconnect() {
    let mut h = harness(vec![accept(|ws: Duplex| async move {
        // Hold the connection open forever.
        let _ws = ws;
        std::future::pending::<()>().await;
    })]);
    let trigger = h.liveness.clone();
    let status = h.status.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(status.is_connected());
        trigger.shutdown();
    });

    h.supervisor.run().await;

    assert_eq!(h.attempts.lock().unwrap().len(), 1);
    assert!(!h.status.is_connected());
    assert_eq!(h.supervisor.session().stats().pings, 1);
}

// ── Frame pipeline ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn seven_frames_leave_the_newest_five() {
    let mut h = harness(vec![accept(|mut ws: Duplex| async move {
        ws.send(Message::text(r#"{"type":"welcome","message":"camera 1"}"#))
            .await
            .unwrap();
        for i in 1..=7 {
            ws.send(frame_message(i)).await.unwrap();
        }
        close(ws).await;
    })]);

    let outcome = h.supervisor.connect_with_retry().await;
    assert!(matches!(outcome, ConnectOutcome::SessionEnded(_)));

    let frames = h.sink.drain();
    let seqs: Vec<u64> = frames.iter().map(|f| f.seq).collect();
    assert_eq!(seqs, vec![2, 3, 4, 5, 6]);
    let values: Vec<u8> = frames.iter().map(|f| f.image.data[0]).collect();
    assert_eq!(values, vec![3, 4, 5, 6, 7]);
    assert_eq!(h.status.frame_count(), 7);
    assert_eq!(h.sink.evicted_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn bad_frames_and_junk_do_not_end_the_session() {
    let mut h = harness(vec![accept(|mut ws: Duplex| async move {
        ws.send(Message::text("not json at all")).await.unwrap();
        ws.send(Message::text(r#"{"type":"frame","data":"%%%"}"#))
            .await
            .unwrap();
        ws.send(Message::binary(b"\xff\xfe".to_vec())).await.unwrap();
        ws.send(frame_message(9)).await.unwrap();
        close(ws).await;
    })]);

    h.supervisor.connect_with_retry().await;

    let stats = h.supervisor.session().stats();
    assert_eq!(stats.invalid, 2);
    assert_eq!(stats.dropped_frames, 1);
    assert_eq!(stats.frames, 1);
    assert_eq!(h.status.frame_count(), 1);
    assert_eq!(h.sink.len(), 1);
}

// ── Keepalive ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn keepalive_pings_every_thirty_seconds() {
    let pings = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&pings);
    let mut h = harness(vec![accept(move |mut ws: Duplex| async move {
        let start = Instant::now();
        let deadline = tokio::time::sleep(Duration::from_secs(65));
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                        assert_eq!(value["type"], "ping");
                        seen.lock().unwrap().push(start.elapsed());
                        ws.send(Message::text(r#"{"type":"pong"}"#)).await.unwrap();
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                },
            }
        }
        close(ws).await;
    })]);

    h.supervisor.connect_with_retry().await;

    let pings = pings.lock().unwrap().clone();
    assert_eq!(pings.len(), 3);
    for (actual, expected) in pings.iter().zip([0, 30, 60]) {
        assert!(near(*actual, Duration::from_secs(expected)), "ping at {actual:?}");
    }
    assert_eq!(h.supervisor.session().stats().pings, 3);
}

// ── Real transport ───────────────────────────────────────────────

#[tokio::test]
async fn streams_frames_from_a_real_websocket_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::text(r#"{"type":"welcome","message":"hello"}"#))
            .await
            .unwrap();
        for i in 0..3 {
            ws.send(jpeg_frame_message(i * 100)).await.unwrap();
        }
        let _ = ws.close(None).await;
        while let Some(Ok(_)) = ws.next().await {}
    });

    let sink = Arc::new(FrameSink::new(5));
    let status = ClientStatus::new();
    let liveness = Liveness::new();
    let ingest = FrameIngest::new(
        Box::new(ImageFrameDecoder::new()),
        Arc::clone(&sink),
        status.clone(),
    );
    let session = ConnectionSession::new(ingest, status.clone(), liveness, Duration::from_secs(30));
    let connector = WsConnector::new(format!("ws://{addr}"), Duration::from_secs(5));
    let mut supervisor = ReconnectSupervisor::new(connector, session, ReconnectPolicy::default());

    let outcome = tokio::time::timeout(Duration::from_secs(10), supervisor.connect_with_retry())
        .await
        .expect("timeout");
    server.await.unwrap();

    assert!(matches!(outcome, ConnectOutcome::SessionEnded(_)));
    assert_eq!(status.frame_count(), 3);
    let frames = sink.drain();
    let seqs: Vec<u64> = frames.iter().map(|f| f.seq).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert!(frames.iter().all(|f| (f.image.width, f.image.height) == (64, 48)));
}
