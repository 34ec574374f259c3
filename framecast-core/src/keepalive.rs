//! Periodic `ping` sender bound to one session.
//!
//! The first ping goes out immediately, then one per interval, for as
//! long as the connectivity flag is set. Pongs are not correlated with
//! pings: a silent-but-open connection is not detected here, only
//! transport errors are.

use std::time::Duration;

use futures::{Sink, SinkExt};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::ClientError;
use crate::message::ClientMessage;
use crate::status::ClientStatus;

/// Default ping interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Sends keepalive pings on the write half of a connection.
#[derive(Debug, Clone)]
pub struct KeepaliveAgent {
    interval: Duration,
    status: ClientStatus,
}

impl KeepaliveAgent {
    pub fn new(interval: Duration, status: ClientStatus) -> Self {
        // `tokio::time::interval` rejects a zero period.
        let interval = interval.max(Duration::from_millis(1));
        Self { interval, status }
    }

    /// Run on its own task. The handle yields the number of pings sent.
    pub fn spawn<S>(self, sink: S, cancel: CancellationToken) -> JoinHandle<u64>
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin + Send + 'static,
    {
        tokio::spawn(self.run(sink, cancel))
    }

    /// Ping until cancelled, disconnected, or a send fails.
    pub async fn run<S>(self, mut sink: S, cancel: CancellationToken) -> u64
    where
        S: Sink<Message, Error = tungstenite::Error> + Unpin,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sent = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if !self.status.is_connected() {
                break;
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = send_ping(&mut sink) => result,
            };
            match result {
                Ok(()) => {
                    sent += 1;
                    trace!(sent, "ping sent");
                }
                Err(e) => {
                    // The read loop observes the broken transport on its own.
                    warn!(error = %e, "failed to send ping");
                    break;
                }
            }
        }

        debug!(sent, "keepalive stopped");
        sent
    }
}

async fn send_ping<S>(sink: &mut S) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let text = ClientMessage::ping_now().to_json()?;
    sink.send(Message::text(text)).await?;
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
