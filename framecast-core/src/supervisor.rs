//! Reconnect supervisor: bounded retries inside an unbounded outer loop.
//!
//! ```text
//!  run() ──► connect_with_retry() ──► session ends ──► wait 5s ──┐
//!   ▲               │                                           │
//!   │               └─ 5 failed attempts, each followed by 3s ─► liveness cleared, stop
//!   └───────────────────────────────────────────────────────────┘
//! ```
//!
//! An established session that later drops never consumes retry budget:
//! every outer iteration starts a fresh count.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::connector::Connector;
use crate::session::{ConnectionSession, SessionEnd};
use crate::status::Liveness;

// ── ReconnectPolicy ──────────────────────────────────────────────

/// Timing and retry limits of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Failed connection attempts tolerated per outer iteration.
    pub max_retries: u32,
    /// Wait between failed attempts.
    pub retry_delay: Duration,
    /// Wait after a session ends before the next round of attempts.
    pub reconnect_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_secs(3),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

// ── ConnectOutcome ───────────────────────────────────────────────

/// How one bounded-retry round ended.
#[derive(Debug)]
pub enum ConnectOutcome {
    /// A session was established and has since ended.
    SessionEnded(SessionEnd),
    /// Every attempt failed. The liveness flag has been cleared.
    Exhausted { attempts: u32 },
    /// The liveness flag was cleared by someone else.
    Cancelled,
}

// ── ReconnectSupervisor ──────────────────────────────────────────

/// Owns the connector and session and keeps the client connected.
pub struct ReconnectSupervisor<C: Connector> {
    connector: C,
    session: ConnectionSession,
    policy: ReconnectPolicy,
    liveness: Liveness,
}

impl<C: Connector> ReconnectSupervisor<C> {
    pub fn new(connector: C, session: ConnectionSession, policy: ReconnectPolicy) -> Self {
        let liveness = session.liveness().clone();
        Self {
            connector,
            session,
            policy,
            liveness,
        }
    }

    /// The session driven by this supervisor.
    pub fn session(&self) -> &ConnectionSession {
        &self.session
    }

    /// Keep reconnecting until the liveness flag is cleared.
    pub async fn run(&mut self) {
        info!(url = self.connector.target(), "starting frame client");

        while self.liveness.is_alive() {
            let outcome = self.connect_with_retry().await;
            if !self.liveness.is_alive() {
                break;
            }
            if let ConnectOutcome::SessionEnded(end) = &outcome {
                info!(reason = %end, "connection lost");
            }

            info!(delay = ?self.policy.reconnect_delay, "reconnecting after delay");
            if !self.liveness.sleep(self.policy.reconnect_delay).await {
                break;
            }
        }

        info!("frame client stopped");
    }

    /// One round of at most `max_retries` connection attempts.
    ///
    /// Returns as soon as a session has been established and has ended.
    pub async fn connect_with_retry(&mut self) -> ConnectOutcome {
        let max = self.policy.max_retries;
        let mut attempts = 0u32;

        while attempts < max && self.liveness.is_alive() {
            info!(
                url = self.connector.target(),
                attempt = attempts + 1,
                max_retries = max,
                "connecting"
            );

            let result = tokio::select! {
                biased;
                _ = self.liveness.cleared() => return ConnectOutcome::Cancelled,
                result = self.connector.connect() => result,
            };

            match result {
                Ok(transport) => {
                    let end = self.session.handle(transport).await;
                    return ConnectOutcome::SessionEnded(end);
                }
                Err(e) => {
                    attempts += 1;
                    warn!(
                        error = %e,
                        attempt = attempts,
                        max_retries = max,
                        delay = ?self.policy.retry_delay,
                        "connection failed"
                    );
                    if !self.liveness.sleep(self.policy.retry_delay).await {
                        return ConnectOutcome::Cancelled;
                    }
                }
            }
        }

        if attempts >= max {
            error!(max_retries = max, "maximum retries reached, giving up");
            self.liveness.shutdown();
            return ConnectOutcome::Exhausted { attempts };
        }
        ConnectOutcome::Cancelled
    }
}
