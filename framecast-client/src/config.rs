//! Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use framecast_core::{FrameDecoder, ImageFrameDecoder, ReconnectPolicy, ZstdFrameDecoder};

/// Top-level configuration for the viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Network settings.
    pub network: NetworkConfig,
    /// Reconnect policy.
    pub reconnect: ReconnectConfig,
    /// Keepalive pings.
    pub keepalive: KeepaliveConfig,
    /// Frame payload format.
    pub frames: FramesConfig,
    /// Frame buffering between network and renderer.
    pub buffer: BufferConfig,
    /// Display settings.
    pub display: DisplayConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Publisher endpoint, e.g. `ws://10.0.0.5:8765`.
    pub server_url: String,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

/// Reconnect settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Failed attempts before giving up for good.
    pub max_retries: u32,
    /// Delay between failed attempts.
    pub retry_delay_ms: u64,
    /// Delay before reconnecting after a session ends.
    pub reconnect_delay_ms: u64,
}

/// Keepalive settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepaliveConfig {
    /// Seconds between `ping` messages.
    pub interval_secs: u64,
}

/// Encoding of the `data` field of `frame` messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    /// JPEG or PNG, detected per frame.
    #[default]
    Image,
    /// Width/height header followed by zstd-compressed BGRA8.
    Zstd,
}

/// Frame payload settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesConfig {
    /// Payload format sent by the publisher.
    pub format: FrameFormat,
}

/// Buffering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Max buffered frames before the oldest is dropped.
    pub capacity: usize,
    /// How long the renderer waits for a frame before re-polling.
    pub poll_timeout_ms: u64,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Seconds between stream statistics lines.
    pub stats_interval_secs: u64,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8765".into(),
            connect_timeout_ms: 5000,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 3000,
            reconnect_delay_ms: 5000,
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            poll_timeout_ms: 100,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            stats_interval_secs: 1,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Reconnect timings for the supervisor.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            max_retries: self.reconnect.max_retries,
            retry_delay: Duration::from_millis(self.reconnect.retry_delay_ms),
            reconnect_delay: Duration::from_millis(self.reconnect.reconnect_delay_ms),
        }
    }

    /// Decoder for the configured payload format.
    pub fn frame_decoder(&self) -> Box<dyn FrameDecoder> {
        match self.frames.format {
            FrameFormat::Image => Box::new(ImageFrameDecoder::new()),
            FrameFormat::Zstd => Box::new(ZstdFrameDecoder::new()),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.network.connect_timeout_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        // A zero period would make `tokio::time::interval` panic.
        Duration::from_secs(self.keepalive.interval_secs.max(1))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.buffer.poll_timeout_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.display.stats_interval_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────
