//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a settings
//! file may specify any subset of fields and the rest keep their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_core::constants::{
    DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY_MS,
    DEFAULT_REPLAY_CAPACITY,
};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "sustainer": { "maxAttempts": 8, "reconnectDelayMs": 500 },
///   "replay": { "capacity": 250 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TetherSettings {
    /// Reconnection policy.
    pub sustainer: SustainerSettings,
    /// Replay cache sizing.
    pub replay: ReplaySettings,
    /// Keep-alive pings on open sockets.
    pub heartbeat: HeartbeatSettings,
    /// WebSocket socket tuning.
    pub socket: SocketSettings,
}

impl TetherSettings {
    /// Reject values that would make the transport unusable.
    pub fn validate(&self) -> Result<()> {
        if self.sustainer.max_attempts == 0 {
            return Err(SettingsError::InvalidValue(
                "sustainer.maxAttempts must be at least 1".into(),
            ));
        }
        if self.replay.capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "replay.capacity must be at least 1".into(),
            ));
        }
        if self.socket.outbound_buffer == 0 {
            return Err(SettingsError::InvalidValue(
                "socket.outboundBuffer must be at least 1".into(),
            ));
        }
        if self.heartbeat.enabled && self.heartbeat.interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "heartbeat.intervalMs must be positive when the heartbeat is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Bounded-retry reconnection policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SustainerSettings {
    /// Reconnection attempts allowed without an intervening successful open.
    pub max_attempts: u32,
    /// Fixed delay before each reconnection attempt.
    pub reconnect_delay_ms: u64,
}

impl SustainerSettings {
    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for SustainerSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

/// Replay cache sizing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplaySettings {
    /// Maximum messages held per logical endpoint (hard cap).
    pub capacity: usize,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_REPLAY_CAPACITY,
        }
    }
}

/// Heartbeat ping configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeartbeatSettings {
    /// Whether pings are sent at all.
    pub enabled: bool,
    /// Interval between pings.
    pub interval_ms: u64,
}

impl HeartbeatSettings {
    /// Ping interval, or `None` when the heartbeat is off.
    pub fn interval(&self) -> Option<Duration> {
        (self.enabled && self.interval_ms > 0).then(|| Duration::from_millis(self.interval_ms))
    }
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
        }
    }
}

/// WebSocket socket tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocketSettings {
    /// Capacity of the per-socket outbound channel. A full channel counts as a
    /// failed send.
    pub outbound_buffer: usize,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
