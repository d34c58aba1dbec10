//! The fused record produced once per sampling trigger.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::platform::LteSignal;
use crate::transport::Transport;

/// Why a sample was taken.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventTag {
    /// Periodic tick of the scheduler.
    Normal,
    /// Taken just before a handover is applied.
    Pre,
    /// Taken just after a handover is applied.
    Post,
}

impl EventTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventTag::Normal => "NORMAL",
            EventTag::Pre => "PRE",
            EventTag::Post => "POST",
        }
    }
}

/// Latency probe result; every field is `-1` when not measured.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PingStats {
    pub avg_ms: i32,
    pub jitter_ms: i32,
    pub loss_pct: f32,
}

impl PingStats {
    pub const fn unmeasured() -> Self {
        Self {
            avg_ms: -1,
            jitter_ms: -1,
            loss_pct: -1.0,
        }
    }
}

impl Default for PingStats {
    fn default() -> Self {
        Self::unmeasured()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSnapshot {
    pub timestamp: DateTime<Local>,
    pub event: EventTag,
    pub transport: Transport,
    /// dBm, 0 when unavailable.
    pub wifi_rssi: i32,
    pub wifi_link_speed_mbps: i32,
    pub lte: LteSignal,
    pub ping: PingStats,
}

/// A queued request for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRequest {
    pub event: EventTag,
    /// Transport to stamp on the record. `None` reads the tracked transport
    /// when the snapshot is assembled.
    pub transport: Option<Transport>,
}

impl SampleRequest {
    pub fn normal() -> Self {
        Self {
            event: EventTag::Normal,
            transport: None,
        }
    }

    pub fn pinned(event: EventTag, transport: Transport) -> Self {
        Self {
            event,
            transport: Some(transport),
        }
    }
}

/// Anything that accepts snapshot requests without blocking the caller.
pub trait SampleRequester: Send + Sync {
    fn request(&self, request: SampleRequest);
}
