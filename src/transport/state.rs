use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Unknown,
    Wifi,
    Cellular,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Unknown => "unknown",
            Transport::Wifi => "wifi",
            Transport::Cellular => "cellular",
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current transport plus the fast-cadence deadline. Both change together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub transport: Transport,
    /// Epoch milliseconds; `None` until the first handover.
    pub focus_until_ms: Option<i64>,
}

impl LinkSnapshot {
    pub fn in_focus(&self, now_ms: i64) -> bool {
        self.focus_until_ms
            .map(|deadline| now_ms < deadline)
            .unwrap_or(false)
    }
}

/// The crate's only shared mutable state, written by the tracker and read by
/// the scheduler and the snapshot builder.
#[derive(Debug, Default)]
pub struct LinkState {
    inner: Mutex<LinkSnapshot>,
}

impl LinkState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LinkSnapshot> {
        // The guarded value is plain data; a panic elsewhere cannot leave it torn.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        *self.lock()
    }

    pub fn current_transport(&self) -> Transport {
        self.lock().transport
    }

    /// Moves to `next` and opens a focus window ending at `focus_until_ms`,
    /// unless `next` is `Unknown` or already current. Returns the transport
    /// that was replaced.
    pub fn transition(&self, next: Transport, focus_until_ms: i64) -> Option<Transport> {
        let mut guard = self.lock();
        if next == Transport::Unknown || next == guard.transport {
            return None;
        }

        let previous = guard.transport;
        *guard = LinkSnapshot {
            transport: next,
            focus_until_ms: Some(focus_until_ms),
        };
        Some(previous)
    }
}
