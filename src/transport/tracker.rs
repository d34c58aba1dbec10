use std::sync::Arc;

use crate::platform::{NetworkCapabilities, NetworkHandle, NetworkStateSource, TransportType};
use crate::sampling::{EventTag, SampleRequest, SampleRequester};
use crate::utils::now_epoch_ms;

use super::{LinkState, Transport};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Duplicate of the current transport, or nothing recognisable.
    Ignored,
    Transitioned { from: Transport, to: Transport },
}

/// Turns "network available" notifications into handover events.
pub struct TransportTracker {
    network: Arc<dyn NetworkStateSource>,
    link: Arc<LinkState>,
    requests: Arc<dyn SampleRequester>,
    focus_window_ms: i64,
}

impl TransportTracker {
    pub fn new(
        network: Arc<dyn NetworkStateSource>,
        link: Arc<LinkState>,
        requests: Arc<dyn SampleRequester>,
        focus_window_ms: u64,
    ) -> Self {
        Self {
            network,
            link,
            requests,
            focus_window_ms: i64::try_from(focus_window_ms).unwrap_or(i64::MAX),
        }
    }

    pub fn on_network_available(&self, network: &NetworkHandle) -> TransitionOutcome {
        self.on_network_available_at(network, now_epoch_ms())
    }

    pub(crate) fn on_network_available_at(
        &self,
        network: &NetworkHandle,
        now_ms: i64,
    ) -> TransitionOutcome {
        let resolved = resolve_transport(self.network.capabilities(network).as_ref());
        let deadline = now_ms.saturating_add(self.focus_window_ms);

        // The compare and the update happen under one lock; PRE is pinned to
        // the replaced transport so it does not matter that it is queued after.
        let Some(previous) = self.link.transition(resolved, deadline) else {
            log_debug!("network {} resolved to {resolved}; no handover", network.0);
            return TransitionOutcome::Ignored;
        };

        self.requests
            .request(SampleRequest::pinned(EventTag::Pre, previous));
        self.requests
            .request(SampleRequest::pinned(EventTag::Post, resolved));

        log_info!(
            "handover {previous} -> {resolved} on {}; focus until {deadline}",
            network.0
        );

        TransitionOutcome::Transitioned {
            from: previous,
            to: resolved,
        }
    }
}

/// WiFi wins over cellular when a network reports both.
pub fn resolve_transport(capabilities: Option<&NetworkCapabilities>) -> Transport {
    match capabilities {
        Some(caps) if caps.has_transport(TransportType::Wifi) => Transport::Wifi,
        Some(caps) if caps.has_transport(TransportType::Cellular) => Transport::Cellular,
        _ => Transport::Unknown,
    }
}
