use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::platform::NetworkHandle;
use crate::sampling::{SampleRequest, SampleRequester};
use crate::transport::{TransitionOutcome, TransportTracker};
use crate::utils::now_epoch_ms;

use super::AdaptiveScheduler;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Single logical queue for timer ticks and network notifications. Neither
/// path does I/O here; both only enqueue work for the sample worker.
pub async fn control_loop(
    scheduler: AdaptiveScheduler,
    tracker: TransportTracker,
    requests: Arc<dyn SampleRequester>,
    mut network_events: UnboundedReceiver<NetworkHandle>,
    cancel_token: CancellationToken,
) {
    let tick = time::sleep(scheduler.initial_delay());
    tokio::pin!(tick);
    let mut events_open = true;

    loop {
        tokio::select! {
            // Shutdown wins over a tick that is due at the same moment.
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("control loop shutting down");
                break;
            }
            _ = &mut tick => {
                requests.request(SampleRequest::normal());
                let delay = scheduler.next_delay(now_epoch_ms());
                log_debug!("next tick in {}ms", delay.as_millis());
                tick.as_mut().reset(Instant::now() + delay);
            }
            event = network_events.recv(), if events_open => {
                match event {
                    Some(network) => {
                        if let TransitionOutcome::Transitioned { from, to } =
                            tracker.on_network_available(&network)
                        {
                            log_debug!("queued PRE/POST for {from} -> {to}");
                        }
                    }
                    None => {
                        log_warn!("network event channel closed; sampling continues on timer only");
                        events_open = false;
                    }
                }
            }
        }
    }
}
