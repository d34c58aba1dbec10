use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::platform::NetworkHandle;
use crate::sampling::SampleRequester;
use crate::transport::TransportTracker;

use super::loop_worker::control_loop;
use super::AdaptiveScheduler;

/// Owns the control loop task and its cancellation.
pub struct SamplerController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SamplerController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start(
        &mut self,
        scheduler: AdaptiveScheduler,
        tracker: TransportTracker,
        requests: Arc<dyn SampleRequester>,
        network_events: UnboundedReceiver<NetworkHandle>,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("sampler already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(control_loop(
            scheduler,
            tracker,
            requests,
            network_events,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        info!("Sampler control loop started");
        Ok(())
    }

    /// Cancels the loop and waits for it, so no tick fires after this returns.
    /// Safe to call repeatedly.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sampler control loop failed to join")
        } else {
            Ok(())
        }
    }
}

impl Drop for SamplerController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

impl Default for SamplerController {
    fn default() -> Self {
        Self::new()
    }
}
