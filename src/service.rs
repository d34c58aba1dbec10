use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use log::{error, info, warn};
use tokio::sync::mpsc;

use crate::dataset::LogWriter;
use crate::platform::Collaborators;
use crate::sampling::{LatencyProbe, PingProbe, SampleWorker, SnapshotBuilder};
use crate::scheduler::{AdaptiveScheduler, SamplerController};
use crate::settings::LoggerSettings;
use crate::transport::{LinkState, Transport, TransportTracker};

/// Lifecycle shell around the sampler: `start()` wires collaborators, worker
/// and control loop together; `stop()` tears them down in reverse.
pub struct HandoverService {
    settings: LoggerSettings,
    collaborators: Collaborators,
    probe: Arc<dyn LatencyProbe>,
    link: Arc<LinkState>,
    writer: Arc<LogWriter>,
    controller: SamplerController,
    worker: Option<SampleWorker>,
}

impl HandoverService {
    pub fn new(settings: LoggerSettings, collaborators: Collaborators) -> Self {
        let probe = Arc::new(PingProbe::new(
            collaborators.launcher.clone(),
            settings.ping_target.clone(),
            settings.ping_count,
        ));
        Self::with_probe(settings, collaborators, probe)
    }

    /// Same as [`HandoverService::new`] with a caller-supplied latency probe.
    pub fn with_probe(
        settings: LoggerSettings,
        collaborators: Collaborators,
        probe: Arc<dyn LatencyProbe>,
    ) -> Self {
        let writer = Arc::new(LogWriter::new(settings.log_path.clone()));
        Self {
            settings,
            collaborators,
            probe,
            link: Arc::new(LinkState::new()),
            writer,
            controller: SamplerController::new(),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn current_transport(&self) -> Transport {
        self.link.current_transport()
    }

    /// Must be called from within a tokio runtime.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            bail!("handover service already running");
        }

        match self.writer.ensure_header() {
            Ok(true) => {}
            Ok(false) => info!("Appending to existing log {}", self.writer.path().display()),
            // Rows keep flowing even if the header cannot be written now.
            Err(err) => error!("Failed to prepare log: {err:#}"),
        }

        let builder = Arc::new(SnapshotBuilder::new(
            &self.collaborators,
            self.probe.clone(),
            self.link.clone(),
        ));
        let worker = SampleWorker::spawn(builder, self.writer.clone())?;
        let requests = Arc::new(worker.queue());

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let subscribed = self.collaborators.network.subscribe(Box::new(move |network| {
            // The receiver only disappears once the service is stopping.
            let _ = event_tx.send(network);
        }));
        if let Err(err) = subscribed {
            worker.shutdown(self.settings.shutdown_grace());
            return Err(err.context("failed to subscribe to network state"));
        }

        let tracker = TransportTracker::new(
            self.collaborators.network.clone(),
            self.link.clone(),
            requests.clone(),
            self.settings.focus_window_ms,
        );
        let scheduler = AdaptiveScheduler::new(self.link.clone(), &self.settings);

        if let Err(err) = self
            .controller
            .start(scheduler, tracker, requests, event_rx)
        {
            self.collaborators.network.unsubscribe();
            worker.shutdown(self.settings.shutdown_grace());
            return Err(err);
        }

        self.worker = Some(worker);
        info!(
            "Handover logging started -> {}",
            self.writer.path().display()
        );
        Ok(())
    }

    /// Stops ticking, unsubscribes, then drains the worker within the grace
    /// period. Calling it on a stopped service does nothing.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        let stopped = self.controller.stop().await;
        self.collaborators.network.unsubscribe();

        let grace = self.settings.shutdown_grace();
        tokio::task::spawn_blocking(move || worker.shutdown(grace))
            .await
            .map_err(|err| anyhow!("sample worker shutdown panicked: {err}"))?;

        if let Err(err) = &stopped {
            warn!("Control loop ended abnormally: {err:#}");
        }
        info!("Handover logging stopped");
        stopped
    }
}
