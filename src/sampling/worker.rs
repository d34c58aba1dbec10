use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::dataset::LogWriter;

use super::{MetricSnapshot, SampleRequest, SampleRequester, SnapshotBuilder};

enum WorkerCommand {
    Collect(SampleRequest),
    Shutdown,
}

/// Cloneable handle that enqueues snapshot requests for the worker thread.
#[derive(Clone)]
pub struct SampleQueue {
    sender: mpsc::Sender<WorkerCommand>,
}

impl SampleRequester for SampleQueue {
    fn request(&self, request: SampleRequest) {
        if self.sender.send(WorkerCommand::Collect(request)).is_err() {
            warn!(
                "sample worker is gone; dropping {} request",
                request.event.as_str()
            );
        }
    }
}

/// Single background thread that builds and writes snapshots strictly in
/// submission order.
pub struct SampleWorker {
    queue: SampleQueue,
    handle: Option<JoinHandle<()>>,
    finished_rx: mpsc::Receiver<()>,
    discard: Arc<AtomicBool>,
}

impl SampleWorker {
    pub fn spawn(builder: Arc<SnapshotBuilder>, writer: Arc<LogWriter>) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<WorkerCommand>();
        let (finished_tx, finished_rx) = mpsc::channel();
        let discard = Arc::new(AtomicBool::new(false));
        let discard_for_thread = discard.clone();

        let handle = thread::Builder::new()
            .name("handover-sampler".into())
            .spawn(move || {
                let mut skipped = 0usize;

                while let Ok(command) = command_rx.recv() {
                    match command {
                        WorkerCommand::Collect(request) => {
                            if discard_for_thread.load(Ordering::Acquire) {
                                skipped += 1;
                                continue;
                            }
                            let writer = writer.clone();
                            builder.collect(
                                request,
                                Box::new(move |snapshot: MetricSnapshot| {
                                    writer.append(&snapshot)
                                }),
                            );
                        }
                        WorkerCommand::Shutdown => break,
                    }
                }

                if skipped > 0 {
                    warn!("Discarded {skipped} queued samples after shutdown grace expired");
                }
                info!("Sample worker shutting down");
                let _ = finished_tx.send(());
            })
            .context("failed to spawn sample worker thread")?;

        Ok(Self {
            queue: SampleQueue { sender: command_tx },
            handle: Some(handle),
            finished_rx,
            discard,
        })
    }

    pub fn queue(&self) -> SampleQueue {
        self.queue.clone()
    }

    /// Lets the worker drain what is already queued for up to `grace`, then
    /// abandons the rest. Blocks the caller for at most `grace`.
    pub fn shutdown(mut self, grace: Duration) {
        if self.queue.sender.send(WorkerCommand::Shutdown).is_err() {
            error!("Sample worker exited before shutdown was requested");
        }

        match self.finished_rx.recv_timeout(grace) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.handle.take() {
                    if let Err(join_err) = handle.join() {
                        error!("Failed to join sample worker: {join_err:?}");
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.discard.store(true, Ordering::Release);
                warn!(
                    "Sample worker still busy after {}ms; discarding its backlog",
                    grace.as_millis()
                );
                // Detach: the in-flight sample finishes on its own and the
                // remaining queue is skipped.
                self.handle.take();
            }
        }
    }
}

impl Drop for SampleWorker {
    fn drop(&mut self) {
        // Dropped without `shutdown`: let the thread exit once it drains.
        if self.handle.take().is_some() {
            let _ = self.queue.sender.send(WorkerCommand::Shutdown);
        }
    }
}
