pub mod dataset;
pub mod platform;
pub mod sampling;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod transport;
pub mod utils;

pub use service::HandoverService;
pub use settings::LoggerSettings;

/// Runs the sampler on this Linux host until Ctrl-C.
pub async fn run(settings: LoggerSettings) -> anyhow::Result<()> {
    log::info!("Handover logger starting up...");

    let collaborators = platform::linux::collaborators(settings.poll_interval());
    let mut service = HandoverService::new(settings, collaborators);
    service.start().await?;

    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {err}");
    }

    log::info!("Shutdown requested");
    service.stop().await
}
