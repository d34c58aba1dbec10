use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use handover_logger_lib::LoggerSettings;

#[derive(Parser)]
#[command(name = "handover-logger")]
#[command(about = "Record network handovers and link quality to a CSV dataset")]
#[command(version)]
struct Cli {
    /// JSON settings file; missing fields take their defaults.
    #[arg(long, env = "HANDOVER_LOGGER_CONFIG", default_value = "handover_logger.json")]
    config: PathBuf,

    /// Dataset CSV to append to.
    #[arg(long, env = "HANDOVER_LOGGER_OUTPUT")]
    output: Option<PathBuf>,

    /// Host to ping for latency, jitter and loss.
    #[arg(long)]
    ping_target: Option<String>,

    /// Echo requests per latency probe.
    #[arg(long)]
    ping_count: Option<u32>,
}

impl Cli {
    fn apply(self, mut settings: LoggerSettings) -> LoggerSettings {
        if let Some(output) = self.output {
            settings.log_path = output;
        }
        if let Some(target) = self.ping_target {
            settings.ping_target = target;
        }
        if let Some(count) = self.ping_count {
            settings.ping_count = count;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let settings = LoggerSettings::load(&cli.config)?;
    handover_logger_lib::run(cli.apply(settings)).await
}
