//! Round-trip latency measurement through the system `ping` utility.
//!
//! The summary lines `ping -q` prints are the only thing read:
//!
//! ```text
//! 50 packets transmitted, 48 received, 4% packet loss, time 49068ms
//! rtt min/avg/max/mdev = 10.123/25.456/40.789/3.663 ms
//! ```
//!
//! BusyBox and BSD builds print `round-trip` instead of `rtt`. The format is
//! locale dependent, which is why the rest of the crate only sees the
//! [`LatencyProbe`] trait.

use std::sync::Arc;

use crate::platform::ProcessLauncher;

use super::PingStats;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub trait LatencyProbe: Send + Sync {
    /// Blocking; bounded only by the probe's own runtime.
    fn measure(&self) -> PingStats;
}

pub struct PingProbe {
    launcher: Arc<dyn ProcessLauncher>,
    target: String,
    count: u32,
}

impl PingProbe {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, target: impl Into<String>, count: u32) -> Self {
        Self {
            launcher,
            target: target.into(),
            count,
        }
    }

    fn args(&self) -> Vec<String> {
        vec![
            "-c".into(),
            self.count.to_string(),
            "-q".into(),
            self.target.clone(),
        ]
    }
}

impl LatencyProbe for PingProbe {
    fn measure(&self) -> PingStats {
        match self.launcher.run("ping", &self.args()) {
            Ok(lines) => {
                let stats = parse_ping_summary(lines.iter().map(String::as_str));
                log_debug!("ping {} -> {stats:?}", self.target);
                stats
            }
            Err(err) => {
                log_warn!("ping {} failed: {err:#}", self.target);
                PingStats::unmeasured()
            }
        }
    }
}

/// Extracts loss, average RTT and mdev from `ping -q` output. Fields that are
/// missing or unparsable stay at `-1`.
pub fn parse_ping_summary<'a>(lines: impl IntoIterator<Item = &'a str>) -> PingStats {
    let mut stats = PingStats::unmeasured();

    for line in lines {
        if line.contains("packets transmitted") {
            if let Some(loss) = parse_loss(line) {
                stats.loss_pct = loss;
            }
        }

        if line.starts_with("rtt ") || line.starts_with("round-trip") {
            let (avg, jitter) = parse_rtt(line);
            if let Some(avg) = avg {
                stats.avg_ms = avg;
            }
            if let Some(jitter) = jitter {
                stats.jitter_ms = jitter;
            }
        }
    }

    stats
}

fn parse_loss(line: &str) -> Option<f32> {
    let field = line.split(',').nth(2)?.trim();
    let number = field.split('%').next()?;
    number.trim().parse().ok()
}

fn parse_rtt(line: &str) -> (Option<i32>, Option<i32>) {
    let Some((_, values)) = line.split_once('=') else {
        return (None, None);
    };
    let values: Vec<&str> = values.trim().split('/').collect();

    let avg = values.get(1).and_then(|v| truncate_ms(v));
    let jitter = values
        .get(3)
        .and_then(|v| truncate_ms(v.trim().trim_end_matches("ms")));
    (avg, jitter)
}

fn truncate_ms(value: &str) -> Option<i32> {
    let ms: f32 = value.trim().parse().ok()?;
    // `as` truncates toward zero, which is the intended rounding.
    Some(ms as i32)
}
