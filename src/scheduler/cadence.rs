use std::{sync::Arc, time::Duration};

use crate::settings::LoggerSettings;
use crate::transport::LinkState;

/// Picks the delay before the next periodic sample: fast while a handover's
/// focus window is open, normal otherwise.
#[derive(Debug, Clone)]
pub struct AdaptiveScheduler {
    link: Arc<LinkState>,
    normal_interval: Duration,
    focus_interval: Duration,
}

impl AdaptiveScheduler {
    pub fn new(link: Arc<LinkState>, settings: &LoggerSettings) -> Self {
        Self {
            link,
            normal_interval: settings.normal_interval(),
            focus_interval: settings.focus_interval(),
        }
    }

    /// Delay before the first tick; the loop always starts at normal cadence.
    pub fn initial_delay(&self) -> Duration {
        self.normal_interval
    }

    pub fn next_delay(&self, now_ms: i64) -> Duration {
        if self.link.snapshot().in_focus(now_ms) {
            self.focus_interval
        } else {
            self.normal_interval
        }
    }
}
