pub mod logging;

/// Milliseconds since the Unix epoch, the unit every deadline in the crate uses.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
