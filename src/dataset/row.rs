use crate::sampling::MetricSnapshot;

pub const HEADER: &str = "ts,event,transport,wifi_rssi,wifi_speed,\
lte_rsrp,lte_rsrq,lte_sinr,lte_rssi,\
ping_avg_ms,jitter_ms,loss_pct";

pub const COLUMN_COUNT: usize = 12;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Renders one snapshot as a CSV row. No field can contain a comma, so
/// nothing is quoted.
pub fn format_row(snapshot: &MetricSnapshot) -> String {
    [
        snapshot.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        snapshot.event.as_str().to_string(),
        snapshot.transport.as_str().to_string(),
        snapshot.wifi_rssi.to_string(),
        snapshot.wifi_link_speed_mbps.to_string(),
        snapshot.lte.rsrp.to_string(),
        snapshot.lte.rsrq.to_string(),
        snapshot.lte.sinr.to_string(),
        snapshot.lte.rssi.to_string(),
        snapshot.ping.avg_ms.to_string(),
        snapshot.ping.jitter_ms.to_string(),
        format_pct(snapshot.ping.loss_pct),
    ]
    .join(",")
}

/// Always keeps a fractional part so the column reads as a float (`4.0`).
fn format_pct(value: f32) -> String {
    let text = value.to_string();
    if text.contains('.') || !value.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, TimeZone};

    use super::*;
    use crate::platform::LteSignal;
    use crate::sampling::{EventTag, PingStats};
    use crate::transport::Transport;

    fn sample() -> MetricSnapshot {
        let timestamp = Local
            .with_ymd_and_hms(2024, 5, 17, 9, 3, 7)
            .unwrap()
            + chrono::Duration::milliseconds(42);
        MetricSnapshot {
            timestamp,
            event: EventTag::Post,
            transport: Transport::Cellular,
            wifi_rssi: 0,
            wifi_link_speed_mbps: 0,
            lte: LteSignal {
                rsrp: -101,
                rsrq: -12,
                sinr: 4,
                rssi: -71,
            },
            ping: PingStats {
                avg_ms: 25,
                jitter_ms: 3,
                loss_pct: 4.0,
            },
        }
    }

    #[test]
    fn header_has_twelve_columns() {
        assert_eq!(HEADER.split(',').count(), COLUMN_COUNT);
        assert!(HEADER.starts_with("ts,event,transport,wifi_rssi,"));
        assert!(HEADER.ends_with(",ping_avg_ms,jitter_ms,loss_pct"));
    }

    #[test]
    fn row_matches_header_order() {
        assert_eq!(
            format_row(&sample()),
            "2024-05-17 09:03:07.042,POST,cellular,0,0,-101,-12,4,-71,25,3,4.0"
        );
    }

    #[test]
    fn unmeasured_ping_uses_sentinels() {
        let snapshot = MetricSnapshot {
            ping: PingStats::unmeasured(),
            ..sample()
        };
        let row = format_row(&snapshot);
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), COLUMN_COUNT);
        assert_eq!(&fields[9..], ["-1", "-1", "-1.0"]);
        assert_eq!(fields[5], "-101");
    }

    #[test]
    fn fractional_loss_kept_as_is() {
        assert_eq!(format_pct(2.5), "2.5");
        assert_eq!(format_pct(100.0), "100.0");
    }
}
