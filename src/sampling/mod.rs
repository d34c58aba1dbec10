pub mod builder;
pub mod probe;
pub mod snapshot;
pub mod worker;

pub use builder::{SnapshotBuilder, SnapshotSink};
pub use probe::{parse_ping_summary, LatencyProbe, PingProbe};
pub use snapshot::{EventTag, MetricSnapshot, PingStats, SampleRequest, SampleRequester};
pub use worker::{SampleQueue, SampleWorker};
