use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};

use crate::platform::{
    CellInfo, CellInfoSource, Collaborators, LteSignal, Permission, PermissionOracle,
    WifiLinkSource,
};
use crate::transport::LinkState;

use super::{LatencyProbe, MetricSnapshot, PingStats, SampleRequest};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

pub type SnapshotSink = Box<dyn FnOnce(MetricSnapshot) + Send + 'static>;

/// Gathers WiFi, latency and cellular readings into one [`MetricSnapshot`].
///
/// Runs on the sample worker. A failing source only blanks its own fields.
pub struct SnapshotBuilder {
    wifi: Arc<dyn WifiLinkSource>,
    cells: Arc<dyn CellInfoSource>,
    permissions: Arc<dyn PermissionOracle>,
    probe: Arc<dyn LatencyProbe>,
    link: Arc<LinkState>,
}

impl SnapshotBuilder {
    pub fn new(
        collaborators: &Collaborators,
        probe: Arc<dyn LatencyProbe>,
        link: Arc<LinkState>,
    ) -> Self {
        Self {
            wifi: collaborators.wifi.clone(),
            cells: collaborators.cells.clone(),
            permissions: collaborators.permissions.clone(),
            probe,
            link,
        }
    }

    /// Builds the snapshot for `request` and hands it to `on_complete`.
    ///
    /// On the async cellular path `on_complete` runs later, on whatever thread
    /// the cell-info source calls back on, so completions from that path are
    /// not ordered against snapshots finished on the worker.
    pub fn collect(&self, request: SampleRequest, on_complete: SnapshotSink) {
        let partial = PartialSnapshot {
            timestamp: Local::now(),
            request,
            wifi: self.read_wifi(),
            ping: self.probe.measure(),
            link: self.link.clone(),
        };

        if !self.cell_permissions_granted() {
            on_complete(partial.finish(LteSignal::default()));
            return;
        }

        if self.cells.supports_async() {
            // The callback may never fire if the source drops it; the sample
            // is then lost, like any other dropped write.
            let pending = Arc::new(Mutex::new(Some((partial, on_complete))));
            let for_callback = pending.clone();
            let issued = self
                .cells
                .request_cell_info_update(Box::new(move |cells: Vec<CellInfo>| {
                    if let Some((partial, on_complete)) = take_pending(&for_callback) {
                        on_complete(partial.finish(CellInfo::first_lte(&cells)));
                    }
                }));

            if let Err(err) = issued {
                log_warn!("async cell info request failed: {err:#}");
                if let Some((partial, on_complete)) = take_pending(&pending) {
                    on_complete(partial.finish(LteSignal::default()));
                }
            }
            return;
        }

        let lte = match self.cells.all_cell_info() {
            Ok(cells) => CellInfo::first_lte(&cells),
            Err(err) => {
                log_warn!("cell info query failed: {err:#}");
                LteSignal::default()
            }
        };
        on_complete(partial.finish(lte));
    }

    fn read_wifi(&self) -> (i32, i32) {
        if !self.permissions.is_granted(Permission::NearbyWifiDevices) {
            log_debug!("wifi stats skipped: permission not granted");
            return (0, 0);
        }

        match self.wifi.connection_info() {
            Ok(Some(info)) => (info.rssi_dbm, info.link_speed_mbps),
            Ok(None) => (0, 0),
            Err(err) => {
                log_warn!("wifi link query failed: {err:#}");
                (0, 0)
            }
        }
    }

    fn cell_permissions_granted(&self) -> bool {
        let location = self.permissions.is_granted(Permission::FineLocation)
            || self.permissions.is_granted(Permission::CoarseLocation);
        location && self.permissions.is_granted(Permission::ReadPhoneState)
    }
}

type Pending = Mutex<Option<(PartialSnapshot, SnapshotSink)>>;

/// Whichever of the callback and the error path gets here first completes the
/// snapshot; the other finds nothing.
fn take_pending(pending: &Pending) -> Option<(PartialSnapshot, SnapshotSink)> {
    match pending.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

/// Everything except the cellular readings, waiting for them to arrive.
struct PartialSnapshot {
    timestamp: DateTime<Local>,
    request: SampleRequest,
    wifi: (i32, i32),
    ping: PingStats,
    link: Arc<LinkState>,
}

impl PartialSnapshot {
    fn finish(self, lte: LteSignal) -> MetricSnapshot {
        let transport = self
            .request
            .transport
            .unwrap_or_else(|| self.link.current_transport());

        MetricSnapshot {
            timestamp: self.timestamp,
            event: self.request.event,
            transport,
            wifi_rssi: self.wifi.0,
            wifi_link_speed_mbps: self.wifi.1,
            lte,
            ping: self.ping,
        }
    }
}
