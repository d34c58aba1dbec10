//! Collaborator interfaces the sampler consumes from its host.
//!
//! The core never talks to the OS directly. A host shell (the Linux adapter in
//! [`linux`], or an embedding mobile app) supplies one implementation of each
//! trait and bundles them into [`Collaborators`].

pub mod linux;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a network as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkHandle(pub String);

impl NetworkHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportType {
    Wifi,
    Cellular,
    Ethernet,
    Bluetooth,
    Vpn,
}

/// Capability set of one network, reduced to the transports it runs over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkCapabilities {
    transports: Vec<TransportType>,
}

impl NetworkCapabilities {
    pub fn new(transports: impl IntoIterator<Item = TransportType>) -> Self {
        Self {
            transports: transports.into_iter().collect(),
        }
    }

    pub fn has_transport(&self, transport: TransportType) -> bool {
        self.transports.contains(&transport)
    }
}

pub type NetworkCallback = Box<dyn Fn(NetworkHandle) + Send + Sync + 'static>;

/// Source of "a candidate network became available" events.
pub trait NetworkStateSource: Send + Sync {
    /// Registers the single listener. Callbacks may arrive on any thread.
    fn subscribe(&self, callback: NetworkCallback) -> Result<()>;

    /// Drops the listener. Calling it without a subscription is a no-op.
    fn unsubscribe(&self);

    /// `None` when the host has no capability information for the network.
    fn capabilities(&self, network: &NetworkHandle) -> Option<NetworkCapabilities>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiLinkInfo {
    pub rssi_dbm: i32,
    pub link_speed_mbps: i32,
}

pub trait WifiLinkSource: Send + Sync {
    /// `Ok(None)` when no wireless link is associated.
    fn connection_info(&self) -> Result<Option<WifiLinkInfo>>;
}

/// Signal quality of an LTE serving/neighbour cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LteSignal {
    pub rsrp: i32,
    pub rsrq: i32,
    pub sinr: i32,
    pub rssi: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellInfo {
    Gsm,
    Wcdma,
    Lte(LteSignal),
    Nr,
}

impl CellInfo {
    /// Signal of the first LTE entry, or all zeros when none is visible.
    pub fn first_lte(cells: &[CellInfo]) -> LteSignal {
        cells
            .iter()
            .find_map(|cell| match cell {
                CellInfo::Lte(signal) => Some(*signal),
                _ => None,
            })
            .unwrap_or_default()
    }
}

pub type CellInfoCallback = Box<dyn FnOnce(Vec<CellInfo>) + Send + 'static>;

pub trait CellInfoSource: Send + Sync {
    /// Synchronous snapshot of every cell the modem reports.
    fn all_cell_info(&self) -> Result<Vec<CellInfo>>;

    /// Whether [`CellInfoSource::request_cell_info_update`] is usable.
    fn supports_async(&self) -> bool {
        false
    }

    /// Asks the modem for fresh cell info; `callback` runs on the host's
    /// thread once it arrives.
    fn request_cell_info_update(&self, callback: CellInfoCallback) -> Result<()> {
        callback(self.all_cell_info()?);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    FineLocation,
    CoarseLocation,
    ReadPhoneState,
    NearbyWifiDevices,
}

pub trait PermissionOracle: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

/// Runs an external program and returns its stdout split into lines.
pub trait ProcessLauncher: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<Vec<String>>;
}

/// Everything the sampler needs from its host.
#[derive(Clone)]
pub struct Collaborators {
    pub network: Arc<dyn NetworkStateSource>,
    pub wifi: Arc<dyn WifiLinkSource>,
    pub cells: Arc<dyn CellInfoSource>,
    pub permissions: Arc<dyn PermissionOracle>,
    pub launcher: Arc<dyn ProcessLauncher>,
}
