//! Drives the whole service against in-memory collaborators.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use handover_logger_lib::dataset::{COLUMN_COUNT, HEADER};
use handover_logger_lib::platform::{
    CellInfo, CellInfoCallback, CellInfoSource, Collaborators, LteSignal, NetworkCallback,
    NetworkCapabilities, NetworkHandle, NetworkStateSource, Permission, PermissionOracle,
    ProcessLauncher, TransportType, WifiLinkInfo, WifiLinkSource,
};
use handover_logger_lib::transport::Transport;
use handover_logger_lib::{HandoverService, LoggerSettings};

#[derive(Default)]
struct FakeNetworks {
    callback: Mutex<Option<NetworkCallback>>,
    caps: HashMap<String, NetworkCapabilities>,
    unsubscribed: Mutex<bool>,
}

impl FakeNetworks {
    fn new() -> Self {
        let mut caps = HashMap::new();
        caps.insert(
            "wlan0".to_string(),
            NetworkCapabilities::new([TransportType::Wifi]),
        );
        caps.insert(
            "rmnet0".to_string(),
            NetworkCapabilities::new([TransportType::Cellular]),
        );
        caps.insert(
            "eth0".to_string(),
            NetworkCapabilities::new([TransportType::Ethernet]),
        );
        Self {
            caps,
            ..Self::default()
        }
    }

    fn emit(&self, id: &str) {
        if let Some(callback) = self.callback.lock().unwrap().as_ref() {
            callback(NetworkHandle::new(id));
        }
    }
}

impl NetworkStateSource for FakeNetworks {
    fn subscribe(&self, callback: NetworkCallback) -> Result<()> {
        *self.callback.lock().unwrap() = Some(callback);
        Ok(())
    }

    fn unsubscribe(&self) {
        self.callback.lock().unwrap().take();
        *self.unsubscribed.lock().unwrap() = true;
    }

    fn capabilities(&self, network: &NetworkHandle) -> Option<NetworkCapabilities> {
        self.caps.get(&network.0).cloned()
    }
}

struct FakeWifi;

impl WifiLinkSource for FakeWifi {
    fn connection_info(&self) -> Result<Option<WifiLinkInfo>> {
        Ok(Some(WifiLinkInfo {
            rssi_dbm: -58,
            link_speed_mbps: 300,
        }))
    }
}

struct FakeCells;

impl CellInfoSource for FakeCells {
    fn all_cell_info(&self) -> Result<Vec<CellInfo>> {
        Ok(vec![CellInfo::Lte(LteSignal {
            rsrp: -97,
            rsrq: -11,
            sinr: 6,
            rssi: -69,
        })])
    }

    fn supports_async(&self) -> bool {
        false
    }

    fn request_cell_info_update(&self, callback: CellInfoCallback) -> Result<()> {
        callback(self.all_cell_info()?);
        Ok(())
    }
}

struct Granted(bool);

impl PermissionOracle for Granted {
    fn is_granted(&self, _permission: Permission) -> bool {
        self.0
    }
}

/// Answers `ping` with a canned summary, or fails every launch.
struct FakePing(bool);

impl ProcessLauncher for FakePing {
    fn run(&self, program: &str, _args: &[String]) -> Result<Vec<String>> {
        if !self.0 {
            anyhow::bail!("{program}: not found");
        }
        Ok(vec![
            "--- 8.8.8.8 ping statistics ---".to_string(),
            "50 packets transmitted, 48 received, 4% packet loss, time 49068ms".to_string(),
            "rtt min/avg/max/mdev = 10.123/25.456/40.789/3.663 ms".to_string(),
        ])
    }
}

fn settings(path: &Path) -> LoggerSettings {
    LoggerSettings {
        log_path: path.to_path_buf(),
        normal_interval_ms: 100,
        focus_interval_ms: 20,
        focus_window_ms: 200,
        shutdown_grace_ms: 2_000,
        ..LoggerSettings::default()
    }
}

fn collaborators(networks: Arc<FakeNetworks>, ping_works: bool, granted: bool) -> Collaborators {
    Collaborators {
        network: networks,
        wifi: Arc::new(FakeWifi),
        cells: Arc::new(FakeCells),
        permissions: Arc::new(Granted(granted)),
        launcher: Arc::new(FakePing(ping_works)),
    }
}

fn rows(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn handovers_are_bracketed_by_pre_and_post_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");
    let networks = Arc::new(FakeNetworks::new());
    let mut service = HandoverService::new(
        settings(&path),
        collaborators(networks.clone(), true, true),
    );

    service.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    networks.emit("wlan0");
    tokio::time::sleep(Duration::from_millis(100)).await;
    networks.emit("wlan0");
    networks.emit("eth0");
    networks.emit("rmnet0");
    tokio::time::sleep(Duration::from_millis(300)).await;
    service.stop().await.unwrap();

    assert_eq!(service.current_transport(), Transport::Cellular);
    assert!(*networks.unsubscribed.lock().unwrap());

    let rows = rows(&path);
    assert_eq!(rows[0].join(","), HEADER);
    assert!(rows.iter().all(|row| row.len() == COLUMN_COUNT));

    let transitions: Vec<(String, String)> = rows[1..]
        .iter()
        .filter(|row| row[1] != "NORMAL")
        .map(|row| (row[1].clone(), row[2].clone()))
        .collect();
    let expected = [
        ("PRE", "unknown"),
        ("POST", "wifi"),
        ("PRE", "wifi"),
        ("POST", "cellular"),
    ];
    assert_eq!(
        transitions,
        expected.map(|(e, t)| (e.to_string(), t.to_string()))
    );

    let normal = rows[1..].iter().find(|row| row[1] == "NORMAL").unwrap();
    assert_eq!(&normal[3..], ["-58", "300", "-97", "-11", "6", "-69", "25", "3", "4.0"]);
}

#[tokio::test]
async fn failed_probe_and_missing_permissions_degrade_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");
    let networks = Arc::new(FakeNetworks::new());
    let mut service = HandoverService::new(
        settings(&path),
        collaborators(networks.clone(), false, false),
    );

    service.start().await.unwrap();
    networks.emit("rmnet0");
    tokio::time::sleep(Duration::from_millis(50)).await;
    service.stop().await.unwrap();

    let rows = rows(&path);
    assert!(rows.len() >= 3);
    for row in &rows[1..] {
        assert_eq!(row.len(), COLUMN_COUNT);
        assert_eq!(&row[3..], ["0", "0", "0", "0", "0", "0", "-1", "-1", "-1.0"]);
    }
}

#[tokio::test]
async fn restarting_on_an_existing_log_keeps_a_single_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dataset.csv");

    for _ in 0..2 {
        let networks = Arc::new(FakeNetworks::new());
        let mut service =
            HandoverService::new(settings(&path), collaborators(networks.clone(), true, true));
        service.start().await.unwrap();
        assert!(service.start().await.is_err());
        networks.emit("wlan0");
        tokio::time::sleep(Duration::from_millis(30)).await;
        service.stop().await.unwrap();
        service.stop().await.unwrap();
    }

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().filter(|line| *line == HEADER).count(), 1);
    assert_eq!(contents.lines().filter(|line| line.contains(",POST,")).count(), 2);
}
