//! Desktop Linux host adapter.
//!
//! Stands in for a phone's connectivity services: the default-route interface
//! plays the role of "the active network", `/proc/net/wireless` and `iw`
//! provide WiFi link stats, and ModemManager's `mmcli` provides LTE signal
//! readings when a modem is attached.

use std::{
    fs,
    path::Path,
    process::{Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use sysinfo::Networks;

use super::{
    CellInfo, CellInfoSource, Collaborators, LteSignal, NetworkCallback, NetworkCapabilities,
    NetworkHandle, NetworkStateSource, Permission, PermissionOracle, ProcessLauncher,
    TransportType, WifiLinkInfo, WifiLinkSource,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

const ROUTE_TABLE: &str = "/proc/net/route";
const WIRELESS_TABLE: &str = "/proc/net/wireless";
const CELLULAR_PREFIXES: &[&str] = &["wwan", "ww", "rmnet", "ccmni", "usb"];

/// Builds the full collaborator set for this host.
pub fn collaborators(poll_interval: Duration) -> Collaborators {
    let launcher: Arc<dyn ProcessLauncher> = Arc::new(SystemLauncher);
    Collaborators {
        network: Arc::new(LinuxNetworkMonitor::new(poll_interval)),
        wifi: Arc::new(LinuxWifiLink::new(launcher.clone())),
        cells: Arc::new(ModemManagerCells::new(launcher.clone(), 0)),
        permissions: Arc::new(HostPermissions),
        launcher,
    }
}

pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn run(&self, program: &str, args: &[String]) -> Result<Vec<String>> {
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .with_context(|| format!("failed to launch {program}"))?;

        // ping exits non-zero on packet loss but still prints its summary.
        if output.stdout.is_empty() && !output.status.success() {
            bail!("{program} exited with {}", output.status);
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }
}

/// Desktop processes need no runtime grants for any of the sources.
pub struct HostPermissions;

impl PermissionOracle for HostPermissions {
    fn is_granted(&self, _permission: Permission) -> bool {
        true
    }
}

struct MonitorThread {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Polls the default route and reports the interface carrying it whenever it
/// changes.
pub struct LinuxNetworkMonitor {
    poll_interval: Duration,
    thread: Mutex<Option<MonitorThread>>,
}

impl LinuxNetworkMonitor {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            thread: Mutex::new(None),
        }
    }
}

impl NetworkStateSource for LinuxNetworkMonitor {
    fn subscribe(&self, callback: NetworkCallback) -> Result<()> {
        let mut guard = self
            .thread
            .lock()
            .map_err(|_| anyhow::anyhow!("network monitor lock poisoned"))?;
        if guard.is_some() {
            bail!("network monitor already has a subscriber");
        }

        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop.clone();
        let poll_interval = self.poll_interval;

        let handle = thread::Builder::new()
            .name("netmon-poll".into())
            .spawn(move || {
                let mut last: Option<String> = None;
                while !stop_for_thread.load(Ordering::Acquire) {
                    let current = fs::read_to_string(ROUTE_TABLE)
                        .ok()
                        .and_then(|table| default_route_interface(&table));
                    if current != last {
                        if let Some(iface) = &current {
                            log_debug!("default route now via {iface}");
                            callback(NetworkHandle::new(iface.clone()));
                        }
                        last = current;
                    }
                    thread::sleep(poll_interval);
                }
            })
            .context("failed to spawn network monitor thread")?;

        *guard = Some(MonitorThread { stop, handle });
        Ok(())
    }

    fn unsubscribe(&self) {
        let taken = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(monitor) = taken {
            monitor.stop.store(true, Ordering::Release);
            if monitor.handle.join().is_err() {
                log_warn!("network monitor thread panicked");
            }
        }
    }

    fn capabilities(&self, network: &NetworkHandle) -> Option<NetworkCapabilities> {
        let iface = network.0.as_str();
        let networks = Networks::new_with_refreshed_list();
        if !networks.list().contains_key(iface) {
            return None;
        }

        let wireless = Path::new("/sys/class/net").join(iface).join("wireless");
        Some(NetworkCapabilities::new(classify_interface(
            iface,
            wireless.exists(),
        )))
    }
}

/// Interface of the first `0.0.0.0` destination in `/proc/net/route`.
pub fn default_route_interface(table: &str) -> Option<String> {
    table.lines().skip(1).find_map(|line| {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        let destination = fields.next()?;
        (destination == "00000000").then(|| iface.to_string())
    })
}

fn classify_interface(iface: &str, has_wireless_dir: bool) -> Vec<TransportType> {
    if has_wireless_dir || iface.starts_with("wl") {
        vec![TransportType::Wifi]
    } else if CELLULAR_PREFIXES.iter().any(|p| iface.starts_with(p)) {
        vec![TransportType::Cellular]
    } else if iface.starts_with("tun") || iface.starts_with("wg") {
        vec![TransportType::Vpn]
    } else if iface.starts_with("eth") || iface.starts_with("en") {
        vec![TransportType::Ethernet]
    } else {
        Vec::new()
    }
}

pub struct LinuxWifiLink {
    launcher: Arc<dyn ProcessLauncher>,
}

impl LinuxWifiLink {
    pub fn new(launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self { launcher }
    }

    fn link_speed(&self, iface: &str) -> i32 {
        let args = ["dev", iface, "link"].map(str::to_string);
        match self.launcher.run("iw", &args) {
            Ok(lines) => parse_iw_bitrate(&lines).unwrap_or(0),
            Err(err) => {
                log_debug!("iw unavailable: {err:#}");
                0
            }
        }
    }
}

impl WifiLinkSource for LinuxWifiLink {
    fn connection_info(&self) -> Result<Option<WifiLinkInfo>> {
        let table = match fs::read_to_string(WIRELESS_TABLE) {
            Ok(table) => table,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err).context("failed to read wireless stats"),
        };

        let Some((iface, rssi_dbm)) = parse_wireless_table(&table) else {
            return Ok(None);
        };

        Ok(Some(WifiLinkInfo {
            rssi_dbm,
            link_speed_mbps: self.link_speed(&iface),
        }))
    }
}

/// First interface and its signal level (dBm) from `/proc/net/wireless`.
pub fn parse_wireless_table(table: &str) -> Option<(String, i32)> {
    // Two header lines, then `iface: status link level noise ...`.
    table.lines().skip(2).find_map(|line| {
        let (iface, rest) = line.split_once(':')?;
        let level = rest.split_whitespace().nth(2)?;
        let level: f32 = level.trim_end_matches('.').parse().ok()?;
        Some((iface.trim().to_string(), level as i32))
    })
}

/// `tx bitrate: 433.3 MBit/s ...` from `iw dev <if> link`, truncated to Mbps.
pub fn parse_iw_bitrate(lines: &[String]) -> Option<i32> {
    lines.iter().find_map(|line| {
        let value = line.trim().strip_prefix("tx bitrate:")?;
        let mbps: f32 = value.split_whitespace().next()?.parse().ok()?;
        Some(mbps as i32)
    })
}

/// LTE signal through ModemManager. Synchronous only.
pub struct ModemManagerCells {
    launcher: Arc<dyn ProcessLauncher>,
    modem_index: u32,
}

impl ModemManagerCells {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, modem_index: u32) -> Self {
        Self {
            launcher,
            modem_index,
        }
    }
}

impl CellInfoSource for ModemManagerCells {
    fn all_cell_info(&self) -> Result<Vec<CellInfo>> {
        let args = ["-m".to_string(), self.modem_index.to_string(), "--signal-get".into()];
        match self.launcher.run("mmcli", &args) {
            Ok(lines) => Ok(parse_mmcli_signal(&lines).into_iter().collect()),
            // No ModemManager, or no modem: nothing is visible.
            Err(err) => {
                log_debug!("mmcli unavailable: {err:#}");
                Ok(Vec::new())
            }
        }
    }
}

/// Reads the `LTE` block of `mmcli --signal-get`:
///
/// ```text
///   LTE  |                 rssi: -65.00 dBm
///        |                 rsrq: -9.00 dB
///        |                 rsrp: -93.00 dBm
///        |                  s/n: 12.50 dB
/// ```
pub fn parse_mmcli_signal(lines: &[String]) -> Option<CellInfo> {
    let mut in_lte = false;
    let mut seen = false;
    let mut signal = LteSignal::default();

    for line in lines {
        let Some((section, entry)) = line.split_once('|') else {
            continue;
        };
        let section = section.trim();
        if !section.is_empty() {
            in_lte = section == "LTE";
        }
        if !in_lte {
            continue;
        }

        let Some((key, value)) = entry.split_once(':') else {
            continue;
        };
        let Some(value) = value
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<f32>().ok())
        else {
            continue;
        };

        let slot = match key.trim() {
            "rssi" => &mut signal.rssi,
            "rsrq" => &mut signal.rsrq,
            "rsrp" => &mut signal.rsrp,
            "s/n" => &mut signal.sinr,
            _ => continue,
        };
        *slot = value as i32;
        seen = true;
    }

    seen.then_some(CellInfo::Lte(signal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn finds_default_route() {
        let table = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask
wlp2s0\t0000A8C0\t00000000\t0001\t0\t0\t600\t00FFFFFF
wlp2s0\t00000000\t0100A8C0\t0003\t0\t0\t600\t00000000
";
        assert_eq!(default_route_interface(table).as_deref(), Some("wlp2s0"));
        assert_eq!(default_route_interface("Iface\tDestination\n"), None);
    }

    #[test]
    fn classifies_interfaces_by_name() {
        assert_eq!(classify_interface("wlan0", false), vec![TransportType::Wifi]);
        assert_eq!(classify_interface("anything", true), vec![TransportType::Wifi]);
        assert_eq!(classify_interface("wwan0", false), vec![TransportType::Cellular]);
        assert_eq!(classify_interface("rmnet_data0", false), vec![TransportType::Cellular]);
        assert_eq!(classify_interface("enp3s0", false), vec![TransportType::Ethernet]);
        assert!(classify_interface("lo", false).is_empty());
    }

    #[test]
    fn parses_wireless_level() {
        let table = "\
Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
 face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
wlp2s0: 0000   54.  -56.  -256        0      0      0      0    112        0
";
        assert_eq!(parse_wireless_table(table), Some(("wlp2s0".to_string(), -56)));
    }

    #[test]
    fn parses_iw_bitrate() {
        let lines = owned(&[
            "Connected to aa:bb:cc:dd:ee:ff (on wlp2s0)",
            "\tsignal: -56 dBm",
            "\ttx bitrate: 433.3 MBit/s VHT-MCS 9 80MHz short GI VHT-NSS 1",
        ]);
        assert_eq!(parse_iw_bitrate(&lines), Some(433));
        assert_eq!(parse_iw_bitrate(&owned(&["Not connected."])), None);
    }

    #[test]
    fn parses_mmcli_lte_block() {
        let lines = owned(&[
            "  --------------------------",
            "  Refresh |       rate: 10 seconds",
            "  --------------------------",
            "  UMTS    |       rssi: -80.00 dBm",
            "  --------------------------",
            "  LTE     |       rssi: -65.00 dBm",
            "          |       rsrq: -9.00 dB",
            "          |       rsrp: -93.00 dBm",
            "          |        s/n: 12.50 dB",
        ]);
        assert_eq!(
            parse_mmcli_signal(&lines),
            Some(CellInfo::Lte(LteSignal {
                rsrp: -93,
                rsrq: -9,
                sinr: 12,
                rssi: -65,
            }))
        );
    }

    #[test]
    fn mmcli_without_lte_reports_nothing() {
        let lines = owned(&["  UMTS    |       rssi: -80.00 dBm"]);
        assert_eq!(parse_mmcli_signal(&lines), None);
    }
}
