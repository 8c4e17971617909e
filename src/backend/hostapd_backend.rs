//! hostapd / wpa_supplicant backend implementation
//!
//! The access point side is driven through the hostapd control socket,
//! scanning and station-link events go through wpa_supplicant. Both speak the
//! same control protocol, so one `wpactrl` client serves both.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wpactrl::Client;

use crate::{
    backend::RadioBackend,
    core::{
        error::{RadioError, RadioResult},
        events::EventBus,
        types::{AccessPointConfig, AuthMode, MacAddress, RadioEvent, Station, WifiNetwork},
    },
};

const EVENT_IDLE_INTERVAL: Duration = Duration::from_millis(100);
const EVENT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
const MAX_STATIONS: usize = 256;
const SYSFS_NET: &str = "/sys/class/net";

/// Control socket locations and timing for [`HostapdBackend`]
#[derive(Debug, Clone)]
pub struct HostapdConfig {
    pub ap_interface: String,
    pub sta_interface: String,
    pub hostapd_ctrl_dir: PathBuf,
    pub wpa_ctrl_dir: PathBuf,
    /// Time between triggering a scan and collecting its results
    pub scan_wait: Duration,
}

/// Real hostapd / wpa_supplicant backend
pub struct HostapdBackend {
    config: HostapdConfig,
    hostapd_socket: PathBuf,
    wpa_socket: PathBuf,
    events: Arc<EventBus>,
}

impl HostapdBackend {
    /// Create a new backend; call [`HostapdBackend::start_event_listeners`]
    /// to begin publishing events
    pub fn new(config: HostapdConfig) -> Self {
        let hostapd_socket = config.hostapd_ctrl_dir.join(&config.ap_interface);
        let wpa_socket = config.wpa_ctrl_dir.join(&config.sta_interface);

        Self {
            config,
            hostapd_socket,
            wpa_socket,
            events: Arc::new(EventBus::new()),
        }
    }

    /// Spawn one listener thread per control socket
    ///
    /// Each thread attaches to its socket and forwards every unsolicited
    /// message as a [`RadioEvent`]. A lost socket is re-opened periodically.
    pub fn start_event_listeners(&self) -> std::io::Result<()> {
        for (name, path) in [
            ("hostapd-events", self.hostapd_socket.clone()),
            ("wpa-events", self.wpa_socket.clone()),
        ] {
            let events = self.events.clone();
            std::thread::Builder::new()
                .name(name.to_string())
                .spawn(move || listen_events(&path, &events))?;
        }
        Ok(())
    }

    /// Send one command over a control socket and return the raw reply
    async fn request(path: &Path, command: String) -> RadioResult<String> {
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let mut ctrl = Client::builder().ctrl_path(&path).open().map_err(|e| {
                RadioError::ControlInterface(format!(
                    "Failed to open {}: {}",
                    path.display(),
                    e
                ))
            })?;

            ctrl.request(&command).map_err(|e| {
                RadioError::ControlInterface(format!("{} failed: {}", command, e))
            })
        })
        .await
        .map_err(|e| RadioError::ControlInterface(format!("Task join error: {}", e)))?
    }

    /// Send a command that must be answered with `OK`
    async fn request_ok(path: &Path, command: String) -> RadioResult<()> {
        let reply = Self::request(path, command.clone()).await?;
        if reply.trim() == "OK" {
            Ok(())
        } else {
            Err(RadioError::ControlInterface(format!(
                "{} rejected: {}",
                command,
                reply.trim()
            )))
        }
    }

    async fn run_command(program: &str, args: &[&str]) -> RadioResult<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| RadioError::InterfaceError(format!("{} failed: {}", program, e)))?;

        if !output.status.success() {
            return Err(RadioError::InterfaceError(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Disable power save so the radio never dozes between frames
    async fn disable_power_save(&self) -> RadioResult<()> {
        Self::run_command(
            "iw",
            &["dev", &self.config.ap_interface, "set", "power_save", "off"],
        )
        .await
        .map(|_| ())
    }

    /// Parse the `SCAN_RESULTS` table
    ///
    /// `bssid / frequency / signal level / flags / ssid`, tab separated,
    /// after one header line.
    fn parse_scan_results(output: &str) -> Vec<WifiNetwork> {
        output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let mut parts = line.splitn(5, '\t');
                let _bssid = parts.next()?;
                let frequency = parts.next()?;
                let signal = parts.next()?;
                let flags = parts.next()?;
                let ssid = parts.next().unwrap_or_default();

                Some(WifiNetwork {
                    ssid: ssid.to_string(),
                    rssi: signal.trim().parse().unwrap_or(0),
                    channel: frequency_to_channel(frequency.trim().parse().unwrap_or(0)),
                    auth: AuthMode::from_scan_flags(flags),
                })
            })
            .collect()
    }

    /// Parse a `STA-FIRST` / `STA-NEXT` reply
    ///
    /// The first line is the station address, the rest are `key=value` pairs.
    /// Returns `None` when the roster is exhausted.
    fn parse_station(reply: &str) -> Option<Station> {
        let mut lines = reply.lines();
        let mac = lines.next()?.trim().parse::<MacAddress>().ok()?;
        let rssi = lines
            .filter_map(|line| line.split_once('='))
            .find(|(key, _)| *key == "signal")
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0);

        Some(Station { mac, rssi })
    }

    /// Extract `txpower 20.00 dBm` from `iw dev <if> info`
    fn parse_tx_power(output: &str) -> Option<f32> {
        output.lines().find_map(|line| {
            let rest = line.trim().strip_prefix("txpower")?;
            rest.split_whitespace().next()?.parse().ok()
        })
    }

    /// Extract the first `inet a.b.c.d/nn` from `ip -4 addr show`
    fn parse_ipv4(output: &str) -> Option<String> {
        output.lines().find_map(|line| {
            let rest = line.trim().strip_prefix("inet ")?;
            let cidr = rest.split_whitespace().next()?;
            cidr.split('/').next().map(str::to_string)
        })
    }
}

/// Convert a frequency in MHz to its channel number (0 when unknown)
fn frequency_to_channel(freq: u32) -> u16 {
    let channel = match freq {
        2484 => 14,
        2412..=2472 => (freq - 2407) / 5,
        5150..=5895 => (freq - 5000) / 5,
        5955..=7115 => (freq - 5950) / 5,
        _ => 0,
    };
    u16::try_from(channel).unwrap_or(0)
}

/// Turn an unsolicited control message into a [`RadioEvent`]
///
/// Messages carry a `<level>` prefix, e.g. `<3>AP-STA-DISCONNECTED 02:00:00:00:01:00`.
fn parse_event(message: &str) -> RadioEvent {
    let message = message.trim();
    let body = match message.strip_prefix('<').and_then(|m| m.split_once('>')) {
        Some((_, rest)) => rest,
        None => message,
    };

    let mut words = body.split_whitespace();
    let station = |word: Option<&str>| word.and_then(|w| w.parse::<MacAddress>().ok());

    match words.next() {
        Some("AP-STA-CONNECTED") => match station(words.next()) {
            Some(mac) => RadioEvent::StationConnected(mac),
            None => RadioEvent::Other(body.to_string()),
        },
        Some("AP-STA-DISCONNECTED") => match station(words.next()) {
            Some(mac) => RadioEvent::StationDisconnected(mac),
            None => RadioEvent::Other(body.to_string()),
        },
        Some("CTRL-EVENT-CONNECTED") => RadioEvent::Connected,
        Some("CTRL-EVENT-DISCONNECTED") => RadioEvent::Disconnected,
        Some("CTRL-EVENT-SCAN-RESULTS") => RadioEvent::ScanResults,
        _ => RadioEvent::Other(body.to_string()),
    }
}

fn listen_events(path: &Path, events: &EventBus) {
    loop {
        let attached = Client::builder()
            .ctrl_path(path)
            .open()
            .and_then(|client| client.attach());

        match attached {
            Ok(mut client) => {
                info!("Listening for events on {}", path.display());
                loop {
                    match client.recv() {
                        Ok(Some(message)) => {
                            events.publish(parse_event(&message));
                        }
                        Ok(None) => std::thread::sleep(EVENT_IDLE_INTERVAL),
                        Err(e) => {
                            warn!("Event socket {} failed: {}", path.display(), e);
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                debug!("Cannot attach to {}: {}", path.display(), e);
            }
        }

        std::thread::sleep(EVENT_RECONNECT_INTERVAL);
    }
}

impl RadioBackend for HostapdBackend {
    async fn start_access_point(&self, config: &AccessPointConfig) -> RadioResult<()> {
        if let Err(e) = self.disable_power_save().await {
            warn!("Could not disable power save: {}", e);
        }

        let settings = [
            ("ssid", config.ssid.as_str()),
            ("wpa", "2"),
            ("wpa_key_mgmt", "WPA-PSK"),
            ("rsn_pairwise", "CCMP"),
            ("wpa_passphrase", config.passphrase.as_str()),
        ];
        for (key, value) in settings {
            Self::request_ok(&self.hostapd_socket, format!("SET {} {}", key, value)).await?;
        }

        // A disabled interface rejects DISABLE; only ENABLE has to succeed
        if let Err(e) = Self::request_ok(&self.hostapd_socket, "DISABLE".to_string()).await {
            debug!("DISABLE before restart: {}", e);
        }
        Self::request_ok(&self.hostapd_socket, "ENABLE".to_string()).await?;

        debug!("Access point enabled on {}", self.config.ap_interface);
        Ok(())
    }

    async fn ip_address(&self) -> RadioResult<String> {
        let output =
            Self::run_command("ip", &["-4", "addr", "show", &self.config.ap_interface]).await?;

        Self::parse_ipv4(&output).ok_or_else(|| {
            RadioError::InterfaceError(format!(
                "{} has no IPv4 address",
                self.config.ap_interface
            ))
        })
    }

    async fn mac_address(&self) -> RadioResult<MacAddress> {
        let path = Path::new(SYSFS_NET)
            .join(&self.config.ap_interface)
            .join("address");
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| RadioError::InterfaceError(format!("{}: {}", path.display(), e)))?;

        raw.parse()
    }

    async fn tx_power(&self) -> RadioResult<f32> {
        let output = Self::run_command("iw", &["dev", &self.config.ap_interface, "info"]).await?;

        Self::parse_tx_power(&output)
            .ok_or_else(|| RadioError::Unavailable("txpower not reported".to_string()))
    }

    async fn scan(&self) -> RadioResult<Vec<WifiNetwork>> {
        debug!("Starting WiFi scan on interface: {}", self.config.sta_interface);

        if !self.wpa_socket.exists() {
            return Err(RadioError::ScanFailed(format!(
                "wpa_supplicant control socket not found: {}",
                self.wpa_socket.display()
            )));
        }

        let reply = Self::request(&self.wpa_socket, "SCAN".to_string()).await?;
        match reply.trim() {
            "OK" => {}
            // Someone else started a scan, its results serve us as well
            "FAIL-BUSY" => debug!("Scan already running"),
            other => return Err(RadioError::ScanFailed(other.to_string())),
        }

        tokio::time::sleep(self.config.scan_wait).await;

        let results = Self::request(&self.wpa_socket, "SCAN_RESULTS".to_string()).await?;
        let networks = Self::parse_scan_results(&results);

        debug!("Scan complete, found {} networks", networks.len());
        Ok(networks)
    }

    async fn release_scan(&self) -> RadioResult<()> {
        Self::request_ok(&self.wpa_socket, "BSS_FLUSH 0".to_string()).await
    }

    async fn stations(&self) -> RadioResult<Vec<Station>> {
        let mut stations = Vec::new();
        let mut reply = Self::request(&self.hostapd_socket, "STA-FIRST".to_string()).await?;

        while let Some(station) = Self::parse_station(&reply) {
            stations.push(station);
            if stations.len() >= MAX_STATIONS {
                warn!("Station roster truncated at {}", MAX_STATIONS);
                break;
            }
            reply = Self::request(&self.hostapd_socket, format!("STA-NEXT {}", station.mac))
                .await?;
        }

        Ok(stations)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<RadioEvent> {
        self.events.subscribe()
    }
}
