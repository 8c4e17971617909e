//! Domain types for the diagnostic access point

use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer};

use crate::core::error::RadioError;

/// Hardware (MAC) address of an interface or station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = RadioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 6 || parts.iter().any(|p| p.len() != 2) {
            return Err(RadioError::Parse(format!("invalid MAC address: {s}")));
        }

        let bytes = hex::decode(parts.concat())
            .map_err(|e| RadioError::Parse(format!("invalid MAC address {s}: {e}")))?;
        let octets: [u8; 6] = bytes
            .try_into()
            .map_err(|_| RadioError::Parse(format!("invalid MAC address: {s}")))?;

        Ok(Self(octets))
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Authentication mode advertised by a scanned network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Open,
    Wep,
    WpaPsk,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Wpa3Psk,
    Unknown,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Open => "Open",
            AuthMode::Wep => "WEP",
            AuthMode::WpaPsk => "WPA_PSK",
            AuthMode::Wpa2Psk => "WPA2_PSK",
            AuthMode::WpaWpa2Psk => "WPA_WPA2_PSK",
            AuthMode::Wpa2Enterprise => "WPA2_ENTERPRISE",
            AuthMode::Wpa3Psk => "WPA3_PSK",
            AuthMode::Unknown => "Unknown",
        }
    }

    /// Derive the auth mode from a wpa_supplicant flags column,
    /// e.g. `[WPA-PSK-CCMP+TKIP][WPA2-PSK-CCMP+TKIP][ESS]`
    pub fn from_scan_flags(flags: &str) -> Self {
        let has = |needle: &str| flags.contains(needle);

        if has("SAE") {
            AuthMode::Wpa3Psk
        } else if has("WPA2-EAP") || has("RSN-EAP") {
            AuthMode::Wpa2Enterprise
        } else if has("[WPA-PSK") && (has("WPA2-PSK") || has("RSN-PSK")) {
            AuthMode::WpaWpa2Psk
        } else if has("WPA2-PSK") || has("RSN-PSK") {
            AuthMode::Wpa2Psk
        } else if has("[WPA-PSK") {
            AuthMode::WpaPsk
        } else if has("WEP") {
            AuthMode::Wep
        } else if has("EAP") {
            AuthMode::Unknown
        } else {
            AuthMode::Open
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuthMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Represents a discovered WiFi network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiNetwork {
    /// Network SSID, not guaranteed unique
    pub ssid: String,
    /// Signal strength in dBm
    pub rssi: i16,
    /// Channel number
    pub channel: u16,
    pub auth: AuthMode,
}

/// A station associated with the access point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Station {
    pub mac: MacAddress,
    /// Signal strength in dBm
    pub rssi: i16,
}

/// Connectivity notifications published by the radio layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// A station associated with our access point
    StationConnected(MacAddress),
    /// A station left our access point
    StationDisconnected(MacAddress),
    /// Our own station link came up
    Connected,
    /// Our own station link dropped
    Disconnected,
    /// Scan results are ready
    ScanResults,
    Other(String),
}

impl RadioEvent {
    /// Whether the event means some station (self or peer) went away
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            RadioEvent::StationDisconnected(_) | RadioEvent::Disconnected
        )
    }
}

/// Identity of the access point we advertise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointConfig {
    pub ssid: String,
    /// WPA2 passphrase, 8 to 63 characters
    pub passphrase: String,
}

/// Point-in-time view of system and network metrics
///
/// Platform readings are optional; a reading that is unavailable stays `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticSnapshot {
    pub ip: Option<String>,
    pub mac: Option<MacAddress>,
    pub uptime_secs: u64,
    pub free_heap: Option<u64>,
    pub tx_power_dbm: Option<f32>,
    pub cpu_freq_mhz: Option<u32>,
    pub tcp_retransmits: Option<u64>,
    pub disconnects: u32,
}

/// Identifier attached to each accepted HTTP connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
