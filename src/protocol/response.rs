//! JSON response records
//!
//! Each endpoint builds one of these records and serializes it once.

use serde::Serialize;

use crate::core::types::{AuthMode, DiagnosticSnapshot, MacAddress, Station, WifiNetwork};

/// Body of `GET /api/status`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,
    /// Seconds since start
    pub uptime: u64,
    /// Free memory in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heap: Option<u64>,
    /// dBm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_power: Option<f32>,
    /// MHz
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_freq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_rexmit: Option<u64>,
    pub disconnects: u32,
}

impl From<DiagnosticSnapshot> for StatusResponse {
    fn from(snapshot: DiagnosticSnapshot) -> Self {
        Self {
            ip: snapshot.ip,
            mac: snapshot.mac,
            uptime: snapshot.uptime_secs,
            heap: snapshot.free_heap,
            tx_power: snapshot.tx_power_dbm,
            cpu_freq: snapshot.cpu_freq_mhz,
            tcp_rexmit: snapshot.tcp_retransmits,
            disconnects: snapshot.disconnects,
        }
    }
}

/// One element of `GET /api/scan`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NetworkEntry<'a> {
    pub ssid: &'a str,
    pub rssi: i16,
    pub channel: u16,
    pub auth: AuthMode,
}

impl<'a> From<&'a WifiNetwork> for NetworkEntry<'a> {
    fn from(network: &'a WifiNetwork) -> Self {
        Self {
            ssid: &network.ssid,
            rssi: network.rssi,
            channel: network.channel,
            auth: network.auth,
        }
    }
}

/// One element of `GET /api/clients`
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StationEntry {
    pub mac: MacAddress,
    pub rssi: i16,
}

impl From<&Station> for StationEntry {
    fn from(station: &Station) -> Self {
        Self {
            mac: station.mac,
            rssi: station.rssi,
        }
    }
}

/// Serialize scan results in scanner order
pub fn scan_body(networks: &[WifiNetwork]) -> serde_json::Result<Vec<u8>> {
    let entries: Vec<NetworkEntry<'_>> = networks.iter().map(NetworkEntry::from).collect();
    serde_json::to_vec(&entries)
}

/// Serialize the station roster in platform order
pub fn stations_body(stations: &[Station]) -> serde_json::Result<Vec<u8>> {
    let entries: Vec<StationEntry> = stations.iter().map(StationEntry::from).collect();
    serde_json::to_vec(&entries)
}
