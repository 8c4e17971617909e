//! Mock radio backend and system probe for tests and bench runs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;

use crate::backend::{RadioBackend, SystemProbe};
use crate::core::error::{ProbeError, ProbeResult, RadioError, RadioResult};
use crate::core::events::EventBus;
use crate::core::types::{AccessPointConfig, MacAddress, RadioEvent, Station, WifiNetwork};

/// Internal state for the mock backend
#[derive(Debug, Clone)]
struct MockState {
    access_point: Option<AccessPointConfig>,
    ip_address: Option<String>,
    mac_address: Option<MacAddress>,
    tx_power: Option<f32>,
    scan_results: Vec<WifiNetwork>,
    should_fail_scan: bool,
    scans: usize,
    releases: usize,
    stations: Vec<Station>,
}

/// Mock radio backend for testing
///
/// Allows configuring behavior for tests without requiring actual hardware.
/// Clones share state and the event channel.
#[derive(Debug, Clone)]
pub struct MockRadioBackend {
    inner: Arc<Mutex<MockState>>,
    events: Arc<EventBus>,
}

impl MockRadioBackend {
    /// Create a new mock backend with default state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                access_point: None,
                ip_address: Some("192.168.4.1".to_string()),
                mac_address: Some(MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01])),
                tx_power: Some(19.5),
                scan_results: vec![],
                should_fail_scan: false,
                scans: 0,
                releases: 0,
                stations: vec![],
            })),
            events: Arc::new(EventBus::new()),
        }
    }

    /// Configure mock to return specific networks on scan
    pub async fn set_scan_results(&self, networks: Vec<WifiNetwork>) {
        self.inner.lock().await.scan_results = networks;
    }

    /// Configure mock to fail scan operations
    pub async fn set_scan_failure(&self, should_fail: bool) {
        self.inner.lock().await.should_fail_scan = should_fail;
    }

    pub async fn set_stations(&self, stations: Vec<Station>) {
        self.inner.lock().await.stations = stations;
    }

    pub async fn set_ip_address(&self, ip: Option<&str>) {
        self.inner.lock().await.ip_address = ip.map(str::to_string);
    }

    pub async fn set_mac_address(&self, mac: Option<MacAddress>) {
        self.inner.lock().await.mac_address = mac;
    }

    pub async fn set_tx_power(&self, dbm: Option<f32>) {
        self.inner.lock().await.tx_power = dbm;
    }

    /// Access point configuration last passed to `start_access_point`
    pub async fn access_point(&self) -> Option<AccessPointConfig> {
        self.inner.lock().await.access_point.clone()
    }

    /// Number of scans performed
    pub async fn scan_count(&self) -> usize {
        self.inner.lock().await.scans
    }

    /// Number of scan buffer releases
    pub async fn release_count(&self) -> usize {
        self.inner.lock().await.releases
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers the event reached.
    pub fn emit(&self, event: RadioEvent) -> usize {
        self.events.publish(event)
    }
}

impl Default for MockRadioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RadioBackend for MockRadioBackend {
    async fn start_access_point(&self, config: &AccessPointConfig) -> RadioResult<()> {
        self.inner.lock().await.access_point = Some(config.clone());
        Ok(())
    }

    async fn ip_address(&self) -> RadioResult<String> {
        self.inner
            .lock()
            .await
            .ip_address
            .clone()
            .ok_or_else(|| RadioError::InterfaceError("no IPv4 address".into()))
    }

    async fn mac_address(&self) -> RadioResult<MacAddress> {
        self.inner
            .lock()
            .await
            .mac_address
            .ok_or_else(|| RadioError::InterfaceError("no hardware address".into()))
    }

    async fn tx_power(&self) -> RadioResult<f32> {
        self.inner
            .lock()
            .await
            .tx_power
            .ok_or_else(|| RadioError::Unavailable("tx power".into()))
    }

    async fn scan(&self) -> RadioResult<Vec<WifiNetwork>> {
        let mut state = self.inner.lock().await;
        state.scans += 1;
        if state.should_fail_scan {
            Err(RadioError::ScanFailed("Mock scan failure".into()))
        } else {
            Ok(state.scan_results.clone())
        }
    }

    async fn release_scan(&self) -> RadioResult<()> {
        self.inner.lock().await.releases += 1;
        Ok(())
    }

    async fn stations(&self) -> RadioResult<Vec<Station>> {
        Ok(self.inner.lock().await.stations.clone())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<RadioEvent> {
        self.events.subscribe()
    }
}

#[derive(Debug, Clone)]
struct ProbeState {
    free_memory: Option<u64>,
    cpu_freq_mhz: Option<u32>,
    tcp_retransmits: Option<u64>,
}

/// Mock system probe with a real monotonic clock and settable readings
#[derive(Debug, Clone)]
pub struct MockSystemProbe {
    started: Instant,
    inner: Arc<std::sync::Mutex<ProbeState>>,
}

impl MockSystemProbe {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            inner: Arc::new(std::sync::Mutex::new(ProbeState {
                free_memory: Some(180_000),
                cpu_freq_mhz: Some(240),
                tcp_retransmits: None,
            })),
        }
    }

    fn update(&self, op: impl FnOnce(&mut ProbeState)) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        op(&mut state);
    }

    fn read(&self) -> ProbeState {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_free_memory(&self, bytes: Option<u64>) {
        self.update(|s| s.free_memory = bytes);
    }

    pub fn set_cpu_freq_mhz(&self, mhz: Option<u32>) {
        self.update(|s| s.cpu_freq_mhz = mhz);
    }

    pub fn set_tcp_retransmits(&self, count: Option<u64>) {
        self.update(|s| s.tcp_retransmits = count);
    }
}

impl Default for MockSystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for MockSystemProbe {
    fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    async fn free_memory(&self) -> ProbeResult<u64> {
        self.read().free_memory.ok_or(ProbeError::Missing("free memory"))
    }

    async fn cpu_freq_mhz(&self) -> ProbeResult<u32> {
        self.read().cpu_freq_mhz.ok_or(ProbeError::Missing("cpu frequency"))
    }

    async fn tcp_retransmits(&self) -> ProbeResult<u64> {
        self.read()
            .tcp_retransmits
            .ok_or(ProbeError::Missing("tcp retransmits"))
    }
}
