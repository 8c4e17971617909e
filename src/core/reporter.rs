//! Diagnostic state reporting

use std::{fmt::Display, sync::Arc};

use tracing::debug;

use crate::{
    backend::{RadioBackend, SystemProbe},
    core::{monitor::LinkMetrics, types::DiagnosticSnapshot},
};

/// Assembles [`DiagnosticSnapshot`]s from the radio, the host and the link metrics
///
/// Nothing is cached: every snapshot reads the platform afresh.
pub struct StatusReporter<R: RadioBackend, P: SystemProbe> {
    radio: Arc<R>,
    probe: Arc<P>,
    metrics: Arc<LinkMetrics>,
}

impl<R: RadioBackend, P: SystemProbe> StatusReporter<R, P> {
    pub fn new(radio: Arc<R>, probe: Arc<P>, metrics: Arc<LinkMetrics>) -> Self {
        Self {
            radio,
            probe,
            metrics,
        }
    }

    /// Monotonic milliseconds since start
    pub fn ticks_ms(&self) -> u64 {
        u64::try_from(self.probe.uptime().as_millis()).unwrap_or(u64::MAX)
    }

    /// Take a snapshot; unavailable readings are left empty
    pub async fn snapshot(&self) -> DiagnosticSnapshot {
        DiagnosticSnapshot {
            ip: available("ip", self.radio.ip_address().await),
            mac: available("mac", self.radio.mac_address().await),
            uptime_secs: self.probe.uptime().as_secs(),
            free_heap: available("heap", self.probe.free_memory().await),
            tx_power_dbm: available("tx_power", self.radio.tx_power().await),
            cpu_freq_mhz: available("cpu_freq", self.probe.cpu_freq_mhz().await),
            tcp_retransmits: available("tcp_rexmit", self.probe.tcp_retransmits().await),
            disconnects: self.metrics.disconnects(),
        }
    }
}

fn available<T, E: Display>(field: &'static str, reading: Result<T, E>) -> Option<T> {
    reading
        .map_err(|e| debug!(field, "Metric unavailable: {}", e))
        .ok()
}
