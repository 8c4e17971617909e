//! System probe trait definition

use std::time::Duration;

use trait_variant::make;

use crate::core::error::ProbeResult;

/// Source of host metrics reported on the status endpoint
#[make(Send)]
pub trait SystemProbe: Send + Sync + 'static {
    /// Monotonic time since the service started
    fn uptime(&self) -> Duration;

    /// Free memory in bytes
    async fn free_memory(&self) -> ProbeResult<u64>;

    /// Processor clock in MHz
    async fn cpu_freq_mhz(&self) -> ProbeResult<u32>;

    /// TCP segments retransmitted since boot
    async fn tcp_retransmits(&self) -> ProbeResult<u64>;
}
