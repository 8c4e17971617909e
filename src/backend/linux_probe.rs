//! procfs / sysfs system probe

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::{
    backend::SystemProbe,
    core::error::{ProbeError, ProbeResult},
};

/// Reads host metrics from procfs and sysfs
///
/// The roots are configurable so the probe can run against fixture trees.
#[derive(Debug, Clone)]
pub struct LinuxSystemProbe {
    started: Instant,
    proc_root: PathBuf,
    sys_root: PathBuf,
}

impl LinuxSystemProbe {
    pub fn new() -> Self {
        Self::with_roots("/proc", "/sys")
    }

    pub fn with_roots(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            started: Instant::now(),
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
        }
    }

    async fn read(path: &Path) -> ProbeResult<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    /// `MemAvailable` (falling back to `MemFree`) from /proc/meminfo, in bytes
    fn parse_meminfo(content: &str) -> Option<u64> {
        let field = |name: &str| {
            content.lines().find_map(|line| {
                let value = line.strip_prefix(name)?.strip_prefix(':')?;
                let kib: u64 = value.split_whitespace().next()?.parse().ok()?;
                Some(kib * 1024)
            })
        };

        field("MemAvailable").or_else(|| field("MemFree"))
    }

    /// First `cpu MHz` entry of /proc/cpuinfo
    fn parse_cpuinfo_mhz(content: &str) -> Option<u32> {
        content.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            if key.trim() != "cpu MHz" {
                return None;
            }
            let mhz: f64 = value.trim().parse().ok()?;
            u32::try_from(mhz.round() as i64).ok()
        })
    }

    /// `RetransSegs` from the `Tcp:` header/value line pair of /proc/net/snmp
    fn parse_retrans_segs(content: &str) -> Option<u64> {
        let mut tcp_lines = content.lines().filter(|line| line.starts_with("Tcp:"));
        let header = tcp_lines.next()?;
        let values = tcp_lines.next()?;

        let index = header
            .split_whitespace()
            .position(|name| name == "RetransSegs")?;
        values.split_whitespace().nth(index)?.parse().ok()
    }
}

impl Default for LinuxSystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for LinuxSystemProbe {
    fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    async fn free_memory(&self) -> ProbeResult<u64> {
        let content = Self::read(&self.proc_root.join("meminfo")).await?;
        Self::parse_meminfo(&content).ok_or(ProbeError::Missing("MemAvailable"))
    }

    async fn cpu_freq_mhz(&self) -> ProbeResult<u32> {
        let cpufreq = self
            .sys_root
            .join("devices/system/cpu/cpu0/cpufreq/scaling_cur_freq");

        if let Ok(content) = Self::read(&cpufreq).await {
            let khz: u32 = content
                .trim()
                .parse()
                .map_err(|_| ProbeError::Parse(format!("scaling_cur_freq: {}", content.trim())))?;
            return Ok(khz / 1000);
        }

        let content = Self::read(&self.proc_root.join("cpuinfo")).await?;
        Self::parse_cpuinfo_mhz(&content).ok_or(ProbeError::Missing("cpu MHz"))
    }

    async fn tcp_retransmits(&self) -> ProbeResult<u64> {
        let content = Self::read(&self.proc_root.join("net/snmp")).await?;
        Self::parse_retrans_segs(&content).ok_or(ProbeError::Missing("RetransSegs"))
    }
}
