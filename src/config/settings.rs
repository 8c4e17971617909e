//! Runtime settings

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::backend::HostapdConfig;
use crate::config::CliArgs;
use crate::core::error::ConfigError;
use crate::core::throughput::{FILL_BYTE, MAX_CHUNK_SIZE, TransferPolicy};
use crate::core::types::AccessPointConfig;

const MAX_SSID_BYTES: usize = 32;

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub access_point: AccessPointConfig,
    pub ap_interface: String,
    pub sta_interface: String,
    pub hostapd_ctrl_dir: PathBuf,
    pub wpa_ctrl_dir: PathBuf,
    pub listen: SocketAddr,
    pub transfer: TransferPolicy,
    pub request_timeout: Duration,
    pub scan_wait: Duration,
    pub mock: bool,
}

impl Settings {
    pub fn hostapd(&self) -> HostapdConfig {
        HostapdConfig {
            ap_interface: self.ap_interface.clone(),
            sta_interface: self.sta_interface.clone(),
            hostapd_ctrl_dir: self.hostapd_ctrl_dir.clone(),
            wpa_ctrl_dir: self.wpa_ctrl_dir.clone(),
            scan_wait: self.scan_wait,
        }
    }
}

impl TryFrom<CliArgs> for Settings {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.ssid.is_empty() || args.ssid.len() > MAX_SSID_BYTES {
            return Err(ConfigError::InvalidSsid(args.ssid.len()));
        }

        let passphrase_len = args.passphrase.chars().count();
        if !(8..=63).contains(&passphrase_len) {
            return Err(ConfigError::PassphraseLength(passphrase_len));
        }

        if args.chunk_size == 0 || args.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize(args.chunk_size));
        }

        let sta_interface = args
            .sta_interface
            .unwrap_or_else(|| args.ap_interface.clone());

        Ok(Settings {
            access_point: AccessPointConfig {
                ssid: args.ssid,
                passphrase: args.passphrase,
            },
            ap_interface: args.ap_interface,
            sta_interface,
            hostapd_ctrl_dir: PathBuf::from(args.hostapd_ctrl_dir),
            wpa_ctrl_dir: PathBuf::from(args.wpa_ctrl_dir),
            listen: SocketAddr::new(args.bind, args.port),
            transfer: TransferPolicy {
                chunk_size: args.chunk_size,
                fill: FILL_BYTE,
                stall_timeout: Duration::from_millis(args.stall_timeout_ms),
            },
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            scan_wait: Duration::from_millis(args.scan_wait_ms),
            mock: args.mock,
        })
    }
}
