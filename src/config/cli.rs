//! Command-line argument parsing

use std::net::IpAddr;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[clap(name = "wifi-diag-ap", version, author)]
#[clap(about = "WiFi diagnostic access point with status, scan and throughput endpoints")]
pub struct CliArgs {
    /// Access point SSID
    #[clap(long, default_value = "WiFi_Diag_AP")]
    pub ssid: String,

    /// WPA2 passphrase (8 to 63 characters)
    #[clap(long, default_value = "12345678")]
    pub passphrase: String,

    /// Wireless interface running the access point
    #[clap(short = 'i', long, default_value = "wlan0")]
    pub ap_interface: String,

    /// Station interface used for scans (defaults to the AP interface)
    #[clap(long)]
    pub sta_interface: Option<String>,

    /// hostapd control socket directory
    #[clap(long, default_value = "/var/run/hostapd")]
    pub hostapd_ctrl_dir: String,

    /// wpa_supplicant control socket directory
    #[clap(long, default_value = "/var/run/wpa_supplicant")]
    pub wpa_ctrl_dir: String,

    /// Address to listen on
    #[clap(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,

    /// HTTP port
    #[clap(short, long, default_value = "80")]
    pub port: u16,

    /// Download chunk size in bytes (1 to 4096)
    #[clap(long, default_value = "4096")]
    pub chunk_size: usize,

    /// Abort a download when a chunk cannot be sent for this long
    #[clap(long, default_value = "5000")]
    pub stall_timeout_ms: u64,

    /// Drop a connection that has not sent its request head in time
    #[clap(long, default_value = "30")]
    pub request_timeout_secs: u64,

    /// Delay between starting a scan and collecting its results
    #[clap(long, default_value = "3000")]
    pub scan_wait_ms: u64,

    /// Serve from an in-memory radio instead of hostapd
    #[clap(long)]
    pub mock: bool,
}
