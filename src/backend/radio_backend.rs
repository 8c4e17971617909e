//! Radio backend trait definition

use tokio::sync::mpsc;
use trait_variant::make;

use crate::core::error::RadioResult;
use crate::core::types::{AccessPointConfig, MacAddress, RadioEvent, Station, WifiNetwork};

/// Abstraction over the wireless stack (typically hostapd + wpa_supplicant)
///
/// This trait enables testing by allowing mock implementations
/// while providing a standard interface for the radio operations
/// the diagnostic endpoints need.
#[make(Send)]
pub trait RadioBackend: Send + Sync + 'static {
    /// Bring up the access point with the given identity
    async fn start_access_point(&self, config: &AccessPointConfig) -> RadioResult<()>;

    /// IPv4 address of the access point interface
    async fn ip_address(&self) -> RadioResult<String>;

    /// Hardware address of the radio
    async fn mac_address(&self) -> RadioResult<MacAddress>;

    /// Current maximum transmit power in dBm
    async fn tx_power(&self) -> RadioResult<f32>;

    /// Scan for nearby networks
    ///
    /// Blocks until the scan has finished; this may take several seconds
    /// and the radio serves its stations poorly meanwhile.
    async fn scan(&self) -> RadioResult<Vec<WifiNetwork>>;

    /// Release the scan buffer kept by the platform after [`RadioBackend::scan`]
    async fn release_scan(&self) -> RadioResult<()>;

    /// Stations currently associated with the access point, in platform order
    async fn stations(&self) -> RadioResult<Vec<Station>>;

    /// Subscribe to connectivity events
    ///
    /// Every event published after this call is delivered; none are dropped.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<RadioEvent>;
}
