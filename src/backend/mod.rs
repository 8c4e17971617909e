//! Radio and platform backend abstraction layer

pub mod hostapd_backend;
pub mod linux_probe;
pub mod mock_backend;
pub mod radio_backend;
pub mod system_probe;

pub use hostapd_backend::{HostapdBackend, HostapdConfig};
pub use linux_probe::LinuxSystemProbe;
pub use mock_backend::{MockRadioBackend, MockSystemProbe};
pub use radio_backend::RadioBackend;
pub use system_probe::SystemProbe;
