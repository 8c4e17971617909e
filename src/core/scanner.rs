//! Synchronous network scanning

use std::sync::Arc;

use tracing::{debug, warn};

use crate::{backend::RadioBackend, core::types::WifiNetwork};

/// WiFi scanning service
///
/// Every scan runs to completion before the caller continues, and the
/// platform's scan buffer is released once the results have been rendered.
pub struct ScanService<B: RadioBackend> {
    backend: Arc<B>,
}

impl<B: RadioBackend> ScanService<B> {
    /// Create a new scan service with the given backend
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Scan, render the results with `render`, then release the scan buffer
    ///
    /// A failed scan renders an empty list.
    pub async fn scan_with<T>(&self, render: impl FnOnce(&[WifiNetwork]) -> T) -> T {
        let networks = match self.backend.scan().await {
            Ok(networks) => networks,
            Err(e) => {
                warn!("Scan failed: {}", e);
                Vec::new()
            }
        };
        debug!("Rendering {} networks", networks.len());

        let rendered = render(&networks);
        drop(networks);

        if let Err(e) = self.backend.release_scan().await {
            warn!("Failed to release scan results: {}", e);
        }

        rendered
    }
}
