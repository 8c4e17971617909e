//! Connectivity event monitoring

use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::types::RadioEvent;

/// Process-wide link metrics
///
/// Concurrency contract: the event monitor is the only writer and the status
/// reporter the only reader. The counter is a single independent word, so
/// `Relaxed` increments and loads are sufficient. Anything that has to stay
/// consistent with the counter must not be added here without a lock or a
/// queue.
#[derive(Debug, Default)]
pub struct LinkMetrics {
    disconnects: AtomicU32,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one disconnect; saturates instead of wrapping
    pub fn record_disconnect(&self) {
        let _ = self
            .disconnects
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1));
    }

    /// Disconnects seen since the process started
    pub fn disconnects(&self) -> u32 {
        self.disconnects.load(Ordering::Relaxed)
    }
}

/// Feeds radio events into [`LinkMetrics`]
#[derive(Debug, Clone)]
pub struct EventMonitor {
    metrics: Arc<LinkMetrics>,
}

impl EventMonitor {
    pub fn new(metrics: Arc<LinkMetrics>) -> Self {
        Self { metrics }
    }

    /// Handle one event; only disconnects are acted on
    pub fn on_event(&self, event: &RadioEvent) {
        if event.is_disconnect() {
            self.metrics.record_disconnect();
            debug!(?event, total = self.metrics.disconnects(), "Disconnect recorded");
        } else {
            debug!(?event, "Ignoring radio event");
        }
    }

    /// Consume events until the source goes away
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<RadioEvent>) {
        info!("Event monitor started");

        while let Some(event) = events.recv().await {
            self.on_event(&event);
        }

        info!("Event monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockRadioBackend, RadioBackend};
    use crate::core::types::MacAddress;

    #[test]
    fn test_counter_counts_only_disconnects() {
        let metrics = Arc::new(LinkMetrics::new());
        let monitor = EventMonitor::new(metrics.clone());
        let mac = MacAddress::new([2, 0, 0, 0, 1, 0]);

        monitor.on_event(&RadioEvent::StationConnected(mac));
        monitor.on_event(&RadioEvent::StationDisconnected(mac));
        monitor.on_event(&RadioEvent::Connected);
        monitor.on_event(&RadioEvent::Disconnected);
        monitor.on_event(&RadioEvent::ScanResults);
        monitor.on_event(&RadioEvent::Other("AP-ENABLED".into()));

        assert_eq!(metrics.disconnects(), 2);
    }

    #[test]
    fn test_counter_equals_delivered_disconnects() {
        for n in [0u32, 1, 7, 250] {
            let metrics = Arc::new(LinkMetrics::new());
            let monitor = EventMonitor::new(metrics.clone());
            for _ in 0..n {
                monitor.on_event(&RadioEvent::Disconnected);
            }
            assert_eq!(metrics.disconnects(), n);
        }
    }

    #[test]
    fn test_counter_saturates() {
        let metrics = LinkMetrics {
            disconnects: AtomicU32::new(u32::MAX),
        };
        metrics.record_disconnect();
        assert_eq!(metrics.disconnects(), u32::MAX);
    }

    #[tokio::test]
    async fn test_monitor_task_consumes_backend_events() {
        let backend = MockRadioBackend::new();
        let metrics = Arc::new(LinkMetrics::new());
        let task = tokio::spawn(EventMonitor::new(metrics.clone()).run(backend.subscribe()));

        let mac = MacAddress::new([2, 0, 0, 0, 1, 0]);
        backend.emit(RadioEvent::StationConnected(mac));
        backend.emit(RadioEvent::StationDisconnected(mac));
        backend.emit(RadioEvent::Disconnected);
        backend.emit(RadioEvent::StationDisconnected(mac));

        // Dropping every sender closes the channel and ends the task
        drop(backend);
        task.await.unwrap();

        assert_eq!(metrics.disconnects(), 3);
    }

    #[tokio::test]
    async fn test_burst_is_counted_exactly() {
        let backend = MockRadioBackend::new();
        let metrics = Arc::new(LinkMetrics::new());
        let events = backend.subscribe();

        // Published before the monitor is ever polled
        let mac = MacAddress::new([2, 0, 0, 0, 2, 0]);
        for i in 0..5000 {
            if i % 2 == 0 {
                backend.emit(RadioEvent::Other("CTRL-EVENT-BSS-ADDED".into()));
            }
            backend.emit(RadioEvent::StationDisconnected(mac));
        }
        drop(backend);

        EventMonitor::new(metrics.clone()).run(events).await;
        assert_eq!(metrics.disconnects(), 5000);
    }
}
