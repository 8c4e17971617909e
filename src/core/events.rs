//! Radio event fan-out

use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::core::types::RadioEvent;

/// Delivers every published [`RadioEvent`] to every live subscriber
///
/// Queues are unbounded: a slow subscriber delays its own events but never
/// loses one. Publishing never blocks, so it is safe from listener threads.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<RadioEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive all events published from now on
    ///
    /// The receiver ends once the bus is dropped.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RadioEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Send `event` to every subscriber; returns how many received it
    pub fn publish(&self, event: RadioEvent) -> usize {
        let mut subscribers = self.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<RadioEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
