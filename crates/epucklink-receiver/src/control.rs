use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared switches between the worker and whoever drives it.
///
/// `enabled` selects between decoding frames and discarding input. The
/// worker re-reads it at the top of every iteration, so a flip takes effect
/// once the frame in flight is finished.
#[derive(Debug, Clone)]
pub struct ReceptionControl {
    enabled: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
}

impl ReceptionControl {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Start decoding frames.
    pub fn enable(&self) {
        self.set_enabled(true);
    }

    /// Stop decoding; buffered input is drained and dropped.
    pub fn disable(&self) {
        self.set_enabled(false);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// False once shutdown has been requested.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

impl Default for ReceptionControl {
    fn default() -> Self {
        Self::new(false)
    }
}
