//! Resize coordinator
//!
//! Observes the hosting container's size and reports when the viewer
//! should pick up a new one. With a debounce configured, a burst of
//! resizes collapses into the last size once the container stops moving.

use std::time::{Duration, Instant};

use log::debug;

#[derive(Debug)]
pub struct ResizeCoordinator {
    last: Option<(f32, f32)>,
    debounce: Option<Duration>,
    pending: Option<((f32, f32), Instant)>,
}

impl ResizeCoordinator {
    #[must_use]
    pub fn new(debounce: Option<Duration>) -> Self {
        Self {
            last: None,
            debounce,
            pending: None,
        }
    }

    /// Record an observed size. Returns the size to apply now, if any.
    pub fn observe(&mut self, width: f32, height: f32, now: Instant) -> Option<(f32, f32)> {
        let size = (width.max(0.0), height.max(0.0));
        if self.debounce.is_none() {
            return self.commit(size);
        }

        if self.last == Some(size) {
            self.pending = None;
            return None;
        }
        self.pending = Some((size, now));
        None
    }

    /// Apply a size right away, dropping anything pending
    pub fn observe_now(&mut self, width: f32, height: f32) -> Option<(f32, f32)> {
        self.pending = None;
        self.commit((width.max(0.0), height.max(0.0)))
    }

    /// Release a debounced size once it has been quiet long enough
    pub fn flush(&mut self, now: Instant) -> Option<(f32, f32)> {
        let debounce = self.debounce?;
        let (size, observed_at) = self.pending?;
        if now.saturating_duration_since(observed_at) < debounce {
            return None;
        }
        self.pending = None;
        self.commit(size)
    }

    fn commit(&mut self, size: (f32, f32)) -> Option<(f32, f32)> {
        if self.last == Some(size) {
            return None;
        }
        debug!("Container resized to {}x{}", size.0, size.1);
        self.last = Some(size);
        Some(size)
    }
}
