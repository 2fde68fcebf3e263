use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerLevel {
    Info,
    Error,
}

/// A message that dismisses itself after a fixed time
#[derive(Debug, Clone)]
pub struct Banner {
    pub message: String,
    pub level: BannerLevel,
    pub expires_at: Instant,
}

impl Banner {
    pub fn new(message: impl Into<String>, level: BannerLevel, duration: Duration) -> Self {
        Self {
            message: message.into(),
            level,
            expires_at: Instant::now() + duration,
        }
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }
}

/// Holds at most one banner; a newer message replaces the old one
#[derive(Debug)]
pub struct BannerSlot {
    current: Option<Banner>,
    duration: Duration,
}

impl BannerSlot {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: None,
            duration,
        }
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.current = Some(Banner::new(message, BannerLevel::Error, self.duration));
    }

    pub fn show_info(&mut self, message: impl Into<String>) {
        self.current = Some(Banner::new(message, BannerLevel::Info, self.duration));
    }

    /// Banner still on screen, if any
    pub fn current(&self) -> Option<&Banner> {
        self.current.as_ref().filter(|b| !b.is_expired())
    }

    /// Drop an expired banner; returns true if one was removed
    pub fn update(&mut self, now: Instant) -> bool {
        if self.current.as_ref().is_some_and(|b| b.is_expired_at(now)) {
            self.current = None;
            return true;
        }
        false
    }
}
