//! Viewer configuration
//!
//! Static settings fixed when a viewer is constructed. Values come from an
//! optional YAML file and may be overridden from the command line.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::render::{DEFAULT_CACHE_SIZE, DEFAULT_WORKERS};

const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "folio";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Open documents as two-page book spreads instead of a scroll strip
    pub double_page_default: bool,
    pub initial_zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Increment applied by zoom in/out
    pub zoom_step: f32,
    /// Gap between adjacent pages, in logical pixels
    pub page_gap: f32,
    /// Pages rendered before and after the current one in scroll mode
    pub preload_pages: usize,
    pub show_controls: bool,
    /// Horizontal travel that turns a page during a touch swipe
    pub swipe_threshold: f32,
    /// Number of rendered surfaces kept in memory
    pub cache_capacity: usize,
    pub render_workers: usize,
    /// How long the error banner stays on screen
    pub error_banner_ms: u64,
    /// 0 disables debouncing of container resizes
    pub resize_debounce_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            double_page_default: false,
            initial_zoom: 1.0,
            min_zoom: 0.5,
            max_zoom: 2.5,
            zoom_step: 0.1,
            page_gap: 10.0,
            preload_pages: 2,
            show_controls: true,
            swipe_threshold: 50.0,
            cache_capacity: DEFAULT_CACHE_SIZE,
            render_workers: DEFAULT_WORKERS,
            error_banner_ms: 3000,
            resize_debounce_ms: 0,
        }
    }
}

impl ViewerConfig {
    /// Repair values that would break viewer invariants
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();

        if !self.min_zoom.is_finite() || self.min_zoom <= 0.0 {
            self.min_zoom = defaults.min_zoom;
        }
        if !self.max_zoom.is_finite() || self.max_zoom <= 0.0 {
            self.max_zoom = defaults.max_zoom;
        }
        if self.min_zoom > self.max_zoom {
            std::mem::swap(&mut self.min_zoom, &mut self.max_zoom);
        }
        if !self.initial_zoom.is_finite() {
            self.initial_zoom = defaults.initial_zoom;
        }
        self.initial_zoom = self.initial_zoom.clamp(self.min_zoom, self.max_zoom);

        if !self.zoom_step.is_finite() || self.zoom_step <= 0.0 {
            self.zoom_step = defaults.zoom_step;
        }
        if !self.swipe_threshold.is_finite() || self.swipe_threshold <= 0.0 {
            self.swipe_threshold = defaults.swipe_threshold;
        }
        if !self.page_gap.is_finite() || self.page_gap < 0.0 {
            self.page_gap = 0.0;
        }
        self.cache_capacity = self.cache_capacity.max(1);
        self.render_workers = self.render_workers.max(1);
        self
    }

    pub fn error_banner_duration(&self) -> Duration {
        Duration::from_millis(self.error_banner_ms)
    }

    pub fn resize_debounce(&self) -> Option<Duration> {
        (self.resize_debounce_ms > 0).then(|| Duration::from_millis(self.resize_debounce_ms))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load the configuration, falling back to defaults on any problem.
///
/// An explicit path takes precedence over the per-user config directory.
pub fn load_config(explicit: Option<&Path>) -> ViewerConfig {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => {
                warn!("Could not determine config directory, using default settings");
                return ViewerConfig::default();
            }
        },
    };

    if !path.exists() {
        info!("Settings file {path:?} not found, using defaults");
        return ViewerConfig::default();
    }

    load_config_from_path(&path)
}

fn load_config_from_path(path: &Path) -> ViewerConfig {
    match fs::read_to_string(path) {
        Ok(content) => match parse_config(&content) {
            Ok(config) => {
                debug!("Loaded settings from {path:?}");
                config
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
                ViewerConfig::default()
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            ViewerConfig::default()
        }
    }
}

pub fn parse_config(content: &str) -> Result<ViewerConfig, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(ViewerConfig::default());
    }
    serde_yaml::from_str::<ViewerConfig>(content).map(ViewerConfig::normalized)
}
