//! Navigation controller
//!
//! [`ViewerState`] is the single mutable state of an open viewer. Page,
//! zoom and mode changes go through [`ViewerState::apply`], which returns the
//! effects the viewer must carry out.

use log::debug;

use crate::config::ViewerConfig;
use crate::layout::{Spread, ViewMode};

/// Zoom bounds and step, fixed at construction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        let config = ViewerConfig::default();
        Self {
            min: config.min_zoom,
            max: config.max_zoom,
            step: config.zoom_step,
        }
    }
}

impl ZoomLimits {
    /// Clamp and round to two decimals so repeated steps don't drift
    #[must_use]
    pub fn clamp(&self, zoom: f32) -> f32 {
        ((zoom * 100.0).round() / 100.0).clamp(self.min, self.max)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerState {
    /// Current page (1-indexed), 0 while nothing is loaded
    pub current_page: usize,
    pub total_pages: usize,
    pub mode: ViewMode,
    pub zoom: f32,
    pub zoom_limits: ZoomLimits,

    pub container_width: f32,
    pub container_height: f32,

    /// Horizontal scroll position of the page strip
    pub scroll_offset: f32,

    pub is_dragging: bool,
    pub drag_origin: f32,
    pub drag_start_scroll_offset: f32,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            current_page: 0,
            total_pages: 0,
            mode: ViewMode::Scroll,
            zoom: 1.0,
            zoom_limits: ZoomLimits::default(),
            container_width: 0.0,
            container_height: 0.0,
            scroll_offset: 0.0,
            is_dragging: false,
            drag_origin: 0.0,
            drag_start_scroll_offset: 0.0,
        }
    }
}

impl ViewerState {
    #[must_use]
    pub fn from_config(config: &ViewerConfig) -> Self {
        let zoom_limits = ZoomLimits {
            min: config.min_zoom,
            max: config.max_zoom,
            step: config.zoom_step,
        };
        Self {
            mode: if config.double_page_default {
                ViewMode::Book
            } else {
                ViewMode::Scroll
            },
            zoom: zoom_limits.clamp(config.initial_zoom),
            zoom_limits,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.total_pages > 0
    }

    /// Spread shown in book mode for the current page
    #[must_use]
    pub fn spread(&self) -> Option<Spread> {
        Spread::containing(self.current_page, self.total_pages)
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        debug!("Navigation command {cmd:?}");
        match cmd {
            Command::DocumentLoaded { total, start_page } => {
                self.total_pages = total;
                self.current_page = if total > 0 {
                    start_page.clamp(1, total)
                } else {
                    0
                };
                self.scroll_offset = 0.0;
                self.is_dragging = false;
                vec![Effect::ClearElements, Effect::InvalidateCache, Effect::Relayout]
            }

            Command::DocumentClosed => {
                self.total_pages = 0;
                self.current_page = 0;
                self.scroll_offset = 0.0;
                self.is_dragging = false;
                vec![Effect::ClearElements]
            }

            Command::SetContainer { width, height } => {
                if self.container_width == width && self.container_height == height {
                    return vec![];
                }
                self.container_width = width;
                self.container_height = height;
                if self.is_loaded() {
                    vec![Effect::Relayout]
                } else {
                    vec![]
                }
            }

            // Everything below is a no-op until a document with pages is open
            _ if !self.is_loaded() => vec![],

            Command::GoToPage(page) => {
                let clamped = page.clamp(1, self.total_pages);
                if clamped == self.current_page {
                    return vec![];
                }
                self.current_page = clamped;
                match self.mode {
                    ViewMode::Scroll => vec![Effect::RevealPage(clamped)],
                    ViewMode::Book => vec![Effect::Relayout],
                }
            }

            Command::NextPage => match self.mode {
                ViewMode::Scroll => self.apply(Command::GoToPage(self.current_page + 1)),
                ViewMode::Book => {
                    let Some(spread) = self.spread() else {
                        return vec![];
                    };
                    let next = spread.first + 2;
                    if next > self.total_pages {
                        return vec![];
                    }
                    self.apply(Command::GoToPage(next))
                }
            },

            Command::PrevPage => match self.mode {
                ViewMode::Scroll => {
                    if self.current_page <= 1 {
                        return vec![];
                    }
                    self.apply(Command::GoToPage(self.current_page - 1))
                }
                ViewMode::Book => {
                    let Some(spread) = self.spread() else {
                        return vec![];
                    };
                    if spread.first <= 1 {
                        return vec![];
                    }
                    self.apply(Command::GoToPage(spread.first - 2))
                }
            },

            Command::FirstPage => self.apply(Command::GoToPage(1)),

            Command::LastPage => self.apply(Command::GoToPage(self.total_pages)),

            Command::SetZoom(zoom) => {
                if !zoom.is_finite() {
                    return vec![];
                }
                let clamped = self.zoom_limits.clamp(zoom);
                if (self.zoom - clamped).abs() <= f32::EPSILON {
                    return vec![];
                }
                self.zoom = clamped;
                vec![Effect::InvalidateCache, Effect::Relayout]
            }

            Command::ZoomIn => self.apply(Command::SetZoom(self.zoom + self.zoom_limits.step)),

            Command::ZoomOut => self.apply(Command::SetZoom(self.zoom - self.zoom_limits.step)),

            Command::ToggleMode => {
                self.mode = self.mode.toggled();
                self.scroll_offset = 0.0;
                self.is_dragging = false;
                vec![Effect::ResetScroll, Effect::ClearElements, Effect::Relayout]
            }

            Command::Refresh => vec![Effect::Relayout],

            Command::ObservePage(page) => {
                if self.mode == ViewMode::Scroll && (1..=self.total_pages).contains(&page) {
                    self.current_page = page;
                }
                vec![]
            }
        }
    }
}

/// Commands that modify viewer state
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// A document finished opening
    DocumentLoaded { total: usize, start_page: usize },
    /// The document was closed
    DocumentClosed,
    /// The hosting container changed size
    SetContainer { width: f32, height: f32 },
    GoToPage(usize),
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    SetZoom(f32),
    ZoomIn,
    ZoomOut,
    ToggleMode,
    /// Re-run layout and rendering for the current state
    Refresh,
    /// Scroll position settled on a page; updates the counter only
    ObservePage(usize),
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Recompute the page set and render it
    Relayout,
    /// Drop every cached surface
    InvalidateCache,
    /// Scroll the strip back to its start
    ResetScroll,
    /// Remove all displayed page elements
    ClearElements,
    /// Bring a page into view, rendering first if it is not displayed
    RevealPage(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(mode: ViewMode, total: usize) -> ViewerState {
        let mut state = ViewerState {
            mode,
            zoom_limits: ZoomLimits {
                min: 0.5,
                max: 2.5,
                step: 0.1,
            },
            ..ViewerState::default()
        };
        let _ = state.apply(Command::DocumentLoaded {
            total,
            start_page: 1,
        });
        state
    }

    #[test]
    fn everything_is_a_noop_before_load() {
        let mut state = ViewerState::default();
        for cmd in [
            Command::GoToPage(3),
            Command::NextPage,
            Command::PrevPage,
            Command::ZoomIn,
            Command::ToggleMode,
            Command::Refresh,
        ] {
            assert!(state.apply(cmd).is_empty(), "{cmd:?}");
        }
        assert_eq!(state.current_page, 0);
        assert_eq!(state.zoom, 1.0);
        assert_eq!(state.mode, ViewMode::Scroll);
    }

    #[test]
    fn go_to_page_clamps() {
        let mut state = loaded(ViewMode::Scroll, 10);
        for (target, expected) in [(0, 1), (4, 4), (10, 10), (999, 10), (1, 1)] {
            let _ = state.apply(Command::GoToPage(target));
            assert_eq!(state.current_page, expected, "goToPage({target})");
        }
    }

    #[test]
    fn go_to_current_page_is_noop() {
        let mut state = loaded(ViewMode::Scroll, 10);
        let _ = state.apply(Command::GoToPage(4));
        assert!(state.apply(Command::GoToPage(4)).is_empty());
    }

    #[test]
    fn scroll_mode_reveals_book_mode_relayouts() {
        let mut state = loaded(ViewMode::Scroll, 10);
        assert_eq!(state.apply(Command::GoToPage(3)), vec![Effect::RevealPage(3)]);

        let mut state = loaded(ViewMode::Book, 10);
        assert_eq!(state.apply(Command::GoToPage(3)), vec![Effect::Relayout]);
    }

    #[test]
    fn book_mode_steps_by_spread() {
        let mut state = loaded(ViewMode::Book, 10);
        let _ = state.apply(Command::GoToPage(4));
        assert_eq!(state.spread(), Spread::containing(3, 10));

        let _ = state.apply(Command::NextPage);
        assert_eq!(state.current_page, 5);
        assert_eq!(
            state.spread(),
            Some(Spread {
                first: 5,
                second: Some(6)
            })
        );

        let _ = state.apply(Command::PrevPage);
        assert_eq!(state.current_page, 3);

        let _ = state.apply(Command::PrevPage);
        assert_eq!(state.current_page, 1);
        assert!(state.apply(Command::PrevPage).is_empty());
    }

    #[test]
    fn book_mode_stops_at_last_spread() {
        let mut state = loaded(ViewMode::Book, 10);
        let _ = state.apply(Command::GoToPage(9));
        assert!(state.apply(Command::NextPage).is_empty());
        assert_eq!(state.current_page, 9);
    }

    #[test]
    fn scroll_mode_steps_by_one() {
        let mut state = loaded(ViewMode::Scroll, 3);
        let _ = state.apply(Command::NextPage);
        assert_eq!(state.current_page, 2);
        let _ = state.apply(Command::NextPage);
        let _ = state.apply(Command::NextPage);
        assert_eq!(state.current_page, 3);
        let _ = state.apply(Command::PrevPage);
        assert_eq!(state.current_page, 2);
    }

    #[test]
    fn zoom_in_saturates_at_max() {
        let mut state = loaded(ViewMode::Scroll, 3);
        for _ in 0..20 {
            let _ = state.apply(Command::ZoomIn);
        }
        assert_eq!(state.zoom, 2.5);
        assert!(state.apply(Command::ZoomIn).is_empty());
    }

    #[test]
    fn zoom_out_saturates_at_min() {
        let mut state = loaded(ViewMode::Scroll, 3);
        for _ in 0..20 {
            let _ = state.apply(Command::ZoomOut);
        }
        assert_eq!(state.zoom, 0.5);
    }

    #[test]
    fn set_zoom_clamps_and_invalidates() {
        let mut state = loaded(ViewMode::Scroll, 3);
        let effects = state.apply(Command::SetZoom(7.0));
        assert_eq!(state.zoom, 2.5);
        assert_eq!(effects, vec![Effect::InvalidateCache, Effect::Relayout]);

        let _ = state.apply(Command::SetZoom(0.1));
        assert_eq!(state.zoom, 0.5);
        assert!(state.apply(Command::SetZoom(f32::NAN)).is_empty());
    }

    #[test]
    fn toggle_twice_keeps_page_and_resets_scroll() {
        let mut state = loaded(ViewMode::Scroll, 10);
        let _ = state.apply(Command::GoToPage(6));
        state.scroll_offset = 340.0;

        let effects = state.apply(Command::ToggleMode);
        assert_eq!(state.mode, ViewMode::Book);
        assert_eq!(state.scroll_offset, 0.0);
        assert_eq!(
            effects,
            vec![Effect::ResetScroll, Effect::ClearElements, Effect::Relayout]
        );

        state.scroll_offset = 50.0;
        let _ = state.apply(Command::ToggleMode);
        assert_eq!(state.mode, ViewMode::Scroll);
        assert_eq!(state.scroll_offset, 0.0);
        assert_eq!(state.current_page, 6);
    }

    #[test]
    fn container_change_relayouts_only_when_loaded() {
        let mut state = ViewerState::default();
        let effects = state.apply(Command::SetContainer {
            width: 800.0,
            height: 600.0,
        });
        assert!(effects.is_empty());
        assert_eq!(state.container_width, 800.0);

        let mut state = loaded(ViewMode::Book, 4);
        let effects = state.apply(Command::SetContainer {
            width: 800.0,
            height: 600.0,
        });
        assert_eq!(effects, vec![Effect::Relayout]);
        assert!(
            state
                .apply(Command::SetContainer {
                    width: 800.0,
                    height: 600.0,
                })
                .is_empty()
        );
    }

    #[test]
    fn observed_page_only_moves_counter_in_scroll_mode() {
        let mut state = loaded(ViewMode::Scroll, 10);
        assert!(state.apply(Command::ObservePage(4)).is_empty());
        assert_eq!(state.current_page, 4);

        let mut state = loaded(ViewMode::Book, 10);
        let _ = state.apply(Command::ObservePage(4));
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn empty_document_stays_unloaded() {
        let mut state = ViewerState::default();
        let _ = state.apply(Command::DocumentLoaded {
            total: 0,
            start_page: 1,
        });
        assert_eq!(state.current_page, 0);
        assert!(state.apply(Command::NextPage).is_empty());
    }

    #[test]
    fn load_clamps_start_page() {
        let mut state = ViewerState::default();
        let _ = state.apply(Command::DocumentLoaded {
            total: 5,
            start_page: 40,
        });
        assert_eq!(state.current_page, 5);
    }
}
