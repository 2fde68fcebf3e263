//! Layout engine
//!
//! Decides which pages a view needs and at what scale, and where the
//! resulting page elements sit on the horizontal page strip.

use crate::document::{DocumentHandle, PageDescriptor};
use crate::error::ViewerError;
use crate::navigation::ViewerState;
use crate::render::{PageViewport, PlannedPage};

/// How pages are presented
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Continuous strip of pages around the current one
    #[default]
    Scroll,
    /// One- or two-page spread fitted to the container
    Book,
}

impl ViewMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Scroll => Self::Book,
            Self::Book => Self::Scroll,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scroll => "Scroll",
            Self::Book => "Book",
        }
    }
}

/// Pages shown together in book mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Spread {
    pub first: usize,
    pub second: Option<usize>,
}

impl Spread {
    /// The spread containing `current`. None when the document is empty.
    #[must_use]
    pub fn containing(current: usize, total: usize) -> Option<Self> {
        if total == 0 {
            return None;
        }
        let current = current.clamp(1, total);
        let first = (current - 1) / 2 * 2 + 1;
        let second = (first < total).then_some(first + 1);
        Some(Self { first, second })
    }

    pub fn pages(&self) -> impl Iterator<Item = usize> {
        std::iter::once(self.first).chain(self.second)
    }

    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        page == self.first || Some(page) == self.second
    }
}

/// Scroll-mode preload window around `current`, clamped to the document
#[must_use]
pub fn scroll_window(current: usize, total: usize, preload: usize) -> Vec<usize> {
    if total == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let start = current.saturating_sub(preload).max(1);
    let end = current.saturating_add(preload).min(total);
    (start..=end).collect()
}

/// Scale that fits a page's width into half the container, minus the gap.
///
/// Falls back to 1.0 until the container has a usable width.
#[must_use]
pub fn book_scale(container_width: f32, page_gap: f32, intrinsic_width: f32) -> f32 {
    let available = container_width / 2.0 - page_gap;
    if available <= 0.0 || intrinsic_width <= 0.0 || !available.is_finite() {
        return 1.0;
    }
    available / intrinsic_width
}

/// Page numbers the current state needs rendered, in display order
#[must_use]
pub fn page_set(state: &ViewerState, preload: usize) -> Vec<usize> {
    match state.mode {
        ViewMode::Scroll => scroll_window(state.current_page, state.total_pages, preload),
        ViewMode::Book => Spread::containing(state.current_page, state.total_pages)
            .map(|spread| spread.pages().collect())
            .unwrap_or_default(),
    }
}

/// Render scale of one page under the current state
#[must_use]
pub fn render_scale(state: &ViewerState, page_gap: f32, page: &PageDescriptor) -> f32 {
    match state.mode {
        ViewMode::Scroll => state.zoom,
        ViewMode::Book => book_scale(state.container_width, page_gap, page.width),
    }
}

/// Pages to render for one layout pass
#[derive(Debug, Default)]
pub struct LayoutPlan {
    pub pages: Vec<PlannedPage>,
    /// Pages whose metadata could not be read; they get no element
    pub unavailable: Vec<(usize, ViewerError)>,
}

/// Full render plan: every needed page with its viewport.
///
/// A page that cannot be measured is reported in `unavailable` and does
/// not keep the rest of the set from being planned.
pub fn plan(
    state: &ViewerState,
    page_gap: f32,
    preload: usize,
    document: &mut DocumentHandle,
) -> LayoutPlan {
    let mut plan = LayoutPlan::default();
    for number in page_set(state, preload) {
        match document.get_page(number) {
            Ok(page) => {
                let scale = render_scale(state, page_gap, &page);
                plan.pages.push(PlannedPage {
                    page,
                    viewport: PageViewport::for_page(&page, scale),
                });
            }
            Err(err) => plan.unavailable.push((number, err)),
        }
    }
    plan
}

/// A page placed on the strip, in logical pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageElement {
    pub page: usize,
    pub x: f32,
    pub width: f32,
    pub height: f32,
}

impl PageElement {
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Width of this element inside the window `[left, left + width)`
    #[must_use]
    pub fn visible_width(&self, left: f32, width: f32) -> f32 {
        (self.right().min(left + width) - self.x.max(left)).max(0.0)
    }
}

/// Lay pages out left to right, `gap` apart
#[must_use]
pub fn arrange(pages: &[(usize, PageViewport)], gap: f32) -> Vec<PageElement> {
    let mut cursor = 0.0;
    pages
        .iter()
        .map(|(page, viewport)| {
            let element = PageElement {
                page: *page,
                x: cursor,
                width: viewport.width,
                height: viewport.height,
            };
            cursor += viewport.width + gap;
            element
        })
        .collect()
}

/// Right edge of the strip
#[must_use]
pub fn content_width(elements: &[PageElement]) -> f32 {
    elements.last().map_or(0.0, PageElement::right)
}
