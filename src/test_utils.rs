//! In-memory documents for exercising the viewer without a rendering library

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossterm::event::{Event, KeyCode, MouseButton, MouseEventKind};
use image::{Rgb, RgbImage};

use crate::document::{BackendFault, DocumentBackend, PageDescriptor, PageSource};
use crate::error::LoadError;
use crate::event_source::SimulatedEventSource;
use crate::render::PageViewport;

/// A fake document: page sizes plus pages that refuse to render
#[derive(Clone, Debug, Default)]
pub struct SyntheticDocument {
    page_sizes: Vec<(f32, f32)>,
    failing: HashSet<usize>,
    render_delay: Duration,
}

impl SyntheticDocument {
    /// `count` pages of 600x800
    pub fn uniform(count: usize) -> Self {
        Self::with_sizes(vec![(600.0, 800.0); count])
    }

    pub fn with_sizes(page_sizes: Vec<(f32, f32)>) -> Self {
        Self {
            page_sizes,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, page: usize) -> Self {
        self.failing.insert(page);
        self
    }

    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = delay;
        self
    }
}

/// Backend serving [`SyntheticDocument`]s by locator.
///
/// Clones share the render counter, so a test can keep one handle while the
/// viewer owns another.
#[derive(Clone, Debug, Default)]
pub struct SyntheticBackend {
    documents: HashMap<String, SyntheticDocument>,
    renders: Arc<AtomicUsize>,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, locator: &str, document: SyntheticDocument) -> Self {
        self.documents.insert(locator.to_string(), document);
        self
    }

    /// Number of pages rasterized so far, across all workers
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl DocumentBackend for SyntheticBackend {
    fn open(&self, locator: &str) -> Result<Box<dyn PageSource>, LoadError> {
        let document = self
            .documents
            .get(locator)
            .cloned()
            .ok_or_else(|| LoadError::new(locator, "no such document"))?;

        Ok(Box::new(SyntheticSource {
            document,
            renders: Arc::clone(&self.renders),
        }))
    }
}

struct SyntheticSource {
    document: SyntheticDocument,
    renders: Arc<AtomicUsize>,
}

impl PageSource for SyntheticSource {
    fn page_count(&self) -> usize {
        self.document.page_sizes.len()
    }

    fn page_size(&self, number: usize) -> Result<(f32, f32), BackendFault> {
        number
            .checked_sub(1)
            .and_then(|index| self.document.page_sizes.get(index).copied())
            .ok_or_else(|| BackendFault::generic(format!("no page {number}")))
    }

    fn rasterize(
        &self,
        page: &PageDescriptor,
        viewport: &PageViewport,
    ) -> Result<RgbImage, BackendFault> {
        if !self.document.render_delay.is_zero() {
            std::thread::sleep(self.document.render_delay);
        }
        if self.document.failing.contains(&page.number) {
            return Err(BackendFault::generic("synthetic render failure"));
        }

        self.renders.fetch_add(1, Ordering::SeqCst);
        let (width, height) = viewport.pixel_size();
        Ok(RgbImage::from_pixel(width, height, page_color(page.number)))
    }
}

/// Solid color each synthetic page is painted with
pub fn page_color(page: usize) -> Rgb<u8> {
    let shade = (page * 37 % 200) as u8 + 40;
    Rgb([shade, 255 - shade, 128])
}

/// Builds a scripted [`SimulatedEventSource`] for driving the app loop
#[derive(Debug, Default)]
pub struct TestScenarioBuilder {
    events: Vec<Event>,
}

impl TestScenarioBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press_char(mut self, c: char) -> Self {
        self.events.push(SimulatedEventSource::char_key(c));
        self
    }

    pub fn press(mut self, code: KeyCode) -> Self {
        self.events.push(SimulatedEventSource::key(code));
        self
    }

    /// Wheel tick over the page area
    pub fn wheel_down(mut self) -> Self {
        self.events
            .push(SimulatedEventSource::mouse(MouseEventKind::ScrollDown, 10, 5));
        self
    }

    /// Left-button drag from one column to another on row 5
    pub fn drag(mut self, from_column: u16, to_column: u16) -> Self {
        self.events.push(SimulatedEventSource::mouse(
            MouseEventKind::Down(MouseButton::Left),
            from_column,
            5,
        ));
        self.events.push(SimulatedEventSource::mouse(
            MouseEventKind::Drag(MouseButton::Left),
            to_column,
            5,
        ));
        self.events.push(SimulatedEventSource::mouse(
            MouseEventKind::Up(MouseButton::Left),
            to_column,
            5,
        ));
        self
    }

    pub fn resize(mut self, columns: u16, rows: u16) -> Self {
        self.events.push(SimulatedEventSource::resize(columns, rows));
        self
    }

    pub fn quit(mut self) -> Self {
        self.events.push(SimulatedEventSource::char_key('q'));
        self
    }

    pub fn build(self) -> SimulatedEventSource {
        SimulatedEventSource::new(self.events)
    }
}
