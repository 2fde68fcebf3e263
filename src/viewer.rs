//! Viewer instance
//!
//! [`Viewer`] owns one document, its render service and all viewer state.
//! Hosts drive it through the control surface (`go_to_page`, `zoom_in`, ...),
//! feed it input and container sizes, and call [`Viewer::poll`] from their
//! event loop so finished render batches reach the screen.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::banner::{Banner, BannerSlot};
use crate::config::ViewerConfig;
use crate::document::{DocumentBackend, DocumentHandle};
use crate::error::{RenderError, ViewerError};
use crate::interaction::{InputAction, InteractionHandler, ViewerInput, most_visible_page};
use crate::layout::{self, PageElement, ViewMode};
use crate::navigation::{Command, Effect, ViewerState};
use crate::render::{PageOutcome, PageViewport, RenderService, RenderedSurface, SettledBatch};
use crate::resize::ResizeCoordinator;

pub struct Viewer {
    config: ViewerConfig,
    backend: Arc<dyn DocumentBackend>,
    state: ViewerState,

    document: Option<DocumentHandle>,
    renderer: Option<RenderService>,

    /// Page strip as last settled
    elements: Vec<PageElement>,
    surfaces: HashMap<usize, Arc<RenderedSurface>>,
    failed_pages: BTreeMap<usize, RenderError>,
    /// Page shown in the counter; trails `state.current_page` until a batch settles
    displayed_page: usize,

    /// Viewports of the batch in flight, for placing pages that fail
    planned: HashMap<usize, PageViewport>,
    unavailable: BTreeMap<usize, RenderError>,
    /// Viewport used by the last successful render of each page
    viewports: HashMap<usize, PageViewport>,

    interaction: InteractionHandler,
    resize: ResizeCoordinator,
    banner: BannerSlot,
}

impl Viewer {
    pub fn new(config: ViewerConfig, backend: Arc<dyn DocumentBackend>) -> Self {
        let config = config.normalized();
        Self {
            state: ViewerState::from_config(&config),
            backend,
            document: None,
            renderer: None,
            elements: Vec::new(),
            surfaces: HashMap::new(),
            failed_pages: BTreeMap::new(),
            displayed_page: 0,
            planned: HashMap::new(),
            unavailable: BTreeMap::new(),
            viewports: HashMap::new(),
            interaction: InteractionHandler::new(config.swipe_threshold),
            resize: ResizeCoordinator::new(config.resize_debounce()),
            banner: BannerSlot::new(config.error_banner_duration()),
            config,
        }
    }

    /// Attach to a container of the given size. Applied immediately,
    /// without any resize debounce.
    pub fn init(&mut self, width: f32, height: f32) {
        if let Some(size) = self.resize.observe_now(width, height) {
            self.set_container(size);
        }
    }

    /// Open a document at its first page
    pub fn load_document(&mut self, locator: &str) -> Result<(), ViewerError> {
        self.load_document_at(locator, 1)
    }

    /// Open a document, replacing the current one only if the open succeeds
    pub fn load_document_at(&mut self, locator: &str, start_page: usize) -> Result<(), ViewerError> {
        let document = match DocumentHandle::open(self.backend.as_ref(), locator) {
            Ok(document) => document,
            Err(err) => {
                error!("Failed to load document: {err}");
                self.banner.show_error(err.to_string());
                return Err(err.into());
            }
        };

        self.close();

        let total = document.total_pages();
        if total == 0 {
            warn!("{locator} has no pages");
            self.banner.show_info(format!("{locator} has no pages"));
        }

        self.renderer = Some(RenderService::new(
            Arc::clone(&self.backend),
            locator,
            self.config.cache_capacity,
            self.config.render_workers,
        ));
        self.document = Some(document);
        self.dispatch(Command::DocumentLoaded { total, start_page });
        Ok(())
    }

    /// Drop the document and everything rendered from it
    pub fn close(&mut self) {
        if let Some(document) = self.document.take() {
            info!("Closing {}", document.source_locator());
        }
        // Dropping the service retires its workers and outstanding batch
        self.renderer = None;
        self.planned.clear();
        self.unavailable.clear();
        self.viewports.clear();
        self.displayed_page = 0;
        self.dispatch(Command::DocumentClosed);
    }

    pub fn refresh(&mut self) {
        self.dispatch(Command::Refresh);
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.dispatch(Command::GoToPage(page));
    }

    pub fn prev_page(&mut self) {
        self.dispatch(Command::PrevPage);
    }

    pub fn next_page(&mut self) {
        self.dispatch(Command::NextPage);
    }

    pub fn first_page(&mut self) {
        self.dispatch(Command::FirstPage);
    }

    pub fn last_page(&mut self) {
        self.dispatch(Command::LastPage);
    }

    pub fn zoom_in(&mut self) {
        self.dispatch(Command::ZoomIn);
    }

    pub fn zoom_out(&mut self) {
        self.dispatch(Command::ZoomOut);
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.dispatch(Command::SetZoom(zoom));
    }

    pub fn toggle_view_mode(&mut self) {
        self.dispatch(Command::ToggleMode);
    }

    /// Feed one input event. Returns true when the host should suppress
    /// its own handling of it.
    pub fn handle_input(&mut self, input: ViewerInput) -> bool {
        let response = self.interaction.handle(input, &mut self.state);
        for action in response.actions {
            match action {
                InputAction::Navigate(cmd) => self.dispatch(cmd),
                InputAction::ScrollTo(offset) => self.set_scroll(offset),
                InputAction::DetectPage => self.detect_page(),
            }
        }
        response.handled
    }

    /// Report the container's current size
    pub fn resize(&mut self, width: f32, height: f32) {
        if let Some(size) = self.resize.observe(width, height, Instant::now()) {
            self.set_container(size);
        }
    }

    /// Scroll the page strip natively, as a scrollbar or wheel would
    pub fn scroll_by(&mut self, delta: f32) {
        self.set_scroll(self.state.scroll_offset + delta);
        self.handle_input(ViewerInput::Scrolled);
    }

    /// Pick up settled render batches, debounced resizes and banner
    /// expiry. Returns true if anything visible changed.
    pub fn poll(&mut self) -> bool {
        let now = Instant::now();
        let mut changed = self.banner.update(now);

        if let Some(size) = self.resize.flush(now) {
            self.set_container(size);
            changed = true;
        }

        if let Some(batch) = self.renderer.as_mut().and_then(RenderService::poll) {
            self.apply_settled(batch);
            changed = true;
        }
        changed
    }

    /// Block until the batch in flight settles. Returns false on timeout.
    pub fn wait_until_settled(&mut self, timeout: Duration) -> bool {
        let Some(renderer) = self.renderer.as_mut() else {
            return true;
        };
        if !renderer.has_batch() {
            return true;
        }
        match renderer.wait(timeout) {
            Some(batch) => {
                self.apply_settled(batch);
                true
            }
            None => false,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    /// Whether a render batch is still outstanding
    pub fn is_rendering(&self) -> bool {
        self.renderer.as_ref().is_some_and(RenderService::has_batch)
    }

    pub fn displayed_page(&self) -> usize {
        self.displayed_page
    }

    pub fn elements(&self) -> &[PageElement] {
        &self.elements
    }

    pub fn content_width(&self) -> f32 {
        layout::content_width(&self.elements)
    }

    pub fn surface(&self, page: usize) -> Option<&Arc<RenderedSurface>> {
        self.surfaces.get(&page)
    }

    pub fn failed_pages(&self) -> &BTreeMap<usize, RenderError> {
        &self.failed_pages
    }

    /// Viewport of the last render of `page`
    pub fn page_viewport(&self, page: usize) -> Option<PageViewport> {
        self.viewports.get(&page).copied().or_else(|| {
            self.renderer
                .as_ref()
                .and_then(|renderer| renderer.last_viewport(page))
        })
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.current()
    }

    fn dispatch(&mut self, cmd: Command) {
        let effects = self.state.apply(cmd);
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Relayout => self.relayout(),
            Effect::InvalidateCache => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.invalidate_cache();
                }
                // Old-scale surfaces must not stay on screen
                self.surfaces.clear();
            }
            Effect::ResetScroll => self.state.scroll_offset = 0.0,
            Effect::ClearElements => {
                self.elements.clear();
                self.surfaces.clear();
                self.failed_pages.clear();
            }
            Effect::RevealPage(page) => {
                if self.surfaces.contains_key(&page) && self.reveal(page) {
                    self.cancel_batch();
                    self.displayed_page = page;
                } else {
                    self.relayout();
                }
            }
        }
    }

    /// Drop the batch in flight; it was planned around another page
    fn cancel_batch(&mut self) {
        if let Some(renderer) = self.renderer.as_mut().filter(|r| r.has_batch()) {
            renderer.cancel_batch();
        }
        self.planned.clear();
        self.unavailable.clear();
    }

    fn set_container(&mut self, (width, height): (f32, f32)) {
        self.dispatch(Command::SetContainer { width, height });
        self.clamp_scroll();
    }

    fn relayout(&mut self) {
        let (Some(document), Some(renderer)) = (self.document.as_mut(), self.renderer.as_mut())
        else {
            return;
        };

        let plan = layout::plan(
            &self.state,
            self.config.page_gap,
            self.config.preload_pages,
            document,
        );
        for (page, err) in &plan.unavailable {
            warn!("Page {page} left out of layout: {err}");
        }

        self.unavailable = plan
            .unavailable
            .into_iter()
            .map(|(page, err)| {
                let err = match err {
                    ViewerError::Render(err) => err,
                    other => RenderError::new(page, other.to_string()),
                };
                (page, err)
            })
            .collect();
        self.planned = plan
            .pages
            .iter()
            .map(|planned| (planned.page.number, planned.viewport))
            .collect();

        let generation = renderer.submit_batch(&plan.pages);
        debug!(
            "Layout {} for page {} -> batch {generation}",
            self.state.mode.as_str(),
            self.state.current_page
        );

        // Fully cached sets settle without touching a worker
        if let Some(batch) = renderer.poll() {
            self.apply_settled(batch);
        }
    }

    fn apply_settled(&mut self, batch: SettledBatch) {
        let current = self.renderer.as_ref().map(RenderService::generation);
        if current != Some(batch.generation) {
            debug!("Ignoring settled batch {} (now {current:?})", batch.generation);
            return;
        }

        let mut placed = Vec::with_capacity(batch.outcomes.len());
        self.surfaces.clear();
        self.failed_pages = std::mem::take(&mut self.unavailable);

        for (page, outcome) in batch.outcomes {
            match outcome {
                PageOutcome::Rendered(surface) => {
                    placed.push((page, surface.viewport));
                    self.viewports.insert(page, surface.viewport);
                    self.surfaces.insert(page, surface);
                }
                PageOutcome::Failed(err) => {
                    if let Some(viewport) = self.planned.get(&page) {
                        placed.push((page, *viewport));
                    }
                    self.failed_pages.insert(page, err);
                }
            }
        }
        self.planned.clear();

        self.elements = layout::arrange(&placed, self.config.page_gap);
        self.report_failures();

        let page = self.state.current_page;
        match self.state.mode {
            ViewMode::Scroll => {
                self.reveal(page);
            }
            ViewMode::Book => self.clamp_scroll(),
        }
        self.displayed_page = page;
        info!(
            "Showing page {page} of {} ({} elements)",
            self.state.total_pages,
            self.elements.len()
        );
    }

    fn report_failures(&mut self) {
        let mut failures = self.failed_pages.values();
        match (failures.next(), failures.next()) {
            (None, _) => {}
            (Some(only), None) => {
                warn!("{only}");
                self.banner.show_error(only.to_string());
            }
            (Some(_), Some(_)) => {
                let pages: Vec<String> = self.failed_pages.keys().map(ToString::to_string).collect();
                warn!("Pages {} failed to render", pages.join(", "));
                self.banner
                    .show_error(format!("Pages {} failed to render", pages.join(", ")));
            }
        }
    }

    /// Scroll an existing element to the left edge. False if the page has no element.
    fn reveal(&mut self, page: usize) -> bool {
        let Some(x) = self.elements.iter().find(|e| e.page == page).map(|e| e.x) else {
            return false;
        };
        self.set_scroll(x);
        true
    }

    fn max_scroll(&self) -> f32 {
        (self.content_width() - self.state.container_width).max(0.0)
    }

    fn set_scroll(&mut self, offset: f32) {
        let offset = if offset.is_finite() { offset } else { 0.0 };
        self.state.scroll_offset = offset.clamp(0.0, self.max_scroll());
    }

    fn clamp_scroll(&mut self) {
        self.set_scroll(self.state.scroll_offset);
    }

    fn detect_page(&mut self) {
        let Some(page) = most_visible_page(
            &self.elements,
            self.state.scroll_offset,
            self.state.container_width,
        ) else {
            return;
        };
        if page == self.state.current_page && page == self.displayed_page {
            return;
        }

        let _ = self.state.apply(Command::ObservePage(page));
        if self.state.current_page == page {
            debug!("Scrolled onto page {page}");
            // The page is already on screen
            self.cancel_batch();
            self.displayed_page = page;
        }
    }
}

impl std::fmt::Debug for Viewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("document", &self.document)
            .field("state", &self.state)
            .field("displayed_page", &self.displayed_page)
            .field("elements", &self.elements.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{SyntheticBackend, SyntheticDocument};

    const WAIT: Duration = Duration::from_secs(5);

    fn viewer(doc: SyntheticDocument, config: ViewerConfig) -> Viewer {
        let backend = SyntheticBackend::new().with_document("doc", doc);
        let mut viewer = Viewer::new(config, Arc::new(backend));
        viewer.init(1000.0, 800.0);
        viewer.load_document("doc").unwrap();
        assert!(viewer.wait_until_settled(WAIT));
        viewer
    }

    fn small_pages(count: usize) -> SyntheticDocument {
        SyntheticDocument::with_sizes(vec![(100.0, 150.0); count])
    }

    #[test]
    fn counter_follows_settled_batches() {
        let doc = small_pages(10).with_render_delay(Duration::from_millis(20));
        let mut viewer = viewer(doc, ViewerConfig::default());
        assert_eq!(viewer.displayed_page(), 1);

        viewer.go_to_page(8);
        assert_eq!(viewer.state().current_page, 8);
        assert_eq!(viewer.displayed_page(), 1);

        assert!(viewer.wait_until_settled(WAIT));
        assert_eq!(viewer.displayed_page(), 8);
        assert!(viewer.surface(8).is_some());
    }

    #[test]
    fn pointer_drag_is_tracked_in_book_mode() {
        let mut viewer = viewer(small_pages(4), ViewerConfig::default());
        viewer.toggle_view_mode();
        assert!(viewer.wait_until_settled(WAIT));

        assert!(viewer.handle_input(ViewerInput::PointerDown { x: 10.0 }));
        assert!(viewer.state().is_dragging);
        assert!(viewer.handle_input(ViewerInput::PointerUp));
        assert!(!viewer.state().is_dragging);
    }

    #[test]
    fn failed_page_keeps_a_placeholder() {
        let mut viewer = viewer(small_pages(5).failing_on(2), ViewerConfig::default());

        assert!(viewer.surface(1).is_some());
        assert!(viewer.surface(2).is_none());
        assert!(viewer.failed_pages().contains_key(&2));
        assert!(viewer.elements().iter().any(|e| e.page == 2));
        assert!(viewer.banner().is_some());
    }
}
