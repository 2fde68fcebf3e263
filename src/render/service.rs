//! Render service - manages worker pool, cache and render batches

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use super::cache::PageCache;
use super::request::{RenderRequest, RenderResponse, RequestId};
use super::surface::{PageViewport, RenderedSurface};
use super::worker::{WorkerContext, render_worker};
use crate::document::{DocumentBackend, PageDescriptor};
use crate::error::RenderError;

/// One page of a batch, with the viewport it should be rendered at
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannedPage {
    pub page: PageDescriptor,
    pub viewport: PageViewport,
}

/// Final state of one page in a batch
#[derive(Clone, Debug)]
pub enum PageOutcome {
    Rendered(Arc<RenderedSurface>),
    Failed(RenderError),
}

/// A batch whose pages have all either rendered or failed
#[derive(Debug)]
pub struct SettledBatch {
    pub generation: u64,
    pub outcomes: BTreeMap<usize, PageOutcome>,
}

#[derive(Debug)]
struct RenderBatch {
    generation: u64,
    pending: HashMap<RequestId, usize>,
    outcomes: BTreeMap<usize, PageOutcome>,
}

/// Renders pages on worker threads and tracks the batch currently in flight.
///
/// Only one batch is live at a time. Submitting a new one bumps the
/// generation, which makes workers skip queued requests of the old batch
/// and makes [`RenderService::poll`] drop any late responses for it.
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    cache: Arc<Mutex<PageCache>>,
    generation: Arc<AtomicU64>,
    num_workers: usize,
    batch: Option<RenderBatch>,
}

impl RenderService {
    /// Spawn `num_workers` threads, each opening `locator` through `backend`
    #[must_use]
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        locator: &str,
        cache_size: usize,
        num_workers: usize,
    ) -> Self {
        let cache = Arc::new(Mutex::new(PageCache::new(cache_size)));
        let generation = Arc::new(AtomicU64::new(0));

        // flume gives us MPMC: every worker pulls from the same request queue
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let num_workers = num_workers.max(1);
        for _ in 0..num_workers {
            let ctx = WorkerContext {
                backend: Arc::clone(&backend),
                locator: locator.to_string(),
                cache: Arc::clone(&cache),
                generation: Arc::clone(&generation),
            };
            let rx = request_rx.clone();
            let tx = response_tx.clone();

            std::thread::spawn(move || {
                render_worker(ctx, rx, tx);
            });
        }

        info!("Render service for {locator} started with {num_workers} workers");

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            cache,
            generation,
            num_workers,
            batch: None,
        }
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, PageCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generation of the newest submitted batch
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Start a new batch, superseding any batch still in flight.
    ///
    /// Pages already cached at the planned scale are resolved immediately;
    /// the rest are queued for the workers. Returns the batch generation.
    pub fn submit_batch(&mut self, pages: &[PlannedPage]) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(old) = self.batch.take() {
            if !old.pending.is_empty() {
                debug!(
                    "Batch {} superseded with {} pages outstanding",
                    old.generation,
                    old.pending.len()
                );
            }
        }

        let mut batch = RenderBatch {
            generation,
            pending: HashMap::new(),
            outcomes: BTreeMap::new(),
        };

        for planned in pages {
            let number = planned.page.number;
            if batch.outcomes.contains_key(&number) || batch.pending.values().any(|p| *p == number)
            {
                continue;
            }

            let cached = self.cache().get(number, planned.viewport.scale);
            if let Some(surface) = cached {
                batch.outcomes.insert(number, PageOutcome::Rendered(surface));
                continue;
            }

            let id = self.next_id();
            let _ = self.request_tx.send(RenderRequest::Page {
                id,
                generation,
                page: planned.page,
                viewport: planned.viewport,
            });
            batch.pending.insert(id, number);
        }

        let (held, capacity) = {
            let cache = self.cache();
            (cache.len(), cache.capacity())
        };
        debug!(
            "Batch {generation}: {} cached, {} queued (cache {held}/{capacity})",
            batch.outcomes.len(),
            batch.pending.len()
        );
        self.batch = Some(batch);
        generation
    }

    /// Forget the batch in flight; its late responses will be dropped
    pub fn cancel_batch(&mut self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.batch = None;
    }

    /// Whether a batch has been submitted and not yet reported as settled
    #[must_use]
    pub fn has_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Drain available responses without blocking.
    ///
    /// Returns the current batch once every page in it has an outcome.
    pub fn poll(&mut self) -> Option<SettledBatch> {
        while let Ok(response) = self.response_rx.try_recv() {
            self.record(response);
        }
        self.take_settled()
    }

    /// Like [`RenderService::poll`] but waits up to `timeout` for the batch
    pub fn wait(&mut self, timeout: Duration) -> Option<SettledBatch> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(settled) = self.poll() {
                return Some(settled);
            }
            self.batch.as_ref()?;

            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.response_rx.recv_timeout(remaining) {
                Ok(response) => self.record(response),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => {
                    return self.take_settled();
                }
            }
        }
    }

    fn record(&mut self, response: RenderResponse) {
        let Some(batch) = self.batch.as_mut() else {
            return;
        };
        if response.generation() != batch.generation {
            debug!(
                "Dropping stale response for page {} (batch {} < {})",
                response.page(),
                response.generation(),
                batch.generation
            );
            return;
        }

        match response {
            RenderResponse::Page { id, surface, .. } => {
                if let Some(page) = batch.pending.remove(&id) {
                    batch.outcomes.insert(page, PageOutcome::Rendered(surface));
                }
            }
            RenderResponse::Error { id, error, .. } => {
                if let Some(page) = batch.pending.remove(&id) {
                    batch.outcomes.insert(page, PageOutcome::Failed(error));
                }
            }
            RenderResponse::Cancelled { id, page, .. } => {
                // Only reachable if the generation moved without a new batch
                warn!("Page {page} cancelled inside the live batch");
                if batch.pending.remove(&id).is_some() {
                    batch.outcomes.insert(
                        page,
                        PageOutcome::Failed(RenderError::new(page, "render cancelled")),
                    );
                }
            }
        }
    }

    fn take_settled(&mut self) -> Option<SettledBatch> {
        if !self.batch.as_ref().is_some_and(|b| b.pending.is_empty()) {
            return None;
        }
        let batch = self.batch.take()?;
        Some(SettledBatch {
            generation: batch.generation,
            outcomes: batch.outcomes,
        })
    }

    /// Drop every cached surface
    pub fn invalidate_cache(&mut self) {
        debug!("Invalidating page cache");
        self.cache().invalidate_all();
    }

    /// Viewport used by the most recent render of `page`
    #[must_use]
    pub fn last_viewport(&self, page: usize) -> Option<PageViewport> {
        self.cache().last_viewport(page)
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        // Queued pages of the last batch are not worth rendering any more
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{SyntheticBackend, SyntheticDocument};

    const WAIT: Duration = Duration::from_secs(5);

    fn planned(page: usize, scale: f32) -> PlannedPage {
        let page = PageDescriptor {
            number: page,
            width: 600.0,
            height: 800.0,
        };
        PlannedPage {
            page,
            viewport: PageViewport::for_page(&page, scale),
        }
    }

    fn service(doc: SyntheticDocument) -> (RenderService, SyntheticBackend) {
        let backend = SyntheticBackend::new().with_document("doc", doc);
        let service = RenderService::new(Arc::new(backend.clone()), "doc", 8, 2);
        (service, backend)
    }

    #[test]
    fn batch_settles_with_every_page() {
        let (mut service, _) = service(SyntheticDocument::uniform(5));
        let generation = service.submit_batch(&[planned(1, 0.1), planned(2, 0.1)]);

        let settled = service.wait(WAIT).expect("batch should settle");
        assert_eq!(settled.generation, generation);
        assert_eq!(settled.outcomes.len(), 2);
        assert!(
            settled
                .outcomes
                .values()
                .all(|o| matches!(o, PageOutcome::Rendered(_)))
        );
        assert!(!service.has_batch());
    }

    #[test]
    fn failing_page_does_not_sink_its_siblings() {
        let (mut service, _) = service(SyntheticDocument::uniform(5).failing_on(2));
        service.submit_batch(&[planned(1, 0.1), planned(2, 0.1), planned(3, 0.1)]);

        let settled = service.wait(WAIT).expect("batch should settle");
        assert!(matches!(settled.outcomes[&1], PageOutcome::Rendered(_)));
        assert!(matches!(settled.outcomes[&2], PageOutcome::Failed(_)));
        assert!(matches!(settled.outcomes[&3], PageOutcome::Rendered(_)));
    }

    #[test]
    fn cached_pages_resolve_without_rendering() {
        let (mut service, backend) = service(SyntheticDocument::uniform(5));
        service.submit_batch(&[planned(1, 0.1)]);
        service.wait(WAIT).expect("first batch");
        let renders = backend.render_count();

        service.submit_batch(&[planned(1, 0.1)]);
        let settled = service.poll().expect("cached batch settles on first poll");
        assert_eq!(settled.outcomes.len(), 1);
        assert_eq!(backend.render_count(), renders);
    }

    #[test]
    fn superseded_batch_is_never_reported() {
        let doc = SyntheticDocument::uniform(5).with_render_delay(Duration::from_millis(50));
        let (mut service, _) = service(doc);

        let first = service.submit_batch(&[planned(1, 0.1), planned(2, 0.1)]);
        let second = service.submit_batch(&[planned(3, 0.1)]);
        assert!(second > first);

        let settled = service.wait(WAIT).expect("second batch settles");
        assert_eq!(settled.generation, second);
        assert_eq!(settled.outcomes.keys().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn invalidation_forces_rerender() {
        let (mut service, backend) = service(SyntheticDocument::uniform(3));
        service.submit_batch(&[planned(1, 0.1)]);
        service.wait(WAIT).expect("first batch");

        service.invalidate_cache();
        assert!(service.last_viewport(1).is_some());

        let before = backend.render_count();
        service.submit_batch(&[planned(1, 0.1)]);
        service.wait(WAIT).expect("second batch");
        assert_eq!(backend.render_count(), before + 1);
    }
}
