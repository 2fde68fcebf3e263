//! Render worker - runs in separate thread(s)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use flume::{Receiver, Sender};
use log::{debug, error, warn};

use super::cache::PageCache;
use super::request::{RenderRequest, RenderResponse, RequestId};
use super::surface::{MAX_SURFACE_DIMENSION, PageViewport, RenderedSurface};
use crate::document::{DocumentBackend, PageDescriptor, PageSource};
use crate::error::RenderError;

/// Everything a worker thread shares with the service
pub(super) struct WorkerContext {
    pub backend: Arc<dyn DocumentBackend>,
    pub locator: String,
    pub cache: Arc<Mutex<PageCache>>,
    /// Generation of the newest batch; older requests are skipped
    pub generation: Arc<AtomicU64>,
}

/// Main worker function - runs in a dedicated thread
#[expect(
    clippy::needless_pass_by_value,
    reason = "Values moved into thread, need ownership"
)]
pub(super) fn render_worker(
    ctx: WorkerContext,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    let source = match ctx.backend.open(&ctx.locator) {
        Ok(source) => Some(source),
        Err(e) => {
            error!("Render worker could not open {}: {e}", ctx.locator);
            None
        }
    };

    for request in requests {
        match request {
            RenderRequest::Page {
                id,
                generation,
                page,
                viewport,
            } => {
                let response = match &source {
                    Some(source) => {
                        handle_page_request(&ctx, source.as_ref(), id, generation, &page, viewport)
                    }
                    None => RenderResponse::Error {
                        id,
                        generation,
                        error: RenderError::new(page.number, "document unavailable to renderer"),
                    },
                };
                let _ = responses.send(response);
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn is_superseded(ctx: &WorkerContext, generation: u64) -> bool {
    generation < ctx.generation.load(Ordering::Acquire)
}

fn handle_page_request(
    ctx: &WorkerContext,
    source: &dyn PageSource,
    id: RequestId,
    generation: u64,
    page: &PageDescriptor,
    viewport: PageViewport,
) -> RenderResponse {
    if is_superseded(ctx, generation) {
        debug!("Skipping page {} from superseded batch {generation}", page.number);
        return RenderResponse::Cancelled {
            id,
            generation,
            page: page.number,
        };
    }

    let cached = ctx
        .cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(page.number, viewport.scale);
    if let Some(surface) = cached {
        return RenderResponse::Page {
            id,
            generation,
            surface,
        };
    }

    match render_page(source, page, viewport) {
        Ok(surface) => {
            // A zoom or navigation may have landed while we were busy
            if is_superseded(ctx, generation) {
                return RenderResponse::Cancelled {
                    id,
                    generation,
                    page: page.number,
                };
            }

            let surface = ctx
                .cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(surface);
            RenderResponse::Page {
                id,
                generation,
                surface,
            }
        }
        Err(error) => {
            warn!("{error}");
            RenderResponse::Error {
                id,
                generation,
                error,
            }
        }
    }
}

/// Render a single page at the given viewport
pub fn render_page(
    source: &dyn PageSource,
    page: &PageDescriptor,
    viewport: PageViewport,
) -> Result<RenderedSurface, RenderError> {
    if viewport.exceeds_surface_limit() {
        return Err(RenderError::new(
            page.number,
            format!("surface larger than {MAX_SURFACE_DIMENSION}px"),
        ));
    }

    let image = source
        .rasterize(page, &viewport)
        .map_err(|e| RenderError::new(page.number, e.to_string()))?;

    Ok(RenderedSurface {
        page: page.number,
        viewport,
        image,
    })
}
