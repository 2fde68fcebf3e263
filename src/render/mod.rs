//! Page rasterization: surfaces, the page cache and the worker-backed service

mod cache;
mod request;
mod service;
mod surface;
mod worker;

pub use cache::{PageCache, ScaleKey};
pub use request::{RenderRequest, RenderResponse, RequestId};
pub use service::{PageOutcome, PlannedPage, RenderService, SettledBatch};
pub use surface::{MAX_SURFACE_DIMENSION, PageViewport, RenderedSurface};

pub const DEFAULT_CACHE_SIZE: usize = 16;
pub const DEFAULT_WORKERS: usize = 2;
