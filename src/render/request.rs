//! Render request and response types

use std::sync::Arc;

use super::surface::{PageViewport, RenderedSurface};
use crate::document::PageDescriptor;
use crate::error::RenderError;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Render one page of a batch
    Page {
        id: RequestId,
        generation: u64,
        page: PageDescriptor,
        viewport: PageViewport,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Rendered (or cached) surface
    Page {
        id: RequestId,
        generation: u64,
        surface: Arc<RenderedSurface>,
    },

    /// The batch this request belonged to was superseded before it ran
    Cancelled {
        id: RequestId,
        generation: u64,
        page: usize,
    },

    /// The page failed to render
    Error {
        id: RequestId,
        generation: u64,
        error: RenderError,
    },
}

impl RenderResponse {
    #[must_use]
    pub fn generation(&self) -> u64 {
        match self {
            Self::Page { generation, .. }
            | Self::Cancelled { generation, .. }
            | Self::Error { generation, .. } => *generation,
        }
    }

    #[must_use]
    pub fn page(&self) -> usize {
        match self {
            Self::Page { surface, .. } => surface.page,
            Self::Cancelled { page, .. } => *page,
            Self::Error { error, .. } => error.page,
        }
    }
}
