//! Document handles and the rendering backends behind them
//!
//! A backend turns a source locator into a [`PageSource`]. The viewer keeps
//! one source on its own thread for metadata, and every render worker opens
//! its own, since the underlying libraries are not thread-safe.

mod image_dir;
#[cfg(feature = "pdf")]
mod mupdf_backend;

use std::collections::HashMap;
use std::path::Path;

use image::RgbImage;
use log::{debug, info};

use crate::error::{LoadError, ViewerError};
use crate::render::PageViewport;

pub use image_dir::ImageSequenceBackend;
#[cfg(feature = "pdf")]
pub use mupdf_backend::MupdfBackend;

/// Errors raised inside a backend
#[derive(Debug, thiserror::Error)]
pub enum BackendFault {
    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl BackendFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Intrinsic page metadata, measured at scale 1
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageDescriptor {
    /// Page number (1-indexed)
    pub number: usize,
    pub width: f32,
    pub height: f32,
}

/// An opened document as seen by a single thread
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Intrinsic `(width, height)` of a page. `number` is 1-indexed and
    /// already validated against [`PageSource::page_count`].
    fn page_size(&self, number: usize) -> Result<(f32, f32), BackendFault>;

    /// Rasterize a page into a surface of exactly `viewport.pixel_size()`
    fn rasterize(
        &self,
        page: &PageDescriptor,
        viewport: &PageViewport,
    ) -> Result<RgbImage, BackendFault>;
}

/// Opens documents from locators. Shared between the viewer and its workers.
pub trait DocumentBackend: Send + Sync {
    fn open(&self, locator: &str) -> Result<Box<dyn PageSource>, LoadError>;
}

/// Picks a backend from the shape of the locator: directories and image
/// files become image sequences, everything else goes to the PDF engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoBackend;

impl DocumentBackend for AutoBackend {
    fn open(&self, locator: &str) -> Result<Box<dyn PageSource>, LoadError> {
        let path = Path::new(locator);
        if path.is_dir() || image_dir::is_page_image(path) {
            return ImageSequenceBackend.open(locator);
        }

        #[cfg(feature = "pdf")]
        {
            MupdfBackend.open(locator)
        }

        #[cfg(not(feature = "pdf"))]
        {
            Err(LoadError::new(
                locator,
                "document format not supported (built without PDF support)",
            ))
        }
    }
}

/// The document owned by one viewer instance
pub struct DocumentHandle {
    source_locator: String,
    total_pages: usize,
    source: Box<dyn PageSource>,
    descriptors: HashMap<usize, PageDescriptor>,
}

impl DocumentHandle {
    pub fn open(backend: &dyn DocumentBackend, locator: &str) -> Result<Self, LoadError> {
        info!("Opening document {locator}");
        let source = backend.open(locator)?;
        let total_pages = source.page_count();
        info!("Opened {locator} with {total_pages} pages");

        Ok(Self {
            source_locator: locator.to_string(),
            total_pages,
            source,
            descriptors: HashMap::new(),
        })
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn source_locator(&self) -> &str {
        &self.source_locator
    }

    /// Metadata for a 1-indexed page. Sizes are queried once and remembered.
    pub fn get_page(&mut self, number: usize) -> Result<PageDescriptor, ViewerError> {
        if number == 0 || number > self.total_pages {
            return Err(ViewerError::PageNotFound {
                page: number,
                total: self.total_pages,
            });
        }

        if let Some(descriptor) = self.descriptors.get(&number) {
            return Ok(*descriptor);
        }

        let (width, height) = self.source.page_size(number).map_err(|e| {
            ViewerError::Render(crate::error::RenderError::new(number, e.to_string()))
        })?;
        debug!("Page {number} measures {width}x{height}");

        let descriptor = PageDescriptor {
            number,
            width,
            height,
        };
        self.descriptors.insert(number, descriptor);
        Ok(descriptor)
    }
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("source_locator", &self.source_locator)
            .field("total_pages", &self.total_pages)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{SyntheticBackend, SyntheticDocument};

    #[test]
    fn open_reports_page_count() {
        let backend = SyntheticBackend::new().with_document("doc", SyntheticDocument::uniform(7));
        let handle = DocumentHandle::open(&backend, "doc").unwrap();
        assert_eq!(handle.total_pages(), 7);
        assert_eq!(handle.source_locator(), "doc");
    }

    #[test]
    fn unknown_locator_is_a_load_error() {
        let backend = SyntheticBackend::new();
        let err = DocumentHandle::open(&backend, "missing").unwrap_err();
        assert_eq!(err.locator, "missing");
    }

    #[test]
    fn get_page_rejects_out_of_range_numbers() {
        let backend = SyntheticBackend::new().with_document("doc", SyntheticDocument::uniform(3));
        let mut handle = DocumentHandle::open(&backend, "doc").unwrap();

        assert!(matches!(
            handle.get_page(0),
            Err(ViewerError::PageNotFound { page: 0, total: 3 })
        ));
        assert!(matches!(
            handle.get_page(4),
            Err(ViewerError::PageNotFound { page: 4, total: 3 })
        ));

        let page = handle.get_page(3).unwrap();
        assert_eq!(page.number, 3);
        assert_eq!((page.width, page.height), (600.0, 800.0));
    }
}
