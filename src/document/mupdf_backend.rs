//! PDF (and other MuPDF formats) backend

use image::RgbImage;
use image::imageops::{self, FilterType};
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::{BackendFault, DocumentBackend, PageDescriptor, PageSource};
use crate::error::LoadError;
use crate::render::PageViewport;

#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl DocumentBackend for MupdfBackend {
    fn open(&self, locator: &str) -> Result<Box<dyn PageSource>, LoadError> {
        let doc = Document::open(locator).map_err(|e| LoadError::new(locator, e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| LoadError::new(locator, e.to_string()))?;

        Ok(Box::new(MupdfSource {
            doc,
            page_count: page_count.max(0) as usize,
        }))
    }
}

struct MupdfSource {
    doc: Document,
    page_count: usize,
}

impl PageSource for MupdfSource {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_size(&self, number: usize) -> Result<(f32, f32), BackendFault> {
        let page = self.doc.load_page(page_index(number)?)?;
        let bounds = page.bounds()?;
        Ok((bounds.x1 - bounds.x0, bounds.y1 - bounds.y0))
    }

    fn rasterize(
        &self,
        page: &PageDescriptor,
        viewport: &PageViewport,
    ) -> Result<RgbImage, BackendFault> {
        let loaded = self.doc.load_page(page_index(page.number)?)?;
        let transform = Matrix::new_scale(viewport.scale, viewport.scale);
        let pixmap = loaded.to_pixmap(&transform, &Colorspace::device_rgb(), false, false)?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let pixels = pixmap_to_rgb(&pixmap)?;
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| BackendFault::generic("Pixmap buffer size mismatch"))?;

        // MuPDF rounds the device box on its own; snap to the planned size.
        let (target_w, target_h) = viewport.pixel_size();
        if (width, height) == (target_w, target_h) {
            Ok(image)
        } else {
            Ok(imageops::resize(&image, target_w, target_h, FilterType::Triangle))
        }
    }
}

fn page_index(number: usize) -> Result<i32, BackendFault> {
    number
        .checked_sub(1)
        .and_then(|index| i32::try_from(index).ok())
        .ok_or_else(|| BackendFault::generic(format!("invalid page number {number}")))
}

fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<Vec<u8>, BackendFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(BackendFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(BackendFault::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}
