//! Image-sequence documents: a directory of page scans, or a single image

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use image::imageops::FilterType;
use log::debug;

use super::{BackendFault, DocumentBackend, PageDescriptor, PageSource};
use crate::error::LoadError;
use crate::render::PageViewport;

/// Extensions the enabled `image` decoders can read
fn is_decodable_extension(ext: &str) -> bool {
    match ext.to_ascii_lowercase().as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "webp" => true,
        "bmp" => cfg!(feature = "image-bmp"),
        "tif" | "tiff" => cfg!(feature = "image-tiff"),
        _ => false,
    }
}

pub(super) fn is_page_image(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(is_decodable_extension)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ImageSequenceBackend;

impl DocumentBackend for ImageSequenceBackend {
    fn open(&self, locator: &str) -> Result<Box<dyn PageSource>, LoadError> {
        let path = Path::new(locator);

        let pages = if path.is_dir() {
            let mut pages: Vec<PathBuf> = fs::read_dir(path)
                .map_err(|e| LoadError::new(locator, e.to_string()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| is_page_image(p))
                .collect();
            pages.sort();
            pages
        } else if is_page_image(path) {
            vec![path.to_path_buf()]
        } else {
            return Err(LoadError::new(locator, "not an image or image directory"));
        };

        if pages.is_empty() {
            return Err(LoadError::new(locator, "directory contains no page images"));
        }

        debug!("Image sequence {locator} has {} pages", pages.len());
        Ok(Box::new(ImageSequence { pages }))
    }
}

struct ImageSequence {
    pages: Vec<PathBuf>,
}

impl ImageSequence {
    fn path(&self, number: usize) -> Result<&Path, BackendFault> {
        number
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .map(PathBuf::as_path)
            .ok_or_else(|| BackendFault::generic(format!("invalid page number {number}")))
    }
}

impl PageSource for ImageSequence {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self, number: usize) -> Result<(f32, f32), BackendFault> {
        let (width, height) = image::image_dimensions(self.path(number)?)?;
        Ok((width as f32, height as f32))
    }

    fn rasterize(
        &self,
        page: &PageDescriptor,
        viewport: &PageViewport,
    ) -> Result<RgbImage, BackendFault> {
        let (width, height) = viewport.pixel_size();
        let decoded = image::open(self.path(page.number)?)?;
        Ok(decoded
            .resize_exact(width, height, FilterType::Triangle)
            .to_rgb8())
    }
}
