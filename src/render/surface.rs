//! Rendered page surfaces and the viewports they were rendered at

use image::RgbImage;

use crate::document::PageDescriptor;

/// Largest edge a single page surface may have, in pixels
pub const MAX_SURFACE_DIMENSION: u32 = 8192;

/// Pixel geometry a page is rasterized at
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageViewport {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

impl PageViewport {
    #[must_use]
    pub fn for_page(page: &PageDescriptor, scale: f32) -> Self {
        Self {
            width: page.width * scale,
            height: page.height * scale,
            scale,
        }
    }

    /// Integer surface size, never smaller than one pixel
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        let to_px = |v: f32| {
            if v.is_finite() {
                (v.round().max(1.0) as u32).min(u32::MAX / 4)
            } else {
                1
            }
        };
        (to_px(self.width), to_px(self.height))
    }

    #[must_use]
    pub fn exceeds_surface_limit(&self) -> bool {
        let (w, h) = self.pixel_size();
        w.max(h) > MAX_SURFACE_DIMENSION
    }
}

/// Raster output for one page at one viewport
#[derive(Clone)]
pub struct RenderedSurface {
    /// Page number (1-indexed)
    pub page: usize,
    pub viewport: PageViewport,
    pub image: RgbImage,
}

impl std::fmt::Debug for RenderedSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedSurface")
            .field("page", &self.page)
            .field("viewport", &self.viewport)
            .field("image.width", &self.image.width())
            .field("image.height", &self.image.height())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_scales_intrinsic_size() {
        let page = PageDescriptor {
            number: 1,
            width: 612.0,
            height: 792.0,
        };
        let viewport = PageViewport::for_page(&page, 0.5);
        assert_eq!(viewport.width, 306.0);
        assert_eq!(viewport.height, 396.0);
        assert_eq!(viewport.pixel_size(), (306, 396));
        assert!(!viewport.exceeds_surface_limit());
    }

    #[test]
    fn degenerate_viewports_still_get_a_pixel() {
        let viewport = PageViewport {
            width: 0.2,
            height: f32::NAN,
            scale: 1.0,
        };
        assert_eq!(viewport.pixel_size(), (1, 1));
    }

    #[test]
    fn huge_viewports_exceed_the_limit() {
        let viewport = PageViewport {
            width: 10_000.0,
            height: 20.0,
            scale: 40.0,
        };
        assert!(viewport.exceeds_surface_limit());
    }
}
