//! LRU page cache for rendered surfaces

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::surface::{PageViewport, RenderedSurface};

/// Scale factor stored as millionths for stable comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScaleKey(u32);

impl ScaleKey {
    #[must_use]
    pub fn from_scale(scale: f32) -> Self {
        Self((scale.max(0.0) * 1_000_000.0).round() as u32)
    }
}

/// Surfaces keyed by page number.
///
/// Each page keeps at most one surface; a lookup at a scale other than the
/// stored one misses, and the next insert replaces the stale entry.
pub struct PageCache {
    cache: LruCache<usize, (ScaleKey, Arc<RenderedSurface>)>,
    viewports: HashMap<usize, PageViewport>,
}

impl PageCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            viewports: HashMap::new(),
        }
    }

    /// Get a cached surface rendered at `scale`, promoting it in the LRU order
    #[must_use]
    pub fn get(&mut self, page: usize, scale: f32) -> Option<Arc<RenderedSurface>> {
        let wanted = ScaleKey::from_scale(scale);
        match self.cache.get(&page) {
            Some((key, surface)) if *key == wanted => Some(Arc::clone(surface)),
            _ => None,
        }
    }

    /// Insert a surface, replacing whatever was cached for its page
    pub fn insert(&mut self, surface: RenderedSurface) -> Arc<RenderedSurface> {
        let page = surface.page;
        let key = ScaleKey::from_scale(surface.viewport.scale);
        self.viewports.insert(page, surface.viewport);
        let arc = Arc::new(surface);
        self.cache.put(page, (key, Arc::clone(&arc)));
        arc
    }

    /// Viewport used for the most recent render of a page
    #[must_use]
    pub fn last_viewport(&self, page: usize) -> Option<PageViewport> {
        self.viewports.get(&page).copied()
    }

    /// Drop every surface. Remembered viewports survive.
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    /// Number of cached pages
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Cache capacity
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    fn surface(page: usize, scale: f32) -> RenderedSurface {
        RenderedSurface {
            page,
            viewport: PageViewport {
                width: 10.0 * scale,
                height: 20.0 * scale,
                scale,
            },
            image: RgbImage::new(1, 1),
        }
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = PageCache::new(10);
        cache.insert(surface(1, 1.0));

        assert!(cache.get(1, 1.0).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lookup_at_other_scale_misses() {
        let mut cache = PageCache::new(10);
        cache.insert(surface(1, 1.0));

        assert!(cache.get(1, 1.1).is_none());
        assert!(cache.get(1, 1.0).is_some());
    }

    #[test]
    fn one_surface_per_page() {
        let mut cache = PageCache::new(10);
        cache.insert(surface(4, 1.0));
        cache.insert(surface(4, 2.0));

        assert_eq!(cache.len(), 1);
        assert!(cache.get(4, 1.0).is_none());
        assert!(cache.get(4, 2.0).is_some());
        assert_eq!(cache.last_viewport(4).unwrap().scale, 2.0);
    }

    #[test]
    fn cache_lru_eviction() {
        let mut cache = PageCache::new(2);

        for page in 1..=3 {
            cache.insert(surface(page, 1.0));
        }

        assert_eq!(cache.len(), 2);
        assert!(cache.get(1, 1.0).is_none());
        assert!(cache.get(2, 1.0).is_some());
        assert!(cache.get(3, 1.0).is_some());
    }

    #[test]
    fn invalidate_all_keeps_viewports() {
        let mut cache = PageCache::new(10);
        for page in 1..=5 {
            cache.insert(surface(page, 1.5));
        }

        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.last_viewport(3).unwrap().scale, 1.5);
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let cache = PageCache::new(0);
        assert_eq!(cache.capacity(), 1);
    }
}
