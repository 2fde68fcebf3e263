//! Error taxonomy for the viewer

/// A document could not be opened
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to open '{locator}': {detail}")]
pub struct LoadError {
    pub locator: String,
    pub detail: String,
}

impl LoadError {
    pub fn new(locator: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            detail: detail.into(),
        }
    }
}

/// A single page failed to rasterize
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("page {page} failed to render: {detail}")]
pub struct RenderError {
    /// Page number (1-indexed)
    pub page: usize,
    pub detail: String,
}

impl RenderError {
    pub fn new(page: usize, detail: impl Into<String>) -> Self {
        Self {
            page,
            detail: detail.into(),
        }
    }
}

/// Errors surfaced by the viewer and its collaborators
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("page {page} not found (document has {total} pages)")]
    PageNotFound { page: usize, total: usize },

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T, E = ViewerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_target() {
        let err = ViewerError::from(LoadError::new("missing.pdf", "no such file"));
        assert_eq!(err.to_string(), "failed to open 'missing.pdf': no such file");

        let err = ViewerError::PageNotFound { page: 12, total: 10 };
        assert_eq!(err.to_string(), "page 12 not found (document has 10 pages)");

        let err = ViewerError::from(RenderError::new(3, "corrupt stream"));
        assert_eq!(err.to_string(), "page 3 failed to render: corrupt stream");
    }
}
