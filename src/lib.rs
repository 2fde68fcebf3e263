pub mod app;
pub mod banner;
pub mod config;
pub mod document;
pub mod error;
pub mod event_source;
pub mod interaction;
pub mod layout;
pub mod navigation;
pub mod panic_handler;
pub mod render;
pub mod resize;
pub mod ui;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{LoadError, RenderError, ViewerError};
pub use viewer::Viewer;
