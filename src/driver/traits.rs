//! Page driver trait and handle types
//!
//! This module defines the capability the crawl engine consumes from a
//! page-automation backend, together with the surface and element handles that
//! every call is addressed with.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to start browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("Unknown surface: {0}")]
    UnknownSurface(Surface),

    #[error("Surface {requested} is not current (current: {current:?})")]
    SurfaceNotCurrent {
        requested: Surface,
        current: Option<Surface>,
    },

    #[error("Element is no longer attached: {0:?}")]
    StaleElement(ElementHandle),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

impl DriverError {
    /// Returns true if the error only means "not there yet" and a retry may succeed
    ///
    /// Surface bookkeeping errors are programming errors and never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::StaleElement(_))
    }
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// One independent browsing context (a tab) under automation control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Surface(pub u32);

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface#{}", self.0)
    }
}

/// A rendered element on a specific surface
///
/// Two handles compare equal exactly when they point at the same DOM node on the
/// same surface, so handles can be used to remember which elements were already
/// processed even when their content failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub surface: Surface,
    pub node: i64,
}

/// Page automation capability consumed by the crawl engine
///
/// Every call names its target explicitly: queries take a [`Surface`], element
/// operations take an [`ElementHandle`] which carries its surface. Backends that
/// only render the foreground tab rely on callers to make a surface current with
/// [`PageDriver::switch_surface`] before driving it.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Opens `url` in a new surface and makes it current
    async fn open_surface(&self, url: &str) -> DriverResult<Surface>;

    /// Navigates an existing surface to `url`
    async fn navigate(&self, surface: Surface, url: &str) -> DriverResult<()>;

    /// Returns every element matching a CSS selector, optionally scoped to an element
    async fn query(
        &self,
        surface: Surface,
        selector: &str,
        scope: Option<ElementHandle>,
    ) -> DriverResult<Vec<ElementHandle>>;

    /// Returns the direct element children of `element` in document order
    async fn children(&self, element: ElementHandle) -> DriverResult<Vec<ElementHandle>>;

    /// Returns the parent element of `element`
    async fn parent(&self, element: ElementHandle) -> DriverResult<Option<ElementHandle>>;

    async fn current_url(&self, surface: Surface) -> DriverResult<String>;

    /// Returns the rendered text of `element`, one line per text block
    async fn text(&self, element: ElementHandle) -> DriverResult<String>;

    async fn attribute(&self, element: ElementHandle, name: &str) -> DriverResult<Option<String>>;

    async fn click(&self, element: ElementHandle) -> DriverResult<()>;

    async fn hover(&self, element: ElementHandle) -> DriverResult<()>;

    async fn scroll_into_view(&self, element: ElementHandle) -> DriverResult<()>;

    /// Scrolls a scrollable container to its end, triggering lazy rendering
    async fn scroll_to_end(&self, element: ElementHandle) -> DriverResult<()>;

    /// Makes `surface` the foreground surface
    async fn switch_surface(&self, surface: Surface) -> DriverResult<()>;

    /// Closes `surface`; the caller must switch to another surface afterwards
    async fn close_surface(&self, surface: Surface) -> DriverResult<()>;
}
