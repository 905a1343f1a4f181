//! Snapshot driver for replaying saved pages
//!
//! Serves saved HTML documents by URL instead of a live browser. A document can
//! be registered in several stages; every `scroll_to_end` on a surface advances it
//! to the next stage, which is how a growing infinite-scroll feed is replayed.
//!
//! The driver is strict about surfaces: any operation addressed at a surface
//! other than the current one fails with `SurfaceNotCurrent`. It also records
//! every opened URL and every click so callers can audit what was touched.

use crate::driver::traits::{DriverError, DriverResult, ElementHandle, PageDriver, Surface};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A click performed through the snapshot driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickRecord {
    pub surface: Surface,
    /// URL of the surface at the time of the click
    pub url: String,
    /// `aria-label` of the clicked element, if any
    pub label: Option<String>,
}

#[derive(Debug)]
struct LoadedSurface {
    url: String,
    stage: usize,
}

#[derive(Debug, Default)]
struct SnapshotState {
    surfaces: BTreeMap<Surface, LoadedSurface>,
    current: Option<Surface>,
    next_surface: u32,
    opened: Vec<String>,
    clicks: Vec<ClickRecord>,
    scrolls: usize,
}

/// Page driver that replays saved HTML documents
#[derive(Debug, Default)]
pub struct SnapshotDriver {
    documents: HashMap<String, Vec<String>>,
    state: Mutex<SnapshotState>,
}

impl SnapshotDriver {
    /// Creates a driver with no documents
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single-stage document for `url`
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_stages(url, vec![html.into()])
    }

    /// Registers a document for `url` that advances one stage per scroll
    pub fn with_stages(mut self, url: impl Into<String>, stages: Vec<String>) -> Self {
        self.documents.insert(url.into(), stages);
        self
    }

    /// URLs opened so far, in order
    pub fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    /// Clicks performed so far, in order
    pub fn clicks(&self) -> Vec<ClickRecord> {
        self.lock().clicks.clone()
    }

    /// Number of `scroll_to_end` calls so far
    pub fn scroll_count(&self) -> usize {
        self.lock().scrolls
    }

    /// Surfaces that are still open
    pub fn open_surfaces(&self) -> Vec<Surface> {
        self.lock().surfaces.keys().copied().collect()
    }

    fn lock(&self) -> MutexGuard<'_, SnapshotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn source(&self, url: &str, stage: usize) -> Option<&str> {
        let stages = self.documents.get(url)?;
        stages
            .get(stage)
            .or_else(|| stages.last())
            .map(String::as_str)
    }

    /// Parses the current document of `surface` and runs `f` against it
    ///
    /// Fails unless `surface` is open and current.
    fn with_document<T>(
        &self,
        surface: Surface,
        f: impl FnOnce(&Document) -> DriverResult<T>,
    ) -> DriverResult<T> {
        let state = self.lock();
        let loaded = state
            .surfaces
            .get(&surface)
            .ok_or(DriverError::UnknownSurface(surface))?;

        if state.current != Some(surface) {
            return Err(DriverError::SurfaceNotCurrent {
                requested: surface,
                current: state.current,
            });
        }

        let source = self
            .source(&loaded.url, loaded.stage)
            .ok_or_else(|| DriverError::Navigation {
                url: loaded.url.clone(),
                message: "no snapshot registered".to_string(),
            })?;

        let document = Document::parse(surface, source);
        f(&document)
    }
}

/// A parsed snapshot; handles number nodes in document order
struct Document {
    surface: Surface,
    html: Html,
}

impl Document {
    fn parse(surface: Surface, source: &str) -> Self {
        Self {
            surface,
            html: Html::parse_document(source),
        }
    }

    fn element(&self, handle: ElementHandle) -> DriverResult<ElementRef<'_>> {
        usize::try_from(handle.node)
            .ok()
            .and_then(|i| self.html.tree.nodes().nth(i))
            .and_then(ElementRef::wrap)
            .ok_or(DriverError::StaleElement(handle))
    }

    fn handle(&self, element: ElementRef<'_>) -> ElementHandle {
        let id = element.id();
        let node = self
            .html
            .tree
            .nodes()
            .position(|node| node.id() == id)
            .unwrap_or_default();
        ElementHandle {
            surface: self.surface,
            node: node as i64,
        }
    }
}

fn parse_selector(selector: &str) -> DriverResult<Selector> {
    Selector::parse(selector).map_err(|e| DriverError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Approximates `innerText`: one trimmed line per non-empty text node
fn rendered_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl PageDriver for SnapshotDriver {
    async fn open_surface(&self, url: &str) -> DriverResult<Surface> {
        if !self.documents.contains_key(url) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message: "no snapshot registered".to_string(),
            });
        }

        let mut state = self.lock();
        let surface = Surface(state.next_surface);
        state.next_surface += 1;
        state.surfaces.insert(
            surface,
            LoadedSurface {
                url: url.to_string(),
                stage: 0,
            },
        );
        state.current = Some(surface);
        state.opened.push(url.to_string());
        Ok(surface)
    }

    async fn navigate(&self, surface: Surface, url: &str) -> DriverResult<()> {
        if !self.documents.contains_key(url) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message: "no snapshot registered".to_string(),
            });
        }

        let mut state = self.lock();
        let loaded = state
            .surfaces
            .get_mut(&surface)
            .ok_or(DriverError::UnknownSurface(surface))?;
        loaded.url = url.to_string();
        loaded.stage = 0;
        state.opened.push(url.to_string());
        Ok(())
    }

    async fn query(
        &self,
        surface: Surface,
        selector: &str,
        scope: Option<ElementHandle>,
    ) -> DriverResult<Vec<ElementHandle>> {
        let selector = parse_selector(selector)?;
        self.with_document(surface, |doc| {
            let found = match scope {
                Some(handle) => doc
                    .element(handle)?
                    .select(&selector)
                    .map(|e| doc.handle(e))
                    .collect(),
                None => doc.html.select(&selector).map(|e| doc.handle(e)).collect(),
            };
            Ok(found)
        })
    }

    async fn children(&self, element: ElementHandle) -> DriverResult<Vec<ElementHandle>> {
        self.with_document(element.surface, |doc| {
            Ok(doc
                .element(element)?
                .children()
                .filter_map(ElementRef::wrap)
                .map(|child| doc.handle(child))
                .collect())
        })
    }

    async fn parent(&self, element: ElementHandle) -> DriverResult<Option<ElementHandle>> {
        self.with_document(element.surface, |doc| {
            Ok(doc
                .element(element)?
                .parent()
                .and_then(ElementRef::wrap)
                .map(|parent| doc.handle(parent)))
        })
    }

    async fn current_url(&self, surface: Surface) -> DriverResult<String> {
        let state = self.lock();
        state
            .surfaces
            .get(&surface)
            .map(|loaded| loaded.url.clone())
            .ok_or(DriverError::UnknownSurface(surface))
    }

    async fn text(&self, element: ElementHandle) -> DriverResult<String> {
        self.with_document(element.surface, |doc| Ok(rendered_text(doc.element(element)?)))
    }

    async fn attribute(&self, element: ElementHandle, name: &str) -> DriverResult<Option<String>> {
        self.with_document(element.surface, |doc| {
            Ok(doc.element(element)?.value().attr(name).map(str::to_string))
        })
    }

    async fn click(&self, element: ElementHandle) -> DriverResult<()> {
        let label = self.attribute(element, "aria-label").await?;
        let url = self.current_url(element.surface).await?;
        self.lock().clicks.push(ClickRecord {
            surface: element.surface,
            url,
            label,
        });
        Ok(())
    }

    async fn hover(&self, element: ElementHandle) -> DriverResult<()> {
        self.with_document(element.surface, |doc| doc.element(element).map(|_| ()))
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> DriverResult<()> {
        self.with_document(element.surface, |doc| doc.element(element).map(|_| ()))
    }

    async fn scroll_to_end(&self, element: ElementHandle) -> DriverResult<()> {
        self.with_document(element.surface, |doc| doc.element(element).map(|_| ()))?;

        let mut state = self.lock();
        state.scrolls += 1;
        if let Some(loaded) = state.surfaces.get_mut(&element.surface) {
            let stages = self.documents.get(&loaded.url).map_or(1, Vec::len);
            loaded.stage = (loaded.stage + 1).min(stages.saturating_sub(1));
        }
        Ok(())
    }

    async fn switch_surface(&self, surface: Surface) -> DriverResult<()> {
        let mut state = self.lock();
        if !state.surfaces.contains_key(&surface) {
            return Err(DriverError::UnknownSurface(surface));
        }
        state.current = Some(surface);
        Ok(())
    }

    async fn close_surface(&self, surface: Surface) -> DriverResult<()> {
        let mut state = self.lock();
        state
            .surfaces
            .remove(&surface)
            .ok_or(DriverError::UnknownSurface(surface))?;
        if state.current == Some(surface) {
            state.current = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div id="feed" role="feed" aria-label="Results for hotels">
            <div role="presentation">header</div>
            <div class="card"><span>First</span></div>
            <div><span>Second</span> <span>line</span></div>
        </div>
        <button aria-label="Close">x</button>
    </body></html>"#;

    #[tokio::test]
    async fn test_query_and_text() {
        let driver = SnapshotDriver::new().with_page("https://maps.test/list", PAGE);
        let surface = driver.open_surface("https://maps.test/list").await.unwrap();

        let feeds = driver.query(surface, "div[role='feed']", None).await.unwrap();
        assert_eq!(feeds.len(), 1);

        let children = driver.children(feeds[0]).await.unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(driver.text(children[2]).await.unwrap(), "Second\nline");
        assert_eq!(
            driver.attribute(children[1], "class").await.unwrap().as_deref(),
            Some("card")
        );
        assert_eq!(driver.parent(children[0]).await.unwrap(), Some(feeds[0]));
    }

    #[tokio::test]
    async fn test_handles_are_stable_across_queries() {
        let driver = SnapshotDriver::new().with_page("https://maps.test/list", PAGE);
        let surface = driver.open_surface("https://maps.test/list").await.unwrap();

        let first = driver.query(surface, "span", None).await.unwrap();
        let second = driver.query(surface, "span", None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_scoped_query() {
        let driver = SnapshotDriver::new().with_page("https://maps.test/list", PAGE);
        let surface = driver.open_surface("https://maps.test/list").await.unwrap();

        let feed = driver.query(surface, "#feed", None).await.unwrap()[0];
        let buttons = driver.query(surface, "button", Some(feed)).await.unwrap();
        assert!(buttons.is_empty());
        let spans = driver.query(surface, "span", Some(feed)).await.unwrap();
        assert_eq!(spans.len(), 3);
    }

    #[tokio::test]
    async fn test_rejects_operations_on_background_surface() {
        let driver = SnapshotDriver::new()
            .with_page("https://maps.test/list", PAGE)
            .with_page("https://maps.test/place", "<html><body><p>detail</p></body></html>");

        let primary = driver.open_surface("https://maps.test/list").await.unwrap();
        let detail = driver.open_surface("https://maps.test/place").await.unwrap();

        let result = driver.query(primary, "span", None).await;
        assert!(matches!(
            result,
            Err(DriverError::SurfaceNotCurrent { requested, current })
                if requested == primary && current == Some(detail)
        ));

        driver.close_surface(detail).await.unwrap();
        assert!(driver.query(primary, "span", None).await.is_err());

        driver.switch_surface(primary).await.unwrap();
        assert_eq!(driver.query(primary, "span", None).await.unwrap().len(), 3);
        assert_eq!(driver.open_surfaces(), vec![primary]);
    }

    #[tokio::test]
    async fn test_stages_advance_on_scroll() {
        let stage = |n: usize| {
            let items: String = (0..n).map(|i| format!("<li>item {}</li>", i)).collect();
            format!("<html><body><ul id=\"list\">{}</ul></body></html>", items)
        };
        let driver = SnapshotDriver::new()
            .with_stages("https://maps.test/feed", vec![stage(2), stage(4)]);
        let surface = driver.open_surface("https://maps.test/feed").await.unwrap();

        let list = driver.query(surface, "#list", None).await.unwrap()[0];
        assert_eq!(driver.query(surface, "li", None).await.unwrap().len(), 2);

        driver.scroll_to_end(list).await.unwrap();
        assert_eq!(driver.query(surface, "li", None).await.unwrap().len(), 4);

        // Stays on the last stage
        driver.scroll_to_end(list).await.unwrap();
        assert_eq!(driver.query(surface, "li", None).await.unwrap().len(), 4);
        assert_eq!(driver.scroll_count(), 2);
    }

    #[tokio::test]
    async fn test_click_is_recorded() {
        let driver = SnapshotDriver::new().with_page("https://maps.test/list", PAGE);
        let surface = driver.open_surface("https://maps.test/list").await.unwrap();

        let close = driver
            .query(surface, "button[aria-label=\"Close\"]", None)
            .await
            .unwrap()[0];
        driver.click(close).await.unwrap();

        let clicks = driver.clicks();
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].label.as_deref(), Some("Close"));
        assert_eq!(clicks[0].url, "https://maps.test/list");
    }

    #[tokio::test]
    async fn test_unknown_url() {
        let driver = SnapshotDriver::new();
        assert!(matches!(
            driver.open_surface("https://maps.test/missing").await,
            Err(DriverError::Navigation { .. })
        ));
    }
}
