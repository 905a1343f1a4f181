//! Chrome DevTools driver
//!
//! Drives a real Chrome instance through chromiumoxide. Each surface is a tab;
//! element handles are keyed by the DOM backend node id, so querying the same
//! node twice yields equal handles.

use crate::config::BrowserConfig;
use crate::driver::traits::{DriverError, DriverResult, ElementHandle, PageDriver, Surface};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig as CdpBrowserConfig, Element, Page};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

const MARK_ATTRIBUTE: &str = "data-harvest-mark";

/// Page driver backed by a Chrome DevTools connection
pub struct ChromeDriver {
    browser: Browser,
    handler: JoinHandle<()>,
    pages: Mutex<HashMap<Surface, Page>>,
    elements: Mutex<HashMap<ElementHandle, Arc<Element>>>,
    current: Mutex<Option<Surface>>,
    next_surface: AtomicU32,
    next_mark: AtomicU64,
}

impl ChromeDriver {
    /// Launches Chrome, or connects to a running instance when
    /// `remote_debugging_url` is configured
    ///
    /// # Returns
    ///
    /// * `Ok(ChromeDriver)` - Browser is up and its event handler is running
    /// * `Err(DriverError::Launch)` - Chrome could not be started or reached
    pub async fn launch(config: &BrowserConfig) -> DriverResult<Self> {
        let (browser, mut handler) = if let Some(url) = &config.remote_debugging_url {
            tracing::info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url.as_str())
                .await
                .map_err(|e| DriverError::Launch(format!("Failed to connect to {}: {}", url, e)))?
        } else {
            let mut builder = CdpBrowserConfig::builder()
                .no_sandbox()
                .request_timeout(Duration::from_secs(30))
                .arg("--disable-infobars")
                .arg("--start-maximized")
                .arg("--ignore-gpu-blocklist")
                .arg("--disable-dev-shm-usage")
                .arg("--incognito")
                .arg("--disable-blink-features=AutomationControlled")
                .arg("--disable-extensions")
                .arg("--log-level=3")
                .arg(format!("--user-agent={}", config.user_agent))
                .arg(format!("--lang={}", config.language));

            if !config.headless {
                builder = builder.with_head();
            }

            for arg in &config.extra_args {
                builder = builder.arg(arg.clone());
            }

            let cdp_config = builder.build().map_err(DriverError::Launch)?;
            tracing::info!("Launching Chrome (headless: {})", config.headless);
            Browser::launch(cdp_config)
                .await
                .map_err(|e| DriverError::Launch(e.to_string()))?
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            pages: Mutex::new(HashMap::new()),
            elements: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            next_surface: AtomicU32::new(0),
            next_mark: AtomicU64::new(0),
        })
    }

    fn page(&self, surface: Surface) -> DriverResult<Page> {
        lock(&self.pages)
            .get(&surface)
            .cloned()
            .ok_or(DriverError::UnknownSurface(surface))
    }

    fn element(&self, handle: ElementHandle) -> DriverResult<Arc<Element>> {
        lock(&self.elements)
            .get(&handle)
            .cloned()
            .ok_or(DriverError::StaleElement(handle))
    }

    fn register(&self, surface: Surface, element: Element) -> ElementHandle {
        let handle = ElementHandle {
            surface,
            node: *element.backend_node_id.inner(),
        };
        lock(&self.elements).insert(handle, Arc::new(element));
        handle
    }

    fn register_all(&self, surface: Surface, elements: Vec<Element>) -> Vec<ElementHandle> {
        elements
            .into_iter()
            .map(|element| self.register(surface, element))
            .collect()
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn open_surface(&self, url: &str) -> DriverResult<Surface> {
        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let surface = Surface(self.next_surface.fetch_add(1, Ordering::SeqCst));
        page.bring_to_front().await.map_err(protocol)?;
        lock(&self.pages).insert(surface, page);
        *lock(&self.current) = Some(surface);

        tracing::debug!("Opened {} at {}", surface, url);
        Ok(surface)
    }

    async fn navigate(&self, surface: Surface, url: &str) -> DriverResult<()> {
        let page = self.page(surface)?;
        page.goto(url).await.map_err(|e| DriverError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    async fn query(
        &self,
        surface: Surface,
        selector: &str,
        scope: Option<ElementHandle>,
    ) -> DriverResult<Vec<ElementHandle>> {
        let found = match scope {
            Some(handle) => {
                let element = self.element(handle)?;
                element.find_elements(selector).await.map_err(protocol)?
            }
            None => {
                let page = self.page(surface)?;
                page.find_elements(selector).await.map_err(protocol)?
            }
        };

        Ok(self.register_all(surface, found))
    }

    async fn children(&self, element: ElementHandle) -> DriverResult<Vec<ElementHandle>> {
        let parent = self.element(element)?;
        let found = parent.find_elements(":scope > *").await.map_err(protocol)?;
        Ok(self.register_all(element.surface, found))
    }

    async fn parent(&self, element: ElementHandle) -> DriverResult<Option<ElementHandle>> {
        let child = self.element(element)?;
        let page = self.page(element.surface)?;

        // CDP hands back remote objects, not nodes; tag the parent and query it back.
        let mark = format!("m{}", self.next_mark.fetch_add(1, Ordering::SeqCst));
        child
            .call_js_fn(
                format!(
                    "function() {{ const p = this.parentElement; if (p) {{ p.setAttribute('{}', '{}'); }} }}",
                    MARK_ATTRIBUTE, mark
                ),
                false,
            )
            .await
            .map_err(protocol)?;

        let mut found = page
            .find_elements(format!("[{}=\"{}\"]", MARK_ATTRIBUTE, mark))
            .await
            .map_err(protocol)?;

        let Some(parent) = found.pop() else {
            return Ok(None);
        };

        parent
            .call_js_fn(
                format!("function() {{ this.removeAttribute('{}'); }}", MARK_ATTRIBUTE),
                false,
            )
            .await
            .map_err(protocol)?;

        Ok(Some(self.register(element.surface, parent)))
    }

    async fn current_url(&self, surface: Surface) -> DriverResult<String> {
        let page = self.page(surface)?;
        Ok(page.url().await.map_err(protocol)?.unwrap_or_default())
    }

    async fn text(&self, element: ElementHandle) -> DriverResult<String> {
        let element = self.element(element)?;
        Ok(element.inner_text().await.map_err(protocol)?.unwrap_or_default())
    }

    async fn attribute(&self, element: ElementHandle, name: &str) -> DriverResult<Option<String>> {
        let element = self.element(element)?;

        // Input values are set by script and only live in the property
        if name == "value" {
            let value = element.property("value").await.map_err(protocol)?;
            if let Some(value) = value.as_ref().and_then(|v| v.as_str()) {
                return Ok(Some(value.to_string()));
            }
        }

        element.attribute(name).await.map_err(protocol)
    }

    async fn click(&self, element: ElementHandle) -> DriverResult<()> {
        let element = self.element(element)?;
        element.click().await.map_err(protocol)?;
        Ok(())
    }

    async fn hover(&self, element: ElementHandle) -> DriverResult<()> {
        let element = self.element(element)?;
        element.hover().await.map_err(protocol)?;
        Ok(())
    }

    async fn scroll_into_view(&self, element: ElementHandle) -> DriverResult<()> {
        let element = self.element(element)?;
        element.scroll_into_view().await.map_err(protocol)?;
        Ok(())
    }

    async fn scroll_to_end(&self, element: ElementHandle) -> DriverResult<()> {
        let element = self.element(element)?;
        element
            .call_js_fn("function() { this.scrollTop = this.scrollHeight; }", false)
            .await
            .map_err(protocol)?;

        // The feed also listens for the End key; a failed key press is not fatal.
        if let Err(e) = element.press_key("End").await {
            tracing::trace!("End key press failed: {}", e);
        }
        Ok(())
    }

    async fn switch_surface(&self, surface: Surface) -> DriverResult<()> {
        let page = self.page(surface)?;
        page.bring_to_front().await.map_err(protocol)?;
        let previous = lock(&self.current).replace(surface);
        tracing::trace!("Switched from {:?} to {}", previous, surface);
        Ok(())
    }

    async fn close_surface(&self, surface: Surface) -> DriverResult<()> {
        let page = lock(&self.pages)
            .remove(&surface)
            .ok_or(DriverError::UnknownSurface(surface))?;

        lock(&self.elements).retain(|handle, _| handle.surface != surface);
        {
            let mut current = lock(&self.current);
            if *current == Some(surface) {
                *current = None;
            }
        }

        page.close().await.map_err(protocol)?;
        tracing::debug!("Closed {}", surface);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn protocol(error: impl std::fmt::Display) -> DriverError {
    DriverError::Protocol(error.to_string())
}
