//! Element polling against an asynchronously rendering page
//!
//! The page never signals that it has finished rendering, so every lookup is a
//! poll: an attempt repeats the query until it yields something or the
//! per-attempt wait runs out, and failed attempts are retried after a pause
//! until a budget is spent.
//!
//! # Budgets
//!
//! | Budget | Gives up after |
//! |--------|----------------|
//! | `Breakout(n)` | the initial attempt plus `n` retries |
//! | `Timeout(d)` | the first failed attempt once `d` has elapsed |
//!
//! Exhausting a budget is not an error: lookups return an empty result and the
//! caller decides. Only [`Poller::require`] turns absence into
//! [`HarvestError::ElementMissing`].

use crate::config::PollConfig;
use crate::driver::{ElementHandle, PageDriver, Surface};
use crate::{HarvestError, Result};
use std::time::{Duration, Instant};

/// Delay between queries inside a single attempt
const QUERY_INTERVAL: Duration = Duration::from_millis(250);

/// How long a lookup may keep retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitBudget {
    /// Give up after this many retries
    Breakout(u32),
    /// Give up once this much time has passed
    Timeout(Duration),
}

/// Polls a page driver for elements under the configured budgets
pub struct Poller<'a, D: PageDriver + ?Sized> {
    driver: &'a D,
    config: &'a PollConfig,
}

impl<'a, D: PageDriver + ?Sized> Clone for Poller<'a, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, D: PageDriver + ?Sized> Copy for Poller<'a, D> {}

impl<'a, D: PageDriver + ?Sized> Poller<'a, D> {
    pub fn new(driver: &'a D, config: &'a PollConfig) -> Self {
        Self { driver, config }
    }

    /// Short budget for optional elements
    pub fn breakout(&self) -> WaitBudget {
        WaitBudget::Breakout(self.config.breakout_retries)
    }

    /// Long budget for elements the page is expected to render eventually
    pub fn patient(&self) -> WaitBudget {
        WaitBudget::Timeout(self.config.timeout())
    }

    /// Returns every element matching `selector`, or an empty list once the
    /// budget is spent
    pub async fn find_all(
        &self,
        surface: Surface,
        selector: &str,
        scope: Option<ElementHandle>,
        budget: WaitBudget,
    ) -> Result<Vec<ElementHandle>> {
        let started = Instant::now();
        let mut retries = 0u32;

        loop {
            let found = self.attempt(surface, selector, scope).await?;
            if !found.is_empty() {
                return Ok(found);
            }

            let exhausted = match budget {
                WaitBudget::Breakout(limit) => retries >= limit,
                WaitBudget::Timeout(limit) => started.elapsed() >= limit,
            };
            if exhausted {
                tracing::debug!(
                    "Gave up on '{}' after {} retries ({:?})",
                    selector,
                    retries,
                    started.elapsed()
                );
                return Ok(Vec::new());
            }

            retries += 1;
            tracing::debug!("'{}' not rendered yet, retry {}", selector, retries);
            tokio::time::sleep(self.config.retry_interval()).await;
        }
    }

    /// Returns the first element matching `selector`, or `None` once the budget
    /// is spent
    pub async fn find_one(
        &self,
        surface: Surface,
        selector: &str,
        scope: Option<ElementHandle>,
        budget: WaitBudget,
    ) -> Result<Option<ElementHandle>> {
        let found = self.find_all(surface, selector, scope, budget).await?;
        Ok(found.into_iter().next())
    }

    /// Like [`Poller::find_one`], but absence is an error
    pub async fn require(
        &self,
        surface: Surface,
        selector: &str,
        scope: Option<ElementHandle>,
        budget: WaitBudget,
    ) -> Result<ElementHandle> {
        self.find_one(surface, selector, scope, budget)
            .await?
            .ok_or_else(|| HarvestError::ElementMissing {
                selector: selector.to_string(),
            })
    }

    /// Waits until `name` on `element` holds a non-empty value
    ///
    /// Returns `None` if the value is still empty after `timeout`.
    pub async fn attribute_value(
        &self,
        element: ElementHandle,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let started = Instant::now();

        loop {
            match self.driver.attribute(element, name).await {
                Ok(Some(value)) if !value.is_empty() => return Ok(Some(value)),
                Ok(_) => {}
                Err(e) if e.is_transient() => {
                    tracing::debug!("Reading '{}' failed transiently: {}", name, e);
                }
                Err(e) => return Err(e.into()),
            }

            if started.elapsed() >= timeout {
                return Ok(None);
            }
            tokio::time::sleep(QUERY_INTERVAL.min(timeout)).await;
        }
    }

    /// One attempt: queries until something renders or the attempt wait runs out
    async fn attempt(
        &self,
        surface: Surface,
        selector: &str,
        scope: Option<ElementHandle>,
    ) -> Result<Vec<ElementHandle>> {
        let wait = self.config.attempt_wait();
        let started = Instant::now();

        loop {
            match self.driver.query(surface, selector, scope).await {
                Ok(found) if !found.is_empty() => return Ok(found),
                Ok(_) => {}
                Err(e) if e.is_transient() => {
                    tracing::debug!("Query '{}' failed transiently: {}", selector, e);
                }
                Err(e) => return Err(e.into()),
            }

            let elapsed = started.elapsed();
            if elapsed >= wait {
                return Ok(Vec::new());
            }
            tokio::time::sleep(QUERY_INTERVAL.min(wait - elapsed)).await;
        }
    }
}
