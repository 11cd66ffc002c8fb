//! Page handle shared by every page-object
//!
//! Wraps a `Driver` with the suite's timeouts and the expectation helpers the
//! page-objects are built from. Cloning is cheap; clones drive the same page.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::config::Timeouts;
use crate::driver::{CapturedResponse, Driver, ResponseMatcher};
use crate::error::{E2eError, E2eResult};
use crate::locator::Locator;
use crate::query::{reconcile_pagination, ListQuery};
use crate::wait::{poll_for, poll_until, settle, PollOptions};

#[derive(Clone)]
pub struct Page {
    driver: Arc<dyn Driver>,
    base_url: Url,
    timeouts: Timeouts,
}

impl Page {
    pub fn new(driver: Arc<dyn Driver>, base_url: &str, timeouts: Timeouts) -> E2eResult<Self> {
        Ok(Self {
            driver,
            base_url: Url::parse(base_url)?,
            timeouts,
        })
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    pub fn poll(&self) -> PollOptions {
        self.timeouts.poll()
    }

    pub fn url_for(&self, path: &str) -> E2eResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        let url = self.url_for(path)?;
        self.driver
            .goto(url.as_str(), self.timeouts.navigation())
            .await
    }

    /// Navigate to a list view and normalize its pagination parameters.
    ///
    /// If the page lands on a URL with `limit` but no `offset`, `offset=0` is
    /// injected and the page re-navigated. Returns the final URL.
    pub async fn goto_list(&self, path: &str, query: &ListQuery) -> E2eResult<Url> {
        let mut url = self.url_for(path)?;
        query.apply_to(&mut url);
        self.driver
            .goto(url.as_str(), self.timeouts.navigation())
            .await?;

        let landed = self.url().await?;
        match reconcile_pagination(&landed) {
            Some(fixed) => {
                debug!("Reconciling pagination: {} -> {}", landed, fixed);
                self.driver
                    .goto(fixed.as_str(), self.timeouts.navigation())
                    .await?;
                Ok(fixed)
            }
            None => Ok(landed),
        }
    }

    pub async fn url(&self) -> E2eResult<Url> {
        Ok(Url::parse(&self.driver.current_url().await?)?)
    }

    pub async fn wait_for_url<P>(&self, what: &str, predicate: P) -> E2eResult<Url>
    where
        P: Fn(&Url) -> bool + Sync,
    {
        let driver = self.driver.as_ref();
        let predicate = &predicate;
        poll_for(&self.poll(), what, move || async move {
            let url = Url::parse(&driver.current_url().await?)?;
            Ok(predicate(&url).then_some(url))
        })
        .await
    }

    pub async fn expect_visible(&self, locator: &Locator) -> E2eResult<()> {
        let driver = self.driver.as_ref();
        poll_until(
            &self.poll(),
            &format!("{} to be visible", locator),
            move || async move { driver.is_visible(locator).await },
        )
        .await
    }

    pub async fn expect_hidden(&self, locator: &Locator) -> E2eResult<()> {
        let driver = self.driver.as_ref();
        poll_until(
            &self.poll(),
            &format!("{} to be hidden", locator),
            move || async move { Ok(!driver.is_visible(locator).await?) },
        )
        .await
    }

    pub async fn expect_count_at_least(&self, locator: &Locator, min: usize) -> E2eResult<usize> {
        let driver = self.driver.as_ref();
        poll_for(
            &self.poll(),
            &format!("at least {} of {}", min, locator),
            move || async move {
                let n = driver.count(locator).await?;
                Ok((n >= min).then_some(n))
            },
        )
        .await
    }

    pub async fn expect_text_contains(&self, locator: &Locator, expected: &str) -> E2eResult<()> {
        let driver = self.driver.as_ref();
        let needle = expected.to_lowercase();
        let needle = needle.as_str();
        poll_until(
            &self.poll(),
            &format!("{} to contain '{}'", locator, expected),
            move || async move {
                Ok(driver.text(locator).await?.to_lowercase().contains(needle))
            },
        )
        .await
    }

    /// Present right now; absence is an answer, not an error
    pub async fn exists(&self, locator: &Locator) -> E2eResult<bool> {
        Ok(self.driver.count(locator).await? > 0)
    }

    /// Becomes visible within the expect timeout.
    ///
    /// Only absence (timeout / element not found) becomes `false`; bridge or
    /// page failures still propagate.
    pub async fn appears(&self, locator: &Locator) -> E2eResult<bool> {
        match self.expect_visible(locator).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_absence() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Row count once two consecutive reads agree
    pub async fn settled_count(&self, locator: &Locator) -> E2eResult<usize> {
        let driver = self.driver.as_ref();
        settle(
            &self.poll(),
            self.timeouts.settle_delay(),
            &format!("count of {}", locator),
            move || async move { driver.count(locator).await },
        )
        .await
    }

    pub async fn text(&self, locator: &Locator) -> E2eResult<String> {
        self.driver.text(locator).await
    }

    pub async fn all_texts(&self, locator: &Locator) -> E2eResult<Vec<String>> {
        self.driver.all_texts(locator).await
    }

    pub async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        self.driver.count(locator).await
    }

    pub async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        self.driver.is_visible(locator).await
    }

    pub async fn input_value(&self, locator: &Locator) -> E2eResult<String> {
        self.driver.input_value(locator).await
    }

    pub async fn click(&self, locator: &Locator) -> E2eResult<()> {
        self.driver.click(locator, self.timeouts.action()).await
    }

    pub async fn fill(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.driver
            .fill(locator, value, self.timeouts.action())
            .await
    }

    pub async fn press(&self, locator: &Locator, key: &str) -> E2eResult<()> {
        self.driver.press(locator, key, self.timeouts.action()).await
    }

    pub async fn select_option(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        self.driver
            .select_option(locator, value, self.timeouts.action())
            .await
    }

    /// Run `action` with a response wait armed beforehand, then await the
    /// response and require a 2xx status.
    pub async fn capture_response<F, Fut>(
        &self,
        matcher: ResponseMatcher,
        action: F,
    ) -> E2eResult<CapturedResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = E2eResult<()>>,
    {
        let waiter = self
            .driver
            .expect_response(matcher, self.timeouts.response())
            .await?;
        action().await?;

        let response = self.driver.await_response(waiter).await?;
        debug!("{} {} -> {}", response.method, response.url, response.status);
        if !response.is_success() {
            return Err(E2eError::Api {
                method: response.method,
                url: response.url,
                status: response.status,
                body: response.body,
            });
        }
        Ok(response)
    }

    pub async fn screenshot(&self, path: &Path) -> E2eResult<()> {
        self.driver.screenshot(path).await
    }

    pub async fn close(&self) -> E2eResult<()> {
        self.driver.close().await
    }
}
