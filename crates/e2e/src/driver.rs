//! Browser driver seam
//!
//! Page-objects talk to the browser only through this trait, and only in terms
//! of `Locator` descriptions, so there is no element handle to go stale across
//! an await.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::E2eResult;
use crate::locator::Locator;

/// Selects the first network response whose request matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMatcher {
    pub method: String,
    pub url_contains: String,
    /// Match only when the URL path (query and fragment stripped) ends with
    /// `url_contains`
    #[serde(default)]
    pub path_end: bool,
}

impl ResponseMatcher {
    pub fn new(method: &str, url_contains: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            url_contains: url_contains.into(),
            path_end: false,
        }
    }

    /// Anchor the match on the end of the URL path, so `/connections/conn`
    /// no longer matches `/connections/conn_1`
    pub fn at_path_end(mut self) -> Self {
        self.path_end = true;
        self
    }

    pub fn post(url_contains: impl Into<String>) -> Self {
        Self::new("POST", url_contains)
    }

    pub fn patch(url_contains: impl Into<String>) -> Self {
        Self::new("PATCH", url_contains)
    }

    pub fn delete(url_contains: impl Into<String>) -> Self {
        Self::new("DELETE", url_contains)
    }

    pub fn matches(&self, method: &str, url: &str) -> bool {
        if !self.method.eq_ignore_ascii_case(method) {
            return false;
        }
        if self.path_end {
            let path = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
            path.ends_with(&self.url_contains)
        } else {
            url.contains(&self.url_contains)
        }
    }
}

impl std::fmt::Display for ResponseMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path_end {
            write!(f, "{} *{}", self.method, self.url_contains)
        } else {
            write!(f, "{} *{}*", self.method, self.url_contains)
        }
    }
}

/// Token for a response wait registered with `Driver::expect_response`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseWaiter {
    pub id: String,
    pub matcher: ResponseMatcher,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedResponse {
    pub status: u16,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub body: String,
}

impl CapturedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> E2eResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[async_trait]
pub trait Driver: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> E2eResult<()>;

    async fn current_url(&self) -> E2eResult<String>;

    /// Number of elements currently matching; zero is not an error
    async fn count(&self, locator: &Locator) -> E2eResult<usize>;

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool>;

    /// Inner text of the first match, `ElementNotFound` when nothing matches
    async fn text(&self, locator: &Locator) -> E2eResult<String>;

    /// Inner text of every match, in document order
    async fn all_texts(&self, locator: &Locator) -> E2eResult<Vec<String>>;

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>>;

    async fn input_value(&self, locator: &Locator) -> E2eResult<String>;

    async fn click(&self, locator: &Locator, timeout: Duration) -> E2eResult<()>;

    async fn fill(&self, locator: &Locator, value: &str, timeout: Duration) -> E2eResult<()>;

    async fn press(&self, locator: &Locator, key: &str, timeout: Duration) -> E2eResult<()>;

    async fn select_option(&self, locator: &Locator, value: &str, timeout: Duration)
        -> E2eResult<()>;

    /// Start listening for a response. Must be called before the action that
    /// triggers the request, otherwise a fast response is missed.
    async fn expect_response(
        &self,
        matcher: ResponseMatcher,
        timeout: Duration,
    ) -> E2eResult<ResponseWaiter>;

    async fn await_response(&self, waiter: ResponseWaiter) -> E2eResult<CapturedResponse>;

    async fn screenshot(&self, path: &Path) -> E2eResult<()>;

    async fn close(&self) -> E2eResult<()>;
}
