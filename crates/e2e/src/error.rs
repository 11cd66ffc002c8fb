//! Error types for E2E testing

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Playwright bridge exited")]
    BridgeClosed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {}ms waiting for: {what}", waited.as_millis())]
    Timeout { what: String, waited: Duration },

    #[error("Assertion failed: expected {expected}, got {actual}")]
    AssertionFailed { expected: String, actual: String },

    #[error("{kind} '{id}' not found")]
    Precondition { kind: String, id: String },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("API {method} {url} returned {status}: {body}")]
    Api {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl E2eError {
    pub fn timeout(what: impl Into<String>, waited: Duration) -> Self {
        E2eError::Timeout {
            what: what.into(),
            waited,
        }
    }

    pub fn assertion(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        E2eError::AssertionFailed {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing(kind: impl Into<String>, id: impl Into<String>) -> Self {
        E2eError::Precondition {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// True only for "the element is not there" outcomes.
    ///
    /// Soft lookups may turn these into a negative answer. Anything else
    /// (a closed page, a bridge crash, an HTTP failure) must propagate.
    pub fn is_absence(&self) -> bool {
        matches!(self, E2eError::ElementNotFound(_) | E2eError::Timeout { .. })
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
