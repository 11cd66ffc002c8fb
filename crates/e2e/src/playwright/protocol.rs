//! Bridge wire format

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::E2eError;

#[derive(Debug, Serialize)]
pub(crate) struct BridgeRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum FailureKind {
    Timeout,
    NotFound,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BridgeFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl BridgeFailure {
    /// Map onto the crate error, naming `subject` (usually a locator)
    pub fn into_error(self, subject: &str, waited: Duration) -> E2eError {
        let detail = self.message.lines().next().unwrap_or_default().to_string();
        match self.kind {
            FailureKind::Timeout => E2eError::timeout(format!("{} ({})", subject, detail), waited),
            FailureKind::NotFound => E2eError::ElementNotFound(subject.to_string()),
            FailureKind::Other => E2eError::Playwright(format!("{}: {}", subject, self.message)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BridgeReply {
    pub id: u64,
    pub ok: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<BridgeFailure>,
}

impl BridgeReply {
    pub fn into_result(self, subject: &str, waited: Duration) -> Result<Value, E2eError> {
        if self.ok {
            return Ok(self.result);
        }
        Err(match self.error {
            Some(failure) => failure.into_error(subject, waited),
            None => E2eError::Playwright(format!("{}: bridge reported failure without detail", subject)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_reply() {
        let reply: BridgeReply = serde_json::from_str(r#"{"id":4,"ok":true,"result":3}"#).unwrap();
        assert_eq!(reply.id, 4);
        assert_eq!(reply.into_result("rows", Duration::ZERO).unwrap(), Value::from(3));
    }

    #[test]
    fn test_failure_kinds_map_to_errors() {
        let reply: BridgeReply = serde_json::from_str(
            r#"{"id":1,"ok":false,"error":{"kind":"not_found","message":"no element matches"}}"#,
        )
        .unwrap();
        let err = reply.into_result("tbody tr", Duration::ZERO).unwrap_err();
        assert!(matches!(err, E2eError::ElementNotFound(ref s) if s == "tbody tr"));

        let reply: BridgeReply = serde_json::from_str(
            r#"{"id":2,"ok":false,"error":{"kind":"timeout","message":"Timeout 500ms exceeded.\n=== logs ==="}}"#,
        )
        .unwrap();
        let err = reply.into_result("button", Duration::from_millis(500)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Timeout after 500ms waiting for: button (Timeout 500ms exceeded.)"
        );
    }

    #[test]
    fn test_unknown_kind_is_not_absence() {
        let reply: BridgeReply = serde_json::from_str(
            r#"{"id":3,"ok":false,"error":{"kind":"crashed","message":"Target page, context or browser has been closed"}}"#,
        )
        .unwrap();
        let err = reply.into_result("row", Duration::ZERO).unwrap_err();
        assert!(!err.is_absence());
    }
}
