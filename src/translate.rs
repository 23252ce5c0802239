//! Error translation.
//!
//! Maps failure-status responses to either a recovered value or a typed
//! error, per the strategy declared on the descriptor. This table-driven
//! recovery is what lets read-style operations declare "not found is not an
//! error" without special-casing caller code.

use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::descriptor::ErrorStrategy;
use crate::error::CloudError;
use crate::decode::DecodedValue;

const NOT_FOUND: u16 = 404;

/// Translate a non-2xx exchange. Returns a recovered success value when the
/// strategy covers the status, a typed API error otherwise.
pub(crate) fn translate_failure(
    strategy: &ErrorStrategy,
    status: u16,
    body: &[u8],
) -> Result<DecodedValue, CloudError> {
    match strategy {
        ErrorStrategy::NullOnNotFound if status == NOT_FOUND => Ok(DecodedValue::Null),
        ErrorStrategy::EmptyOnNotFound if status == NOT_FOUND => {
            Ok(DecodedValue::Json(json!([])))
        }
        _ => Err(domain_error(status, body)),
    }
}

fn domain_error(status: u16, body: &[u8]) -> CloudError {
    let details: Option<Value> = serde_json::from_slice(body).ok();
    let message = details
        .as_ref()
        .and_then(error_message)
        .or_else(|| {
            StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("status {status}"));
    CloudError::Api {
        status,
        message,
        details,
    }
}

/// Pull a human-readable message out of common provider error payload
/// shapes.
fn error_message(details: &Value) -> Option<String> {
    for path in [
        &["error", "message"][..],
        &["message"][..],
        &["Error", "Message"][..],
    ] {
        let mut value = details;
        let mut found = true;
        for key in path {
            match value.get(key) {
                Some(v) => value = v,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found && let Some(text) = value.as_str() {
            return Some(text.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_strategy_recovers_404_only() {
        let out = translate_failure(&ErrorStrategy::NullOnNotFound, 404, b"").unwrap();
        assert!(out.is_null());

        let err = translate_failure(&ErrorStrategy::NullOnNotFound, 500, b"").unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn empty_strategy_recovers_404_as_empty_collection() {
        let out = translate_failure(&ErrorStrategy::EmptyOnNotFound, 404, b"").unwrap();
        let items = out.into_json().unwrap();
        assert_eq!(items.as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn empty_strategy_propagates_other_statuses() {
        let err = translate_failure(&ErrorStrategy::EmptyOnNotFound, 403, b"").unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_retryable());
    }

    #[test]
    fn propagate_strategy_wraps_status_and_payload() {
        let body = br#"{"error": {"message": "Throttled", "code": "Throttling"}}"#;
        let err = translate_failure(&ErrorStrategy::Propagate, 400, body).unwrap_err();
        match err {
            CloudError::Api {
                status,
                message,
                details,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Throttled");
                assert_eq!(details.unwrap()["error"]["code"], "Throttling");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn propagate_strategy_treats_404_as_an_error() {
        let err = translate_failure(&ErrorStrategy::Propagate, 404, b"").unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn unparsable_bodies_fall_back_to_the_status_reason() {
        let err = translate_failure(&ErrorStrategy::Propagate, 503, b"<html/>").unwrap_err();
        match err {
            CloudError::Api {
                message, details, ..
            } => {
                assert_eq!(message, "Service Unavailable");
                assert!(details.is_none());
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
