//! Type Conversions for CloudError
//!
//! From implementations for the error types produced by the crates sitting
//! at the engine's seams.

use super::CloudError;

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for CloudError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
