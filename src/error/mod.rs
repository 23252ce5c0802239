//! Error Handling Module
//!
//! One error type covers the whole invocation pipeline, from descriptor
//! registration through transport execution and response decoding. Errors
//! carry enough context (status codes, parsed error payloads, filter ids)
//! for callers to build their own recovery policies on top.

mod conversions;

use serde_json::Value;

/// Errors surfaced by the invocation engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CloudError {
    /// Bad descriptor or binder wiring. Detected when operations are
    /// registered or when an invoker is assembled; never surfaces at call
    /// time for a validly constructed invoker.
    #[error("Invalid operation wiring: {0}")]
    Construction(String),

    /// An invocation named an operation the provider never registered.
    #[error("Provider '{provider}' has no operation '{operation}'")]
    UnknownOperation { provider: String, operation: String },

    /// A logical endpoint target could not be mapped to a base URI.
    #[error("Unresolvable endpoint target '{target}' for provider '{provider}'")]
    UnresolvableEndpoint { provider: String, target: String },

    /// A request filter refused to let the request proceed.
    #[error("Request rejected by filter '{filter}': {reason}")]
    FilterRejected { filter: String, reason: String },

    /// Connectivity or timeout failure reported by the transport.
    #[error("Transport fault: {0}")]
    Transport(String),

    /// Non-2xx status not covered by the operation's recovery strategy.
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<Value>,
    },

    /// Malformed body on a success-status response. Fatal for the
    /// invocation, never retried.
    #[error("Failed to decode response body: {0}")]
    Decode(String),

    /// The invocation was cancelled before completion.
    #[error("Invocation cancelled")]
    Cancelled,

    /// Invalid provider configuration (credentials, header values, URIs).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invariant violation inside the engine.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by caller-side retry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Wiring or configuration problems; retrying cannot help.
    Configuration,
    /// The remote service rejected the request (4xx).
    Client,
    /// The remote service failed (5xx).
    Server,
    /// Connectivity-level failure.
    Network,
    /// Success status with an undecodable body.
    Decode,
    /// Cancelled by the caller.
    Cancelled,
}

impl CloudError {
    /// Construct an API error without a parsed payload.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Construct a construction-time wiring error.
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction(message.into())
    }

    /// Classify this error for caller-side policy decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Construction(_) | Self::Configuration(_) | Self::Internal(_) => {
                ErrorCategory::Configuration
            }
            Self::UnknownOperation { .. }
            | Self::UnresolvableEndpoint { .. }
            | Self::FilterRejected { .. } => ErrorCategory::Configuration,
            Self::Transport(_) => ErrorCategory::Network,
            Self::Api { status, .. } if *status >= 500 => ErrorCategory::Server,
            Self::Api { .. } => ErrorCategory::Client,
            Self::Decode(_) => ErrorCategory::Decode,
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Whether repeating the same invocation could plausibly succeed.
    ///
    /// The engine itself never retries; this is advisory for callers that
    /// layer their own policy around repeated invocations.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Server
        )
    }

    /// Status code carried by the error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
