//! Response dispatching and decoding.
//!
//! The dispatcher picks the decoding path declared on the descriptor and
//! runs it against the raw body. It is only invoked for exchanges the
//! transport reported as successful; status classification lives in the
//! error translator. Malformed bodies are fatal for the invocation and are
//! never retried.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::descriptor::ResponseStrategy;
use crate::error::CloudError;

/// Terminal success value of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    /// Void operations: the body was discarded.
    Unit,
    /// "Absent, not failure": a recovering error strategy mapped the status
    /// to an empty result.
    Null,
    /// A decoded structured document (or subtree thereof).
    Json(Value),
}

impl DecodedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Deserialize into the operation's domain type. `Null` and `Unit`
    /// become `None`.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<Option<T>, CloudError> {
        match self {
            Self::Unit | Self::Null => Ok(None),
            Self::Json(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Unit | Self::Null => None,
        }
    }
}

/// Decodes a buffered response body into a structured value.
pub trait BodyDecoder: Send + Sync {
    fn decode(&self, body: &[u8]) -> Result<Value, CloudError>;

    /// Decode, then navigate to the named subtree. `key` is a dotted path.
    fn decode_subtree(&self, body: &[u8], key: &str) -> Result<Value, CloudError> {
        let mut value = self.decode(body)?;
        for segment in key.split('.') {
            value = match value {
                Value::Object(mut map) => map.remove(segment).ok_or_else(|| {
                    CloudError::Decode(format!("response has no '{segment}' key"))
                })?,
                other => {
                    return Err(CloudError::Decode(format!(
                        "cannot select '{segment}' from non-object value {other}"
                    )));
                }
            };
        }
        Ok(value)
    }
}

/// JSON decoder used unless a provider supplies its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl BodyDecoder for JsonDecoder {
    fn decode(&self, body: &[u8]) -> Result<Value, CloudError> {
        serde_json::from_slice(body).map_err(Into::into)
    }
}

/// Factory for per-response streaming decode sessions, registered by name
/// and referenced through [`ResponseStrategy::Handler`].
pub trait ResponseHandler: Send + Sync {
    fn start(&self) -> Box<dyn HandlerSession>;
}

/// One in-flight streaming decode. Fed the body in chunks, then finished.
pub trait HandlerSession: Send {
    fn push(&mut self, chunk: &[u8]) -> Result<(), CloudError>;

    fn finish(self: Box<Self>) -> Result<Value, CloudError>;
}

pub(crate) type HandlerSet = HashMap<String, Arc<dyn ResponseHandler>>;

const HANDLER_CHUNK: usize = 8 * 1024;

/// Run the declared decoding strategy against a success-status body.
pub(crate) fn dispatch(
    strategy: &ResponseStrategy,
    body: &[u8],
    decoder: &dyn BodyDecoder,
    handlers: &HandlerSet,
) -> Result<DecodedValue, CloudError> {
    match strategy {
        ResponseStrategy::Void => Ok(DecodedValue::Unit),
        ResponseStrategy::Document => decoder.decode(body).map(DecodedValue::Json),
        ResponseStrategy::Subtree(key) => {
            decoder.decode_subtree(body, key).map(DecodedValue::Json)
        }
        ResponseStrategy::Handler(id) => {
            let handler = handlers.get(id).ok_or_else(|| {
                CloudError::construction(format!("unknown response handler '{id}'"))
            })?;
            let mut session = handler.start();
            for chunk in body.chunks(HANDLER_CHUNK) {
                session.push(chunk)?;
            }
            session.finish().map(DecodedValue::Json)
        }
    }
}
