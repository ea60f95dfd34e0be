use serde_json::Value;
use tracing::debug;

use crate::error::ErrorResponse;

/// A decoded HTTP body: one request object or a batch of them.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(Value),
    Batch(Vec<Value>),
}

/// Decode a request body.
///
/// Malformed JSON maps to the Parse error envelope with a null id and
/// short-circuits the whole exchange, batch or not.
pub fn parse_payload(body: &str) -> Result<Payload, ErrorResponse> {
    let value: Value = serde_json::from_str(body).map_err(|err| {
        debug!("request body failed to decode: {}", err);
        ErrorResponse::parse_error()
    })?;

    Ok(match value {
        Value::Array(items) => Payload::Batch(items),
        other => Payload::Single(other),
    })
}
