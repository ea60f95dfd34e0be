use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorResponse;
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: Value,
    pub id: RequestId,
}

impl Response {
    pub fn new(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }
}

/// Union type representing either a successful response or an error response.
/// Keeps the `result` and `error` members mutually exclusive, as JSON-RPC 2.0
/// requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    /// Successful response with a result member
    Response(Response),
    /// Error response with an error member
    Error(ErrorResponse),
}

impl Message {
    /// Create a success message
    pub fn success(id: RequestId, result: Value) -> Self {
        Message::Response(Response::new(id, result))
    }

    /// Create an error message
    pub fn error(error: ErrorResponse) -> Self {
        Message::Error(error)
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, Message::Error(_))
    }

    /// The id echoed on the envelope
    pub fn id(&self) -> &RequestId {
        match self {
            Message::Response(response) => &response.id,
            Message::Error(error) => &error.id,
        }
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

impl From<ErrorResponse> for Message {
    fn from(error: ErrorResponse) -> Self {
        Message::Error(error)
    }
}
