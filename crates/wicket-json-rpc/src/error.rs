use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{JsonRpcVersion, RequestId};

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
}

impl ErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::ServerError(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ServerError(_) => "Server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Error member of a JSON-RPC error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn new(code: ErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError, None, None)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(ErrorCode::InvalidRequest, None, data)
    }

    /// Protocol version mismatch; same code as Invalid Request with the
    /// message the validator reports.
    pub fn invalid_version() -> Self {
        Self::new(
            ErrorCode::InvalidRequest,
            Some("Invalid jsonrpc version".to_string()),
            None,
        )
    }

    pub fn method_not_found() -> Self {
        Self::new(ErrorCode::MethodNotFound, None, None)
    }

    pub fn invalid_params() -> Self {
        Self::new(ErrorCode::InvalidParams, None, None)
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::new(ErrorCode::InternalError, None, data)
    }

    pub fn server_error(code: i64, message: &str, data: Option<Value>) -> Self {
        assert!(
            (-32099..=-32000).contains(&code),
            "Server error code must be in range -32099 to -32000"
        );
        Self::new(
            ErrorCode::ServerError(code),
            Some(message.to_string()),
            data,
        )
    }
}

/// JSON-RPC error response
///
/// The `id` member is always serialized; a null id is a legitimate value on
/// error envelopes (parse errors, unclassifiable payloads).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: ErrorObject,
    pub id: RequestId,
}

impl ErrorResponse {
    pub fn new(id: RequestId, error: ErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(RequestId::Null, ErrorObject::parse_error())
    }

    pub fn invalid_request(id: RequestId) -> Self {
        Self::new(id, ErrorObject::invalid_request(None))
    }

    pub fn method_not_found(id: RequestId) -> Self {
        Self::new(id, ErrorObject::method_not_found())
    }

    pub fn internal_error(id: RequestId, data: Option<Value>) -> Self {
        Self::new(id, ErrorObject::internal_error(data))
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for ErrorResponse {}
