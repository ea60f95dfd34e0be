//! # JSON-RPC 2.0 routing and dispatch
//!
//! A transport-agnostic JSON-RPC 2.0 request dispatcher built around a
//! namespaced, path-keyed handler registry. The crate parses request objects
//! (single or batched) out of a decoded body, validates them against the
//! protocol grammar, resolves each to a registered handler and assembles
//! spec-compliant responses — or suppresses them for notifications.
//!
//! ## Features
//! - Full JSON-RPC 2.0 request/response/error compliance
//! - Transport agnostic: callers hand in a route path and a body string
//! - Nested `route`/`namespace` registration with a frozen, lock-free registry
//! - Per-request error containment with batch isolation
//! - Async handler invocation via trait objects

pub mod r#async;
pub mod dispatch;
pub mod error;
pub mod request;
pub mod response;
pub mod router;
pub mod types;

// Re-export main types
pub use dispatch::{Payload, parse_payload};
pub use error::{ErrorCode, ErrorObject, ErrorResponse};
pub use r#async::{
    CallContext, DispatchOutcome, Dispatcher, Exposure, HandlerEntry, HandlerError, RpcHandler,
};
pub use request::{Params, Request};
pub use response::{Message, Response};
pub use router::{IntoNamespace, Router, RouterBuilder};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
