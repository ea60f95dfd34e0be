//! # HTTP JSON-RPC server
//!
//! This crate embeds the `wicket-json-rpc` dispatcher in a hyper HTTP
//! server. The transport's whole job is to read POST bodies, hand them to
//! the dispatcher together with the request path, and write the dispatch
//! outcome back out — one envelope, a batch array, or nothing at all when an
//! exchange consisted only of notifications.
//!
//! ## Features
//! - hyper 1.x, one spawned task per connection
//! - Transport gates before dispatch: method, content type, body size, UTF-8
//! - JSON-RPC errors travel over HTTP 200; only the non-POST rejection and
//!   the transport gates use other status codes

pub mod handler;
pub mod server;

#[cfg(test)]
mod tests;

// Re-export main types
pub use handler::HttpRpcHandler;
pub use server::{RpcServer, RpcServerBuilder, ServerConfig};

// Re-export foundational types
pub use wicket_json_rpc::{
    CallContext, DispatchOutcome, Dispatcher, Exposure, HandlerEntry, HandlerError, Params, Router,
    RouterBuilder, RpcHandler,
};

/// Result type for HTTP RPC operations
pub type Result<T> = std::result::Result<T, HttpRpcError>;

/// HTTP transport specific errors
#[derive(Debug, thiserror::Error)]
pub enum HttpRpcError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
