//! HTTP request handler bridging hyper exchanges to the dispatcher

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{ALLOW, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use tracing::{debug, error, warn};

use wicket_json_rpc::{DispatchOutcome, Dispatcher};

use crate::{Result, server::ServerConfig};

/// Fixed body for the non-POST rejection: a transport-level error with no id
/// and no standard code, deliberately not a JSON-RPC envelope.
const INVALID_VERB_BODY: &str = r#"{"code":-1,"message":"Invalid HTTP verb"}"#;

/// Serves one HTTP exchange by running the dispatcher over the request body.
///
/// Generic over the request body type so tests can drive it with
/// `Full<Bytes>` instead of a live connection's `Incoming`.
#[derive(Clone)]
pub struct HttpRpcHandler {
    pub(crate) config: ServerConfig,
    pub(crate) dispatcher: Arc<Dispatcher>,
}

impl HttpRpcHandler {
    pub fn new(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Handle one HTTP exchange.
    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>>
    where
        B: http_body::Body,
        B::Error: std::fmt::Display,
    {
        match req.method() {
            &Method::POST => self.handle_rpc(req).await,
            _ => self.method_not_allowed(),
        }
    }

    /// Handle a JSON-RPC exchange over HTTP POST
    async fn handle_rpc<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>>
    where
        B: http_body::Body,
        B::Error: std::fmt::Display,
    {
        // Check content type
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            warn!("Invalid content type: {}", content_type);
            return Ok(plain(
                StatusCode::BAD_REQUEST,
                "Content-Type must be application/json",
            ));
        }

        let path = req.uri().path().to_string();

        // Read request body
        let body_bytes = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return Ok(plain(StatusCode::BAD_REQUEST, "Failed to read request body"));
            }
        };

        // Check body size
        if body_bytes.len() > self.config.max_body_size {
            warn!("Request body too large: {} bytes", body_bytes.len());
            return Ok(plain(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
            ));
        }

        // Parse as UTF-8
        let body_str = match std::str::from_utf8(&body_bytes) {
            Ok(s) => s,
            Err(err) => {
                error!("Invalid UTF-8 in request body: {}", err);
                return Ok(plain(
                    StatusCode::BAD_REQUEST,
                    "Request body must be valid UTF-8",
                ));
            }
        };

        debug!("Received JSON-RPC request on {}: {}", path, body_str);

        // Every protocol-level outcome, error envelopes included, travels
        // over HTTP 200; an all-notification exchange writes no body at all.
        let response = match self.dispatcher.dispatch(&path, body_str).await {
            DispatchOutcome::Empty => json_response(Bytes::new()),
            DispatchOutcome::Single(message) => {
                json_response(Bytes::from(serde_json::to_string(&message)?))
            }
            DispatchOutcome::Batch(messages) => {
                json_response(Bytes::from(serde_json::to_string(&messages)?))
            }
        };
        Ok(response)
    }

    /// Reject any method other than POST
    fn method_not_allowed(&self) -> Result<Response<Full<Bytes>>> {
        Ok(Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header(ALLOW, "POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(INVALID_VERB_BODY)))
            .unwrap())
    }
}

fn json_response(body: Bytes) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(body))
        .unwrap()
}

fn plain(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(message)))
        .unwrap()
}
