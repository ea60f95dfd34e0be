use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use crate::dispatch::{Payload, parse_payload};
use crate::error::{ErrorObject, ErrorResponse};
use crate::request::{Params, Request};
use crate::response::{Message, Response};
use crate::router::Router;
use crate::types::RequestId;

/// Per-call context handed to handlers alongside method and params, so
/// handler code can introspect the call it is serving.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Route path the call arrived on.
    pub path: String,
    /// The caller's id; `None` for notifications.
    pub id: Option<RequestId>,
}

/// Failure raised by a handler method.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// A structured protocol error, forwarded to the client verbatim.
    #[error("JSON-RPC error {}: {}", .0.code, .0.message)]
    Rpc(ErrorObject),

    /// A business failure; collapsed to Internal error outside diagnostic
    /// mode so internals never leak onto the wire.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        HandlerError::Other(err.into())
    }
}

impl From<ErrorObject> for HandlerError {
    fn from(error: ErrorObject) -> Self {
        HandlerError::Rpc(error)
    }
}

/// Trait for types that serve JSON-RPC method calls.
///
/// Handlers are stateless shared objects; everything specific to one call
/// travels through the arguments. The params shape is decided at parse time
/// ([`Params`]) and pattern-matched here: named params arrive as one map,
/// positional params as an ordered list, an absent member as `None`.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    /// Every method this handler implements. Exposure may narrow this set at
    /// registration, never widen it.
    fn methods(&self) -> Vec<String>;

    /// Serve one call of `method` (the bare name, namespace already
    /// stripped).
    async fn handle(
        &self,
        method: &str,
        params: Option<Params>,
        cx: CallContext,
    ) -> Result<Value, HandlerError>;
}

/// Which of a handler's declared methods are callable over the wire.
#[derive(Debug, Clone)]
pub enum Exposure {
    /// Every declared method.
    All,
    /// An explicit allow-list; every name must be declared by the handler.
    Only(Vec<String>),
}

/// A registered handler plus its exposed-method set.
///
/// The set is computed once at registration and cached; `exposes` never
/// re-derives it per call.
#[derive(Clone)]
pub struct HandlerEntry {
    handler: Arc<dyn RpcHandler>,
    exposed: Vec<String>,
}

impl HandlerEntry {
    pub fn new(handler: Arc<dyn RpcHandler>, exposure: Exposure) -> Self {
        let declared = handler.methods();
        let exposed = match exposure {
            Exposure::All => declared,
            Exposure::Only(names) => {
                for name in &names {
                    assert!(
                        declared.contains(name),
                        "cannot expose undeclared method '{}'",
                        name
                    );
                }
                names
            }
        };
        Self { handler, exposed }
    }

    /// Expose every declared method.
    pub fn all(handler: Arc<dyn RpcHandler>) -> Self {
        Self::new(handler, Exposure::All)
    }

    /// Expose only the named methods.
    pub fn only<I, S>(handler: Arc<dyn RpcHandler>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        Self::new(handler, Exposure::Only(names))
    }

    /// Whether `method` is callable through this entry.
    pub fn exposes(&self, method: &str) -> bool {
        self.exposed.iter().any(|exposed| exposed == method)
    }

    pub fn exposed_methods(&self) -> &[String] {
        &self.exposed
    }

    pub fn handler(&self) -> &Arc<dyn RpcHandler> {
        &self.handler
    }

    /// Identity comparison used for registration de-duplication.
    pub(crate) fn same_handler(&self, other: &HandlerEntry) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("exposed", &self.exposed)
            .finish_non_exhaustive()
    }
}

/// Result of dispatching one HTTP body.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Nothing to write: all notifications, or an empty batch.
    Empty,
    Single(Message),
    Batch(Vec<Message>),
}

impl DispatchOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, DispatchOutcome::Empty)
    }
}

/// JSON-RPC dispatcher over a frozen [`Router`].
///
/// One `dispatch` call covers a whole HTTP exchange: decode the body, fan out
/// over single/batch, resolve each request against the registry, invoke, and
/// fold results and failures into response envelopes. Stateless apart from
/// the shared read-only router, so a single instance serves concurrent
/// exchanges.
pub struct Dispatcher {
    router: Arc<Router>,
    diagnostics: bool,
}

impl Dispatcher {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            diagnostics: false,
        }
    }

    /// Diagnostic mode widens Internal error envelopes with the source
    /// error's display string. Off by default; never enable it where clients
    /// are untrusted.
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Run one decoded HTTP body through parse → validate → route → invoke.
    pub async fn dispatch(&self, path: &str, body: &str) -> DispatchOutcome {
        let payload = match parse_payload(body) {
            Ok(payload) => payload,
            Err(err) => return DispatchOutcome::Single(Message::Error(err)),
        };

        match payload {
            Payload::Single(value) => match self.process_one(path, &value).await {
                Some(message) => DispatchOutcome::Single(message),
                None => DispatchOutcome::Empty,
            },
            Payload::Batch(values) => {
                // Elements are processed independently in input order; one
                // bad element never prevents its siblings from executing.
                let mut responses = Vec::new();
                for value in &values {
                    if let Some(message) = self.process_one(path, value).await {
                        responses.push(message);
                    }
                }
                if responses.is_empty() {
                    DispatchOutcome::Empty
                } else {
                    DispatchOutcome::Batch(responses)
                }
            }
        }
    }

    async fn process_one(&self, path: &str, raw: &Value) -> Option<Message> {
        let Some(object) = raw.as_object() else {
            // Notification status cannot be determined from a non-object
            // payload, so this error is always reported.
            return Some(Message::Error(ErrorResponse::invalid_request(
                RequestId::Null,
            )));
        };
        let is_notification = !object.contains_key("id");

        let request = match Request::from_object(object) {
            Ok(request) => request,
            Err(err) => return (!is_notification).then(|| Message::Error(err)),
        };

        let Request {
            method: namespaced_method,
            params,
            id,
        } = request;
        let response_id = id.clone().unwrap_or(RequestId::Null);

        let (entry, method) = self.router.resolve(path, &namespaced_method);
        let Some(entry) = entry else {
            debug!(path, method = %namespaced_method, "no handler exposes method");
            return (!is_notification)
                .then(|| Message::Error(ErrorResponse::method_not_found(response_id)));
        };

        let cx = CallContext {
            path: path.to_string(),
            id,
        };
        match entry.handler().handle(method, params, cx).await {
            Ok(result) => {
                (!is_notification).then(|| Message::Response(Response::new(response_id, result)))
            }
            Err(err) => {
                let response = self.contain(err, response_id);
                (!is_notification).then(|| Message::Error(response))
            }
        }
    }

    /// Fold an invocation failure into the fixed error taxonomy. Structured
    /// protocol errors pass through verbatim in every mode.
    fn contain(&self, err: HandlerError, id: RequestId) -> ErrorResponse {
        match err {
            HandlerError::Rpc(object) => ErrorResponse::new(id, object),
            HandlerError::Other(source) => {
                error!("handler failed: {}", source);
                let data = self
                    .diagnostics
                    .then(|| Value::String(source.to_string()));
                ErrorResponse::internal_error(id, data)
            }
        }
    }
}
