use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use crate::r#async::HandlerEntry;

const ROOT_PATH: &str = "/";
const ROOT_NAMESPACE: &str = "";

/// Default namespace separator used when none is configured.
pub const DEFAULT_SEPARATOR: &str = ".";

/// Argument accepted by [`RouterBuilder::namespace`]: a single name or an
/// ordered list of names.
pub trait IntoNamespace {
    fn into_components(self) -> Vec<String>;
}

impl IntoNamespace for &str {
    fn into_components(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl IntoNamespace for String {
    fn into_components(self) -> Vec<String> {
        vec![self]
    }
}

impl IntoNamespace for &[&str] {
    fn into_components(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl<const N: usize> IntoNamespace for [&str; N] {
    fn into_components(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl IntoNamespace for Vec<String> {
    fn into_components(self) -> Vec<String> {
        self
    }
}

/// Mutable registration context for building a [`Router`].
///
/// `route` and `namespace` nest arbitrarily: each appends to the current
/// context for the duration of its build closure and restores the previous
/// value on every exit path, so hierarchical registration needs no tree
/// structure. All registration happens before `build`; the frozen router is
/// the only thing request handling ever sees.
#[derive(Debug)]
pub struct RouterBuilder {
    separator: String,
    path: String,
    namespace: String,
    routes: HashMap<String, HashMap<String, Vec<HandlerEntry>>>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_SEPARATOR)
    }

    /// The separator is used both when composing nested namespaces and when
    /// splitting inbound `namespace.method` strings.
    pub fn with_separator(separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "namespace separator must be non-empty");
        Self {
            separator,
            path: ROOT_PATH.to_string(),
            namespace: ROOT_NAMESPACE.to_string(),
            routes: HashMap::new(),
        }
    }

    /// Append a path segment for the duration of `build`. Surrounding
    /// slashes and whitespace are stripped; an empty segment is a no-op.
    pub fn route<F>(&mut self, path: &str, build: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let saved_path = self.path.clone();
        let saved_namespace = self.namespace.clone();

        let segment = sanitize_path(path);
        if !segment.is_empty() {
            if self.path != ROOT_PATH {
                self.path.push('/');
            }
            self.path.push_str(&segment);
        }

        self.scoped(saved_path, saved_namespace, build)
    }

    /// Append one or more namespace components for the duration of `build`.
    /// Each component is stripped of surrounding separator occurrences; an
    /// empty result leaves the namespace context unchanged.
    pub fn namespace<N, F>(&mut self, namespace: N, build: F) -> &mut Self
    where
        N: IntoNamespace,
        F: FnOnce(&mut Self),
    {
        let saved_path = self.path.clone();
        let saved_namespace = self.namespace.clone();

        let joined = self.sanitize_namespace(namespace);
        if !joined.is_empty() {
            if self.namespace == ROOT_NAMESPACE {
                self.namespace = joined;
            } else {
                self.namespace = format!("{}{}{}", self.namespace, self.separator, joined);
            }
        }

        self.scoped(saved_path, saved_namespace, build)
    }

    /// Register `entry` under the current `(path, namespace)` key. The same
    /// handler instance is never registered twice at one key.
    pub fn expose(&mut self, entry: HandlerEntry) -> &mut Self {
        let handlers = self
            .routes
            .entry(self.path.clone())
            .or_default()
            .entry(self.namespace.clone())
            .or_default();
        if !handlers.iter().any(|existing| existing.same_handler(&entry)) {
            handlers.push(entry);
        }
        self
    }

    /// Register `entry` under a one-shot `route`/`namespace` nesting of the
    /// current context.
    pub fn expose_at<N>(&mut self, entry: HandlerEntry, route: &str, namespace: N) -> &mut Self
    where
        N: IntoNamespace,
    {
        self.route(route, |r| {
            r.namespace(namespace, |r| {
                r.expose(entry);
            });
        })
    }

    /// Freeze the registry. The result is immutable and safe for
    /// unsynchronized concurrent reads.
    pub fn build(self) -> Router {
        Router {
            separator: self.separator,
            routes: self.routes,
        }
    }

    /// Run `build` and restore the previous context on every exit path,
    /// including an unwinding panic.
    fn scoped<F>(&mut self, saved_path: String, saved_namespace: String, build: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let outcome = catch_unwind(AssertUnwindSafe(|| build(&mut *self)));
        self.path = saved_path;
        self.namespace = saved_namespace;
        if let Err(panic) = outcome {
            resume_unwind(panic);
        }
        self
    }

    fn sanitize_namespace<N: IntoNamespace>(&self, namespace: N) -> String {
        let separator = self.separator.as_str();
        namespace
            .into_components()
            .iter()
            .map(|component| {
                component
                    .trim_start_matches(separator)
                    .trim_end_matches(separator)
            })
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize_path(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

/// Immutable routing table mapping `(path, namespace)` keys to ordered lists
/// of handler entries.
///
/// Built once at startup via [`RouterBuilder`] and read-only thereafter;
/// share it behind an `Arc` across however many exchanges run concurrently.
#[derive(Debug)]
pub struct Router {
    separator: String,
    routes: HashMap<String, HashMap<String, Vec<HandlerEntry>>>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Split `namespaced_method` on its last separator, look up the handler
    /// list registered at `(path, namespace)`, and return the first entry in
    /// insertion order that exposes the bare method name, together with that
    /// name. `path` is normalized to start with the path separator; a
    /// missing key behaves as an empty list.
    pub fn resolve<'a>(
        &'a self,
        path: &str,
        namespaced_method: &'a str,
    ) -> (Option<&'a HandlerEntry>, &'a str) {
        let (namespace, method) = self.split_namespaced_method(namespaced_method);
        let entry = self
            .handlers_at(path, namespace)
            .iter()
            .find(|entry| entry.exposes(method));
        (entry, method)
    }

    fn split_namespaced_method<'a>(&self, namespaced_method: &'a str) -> (&'a str, &'a str) {
        let trimmed = namespaced_method.trim_end_matches(self.separator.as_str());
        match trimmed.rsplit_once(self.separator.as_str()) {
            Some((namespace, method)) => (namespace, method),
            None => (ROOT_NAMESPACE, trimmed),
        }
    }

    fn handlers_at(&self, path: &str, namespace: &str) -> &[HandlerEntry] {
        let namespaces = if path.starts_with('/') {
            self.routes.get(path)
        } else {
            self.routes.get(&format!("/{}", path))
        };
        namespaces
            .and_then(|handlers| handlers.get(namespace))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r#async::{CallContext, HandlerError, RpcHandler};
    use crate::request::Params;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct NamedHandler {
        name: &'static str,
        methods: Vec<String>,
    }

    impl NamedHandler {
        fn new(name: &'static str, methods: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                name,
                methods: methods.iter().map(|m| m.to_string()).collect(),
            })
        }
    }

    #[async_trait]
    impl RpcHandler for NamedHandler {
        fn methods(&self) -> Vec<String> {
            self.methods.clone()
        }

        async fn handle(
            &self,
            _method: &str,
            _params: Option<Params>,
            _cx: CallContext,
        ) -> Result<Value, HandlerError> {
            Ok(json!(self.name))
        }
    }

    fn resolves_to(router: &Router, path: &str, namespaced: &str, expected: &Arc<NamedHandler>) {
        let (entry, _) = router.resolve(path, namespaced);
        let resolved = entry.unwrap_or_else(|| panic!("no handler for {}", namespaced));
        assert!(
            resolved.same_handler(&HandlerEntry::all(expected.clone())),
            "wrong handler for {}",
            namespaced
        );
    }

    #[test]
    fn test_resolve_returns_first_exposing_handler() {
        let first = NamedHandler::new("first", &["ping"]);
        let second = NamedHandler::new("second", &["ping", "pong"]);

        let mut builder = RouterBuilder::new();
        builder.route("rpc", |r| {
            r.namespace("sys", |r| {
                r.expose(HandlerEntry::all(first.clone()));
                r.expose(HandlerEntry::all(second.clone()));
            });
        });
        let router = builder.build();

        let (_, method) = router.resolve("/rpc", "sys.ping");
        assert_eq!(method, "ping");
        resolves_to(&router, "/rpc", "sys.ping", &first);

        // A method only the second handler exposes skips past the first.
        resolves_to(&router, "/rpc", "sys.pong", &second);
    }

    #[test]
    fn test_resolve_misses() {
        let handler = NamedHandler::new("h", &["ping"]);
        let mut builder = RouterBuilder::new();
        builder.expose_at(HandlerEntry::all(handler), "rpc", "sys");
        let router = builder.build();

        assert!(router.resolve("/rpc", "sys.other").0.is_none());
        assert!(router.resolve("/rpc", "net.ping").0.is_none());
        assert!(router.resolve("/elsewhere", "sys.ping").0.is_none());
        assert!(router.resolve("/rpc", "ping").0.is_none());
    }

    #[test]
    fn test_resolve_normalizes_path() {
        let handler = NamedHandler::new("h", &["ping"]);
        let mut builder = RouterBuilder::new();
        builder.expose_at(HandlerEntry::all(handler), "rpc", "");
        let router = builder.build();

        assert!(router.resolve("rpc", "ping").0.is_some());
        assert!(router.resolve("/rpc", "ping").0.is_some());
    }

    #[test]
    fn test_expose_is_idempotent_per_key() {
        let handler = NamedHandler::new("h", &["ping"]);
        let mut builder = RouterBuilder::new();
        builder.expose(HandlerEntry::all(handler.clone()));
        builder.expose(HandlerEntry::all(handler.clone()));
        // A different instance of the same type is a different identity.
        let other = NamedHandler::new("h", &["ping"]);
        builder.expose(HandlerEntry::all(other));
        let router = builder.build();

        assert_eq!(router.handlers_at("/", "").len(), 2);
    }

    #[test]
    fn test_nested_routes_and_namespaces() {
        let deep = NamedHandler::new("deep", &["status"]);
        let shallow = NamedHandler::new("shallow", &["status"]);

        let mut builder = RouterBuilder::new();
        builder.route("api", |r| {
            r.expose(HandlerEntry::all(shallow));
            r.route("v2", |r| {
                r.namespace(["sys", "net"], |r| {
                    r.expose(HandlerEntry::all(deep));
                });
            });
        });
        let router = builder.build();

        assert!(router.resolve("/api", "status").0.is_some());
        assert!(router.resolve("/api/v2", "sys.net.status").0.is_some());
        assert!(router.resolve("/api/v2", "sys.status").0.is_none());
    }

    #[test]
    fn test_context_is_restored_after_each_block() {
        let a = NamedHandler::new("a", &["m"]);
        let b = NamedHandler::new("b", &["m"]);

        let mut builder = RouterBuilder::new();
        builder.route("outer", |r| {
            r.namespace("ns", |r| {
                r.route("inner", |r| {
                    r.expose(HandlerEntry::all(a));
                });
            });
            // Back at /outer with no namespace.
            r.expose(HandlerEntry::all(b));
        });
        let router = builder.build();

        assert!(router.resolve("/outer/inner", "ns.m").0.is_some());
        assert!(router.resolve("/outer", "m").0.is_some());
        assert!(router.resolve("/outer/inner", "m").0.is_none());
    }

    #[test]
    fn test_context_is_restored_after_panic() {
        let handler = NamedHandler::new("h", &["m"]);
        let mut builder = RouterBuilder::new();

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            builder.route("doomed", |r| {
                r.namespace("deep", |_| panic!("registration failed"));
            });
        }));
        assert!(panicked.is_err());

        // The builder is back at the root context.
        builder.expose(HandlerEntry::all(handler));
        let router = builder.build();
        assert!(router.resolve("/", "m").0.is_some());
        assert!(router.resolve("/doomed", "deep.m").0.is_none());
    }

    #[test]
    fn test_sanitization() {
        let handler = NamedHandler::new("h", &["m"]);
        let mut builder = RouterBuilder::new();
        builder.route("  /messy/ ", |r| {
            r.namespace(".sys.", |r| {
                r.expose(HandlerEntry::all(handler));
            });
        });
        let router = builder.build();

        assert!(router.resolve("/messy", "sys.m").0.is_some());
    }

    #[test]
    fn test_empty_segments_are_no_ops() {
        let handler = NamedHandler::new("h", &["m"]);
        let mut builder = RouterBuilder::new();
        builder.route("", |r| {
            r.namespace("", |r| {
                r.expose(HandlerEntry::all(handler));
            });
        });
        let router = builder.build();

        assert!(router.resolve("/", "m").0.is_some());
    }

    #[test]
    fn test_custom_separator() {
        let handler = NamedHandler::new("h", &["m"]);
        let mut builder = RouterBuilder::with_separator("::");
        builder.route("rpc", |r| {
            r.namespace(["sys", "net"], |r| {
                r.expose(HandlerEntry::all(handler));
            });
        });
        let router = builder.build();

        assert!(router.resolve("/rpc", "sys::net::m").0.is_some());
        assert!(router.resolve("/rpc", "sys.net.m").0.is_none());
    }

    #[test]
    fn test_trailing_separator_is_ignored() {
        let handler = NamedHandler::new("h", &["m"]);
        let mut builder = RouterBuilder::new();
        builder.expose_at(HandlerEntry::all(handler), "rpc", "sys");
        let router = builder.build();

        let (entry, method) = router.resolve("/rpc", "sys.m.");
        assert!(entry.is_some());
        assert_eq!(method, "m");
    }

    #[test]
    #[should_panic(expected = "separator must be non-empty")]
    fn test_empty_separator_is_rejected() {
        RouterBuilder::with_separator("");
    }
}
