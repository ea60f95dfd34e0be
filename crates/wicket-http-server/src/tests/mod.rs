//! Test modules for the wicket-http-server crate


use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, Response};
use serde_json::{Value, json};

use wicket_json_rpc::{
    CallContext, Dispatcher, HandlerEntry, HandlerError, Params, RouterBuilder, RpcHandler,
};

use crate::handler::HttpRpcHandler;
use crate::server::ServerConfig;

/// Handler registered at path `/rpc`, namespace `sys` for every suite here.
struct SysHandler;

#[async_trait]
impl RpcHandler for SysHandler {
    fn methods(&self) -> Vec<String> {
        vec!["ping".to_string(), "add".to_string(), "boom".to_string()]
    }

    async fn handle(
        &self,
        method: &str,
        params: Option<Params>,
        _cx: CallContext,
    ) -> Result<Value, HandlerError> {
        match method {
            "ping" => Ok(json!("pong")),
            "add" => {
                let (a, b) = match params {
                    Some(Params::Positional(ref items)) => (
                        items.first().and_then(Value::as_i64).unwrap_or(0),
                        items.get(1).and_then(Value::as_i64).unwrap_or(0),
                    ),
                    Some(Params::Named(ref map)) => (
                        map.get("a").and_then(Value::as_i64).unwrap_or(0),
                        map.get("b").and_then(Value::as_i64).unwrap_or(0),
                    ),
                    None => (0, 0),
                };
                Ok(json!(a + b))
            }
            "boom" => Err(HandlerError::other(std::io::Error::other("boom"))),
            other => Err(HandlerError::other(format!("unexpected method {}", other))),
        }
    }
}

fn test_handler() -> HttpRpcHandler {
    test_handler_with(ServerConfig::default())
}

fn test_handler_with(config: ServerConfig) -> HttpRpcHandler {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut builder = RouterBuilder::new();
    builder.route("rpc", |r| {
        r.namespace("sys", |r| {
            r.expose(HandlerEntry::all(Arc::new(SysHandler)));
        });
    });

    let dispatcher =
        Arc::new(Dispatcher::new(Arc::new(builder.build())).diagnostics(config.diagnostics));
    HttpRpcHandler::new(config, dispatcher)
}

fn post(path: &str, body: impl Into<Bytes>) -> Request<Full<Bytes>> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header("content-type", "application/json")
        .body(Full::new(body.into()))
        .unwrap()
}

async fn body_of(response: Response<Full<Bytes>>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

async fn json_body_of(response: Response<Full<Bytes>>) -> Value {
    serde_json::from_slice(&body_of(response).await).unwrap()
}
