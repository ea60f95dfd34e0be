//! HTTP server embedding the JSON-RPC dispatcher
//!
//! The registry is built before the listener starts and frozen into the
//! dispatcher; request handling only ever reads it.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use wicket_json_rpc::{Dispatcher, Router};

use crate::Result;
use crate::handler::HttpRpcHandler;

/// Configuration for the HTTP RPC server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Maximum request body size
    pub max_body_size: usize,
    /// Widen Internal error envelopes with handler failure detail. Leave off
    /// wherever clients are untrusted.
    pub diagnostics: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".parse().unwrap(),
            max_body_size: 1024 * 1024, // 1MB
            diagnostics: false,
        }
    }
}

/// Builder for the HTTP RPC server
pub struct RpcServerBuilder {
    config: ServerConfig,
    router: Router,
}

impl RpcServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            router: Router::builder().build(),
        }
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Enable or disable diagnostic mode
    pub fn diagnostics(mut self, enable: bool) -> Self {
        self.config.diagnostics = enable;
        self
    }

    /// Install the frozen routing table
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Build the HTTP RPC server
    pub fn build(self) -> RpcServer {
        let dispatcher =
            Arc::new(Dispatcher::new(Arc::new(self.router)).diagnostics(self.config.diagnostics));
        let handler = HttpRpcHandler::new(self.config.clone(), dispatcher);
        RpcServer {
            config: self.config,
            handler,
        }
    }
}

impl Default for RpcServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP server serving a frozen routing table
#[derive(Clone)]
pub struct RpcServer {
    config: ServerConfig,
    handler: HttpRpcHandler,
}

impl RpcServer {
    pub fn builder() -> RpcServerBuilder {
        RpcServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the accept loop. Each connection is served on its own task; the
    /// shared dispatcher state is read-only, so no synchronization happens
    /// per request.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        info!("JSON-RPC server listening on {}", self.config.bind_address);

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| serve_exchange(req, handler.clone()));

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    // Filter out common client disconnection errors that
                    // aren't actual problems
                    let err_str = err.to_string();
                    if err_str.contains("connection closed before message completed") {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}

async fn serve_exchange(
    req: Request<hyper::body::Incoming>,
    handler: HttpRpcHandler,
) -> Result<Response<Full<Bytes>>> {
    handler.handle(req).await
}
