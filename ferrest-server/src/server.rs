//! HTTP/1 connection layer.
//!
//! Accepts TCP connections, serves each on its own tokio task with hyper,
//! collects the request body, and hands a [`RequestContext`] to the
//! [`Dispatcher`]. Routing and encoding run synchronously inside the task.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use ferrest_core::{Dispatcher, Origin, RequestContext, ResponseEnvelope, Router};
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// State shared by every connection task. Read-only.
#[derive(Debug)]
struct Shared {
    dispatcher: Dispatcher,
    origin: Origin,
    max_body_bytes: usize,
    keep_alive: Option<Duration>,
}

/// A REST server serving one frozen route table.
#[derive(Debug, Clone)]
pub struct RestServer {
    shared: Arc<Shared>,
    listen_addr: String,
}

impl RestServer {
    /// Freezes `router` and prepares a server for `config`.
    #[must_use]
    pub fn new(router: Router, config: &ServerConfig) -> Self {
        let dispatcher = Dispatcher::new(router).with_debug(config.debug);
        Self {
            shared: Arc::new(Shared {
                dispatcher,
                origin: config.origin(),
                max_body_bytes: config.max_body_bytes,
                keep_alive: config.keep_alive(),
            }),
            listen_addr: config.listen_addr.clone(),
        }
    }

    /// The dispatcher requests are routed through.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    /// Binds the configured listen address.
    ///
    /// # Errors
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        TcpListener::bind(&self.listen_addr)
            .await
            .map_err(|source| ServerError::Bind { addr: self.listen_addr.clone(), source })
    }

    /// Serves connections from `listener` until the process ends.
    ///
    /// # Errors
    /// Returns [`ServerError::Io`] if the listener's local address cannot be read.
    pub async fn serve(self, listener: TcpListener) -> Result<(), ServerError> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serves connections until `shutdown` completes.
    ///
    /// Connections already accepted keep running on their own tasks.
    ///
    /// # Errors
    /// Returns [`ServerError::Io`] if the listener's local address cannot be read.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let local = listener.local_addr()?;
        tracing::info!(
            addr = %local,
            routes = self.shared.dispatcher.router().len(),
            debug = self.shared.dispatcher.debug(),
            "ferrest-server listening"
        );

        tokio::pin!(shutdown);
        loop {
            let (stream, peer) = tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(addr = %local, "shutdown requested, no longer accepting");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };

            let shared = Arc::clone(&self.shared);
            tokio::spawn(serve_connection(shared, stream, peer));
        }
        Ok(())
    }
}

async fn serve_connection(shared: Arc<Shared>, stream: TcpStream, peer: SocketAddr) {
    tracing::debug!(%peer, "connection accepted");
    let io = TokioIo::new(stream);

    let mut builder = http1::Builder::new();
    builder.timer(TokioTimer::new());
    match shared.keep_alive {
        Some(idle) => {
            builder.keep_alive(true).header_read_timeout(idle);
        }
        None => {
            builder.keep_alive(false);
        }
    }

    let service = {
        let shared = Arc::clone(&shared);
        service_fn(move |req: Request<Incoming>| {
            let shared = Arc::clone(&shared);
            async move { respond(&shared, req, peer).await }
        })
    };

    if let Err(e) = builder.serve_connection(io, service).await {
        tracing::debug!(%peer, error = %e, "connection closed with error");
    }
}

async fn respond(
    shared: &Shared,
    req: Request<Incoming>,
    peer: SocketAddr,
) -> Result<Response<Full<Bytes>>, ServerError> {
    let span = tracing::info_span!(
        "request",
        method = %req.method(),
        path = req.uri().path(),
        %peer,
        request_id = tracing::field::Empty,
    );

    async move {
        let started = Instant::now();
        let (parts, body) = req.into_parts();

        let bytes = match Limited::new(body, shared.max_body_bytes).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::info!(limit = shared.max_body_bytes, "request body too large");
                let envelope = ResponseEnvelope::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    json!({"error": "request body too large"}),
                );
                return Ok(envelope.into_response().map(Full::new));
            }
            Err(e) => {
                // The handler never runs for a request whose body did not arrive.
                tracing::debug!(error = %e, "aborting request, body read failed");
                return Err(ServerError::Body { peer, reason: e.to_string() });
            }
        };

        let ctx = RequestContext::from_parts(parts, bytes, &shared.origin);
        tracing::Span::current().record("request_id", tracing::field::display(ctx.request_id()));

        let envelope = shared.dispatcher.handle(&ctx);
        tracing::info!(
            status = envelope.status.as_u16(),
            elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "request completed"
        );
        Ok(envelope.into_response().map(Full::new))
    }
    .instrument(span)
    .await
}
