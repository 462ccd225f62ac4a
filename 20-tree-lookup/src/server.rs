//! HTTP surface of a node.
//!
//! The handler owns wire framing only: it decodes the request, hands the key
//! to [`Node::resolve`] and turns the outcome into a JSON response. Every
//! failure is scoped to the request that caused it and reported with a
//! status code; the server keeps running.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Result, ensure};
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::client::ParentError;
use crate::node::{Node, ResolveError};
use crate::protocol::{ErrorResponse, LOOKUP_PATH, LookupResponse, RequestError, decode_request};

/// Builds the router serving lookups for `node`.
pub fn router(node: Arc<Node>) -> Router {
    Router::new()
        .route(LOOKUP_PATH, get(lookup))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

/// Serves lookups on `listener` until `shutdown` completes.
///
/// Refuses to start for a node whose store has not been seeded, so no request
/// can observe a partially initialized node.
pub async fn serve<F>(listener: TcpListener, node: Arc<Node>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    ensure!(
        node.is_initialized(),
        "node '{}' must be initialized before serving",
        node.name()
    );

    axum::serve(listener, router(node))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub async fn serve_until_ctrl_c(listener: TcpListener, node: Arc<Node>) -> Result<()> {
    serve(listener, node, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = ?err, "failed to install ctrl-c handler");
        }
        info!("shutting down");
    })
    .await
}

async fn lookup(
    State(node): State<Arc<Node>>,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Result<Json<LookupResponse>, LookupFailure> {
    let request = decode_request(&query, &body)?;
    let origin = if request.requester.is_empty() {
        "external"
    } else {
        request.requester.as_str()
    };
    info!(key = %request.key, origin, hops = request.hops, "lookup requested");

    let response = node
        .resolve(&request.key, request.hops)
        .await
        .inspect_err(|err| warn!(key = %request.key, origin, error = %err, "lookup failed"))?;

    info!(
        key = %request.key,
        origin,
        answering = %response.answering,
        value = %response.value,
        found = response.found,
        "responding"
    );
    Ok(Json(response))
}

#[derive(Debug)]
enum LookupFailure {
    Request(RequestError),
    Resolve(ResolveError),
}

impl From<RequestError> for LookupFailure {
    fn from(err: RequestError) -> Self {
        Self::Request(err)
    }
}

impl From<ResolveError> for LookupFailure {
    fn from(err: ResolveError) -> Self {
        Self::Resolve(err)
    }
}

impl LookupFailure {
    fn status(&self) -> StatusCode {
        match self {
            Self::Request(_) => StatusCode::BAD_REQUEST,
            Self::Resolve(ResolveError::Uninitialized) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Resolve(ResolveError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Resolve(ResolveError::HopLimit { .. }) => StatusCode::LOOP_DETECTED,
            Self::Resolve(ResolveError::Parent {
                source: ParentError::Timeout(_),
                ..
            }) => StatusCode::GATEWAY_TIMEOUT,
            Self::Resolve(ResolveError::Parent { .. }) => StatusCode::BAD_GATEWAY,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Request(err) => err.to_string(),
            Self::Resolve(err) => err.to_string(),
        }
    }
}

impl IntoResponse for LookupFailure {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
