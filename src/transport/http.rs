use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::net::TcpListener;

use crate::relay::{Message, Relay};
use crate::transport::message::{PublishRequest, SinceQuery, parse_since};
use crate::utils::error::{RelayError, Result};

/// Builds a router with every relay mounted at `/<relay name>`.
pub fn build_router(relays: impl IntoIterator<Item = Relay>) -> Router {
    relays
        .into_iter()
        .fold(Router::new(), |router, relay| router.merge(relay_routes(relay)))
}

fn relay_routes(relay: Relay) -> Router {
    let base = format!("/{}", relay.name());
    Router::new()
        .route(&base, get(fetch).post(publish).delete(clear))
        .route(&format!("{base}/{{since}}"), get(fetch_since))
        .with_state(relay)
}

/// `GET /<name>?since=<ms>`
async fn fetch(State(relay): State<Relay>, Query(query): Query<SinceQuery>) -> Result<Response> {
    let since = parse_since(query.since.as_deref())?;
    batch_response(relay.fetch(since).await)
}

/// `GET /<name>/<ms>`; the path cursor wins over a query cursor.
async fn fetch_since(
    State(relay): State<Relay>,
    Path(since): Path<String>,
    Query(query): Query<SinceQuery>,
) -> Result<Response> {
    let since = match parse_since(Some(&since))? {
        Some(cursor) => Some(cursor),
        None => parse_since(query.since.as_deref())?,
    };
    batch_response(relay.fetch(since).await)
}

/// `POST /<name>`
async fn publish(State(relay): State<Relay>, body: Bytes) -> Result<Response> {
    let request = PublishRequest::from_slice(&body)?;
    relay.publish(request.message, request.kind, request.session_start);
    Ok((
        StatusCode::CREATED,
        [("content-type", "text/plain"), ("connection", "close")],
    )
        .into_response())
}

/// `DELETE /<name>`
async fn clear(State(relay): State<Relay>) -> Response {
    relay.clear();
    (StatusCode::NO_CONTENT, [("connection", "close")]).into_response()
}

fn batch_response(batch: Vec<Message>) -> Result<Response> {
    let body = serde_json::to_string(&batch)?;
    Ok((
        StatusCode::OK,
        [("content-type", "text/plain"), ("connection", "close")],
        body,
    )
        .into_response())
}

/// Binds `addr` and serves the relays until the server fails.
pub async fn start_http_server(addr: &str, relays: Vec<Relay>) -> Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(RelayError::Bind)?;
    serve(listener, relays).await
}

/// Serves the relays on an already bound listener.
pub async fn serve(listener: TcpListener, relays: Vec<Relay>) -> Result<()> {
    let addr = listener.local_addr().map_err(RelayError::Bind)?;
    let channels = relays
        .iter()
        .map(Relay::name)
        .collect::<Vec<_>>()
        .join(",");
    tracing::info!(%addr, %channels, "long-poll relay listening");

    axum::serve(listener, build_router(relays))
        .await
        .map_err(RelayError::Serve)
}
