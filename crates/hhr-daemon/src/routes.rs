//! Axum router and all HTTP handlers for hhr-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Scenario tests in `tests/` compose the bare router.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use hhr_ingest::IngestAck;
use hhr_notify::Subscription;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    api_types::{ErrorResponse, HealthResponse, ListHandsQuery},
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/hands", get(list_hands).post(ingest_hand))
        .route("/v1/hands/recent", get(recent_hand))
        .route("/v1/hands/:id", get(get_hand))
        .route("/v1/hands/:id/replay", get(get_replay))
        .route("/v1/events", get(events))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/hands
// ---------------------------------------------------------------------------

/// 204 on store and on duplicate; 400 with the validation message; 500 when
/// the store fails. Error bodies are plain text.
pub(crate) async fn ingest_hand(State(st): State<Arc<AppState>>, body: Bytes) -> Response {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("malformed hand payload: {e}")).into_response()
        }
    };

    match st.gate.ingest(&payload).await {
        Ok(ack) => {
            match ack {
                IngestAck::Stored { hand_id } => info!(%hand_id, "hands/ingest stored"),
                IngestAck::Duplicate { hand_id } => debug!(%hand_id, "hands/ingest duplicate"),
            }
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) if e.is_client_error() => {
            info!(error = %e, "hands/ingest rejected");
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "hands/ingest failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// GET /v1/hands  /v1/hands/recent  /v1/hands/:id
// ---------------------------------------------------------------------------

pub(crate) async fn list_hands(
    State(st): State<Arc<AppState>>,
    Query(q): Query<ListHandsQuery>,
) -> Response {
    let page = q.page.unwrap_or(0);
    let page_size = st.config.api.page_size(q.page_size);
    match st.store.list_hands(page, page_size).await {
        Ok(hands) => (StatusCode::OK, Json(hands)).into_response(),
        Err(e) => store_failure("hands/list", e),
    }
}

pub(crate) async fn recent_hand(State(st): State<Arc<AppState>>) -> Response {
    match st.store.most_recent_hand().await {
        Ok(hand) => (StatusCode::OK, Json(hand)).into_response(),
        Err(e) => store_failure("hands/recent", e),
    }
}

pub(crate) async fn get_hand(State(st): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match st.store.fetch_hand(id).await {
        Ok(Some(hand)) => (StatusCode::OK, Json(hand)).into_response(),
        Ok(None) => hand_not_found(id),
        Err(e) => store_failure("hands/get", e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/hands/:id/replay
// ---------------------------------------------------------------------------

pub(crate) async fn get_replay(State(st): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match st.store.fetch_hand(id).await {
        Ok(Some(hand)) => {
            let timeline = hhr_replay::build_timeline(&hand);
            (StatusCode::OK, Json(timeline)).into_response()
        }
        Ok(None) => hand_not_found(id),
        Err(e) => store_failure("hands/replay", e),
    }
}

fn hand_not_found(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("hand {id} not found"),
        }),
    )
        .into_response()
}

fn store_failure(route: &'static str, e: anyhow::Error) -> Response {
    error!(route, error = %format!("{e:#}"), "store read failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{e:#}"),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/events  (SSE)
// ---------------------------------------------------------------------------

/// First event is always `{"type":"connected"}`. The subscription lives as
/// long as the response body; a client disconnect drops it and unsubscribes.
pub(crate) async fn events(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    let sub = st.broadcaster.subscribe();
    debug!(subscriber = sub.id(), "events stream opened");
    let keepalive = KeepAlive::new().interval(st.keepalive_interval());

    (headers, Sse::new(subscription_to_sse(sub)).keep_alive(keepalive)).into_response()
}

fn subscription_to_sse(sub: Subscription) -> impl Stream<Item = Result<Event, axum::Error>> {
    sub.map(|n| Event::default().json_data(n))
}
