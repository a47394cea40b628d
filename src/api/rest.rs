//! REST API for the timeline.
//!
//! Endpoints (trailing slash accepted on the collection):
//! - `GET /health`: health check
//! - `POST /events`: create an event
//! - `GET /events?start&end&cursor&pageSize&order`: range query
//! - `GET /events/{id}`: fetch one event
//! - `PUT /events/{id}`: replace `at` and `data`
//! - `PATCH /events/{id}`: update either field
//! - `DELETE /events/{id}`: remove an event

use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::ApiError;
use crate::config::ServerConfig;
use crate::model::{Event, EventId, EventPatch, Order, RangeQuery, RangeResult, RawInstant};
use crate::storage::EventStore;

/// Shared state for axum handlers.
type AppState = Arc<dyn EventStore>;

/// Start the REST server and run until `shutdown` resolves.
///
/// When the configured port is 0, the OS assigns an ephemeral port. The
/// actual bound address is always logged so it can be discovered.
pub async fn serve<F>(
    store: Arc<dyn EventStore>,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(store, &config.cors_origins);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "eventline REST API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(store: Arc<dyn EventStore>, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/events", get(list_events).post(create_event))
        .route("/events/", get(list_events).post(create_event))
        .route(
            "/events/{id}",
            get(get_event)
                .put(replace_event)
                .patch(patch_event)
                .delete(delete_event),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
struct EventBody {
    at: String,
    data: String,
}

#[derive(Deserialize)]
struct PatchBody {
    at: Option<String>,
    data: Option<String>,
}

/// Query string of a range request. Everything arrives as text so that
/// parse failures share the API's error body.
#[derive(Deserialize)]
struct RangeParams {
    start: Option<String>,
    end: Option<String>,
    cursor: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
    order: Option<String>,
}

impl RangeParams {
    fn into_query(self) -> Result<RangeQuery, ApiError> {
        let mut query = RangeQuery::new().cursor(self.cursor);

        if let Some(start) = self.start {
            query = query.start(parse_instant(&start)?);
        }
        if let Some(end) = self.end {
            query = query.end(parse_instant(&end)?);
        }
        if let Some(size) = self.page_size {
            let limit = size
                .parse::<usize>()
                .map_err(|_| ApiError::BadRequest(format!("invalid pageSize: {:?}", size)))?;
            query = query.limit(limit);
        }
        if let Some(order) = self.order {
            query = query.order(order.parse::<Order>()?);
        }

        Ok(query)
    }
}

fn parse_instant(raw: &str) -> Result<RawInstant, ApiError> {
    Ok(raw.parse::<RawInstant>()?)
}

fn parse_id(raw: &str) -> EventId {
    raw.parse().unwrap_or_else(|never| match never {})
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_event(
    State(store): State<AppState>,
    payload: Result<Json<EventBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let body = body(payload)?;
    let event = store.create(parse_instant(&body.at)?, body.data).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn list_events(
    State(store): State<AppState>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<RangeResult>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let result = store.range(params.into_query()?).await?;
    Ok(Json(result))
}

async fn get_event(
    State(store): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    Ok(Json(store.get(&parse_id(&id)).await?))
}

async fn replace_event(
    State(store): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EventBody>, JsonRejection>,
) -> Result<Json<Event>, ApiError> {
    let body = body(payload)?;
    let patch = EventPatch::new()
        .at(parse_instant(&body.at)?)
        .data(body.data);
    Ok(Json(store.update(&parse_id(&id), patch).await?))
}

async fn patch_event(
    State(store): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PatchBody>, JsonRejection>,
) -> Result<Json<Event>, ApiError> {
    let body = body(payload)?;
    let mut patch = EventPatch::new();
    if let Some(at) = body.at {
        patch = patch.at(parse_instant(&at)?);
    }
    if let Some(data) = body.data {
        patch = patch.data(data);
    }
    Ok(Json(store.update(&parse_id(&id), patch).await?))
}

async fn delete_event(
    State(store): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    store.delete(&parse_id(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
