use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ingest::{Coordinator, Health};
use search_core::{Error, Generation, Message};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const MAX_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub admin_token: Option<String>,
    pub query_timeout: Duration,
    /// Comma-separated origins; any origin when unset or empty.
    pub cors_allow_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { admin_token: None, query_timeout: Duration::from_secs(1), cors_allow_origin: None }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub admin_token: Option<String>,
    pub query_timeout: Duration,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}
fn default_page() -> usize { 1 }
fn default_limit() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse<'a> {
    pub total_matches: usize,
    pub page_number: usize,
    pub page_limit: usize,
    pub took_ms: f64,
    pub items: Vec<&'a Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn build_app(coordinator: Arc<Coordinator>, config: ServerConfig) -> Router {
    let state = AppState { coordinator, admin_token: config.admin_token, query_timeout: config.query_timeout };

    let cors = match config.cors_allow_origin.as_deref() {
        Some(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/search", get(search_handler))
        .route("/messages/:id", get(message_handler))
        .route("/admin/refresh", post(refresh_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn health_handler(State(state): State<AppState>) -> Json<Health> {
    Json(state.coordinator.health())
}

pub async fn search_handler(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Response {
    let start = Instant::now();
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            let err = Error::invalid(rejection.body_text());
            return search_failure(default_page(), default_limit(), start.elapsed(), err);
        }
    };
    let generation = state.coordinator.current();
    let outcome = validate(&params).and_then(|()| {
        let generation: &Generation = generation.as_deref().ok_or(Error::NotReady)?;
        generation.engine().search_within(&params.query, params.page, params.limit, state.query_timeout)
    });
    let took = start.elapsed();
    if took > Duration::from_millis(100) {
        tracing::warn!(query = %params.query, took_ms = took.as_millis() as u64, "slow search");
    }

    match outcome {
        Ok(result) => Json(SearchResponse {
            total_matches: result.total,
            page_number: params.page,
            page_limit: params.limit,
            took_ms: took.as_secs_f64() * 1000.0,
            items: result.items,
            error: None,
            message: None,
        })
        .into_response(),
        Err(err) => search_failure(params.page, params.limit, took, err),
    }
}

/// Empty result set carrying the error code, so callers can tell a failure from no matches.
fn search_failure(page: usize, limit: usize, took: Duration, err: Error) -> Response {
    let api = ApiError::from(err);
    let body = SearchResponse {
        total_matches: 0,
        page_number: page,
        page_limit: limit,
        took_ms: took.as_secs_f64() * 1000.0,
        items: Vec::new(),
        error: Some(api.code),
        message: Some(api.message),
    };
    (api.status, Json(body)).into_response()
}

pub async fn message_handler(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(generation) = state.coordinator.current() else {
        return ApiError::from(Error::NotReady).into_response();
    };
    match generation.get(&id) {
        Ok(msg) => Json(msg).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

async fn refresh_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let generation = state.coordinator.refresh().await?;
    Ok(Json(serde_json::json!({ "generation": generation.id(), "documents": generation.len() })))
}

fn validate(params: &SearchParams) -> search_core::Result<()> {
    if params.query.trim().is_empty() {
        return Err(Error::invalid("query must not be empty"));
    }
    if params.page < 1 {
        return Err(Error::invalid("page must be at least 1"));
    }
    if params.limit < 1 || params.limit > MAX_PAGE_LIMIT {
        return Err(Error::invalid(format!("limit must be between 1 and {MAX_PAGE_LIMIT}")));
    }
    Ok(())
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::unauthorized("ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::unauthorized("invalid admin token"))
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn unauthorized(message: &str) -> Self {
        Self { status: StatusCode::UNAUTHORIZED, code: "unauthorized", message: message.into() }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let (status, code) = match &err {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::NotReady => (StatusCode::SERVICE_UNAVAILABLE, "not_ready"),
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::RefreshInProgress => (StatusCode::CONFLICT, "refresh_in_progress"),
            Error::UpstreamUnavailable { .. } | Error::UpstreamRejected { .. } | Error::DuplicateDocument(_) => {
                (StatusCode::BAD_GATEWAY, "upstream")
            }
            Error::InternalInconsistency { .. } | Error::Build(_) => {
                tracing::error!(error = %err, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        Self { status, code, message: err.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.code, "message": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_statuses() {
        let cases = [
            (Error::NotFound("m9".into()), StatusCode::NOT_FOUND, "not_found"),
            (Error::NotReady, StatusCode::SERVICE_UNAVAILABLE, "not_ready"),
            (Error::Timeout(Duration::ZERO), StatusCode::GATEWAY_TIMEOUT, "timeout"),
            (Error::invalid("bad"), StatusCode::BAD_REQUEST, "invalid_request"),
            (Error::RefreshInProgress, StatusCode::CONFLICT, "refresh_in_progress"),
            (
                Error::UpstreamRejected { status: 403, message: "no".into() },
                StatusCode::BAD_GATEWAY,
                "upstream",
            ),
            (Error::DuplicateDocument("m1".into()), StatusCode::BAD_GATEWAY, "upstream"),
            (Error::InternalInconsistency { doc: 7 }, StatusCode::INTERNAL_SERVER_ERROR, "internal"),
            (Error::Build("panicked".into()), StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!((api.status, api.code), (status, code));
        }
    }
}
