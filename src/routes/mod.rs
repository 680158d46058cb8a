//! Router assembly: HTTP endpoints, origin allow-list, CORS, panic catching and HTTP tracing.

use std::{any::Any, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{header::ORIGIN, request::Parts, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, warn, Level};

use crate::error::GENERATION_FAILED_MESSAGE;
use crate::protocol::{ErrorOut, MessageOut};
use crate::state::AppState;

pub mod http;

pub const ORIGIN_REJECTED_MESSAGE: &str = "Origem não permitida.";

/// Build the application router with:
/// - `GET /healthcheck`
/// - `GET /ai-powered-flashcards`
/// - origin guard: absent `Origin` passes, allow-listed hostnames pass, the rest get 403
/// - CORS headers echoed for allow-listed origins
/// - panics turned into the generic 500 body
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors_state = state.clone();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
            origin.to_str().map(|o| cors_state.origin_allowed(o)).unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/healthcheck", get(http::http_healthcheck))
        .route("/ai-powered-flashcards", get(http::http_get_flashcards))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(middleware::from_fn_with_state(state.clone(), origin_guard))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

/// Reject requests from origins outside the allow-list before any handler runs.
async fn origin_guard(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let Some(origin) = req.headers().get(ORIGIN).cloned() else {
        return next.run(req).await;
    };
    let allowed = origin.to_str().map(|o| state.origin_allowed(o)).unwrap_or(false);
    if allowed {
        return next.run(req).await;
    }
    warn!(target: "flashcards", origin = ?origin, path = %req.uri().path(), "Rejected request from disallowed origin");
    (StatusCode::FORBIDDEN, Json(MessageOut { message: ORIGIN_REJECTED_MESSAGE.into() })).into_response()
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(target: "flashcards", error = %detail, "Unexpected server side error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorOut { message: GENERATION_FAILED_MESSAGE.into(), error: detail }),
    )
        .into_response()
}
