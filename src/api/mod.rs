use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod handlers;

/// Build the public router: Slack webhooks, OAuth redirect, landing page.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/healthz", get(|| async { "ok" }))
        .route("/slack", post(handlers::slack_events))
        .route("/slash", post(handlers::slash_command))
        .route("/oauth", get(handlers::oauth_callback))
        .fallback(fallback_404)
        .with_state(state)
        // Slack payloads are small; anything bigger is not from Slack.
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(req: Request, next: Next) -> Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = axum::http::HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}
