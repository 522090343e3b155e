//! Route configuration and setup

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
pub fn setup_routes(state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/events", get(handlers::events::list_events))
        .route("/events/{event_id}", get(handlers::events::get_event))
        .route("/recent_products", get(handlers::products::recent_products))
        .fallback(handlers::not_found)
        .layer(setup_cors())
        .layer(middleware::from_fn(default_allow_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin may read; the request `Origin` is echoed back.
fn setup_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}

/// Requests without an `Origin` header get `Access-Control-Allow-Origin: *`.
async fn default_allow_origin(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .entry(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .or_insert(HeaderValue::from_static("*"));
    response
}
