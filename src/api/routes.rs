use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers::{
    generate_report, get_report, health_check, list_reports, overview, region_stats,
    sales_timeline, top_customers, top_products, AppState,
};
use super::ws::refresh_socket;

/// Router serving everything under `/api`.
///
/// With `allowed_origin` unset (or unparsable) any origin may call the API.
pub fn create_api_router(state: Arc<AppState>, allowed_origin: Option<&str>) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/analytics/overview", get(overview))
        .route("/analytics/products/top", get(top_products))
        .route("/analytics/customers/top", get(top_customers))
        .route("/analytics/regions", get(region_stats))
        .route("/analytics/timeline", get(sales_timeline))
        .route("/analytics/generate-report", post(generate_report))
        .route("/reports", get(list_reports))
        .route("/reports/{id}", get(get_report))
        .route("/ws", get(refresh_socket))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origin))
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let Some(origin) = allowed_origin else {
        return CorsLayer::permissive();
    };

    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any),
        Err(_) => {
            warn!(origin, "CLIENT_URL is not a valid origin, allowing any origin");
            CorsLayer::permissive()
        }
    }
}
