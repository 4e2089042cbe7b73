//! API routes

pub mod credits;
pub mod health;
pub mod invoices;
pub mod notifications;
pub mod reports;
pub mod users;

#[cfg(test)]
mod tests;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    auth::require_auth,
    error::{ApiError, ApiResult},
    security::security_headers_middleware,
    state::AppState,
};

/// Parse a path id. Malformed ids are reported like missing rows.
pub(crate) fn parse_id<T: From<Uuid>>(raw: &str, resource: &'static str) -> ApiResult<T> {
    Uuid::parse_str(raw)
        .map(T::from)
        .map_err(|_| ApiError::NotFound(resource))
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Everything under /api requires a bearer token
    let protected_api_routes = Router::new()
        // Invoices
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/invoices/:id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        // Credits
        .route("/credits", get(credits::get_balance))
        .route("/credits/add", post(credits::add_credits))
        // AI reports
        .route("/ai/report", post(reports::generate_report))
        .route("/ai/reports", get(reports::list_reports))
        .route("/ai/reports/:id", get(reports::get_report))
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/:id/read", patch(notifications::mark_read))
        // Account
        .route("/auth/user", get(users::current_user))
        .route("/user/settings", patch(users::update_settings))
        .layer(middleware::from_fn_with_state(auth_state, require_auth));

    let mut router = Router::new()
        .merge(health_routes)
        .nest("/api", protected_api_routes)
        .layer(DefaultBodyLimit::max(state.config.max_request_body_bytes))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_layer(&state.config.cors_allowed_origins) {
        router = router.layer(cors);
    }

    router.with_state(state)
}

/// CORS for the configured browser origins; `None` when none are configured
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}
