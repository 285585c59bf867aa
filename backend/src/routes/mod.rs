//! Route definitions for the Quote Desk server

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - quote negotiation
        .nest("/quotes", quote_routes(state))
}

/// Quote routes (protected)
fn quote_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_quotes).post(handlers::create_quote))
        .route("/check-existing", get(handlers::check_existing))
        .route("/statistics", get(handlers::get_statistics))
        .route("/:quote_id", get(handlers::get_quote))
        .route("/:quote_id/issue", post(handlers::issue_quote))
        .route("/:quote_id/accept", post(handlers::accept_quote))
        .route("/:quote_id/reject", post(handlers::reject_quote))
        .route("/:quote_id/counter", post(handlers::counter_quote))
        .route("/:quote_id/cancel", post(handlers::cancel_quote))
        .route("/:quote_id/revise", post(handlers::revise_quote))
        .route("/:quote_id/extend", post(handlers::extend_validity))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
