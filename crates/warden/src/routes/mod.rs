//! HTTP route handlers for Warden.

use axum::{Router, middleware, routing::get};
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::gate::require_verification;
use crate::state::AppState;

mod challenge;
mod health;
mod lookup;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // Everything in here sits behind the gate
    let gated = Router::new()
        .route("/", get(lookup::index))
        .route("/lookup/{name}", get(lookup::lookup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_verification,
        ));

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))

        // Challenge widget support
        .route("/challenge", get(challenge::challenge_status))

        .merge(gated)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())

        // Add shared state
        .with_state(state)
}
