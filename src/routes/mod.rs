//! Router Module Index
//!
//! One router per resource. Access control is not a layer here: each handler
//! names the identity it needs (`CurrentIdentity`, `AuthUser`, `AdminUser`)
//! and the extractor rejects the request before the handler runs.

use axum::{
    Router,
    routing::{get, post},
};

use crate::{AppState, handlers};

/// Sign-up, sign-in and the session's identity.
pub mod account;

/// Event catalogue and its admin management.
pub mod events;

/// Volunteer profiles.
pub mod volunteers;

/// Event applications.
pub mod applications;

/// api_routes
///
/// Every JSON endpoint, relative to the `/api` prefix.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe, no database access.
        .route("/health", get(handlers::health))
        // POST /seed
        // Loads the demo events and the bootstrap admin. Idempotent.
        .route("/seed", post(handlers::seed))
        .merge(account::account_routes())
        .merge(events::event_routes())
        .merge(volunteers::volunteer_routes())
        .merge(applications::application_routes())
}
