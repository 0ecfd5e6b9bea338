use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Event Router Module
///
/// Listing is public and personalised when a session is present. Creating
/// and deleting require the admin role.
pub fn event_routes() -> Router<AppState> {
    Router::new()
        // GET /events  (public)
        // POST /events (admin)
        .route(
            "/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        // DELETE /events/{id}
        // Cascades to the event's applications.
        .route("/events/{id}", delete(handlers::delete_event))
}
