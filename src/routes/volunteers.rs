use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

pub fn volunteer_routes() -> Router<AppState> {
    Router::new()
        // GET /volunteers (admin)
        .route("/volunteers", get(handlers::list_volunteers))
        // PUT /volunteers/me (volunteer)
        // Partial update; absent fields are kept.
        .route("/volunteers/me", put(handlers::update_my_profile))
}
