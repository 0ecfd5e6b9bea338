use crate::{AppState, handlers};
use axum::{Router, routing::get};

pub fn application_routes() -> Router<AppState> {
    Router::new()
        // GET /applications  (any signed-in user)
        // POST /applications (volunteer)
        .route(
            "/applications",
            get(handlers::list_my_applications).post(handlers::apply),
        )
}
