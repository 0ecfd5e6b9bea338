use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        // POST /register
        // Creates a volunteer account and signs it in.
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        // GET /me
        // The signed-in user, or `null`.
        .route("/me", get(handlers::me))
}
