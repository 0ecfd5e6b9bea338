use sqlx::PgPool;
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore, cookie::SameSite, session_store::ExpiredDeletion,
};
use tower_sessions_sqlx_store::PostgresStore;

use crate::{config::Env, error::AppResult};

// Session cookie carrying the server-side session id.
pub const SESSION_COOKIE: &str = "campus_session";

// How often expired session rows are purged.
const EXPIRED_SWEEP_INTERVAL: tokio::time::Duration = tokio::time::Duration::from_secs(60);

/// session_layer
///
/// Cookie settings shared by every store: SameSite=Lax, `Secure` only in
/// production, and a week of inactivity before expiry.
pub fn session_layer<Store>(store: Store, env: Env) -> SessionManagerLayer<Store>
where
    Store: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE)
        .with_same_site(SameSite::Lax)
        .with_secure(env == Env::Production)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(7)))
}

/// postgres_store
///
/// The production session store, kept in the application database so
/// sessions survive restarts. Creates its table on first use.
pub async fn postgres_store(pool: PgPool) -> AppResult<PostgresStore> {
    let store = PostgresStore::new(pool);
    store.migrate().await?;
    Ok(store)
}

/// Spawns the background sweep that deletes expired session rows.
pub fn spawn_expired_cleanup(store: PostgresStore) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = store.continuously_delete_expired(EXPIRED_SWEEP_INTERVAL).await {
            tracing::error!(error = %e, "expired session cleanup stopped");
        }
    })
}
