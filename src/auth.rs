use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;

use crate::{
    error::{AppError, AppResult},
    models::User,
    repository::RepositoryState,
};

// Session key holding the signed-in user's id.
const SESSION_USER_ID: &str = "auth:user_id";

/// AuthSession
///
/// Typed access to the identity stored in the server-side session, so the
/// key and value type live in exactly one place.
pub struct AuthSession<'a> {
    session: &'a Session,
}

impl<'a> AuthSession<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Binds `user_id` to a freshly issued session id. Cycling the id on
    /// every sign-in keeps a pre-login cookie from being promoted.
    pub async fn sign_in(&self, user_id: i32) -> AppResult<()> {
        self.session.cycle_id().await?;
        self.session.insert(SESSION_USER_ID, user_id).await?;
        Ok(())
    }

    pub async fn user_id(&self) -> AppResult<Option<i32>> {
        Ok(self.session.get::<i32>(SESSION_USER_ID).await?)
    }

    /// Drops the session and its cookie. Safe to call without a session.
    pub async fn sign_out(&self) -> AppResult<()> {
        self.session.flush().await?;
        Ok(())
    }
}

/// CurrentIdentity
///
/// The identity resolved for this request, if any. A session pointing at a
/// user that no longer exists resolves to `None`.
#[derive(Debug, Clone, Default)]
pub struct CurrentIdentity(pub Option<User>);

impl CurrentIdentity {
    pub fn user_id(&self) -> Option<i32> {
        self.0.as_ref().map(|user| user.id)
    }
}

/// AuthUser
///
/// A request that passed `require_authenticated`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

/// AdminUser
///
/// A request that passed `require_admin`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

/// Fails with Unauthorized unless an identity resolved.
pub fn require_authenticated(identity: CurrentIdentity) -> AppResult<User> {
    identity.0.ok_or(AppError::Unauthorized)
}

/// Fails with Unauthorized without an identity, Forbidden for non-admins.
pub fn require_admin(identity: CurrentIdentity) -> AppResult<User> {
    let user = require_authenticated(identity)?;
    if !user.role.is_admin() {
        tracing::warn!(user_id = user.id, role = %user.role, "admin capability denied");
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

/// Fails with Forbidden unless the user acts as a volunteer.
pub fn require_volunteer(user: &User) -> AppResult<()> {
    if !user.role.is_volunteer() {
        tracing::debug!(user_id = user.id, role = %user.role, "volunteer capability denied");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// CurrentIdentity Extractor
///
/// Reads the user id from the session and loads the account through the
/// repository. Never rejects for a missing identity; only session or
/// database failures turn into errors.
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;

        let Some(user_id) = AuthSession::new(&session).user_id().await? else {
            return Ok(CurrentIdentity(None));
        };

        let repo = RepositoryState::from_ref(state);
        let user = repo.find_user(user_id).await?;
        if user.is_none() {
            tracing::debug!(user_id, "session refers to a missing user");
        }
        Ok(CurrentIdentity(user))
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = CurrentIdentity::from_request_parts(parts, state).await?;
        require_authenticated(identity).map(AuthUser)
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = CurrentIdentity::from_request_parts(parts, state).await?;
        require_admin(identity).map(AdminUser)
    }
}
