use crate::{
    AppState,
    auth::{AdminUser, AuthSession, AuthUser, CurrentIdentity, require_volunteer},
    error::{AppError, AppResult, ErrorBody},
    extract::{ApiJson, ApiPath},
    models::{
        Application, ApplyRequest, CreateEventRequest, Event, EventSummary, LoginRequest,
        NewUser, NewVolunteer, ProfilePatch, RegisterRequest, Role, StatusResponse, User,
        VolunteerProfile, normalize_email,
    },
    password::{hash_password, verify_password},
};
use axum::{Json, extract::State};
use tower_sessions::Session;

pub const ACCOUNT_TAG: &str = "account";
pub const EVENT_TAG: &str = "events";
pub const VOLUNTEER_TAG: &str = "volunteers";
pub const APPLICATION_TAG: &str = "applications";

// --- Health ---

/// health
///
/// [Public Route] Liveness check. Touches neither the database nor the session.
#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = StatusResponse))
)]
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::new("ok"))
}

// --- Accounts ---

/// register
///
/// [Public Route] Creates a volunteer account with its profile and signs it in.
/// The role is always `volunteer`; administrators only come from the seed routine.
#[utoipa::path(
    post,
    path = "/api/register",
    tag = ACCOUNT_TAG,
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered and signed in", body = User),
        (status = 400, description = "Missing fields or email already registered", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<Json<User>> {
    let name = payload.name.unwrap_or_default().trim().to_string();
    let email = normalize_email(&payload.email.unwrap_or_default());
    let password = payload.password.unwrap_or_default();
    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }

    let volunteer = NewVolunteer {
        user: NewUser {
            name,
            email,
            password_hash: hash_password(password).await?,
            role: Role::Volunteer,
        },
        skill: payload.skill.unwrap_or_default().trim().to_string(),
        availability: payload.availability.unwrap_or_default().trim().to_string(),
    };

    let user = state.repo.register_volunteer(volunteer).await?;
    AuthSession::new(&session).sign_in(user.id).await?;

    tracing::info!(user_id = user.id, "volunteer registered");
    Ok(Json(user))
}

/// login
///
/// [Public Route] Verifies the credentials and binds the account to the session.
/// Unknown emails and wrong passwords are indistinguishable to the client.
#[utoipa::path(
    post,
    path = "/api/login",
    tag = ACCOUNT_TAG,
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = User),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<Json<User>> {
    let email = normalize_email(&payload.email.unwrap_or_default());
    let password = payload.password.unwrap_or_default();

    let Some(creds) = state.repo.find_user_by_email(&email).await? else {
        tracing::debug!("login for unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(password, creds.password_hash).await? {
        tracing::debug!(user_id = creds.user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    AuthSession::new(&session).sign_in(creds.user.id).await?;
    tracing::info!(user_id = creds.user.id, "user signed in");
    Ok(Json(creds.user))
}

/// logout
///
/// [Public Route] Ends the session. Succeeds whether or not one existed.
#[utoipa::path(
    post,
    path = "/api/logout",
    tag = ACCOUNT_TAG,
    responses((status = 200, description = "Signed out", body = StatusResponse))
)]
pub async fn logout(session: Session) -> AppResult<Json<StatusResponse>> {
    AuthSession::new(&session).sign_out().await?;
    Ok(Json(StatusResponse::new("ok")))
}

/// me
///
/// [Public Route] The signed-in account, or `null` for anonymous callers.
#[utoipa::path(
    get,
    path = "/api/me",
    tag = ACCOUNT_TAG,
    responses((status = 200, description = "Current user, or null when signed out", body = User))
)]
pub async fn me(CurrentIdentity(user): CurrentIdentity) -> Json<Option<User>> {
    Json(user)
}

// --- Events ---

/// list_events
///
/// [Public Route] Every event by ascending date, with applicant counts,
/// remaining slots and whether the caller has already applied.
#[utoipa::path(
    get,
    path = "/api/events",
    tag = EVENT_TAG,
    responses((status = 200, description = "All events", body = [EventSummary]))
)]
pub async fn list_events(
    identity: CurrentIdentity,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<EventSummary>>> {
    let events = state.repo.list_events(identity.user_id()).await?;
    Ok(Json(events))
}

/// create_event
///
/// [Admin Route] Publishes a new event.
#[utoipa::path(
    post,
    path = "/api/events",
    tag = EVENT_TAG,
    request_body = CreateEventRequest,
    responses(
        (status = 200, description = "Created", body = Event),
        (status = 400, description = "Missing or malformed fields", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn create_event(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateEventRequest>,
) -> AppResult<Json<Event>> {
    let event = state.repo.create_event(payload.validate()?).await?;
    tracing::info!(event_id = event.id, admin_id = admin.id, slots = event.slots, "event created");
    Ok(Json(event))
}

/// delete_event
///
/// [Admin Route] Removes an event together with all of its applications.
#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    tag = EVENT_TAG,
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Deleted", body = StatusResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not an administrator", body = ErrorBody),
        (status = 404, description = "No such event", body = ErrorBody)
    )
)]
pub async fn delete_event(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<StatusResponse>> {
    state.repo.delete_event(id).await?;
    tracing::info!(event_id = id, admin_id = admin.id, "event deleted");
    Ok(Json(StatusResponse::new("deleted")))
}

// --- Volunteer Profiles ---

/// list_volunteers
///
/// [Admin Route] Every volunteer profile with its owner's name and email.
#[utoipa::path(
    get,
    path = "/api/volunteers",
    tag = VOLUNTEER_TAG,
    responses(
        (status = 200, description = "All profiles", body = [VolunteerProfile]),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn list_volunteers(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<VolunteerProfile>>> {
    Ok(Json(state.repo.list_volunteer_profiles().await?))
}

/// update_my_profile
///
/// [Volunteer Route] Partially updates the caller's profile, creating it on
/// first use. Fields left out of the body keep their stored value.
#[utoipa::path(
    put,
    path = "/api/volunteers/me",
    tag = VOLUNTEER_TAG,
    request_body = ProfilePatch,
    responses(
        (status = 200, description = "Updated profile", body = VolunteerProfile),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not a volunteer", body = ErrorBody)
    )
)]
pub async fn update_my_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> AppResult<Json<VolunteerProfile>> {
    require_volunteer(&user)?;
    let profile = state.repo.upsert_volunteer_profile(user.id, patch).await?;
    Ok(Json(profile))
}

// --- Applications ---

/// list_my_applications
///
/// [Authenticated Route] The caller's applications, each with its event name.
#[utoipa::path(
    get,
    path = "/api/applications",
    tag = APPLICATION_TAG,
    responses(
        (status = 200, description = "My applications", body = [Application]),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn list_my_applications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Application>>> {
    Ok(Json(state.repo.list_applications(user.id).await?))
}

/// apply
///
/// [Volunteer Route] Applies the caller to an event. The repository rejects
/// unknown events, full events and repeat applications, in that order.
#[utoipa::path(
    post,
    path = "/api/applications",
    tag = APPLICATION_TAG,
    request_body = ApplyRequest,
    responses(
        (status = 200, description = "Applied", body = Application),
        (status = 400, description = "Missing event_id, event full or already applied", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not a volunteer", body = ErrorBody),
        (status = 404, description = "No such event", body = ErrorBody)
    )
)]
pub async fn apply(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ApplyRequest>,
) -> AppResult<Json<Application>> {
    require_volunteer(&user)?;

    let missing = || AppError::Validation("Missing event_id".to_string());
    let event_id = payload
        .event_id
        .and_then(|id| id.to_i32())
        .filter(|id| *id != 0)
        .ok_or_else(missing)?;

    let application = state.repo.apply_to_event(user.id, event_id).await?;
    tracing::info!(user_id = user.id, event_id, application_id = application.id, "applied to event");
    Ok(Json(application))
}

// --- Bootstrap ---

/// seed
///
/// [Admin Route] Loads the demo events and the bootstrap administrator.
/// Repeated calls change nothing.
#[utoipa::path(
    post,
    path = "/api/seed",
    tag = EVENT_TAG,
    responses(
        (status = 200, description = "Seeded", body = StatusResponse),
        (status = 401, description = "Not signed in", body = ErrorBody),
        (status = 403, description = "Not an administrator", body = ErrorBody)
    )
)]
pub async fn seed(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<Json<StatusResponse>> {
    crate::seed::run(state.repo.as_ref(), &state.config).await?;
    Ok(Json(StatusResponse::new("seeded")))
}
