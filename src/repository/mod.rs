use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        Application, Event, EventSummary, NewEvent, NewUser, NewVolunteer, ProfilePatch,
        SeedReport, User, UserCredentials, VolunteerProfile,
    },
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract every handler works against. Domain rule
/// violations (duplicate email, full event, duplicate application, unknown
/// event) come back as the matching `AppError` variant so both
/// implementations reject the same inputs the same way.
///
/// Multi-row writes are atomic: an `Err` means nothing was written.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn find_user(&self, id: i32) -> AppResult<Option<User>>;
    // Expects an already-normalized email.
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>>;
    // Creates the volunteer account and its profile together.
    // Fails with Conflict("Email already registered") on a taken email.
    async fn register_volunteer(&self, volunteer: NewVolunteer) -> AppResult<User>;

    // --- Events ---
    // Ordered by date, then id. `viewer` drives the `applied` flag.
    async fn list_events(&self, viewer: Option<i32>) -> AppResult<Vec<EventSummary>>;
    async fn create_event(&self, event: NewEvent) -> AppResult<Event>;
    // Removes the event and every application referencing it.
    async fn delete_event(&self, id: i32) -> AppResult<()>;

    // --- Volunteer Profiles ---
    async fn list_volunteer_profiles(&self) -> AppResult<Vec<VolunteerProfile>>;
    // Creates the profile when missing; only `Some` fields overwrite.
    async fn upsert_volunteer_profile(
        &self,
        user_id: i32,
        patch: ProfilePatch,
    ) -> AppResult<VolunteerProfile>;

    // --- Applications ---
    async fn list_applications(&self, user_id: i32) -> AppResult<Vec<Application>>;
    /// Capacity and duplicate checks happen atomically with the insert, so
    /// concurrent applications cannot overbook an event.
    async fn apply_to_event(&self, user_id: i32, event_id: i32) -> AppResult<Application>;

    // --- Bootstrap ---
    // Inserts `events` only when the table is empty and `admin` only when
    // its email is unused.
    async fn seed(&self, events: Vec<NewEvent>, admin: NewUser) -> AppResult<SeedReport>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

pub(crate) fn email_taken() -> AppError {
    AppError::Conflict("Email already registered".to_string())
}

pub(crate) fn event_not_found() -> AppError {
    AppError::NotFound("Event not found".to_string())
}

pub(crate) fn event_full() -> AppError {
    AppError::Conflict("Event full".to_string())
}

pub(crate) fn already_applied() -> AppError {
    AppError::Conflict("Already applied".to_string())
}
