use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Status written on every new application.
pub const APPLIED: &str = "applied";

// --- Identity ---

/// Role
///
/// The capability tag attached to every account. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Volunteer,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Volunteer => "volunteer",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    pub fn is_volunteer(self) -> bool {
        self == Role::Volunteer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "volunteer" => Ok(Role::Volunteer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User
///
/// Public view of an account from the `users` table. The credential column is
/// never part of this struct, so it cannot leak through serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// UserCredentials
///
/// Internal row used by login: the public view plus the stored Argon2 PHC string.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// NewUser
///
/// A validated, already-hashed account ready for insertion.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

// --- Volunteer Profiles ---

/// VolunteerProfile
///
/// A row of `volunteer_profiles` joined with its owner's name and email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct VolunteerProfile {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub skill: String,
    pub availability: String,
}

/// ProfilePatch
///
/// Partial update for `PUT /api/volunteers/me`. Absent (or null) fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
}

// --- Events ---

/// Event
///
/// A volunteering event from the `events` table. `slots` is the applicant capacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Event {
    pub id: i32,
    pub name: String,
    #[ts(type = "string")]
    pub date: NaiveDate,
    pub venue: String,
    pub category: String,
    pub slots: i32,
    pub tagline: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// EventSummary
///
/// An event as listed by `GET /api/events`: the base fields plus the live
/// applicant count, the remaining capacity and whether the caller has applied.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: Event,
    pub applicants: i32,
    pub slots_left: i32,
    pub applied: bool,
}

impl EventSummary {
    /// Builds the summary; `slots_left` is clamped at zero so a shrunk
    /// capacity never reports negative space.
    pub fn new(event: Event, applicants: i32, applied: bool) -> Self {
        let slots_left = (event.slots - applicants).max(0);
        Self {
            event,
            applicants,
            slots_left,
            applied,
        }
    }
}

/// NewEvent
///
/// A validated event ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub date: NaiveDate,
    pub venue: String,
    pub category: String,
    pub slots: i32,
    pub tagline: String,
}

/// LooseInt
///
/// Integer input that also accepts numeric strings, as HTML forms submit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(untagged)]
#[ts(export)]
pub enum LooseInt {
    Number(i64),
    Text(String),
}

impl LooseInt {
    pub fn to_i32(&self) -> Option<i32> {
        match self {
            LooseInt::Number(n) => i32::try_from(*n).ok(),
            LooseInt::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// CreateEventRequest
///
/// Input payload for `POST /api/events`. Every field is required and must be
/// truthy; see `validate`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    #[schema(example = "2026-03-12")]
    pub date: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub slots: Option<LooseInt>,
    #[serde(default)]
    pub tagline: Option<String>,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

impl CreateEventRequest {
    /// validate
    ///
    /// Rejects the payload with "Missing fields" when any field is absent,
    /// blank, or (for `slots`) zero. Malformed slots and dates are reported
    /// separately.
    pub fn validate(self) -> AppResult<NewEvent> {
        let missing = || AppError::Validation("Missing fields".to_string());

        let name = present(self.name).ok_or_else(missing)?;
        let date = present(self.date).ok_or_else(missing)?;
        let venue = present(self.venue).ok_or_else(missing)?;
        let category = present(self.category).ok_or_else(missing)?;
        let tagline = present(self.tagline).ok_or_else(missing)?;
        let slots = self.slots.ok_or_else(missing)?;

        if slots == LooseInt::Number(0) || matches!(&slots, LooseInt::Text(s) if s.trim().is_empty()) {
            return Err(missing());
        }
        let slots = slots
            .to_i32()
            .ok_or_else(|| AppError::Validation("slots must be an integer".to_string()))?;
        if slots <= 0 {
            return Err(AppError::Validation("slots must be a positive integer".to_string()));
        }

        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::Validation("date must be formatted YYYY-MM-DD".to_string()))?;

        Ok(NewEvent {
            name,
            date,
            venue,
            category,
            slots,
            tagline,
        })
    }
}

// --- Applications ---

/// Application
///
/// A row of `applications` annotated with the referenced event's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Application {
    pub id: i32,
    pub user_id: i32,
    pub event_id: i32,
    pub event_name: String,
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ApplyRequest
///
/// Input payload for `POST /api/applications`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ApplyRequest {
    #[serde(default)]
    pub event_id: Option<LooseInt>,
}

// --- Account Payloads ---

/// RegisterRequest
///
/// Input payload for `POST /api/register`. Registration always creates a volunteer.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub availability: Option<String>,
}

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Trims and lowercases an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// NewVolunteer
///
/// A validated registration: the account plus its initial profile fields.
#[derive(Debug, Clone)]
pub struct NewVolunteer {
    pub user: NewUser,
    pub skill: String,
    pub availability: String,
}

/// StatusResponse
///
/// The `{"status": ...}` acknowledgement used by health, logout, delete and seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
        }
    }
}

/// SeedReport
///
/// What a seed run actually inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub events_created: usize,
    pub admin_created: bool,
}
