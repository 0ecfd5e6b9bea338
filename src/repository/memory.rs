use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use super::{Repository, already_applied, email_taken, event_full, event_not_found};
use crate::{
    error::{AppError, AppResult},
    models::{
        APPLIED, Application, Event, EventSummary, NewEvent, NewUser, NewVolunteer, ProfilePatch,
        SeedReport, User, UserCredentials, VolunteerProfile,
    },
};

struct ProfileRow {
    id: i32,
    user_id: i32,
    skill: String,
    availability: String,
}

struct ApplicationRow {
    id: i32,
    user_id: i32,
    event_id: i32,
    status: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, UserCredentials>,
    profiles: BTreeMap<i32, ProfileRow>,
    events: BTreeMap<i32, Event>,
    applications: BTreeMap<i32, ApplicationRow>,
    last_id: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn email_in_use(&self, email: &str) -> bool {
        self.users.values().any(|creds| creds.user.email == email)
    }

    fn insert_user(&mut self, new: NewUser) -> User {
        let user = User {
            id: self.next_id(),
            name: new.name,
            email: new.email,
            role: new.role,
        };
        self.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        user
    }

    fn insert_event(&mut self, new: NewEvent) -> Event {
        let event = Event {
            id: self.next_id(),
            name: new.name,
            date: new.date,
            venue: new.venue,
            category: new.category,
            slots: new.slots,
            tagline: new.tagline,
            created_at: Utc::now(),
        };
        self.events.insert(event.id, event.clone());
        event
    }

    fn profile_view(&self, row: &ProfileRow) -> VolunteerProfile {
        let owner = self.users.get(&row.user_id).map(|creds| &creds.user);
        VolunteerProfile {
            id: row.id,
            user_id: row.user_id,
            name: owner.map(|u| u.name.clone()).unwrap_or_default(),
            email: owner.map(|u| u.email.clone()).unwrap_or_default(),
            skill: row.skill.clone(),
            availability: row.availability.clone(),
        }
    }

    fn application_view(&self, row: &ApplicationRow) -> Application {
        Application {
            id: row.id,
            user_id: row.user_id,
            event_id: row.event_id,
            event_name: self
                .events
                .get(&row.event_id)
                .map(|e| e.name.clone())
                .unwrap_or_default(),
            status: row.status.clone(),
            created_at: row.created_at,
        }
    }
}

/// MemoryRepository
///
/// An in-process `Repository` with the same rules as the Postgres one. Every
/// operation runs under a single lock, which makes each of them atomic. Used
/// by the test suites and for running the API without a database.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Internal("memory repository lock poisoned".to_string()))
    }

    /// Inserts an account with an arbitrary role. Test fixtures use this to
    /// create administrators without going through the seed routine.
    pub fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables()?;
        if tables.email_in_use(&user.email) {
            return Err(email_taken());
        }
        Ok(tables.insert_user(user))
    }

    /// Total application rows across all users and events.
    pub fn application_count(&self) -> AppResult<usize> {
        Ok(self.tables()?.applications.len())
    }

    pub fn user_count(&self) -> AppResult<usize> {
        Ok(self.tables()?.users.len())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).map(|creds| creds.user.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|creds| creds.user.email == email)
            .cloned())
    }

    async fn register_volunteer(&self, volunteer: NewVolunteer) -> AppResult<User> {
        let mut tables = self.tables()?;
        if tables.email_in_use(&volunteer.user.email) {
            return Err(email_taken());
        }

        let user = tables.insert_user(volunteer.user);
        let id = tables.next_id();
        tables.profiles.insert(
            id,
            ProfileRow {
                id,
                user_id: user.id,
                skill: volunteer.skill,
                availability: volunteer.availability,
            },
        );
        Ok(user)
    }

    async fn list_events(&self, viewer: Option<i32>) -> AppResult<Vec<EventSummary>> {
        let tables = self.tables()?;
        let mut events: Vec<&Event> = tables.events.values().collect();
        events.sort_by_key(|e| (e.date, e.id));

        Ok(events
            .into_iter()
            .map(|event| {
                let mut applicants = 0;
                let mut applied = false;
                for row in tables.applications.values().filter(|a| a.event_id == event.id) {
                    applicants += 1;
                    applied |= Some(row.user_id) == viewer;
                }
                EventSummary::new(event.clone(), applicants, applied)
            })
            .collect())
    }

    async fn create_event(&self, event: NewEvent) -> AppResult<Event> {
        Ok(self.tables()?.insert_event(event))
    }

    async fn delete_event(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables()?;
        if tables.events.remove(&id).is_none() {
            return Err(event_not_found());
        }
        tables.applications.retain(|_, a| a.event_id != id);
        Ok(())
    }

    async fn list_volunteer_profiles(&self) -> AppResult<Vec<VolunteerProfile>> {
        let tables = self.tables()?;
        Ok(tables
            .profiles
            .values()
            .map(|row| tables.profile_view(row))
            .collect())
    }

    async fn upsert_volunteer_profile(
        &self,
        user_id: i32,
        patch: ProfilePatch,
    ) -> AppResult<VolunteerProfile> {
        let mut tables = self.tables()?;

        let existing = tables
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .map(|p| p.id);
        let id = match existing {
            Some(id) => id,
            None => {
                let id = tables.next_id();
                tables.profiles.insert(
                    id,
                    ProfileRow {
                        id,
                        user_id,
                        skill: String::new(),
                        availability: String::new(),
                    },
                );
                id
            }
        };

        let Some(row) = tables.profiles.get_mut(&id) else {
            return Err(AppError::Internal(format!("profile {id} vanished")));
        };
        if let Some(skill) = patch.skill {
            row.skill = skill;
        }
        if let Some(availability) = patch.availability {
            row.availability = availability;
        }

        let row = &tables.profiles[&id];
        Ok(tables.profile_view(row))
    }

    async fn list_applications(&self, user_id: i32) -> AppResult<Vec<Application>> {
        let tables = self.tables()?;
        Ok(tables
            .applications
            .values()
            .filter(|a| a.user_id == user_id)
            .map(|row| tables.application_view(row))
            .collect())
    }

    async fn apply_to_event(&self, user_id: i32, event_id: i32) -> AppResult<Application> {
        let mut tables = self.tables()?;

        let Some(event) = tables.events.get(&event_id) else {
            return Err(event_not_found());
        };
        let slots = event.slots;

        let applicants = tables
            .applications
            .values()
            .filter(|a| a.event_id == event_id)
            .count();
        if applicants >= usize::try_from(slots).unwrap_or(0) {
            return Err(event_full());
        }
        if tables
            .applications
            .values()
            .any(|a| a.event_id == event_id && a.user_id == user_id)
        {
            return Err(already_applied());
        }

        let id = tables.next_id();
        let row = ApplicationRow {
            id,
            user_id,
            event_id,
            status: APPLIED.to_string(),
            created_at: Utc::now(),
        };
        let application = tables.application_view(&row);
        tables.applications.insert(id, row);
        Ok(application)
    }

    async fn seed(&self, events: Vec<NewEvent>, admin: NewUser) -> AppResult<SeedReport> {
        let mut tables = self.tables()?;
        let mut report = SeedReport::default();

        if tables.events.is_empty() {
            report.events_created = events.len();
            for event in events {
                tables.insert_event(event);
            }
        }
        if !tables.email_in_use(&admin.email) {
            tables.insert_user(admin);
            report.admin_created = true;
        }
        Ok(report)
    }
}
