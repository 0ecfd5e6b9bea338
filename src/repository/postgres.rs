use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use super::{Repository, already_applied, email_taken, event_full, event_not_found};
use crate::{
    error::AppResult,
    models::{
        APPLIED, Application, Event, EventSummary, NewEvent, NewUser, NewVolunteer, ProfilePatch,
        SeedReport, User, UserCredentials, VolunteerProfile,
    },
};

/// PostgresRepository
///
/// The production `Repository`, backed by the schema in `migrations/`.
/// Cloning shares the underlying pool.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the schema in `migrations/`. Already-applied versions are skipped.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Row shape of the event listing query before `slots_left` is derived.
#[derive(FromRow)]
struct EventStatsRow {
    #[sqlx(flatten)]
    event: Event,
    applicants: i32,
    applied: bool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user(&self, id: i32) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let creds = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, name, email, role, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(creds)
    }

    /// register_volunteer
    ///
    /// The email pre-check gives the friendly error; the unique index on
    /// `users.email` catches a concurrent registration that slips past it.
    async fn register_volunteer(&self, volunteer: NewVolunteer) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&volunteer.user.email)
            .fetch_one(&mut *tx)
            .await?;
        if taken {
            return Err(email_taken());
        }

        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (name, email, password_hash, role)
               VALUES ($1, $2, $3, $4)
               RETURNING id, name, email, role"#,
        )
        .bind(&volunteer.user.name)
        .bind(&volunteer.user.email)
        .bind(&volunteer.user.password_hash)
        .bind(volunteer.user.role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| if is_unique_violation(&e) { email_taken() } else { e.into() })?;

        sqlx::query("INSERT INTO volunteer_profiles (user_id, skill, availability) VALUES ($1, $2, $3)")
            .bind(user.id)
            .bind(&volunteer.skill)
            .bind(&volunteer.availability)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// list_events
    ///
    /// One grouped query: applicant counts via LEFT JOIN, and `applied` via
    /// BOOL_OR over the viewer's rows (NULL viewer collapses to false).
    async fn list_events(&self, viewer: Option<i32>) -> AppResult<Vec<EventSummary>> {
        let rows = sqlx::query_as::<_, EventStatsRow>(
            r#"
            SELECT
                e.id, e.name, e.date, e.venue, e.category, e.slots, e.tagline, e.created_at,
                COUNT(a.id)::INT AS applicants,
                COALESCE(BOOL_OR(a.user_id = $1), FALSE) AS applied
            FROM events e
            LEFT JOIN applications a ON a.event_id = e.id
            GROUP BY e.id
            ORDER BY e.date ASC, e.id ASC
            "#,
        )
        .bind(viewer)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EventSummary::new(row.event, row.applicants, row.applied))
            .collect())
    }

    async fn create_event(&self, event: NewEvent) -> AppResult<Event> {
        let created = sqlx::query_as::<_, Event>(
            r#"INSERT INTO events (name, date, venue, category, slots, tagline)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, name, date, venue, category, slots, tagline, created_at"#,
        )
        .bind(&event.name)
        .bind(event.date)
        .bind(&event.venue)
        .bind(&event.category)
        .bind(event.slots)
        .bind(&event.tagline)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// delete_event
    ///
    /// Dependent applications go first, inside the same transaction; an
    /// unknown id returns before commit so nothing is removed.
    async fn delete_event(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM applications WHERE event_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Err(event_not_found());
        }

        tx.commit().await?;
        tracing::debug!(event_id = id, applications_removed = removed, "event deleted");
        Ok(())
    }

    async fn list_volunteer_profiles(&self) -> AppResult<Vec<VolunteerProfile>> {
        let profiles = sqlx::query_as::<_, VolunteerProfile>(
            r#"
            SELECT p.id, p.user_id, u.name, u.email, p.skill, p.availability
            FROM volunteer_profiles p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(profiles)
    }

    /// upsert_volunteer_profile
    ///
    /// A single upsert; `COALESCE` keeps the stored value for every field the
    /// patch leaves as `None`.
    async fn upsert_volunteer_profile(
        &self,
        user_id: i32,
        patch: ProfilePatch,
    ) -> AppResult<VolunteerProfile> {
        let profile = sqlx::query_as::<_, VolunteerProfile>(
            r#"
            WITH upserted AS (
                INSERT INTO volunteer_profiles (user_id, skill, availability)
                VALUES ($1, COALESCE($2, ''), COALESCE($3, ''))
                ON CONFLICT (user_id) DO UPDATE
                SET skill = COALESCE($2, volunteer_profiles.skill),
                    availability = COALESCE($3, volunteer_profiles.availability)
                RETURNING id, user_id, skill, availability
            )
            SELECT p.id, p.user_id, u.name, u.email, p.skill, p.availability
            FROM upserted p
            JOIN users u ON u.id = p.user_id
            "#,
        )
        .bind(user_id)
        .bind(patch.skill)
        .bind(patch.availability)
        .fetch_one(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn list_applications(&self, user_id: i32) -> AppResult<Vec<Application>> {
        let applications = sqlx::query_as::<_, Application>(
            r#"
            SELECT a.id, a.user_id, a.event_id, e.name AS event_name, a.status, a.created_at
            FROM applications a
            JOIN events e ON e.id = a.event_id
            WHERE a.user_id = $1
            ORDER BY a.created_at ASC, a.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    /// apply_to_event
    ///
    /// Locks the event row before counting so concurrent applications to the
    /// same event queue up behind each other; the count-then-insert can then
    /// never exceed `slots`.
    async fn apply_to_event(&self, user_id: i32, event_id: i32) -> AppResult<Application> {
        let mut tx = self.pool.begin().await?;

        let slots: Option<i32> = sqlx::query_scalar("SELECT slots FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(slots) = slots else {
            return Err(event_not_found());
        };

        let applicants: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&mut *tx)
            .await?;
        if applicants >= i64::from(slots) {
            return Err(event_full());
        }

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM applications WHERE user_id = $1 AND event_id = $2)",
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;
        if already {
            return Err(already_applied());
        }

        let application = sqlx::query_as::<_, Application>(
            r#"
            WITH inserted AS (
                INSERT INTO applications (user_id, event_id, status)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, event_id, status, created_at
            )
            SELECT i.id, i.user_id, i.event_id, e.name AS event_name, i.status, i.created_at
            FROM inserted i
            JOIN events e ON e.id = i.event_id
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .bind(APPLIED)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| if is_unique_violation(&e) { already_applied() } else { e.into() })?;

        tx.commit().await?;
        Ok(application)
    }

    async fn seed(&self, events: Vec<NewEvent>, admin: NewUser) -> AppResult<SeedReport> {
        let mut tx = self.pool.begin().await?;
        let mut report = SeedReport::default();

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&mut *tx)
            .await?;
        if existing == 0 {
            for event in &events {
                sqlx::query(
                    r#"INSERT INTO events (name, date, venue, category, slots, tagline)
                       VALUES ($1, $2, $3, $4, $5, $6)"#,
                )
                .bind(&event.name)
                .bind(event.date)
                .bind(&event.venue)
                .bind(&event.category)
                .bind(event.slots)
                .bind(&event.tagline)
                .execute(&mut *tx)
                .await?;
            }
            report.events_created = events.len();
        }

        let admin_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(&admin.email)
            .fetch_one(&mut *tx)
            .await?;
        if !admin_exists {
            sqlx::query("INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4)")
                .bind(&admin.name)
                .bind(&admin.email)
                .bind(&admin.password_hash)
                .bind(admin.role.as_str())
                .execute(&mut *tx)
                .await?;
            report.admin_created = true;
        }

        tx.commit().await?;
        Ok(report)
    }
}
