use chrono::NaiveDate;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{NewEvent, NewUser, Role, SeedReport},
    password::hash_password,
    repository::Repository,
};

/// The demo events inserted into an empty database.
pub fn sample_events() -> AppResult<Vec<NewEvent>> {
    let samples = [
        (
            "Freshers Welcome Expo",
            (2026, 3, 12),
            "Student Center Hall",
            "community",
            18,
            "Welcome new students with guided tours and info desks.",
        ),
        (
            "Spring Arts Night",
            (2026, 3, 20),
            "Fine Arts Gallery",
            "arts",
            12,
            "Support performers, run stage cues, and capture highlights.",
        ),
        (
            "Campus 5K Run",
            (2026, 3, 27),
            "North Track",
            "sports",
            20,
            "Manage check-in and hydration stations for runners.",
        ),
    ];

    samples
        .into_iter()
        .map(|(name, (y, m, d), venue, category, slots, tagline)| {
            let date = NaiveDate::from_ymd_opt(y, m, d)
                .ok_or_else(|| AppError::Internal(format!("invalid sample date for {name}")))?;
            Ok(NewEvent {
                name: name.to_string(),
                date,
                venue: venue.to_string(),
                category: category.to_string(),
                slots,
                tagline: tagline.to_string(),
            })
        })
        .collect()
}

/// run
///
/// Inserts the sample events and the bootstrap administrator from `config`.
/// Safe to repeat: existing events or an existing admin email are left alone.
pub async fn run(repo: &dyn Repository, config: &AppConfig) -> AppResult<SeedReport> {
    let admin = NewUser {
        name: "Campus Admin".to_string(),
        email: config.admin_email.clone(),
        password_hash: hash_password(config.admin_password.clone()).await?,
        role: Role::Admin,
    };

    let report = repo.seed(sample_events()?, admin).await?;
    tracing::info!(
        events_created = report.events_created,
        admin_created = report.admin_created,
        "seed completed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;

    #[tokio::test]
    async fn seeds_once() {
        let repo = MemoryRepository::new();
        let config = AppConfig::default();

        let first = run(&repo, &config).await.unwrap();
        let second = run(&repo, &config).await.unwrap();

        assert_eq!(first.events_created, 3);
        assert!(first.admin_created);
        assert_eq!(second, SeedReport::default());

        let admin = repo
            .find_user_by_email("admin@campus.edu")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.user.role, Role::Admin);
        assert!(admin.password_hash.starts_with("$argon2id$"));
    }
}
