//! Salted Argon2id password hashing.
//!
//! Hashing is deliberately expensive, so both operations run on tokio's
//! blocking pool instead of stalling the request executor.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AppError, AppResult};

/// Hashes `password` with a fresh random salt, returning the PHC string to store.
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
    })
    .await
    .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
}

/// Checks `password` against a stored PHC string. A malformed stored hash
/// is an internal error, not a failed login.
pub async fn verify_password(password: String, stored_hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| AppError::Internal(format!("stored password hash is invalid: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashes_are_salted_and_verifiable() {
        let first = hash_password("hunter22".to_string()).await.unwrap();
        let second = hash_password("hunter22".to_string()).await.unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("$argon2id$"));
        assert!(verify_password("hunter22".to_string(), first.clone()).await.unwrap());
        assert!(!verify_password("hunter23".to_string(), first).await.unwrap());
    }

    #[tokio::test]
    async fn plaintext_stored_value_is_rejected_as_corrupt() {
        let result = verify_password("admin123".to_string(), "admin123".to_string()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
