use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::password::{hash_password, verify_password};
use crate::{
    error::{AppError, AppResult},
    store::{Store, User},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates and stores a new user. Duplicate emails are a validation failure.
pub async fn register(store: &Store, full_name: &str, email: &str, password: &str) -> AppResult<()> {
    let email = normalize_email(email);
    let full_name = full_name.trim();

    if full_name.is_empty() {
        return Err(AppError::validation("Full name is required"));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation("Password too short"));
    }

    let hash = hash_password(password)?;
    if !store.add_user(full_name, &email, &hash).await? {
        warn!(email = %email, "email already registered");
        return Err(AppError::validation("Email already exists"));
    }

    info!(email = %email, "user registered");
    Ok(())
}

/// Returns the user when `password` matches the stored hash.
pub async fn authenticate(store: &Store, email: &str, password: &str) -> AppResult<Option<User>> {
    let email = normalize_email(email);
    let Some(user) = store.get_user_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Ok(None);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, "login invalid password");
        return Ok(None);
    }
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_store;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.io"));
        assert!(!is_valid_email(""));
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[tokio::test]
    async fn register_twice_fails_second_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path()).await;

        register(&store, "Ada Lovelace", "ada@example.com", "analytical").await.unwrap();
        let err = register(&store, "Imposter", "ADA@example.com", "different1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == "Email already exists"));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path()).await;

        for (name, email, pw) in [
            ("", "a@b.io", "longenough"),
            ("A", "not-an-email", "longenough"),
            ("A", "a@b.io", "short"),
        ] {
            let err = register(&store, name, email, pw).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert!(store.get_user_by_email("a@b.io").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn authenticate_checks_password() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path()).await;
        register(&store, "Ada Lovelace", "ada@example.com", "analytical").await.unwrap();

        let user = authenticate(&store, "ada@example.com", "analytical").await.unwrap();
        assert_eq!(user.map(|u| u.full_name).as_deref(), Some("Ada Lovelace"));

        assert!(authenticate(&store, "ada@example.com", "wrong-pass").await.unwrap().is_none());
        assert!(authenticate(&store, "nobody@example.com", "analytical").await.unwrap().is_none());
    }
}
