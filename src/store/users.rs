use anyhow::Context;
use time::OffsetDateTime;

use super::{Store, User};

impl Store {
    /// Inserts a user with an already hashed password.
    /// Returns `false` when the email is taken.
    pub async fn add_user(
        &self,
        full_name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO users (full_name, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(full_name)
        .bind(email)
        .bind(password_hash)
        .bind(OffsetDateTime::now_utc())
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Ok(false),
            Err(e) => Err(e).context("insert user"),
        }
    }

    /// Find a user by email.
    pub async fn get_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, full_name, email, password_hash, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("select user by email")?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use crate::store::test_store;

    #[tokio::test]
    async fn duplicate_email_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path()).await;

        assert!(store.add_user("Ada", "ada@example.com", "h1").await.unwrap());
        assert!(!store.add_user("Other", "ada@example.com", "h2").await.unwrap());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);

        let user = store.get_user_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(user.full_name, "Ada");
        assert_eq!(user.password_hash, "h1");
    }

    #[tokio::test]
    async fn unknown_email_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path()).await;
        assert!(store.get_user_by_email("ghost@example.com").await.unwrap().is_none());
    }
}
