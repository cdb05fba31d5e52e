//! User and session models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// The single user allowed to create, edit and delete posts.
pub const ADMIN_USER_ID: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// What pages get to know about the logged-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub is_admin: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            is_admin: user.is_admin(),
        }
    }
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_USER_ID
    }

    /// Insert a new user. Fails with a UNIQUE violation if the email is taken.
    pub async fn create(
        db: &SqlitePool,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, sqlx::Error> {
        let id = sqlx::query("INSERT INTO users (email, name, password_hash) VALUES (?, ?, ?)")
            .bind(email)
            .bind(name)
            .bind(password_hash)
            .execute(db)
            .await?
            .last_insert_rowid();

        Self::get_by_id(db, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as("SELECT id, email, name, password_hash, created_at FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn get_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, email, name, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    #[cfg(test)]
    pub async fn count_with_email(db: &SqlitePool, email: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(db)
            .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

impl Session {
    /// Record a session. `expires_at` uses SQLite's `YYYY-MM-DD HH:MM:SS`
    /// format so it compares against `datetime('now')`.
    pub async fn create(
        db: &SqlitePool,
        user_id: i64,
        token_hash: &str,
        expires_at: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO sessions (user_id, token_hash, expires_at) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(token_hash)
                .bind(expires_at)
                .execute(db)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// The user owning an unexpired session with this token hash
    pub async fn find_user(db: &SqlitePool, token_hash: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.name, u.password_hash, u.created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = ? AND s.expires_at > datetime('now')
            "#,
        )
        .bind(token_hash)
        .fetch_optional(db)
        .await
    }

    pub async fn delete_by_token_hash(db: &SqlitePool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired(db: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= datetime('now')")
            .execute(db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;

    #[tokio::test]
    async fn test_first_user_is_admin() {
        let db = init_in_memory().await.unwrap();
        let first = User::create(&db, "a@example.com", "Ada", "hash").await.unwrap();
        let second = User::create(&db, "b@example.com", "Bob", "hash").await.unwrap();

        assert_eq!(first.id, ADMIN_USER_ID);
        assert!(first.is_admin());
        assert!(!second.is_admin());
        assert!(UserView::from(&first).is_admin);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let db = init_in_memory().await.unwrap();
        User::create(&db, "a@example.com", "Ada", "hash").await.unwrap();
        let err = User::create(&db, "a@example.com", "Other", "hash").await.unwrap_err();

        assert!(matches!(err, sqlx::Error::Database(ref e) if e.is_unique_violation()));
        assert_eq!(User::count_with_email(&db, "a@example.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_session_lookup_respects_expiry() {
        let db = init_in_memory().await.unwrap();
        let user = User::create(&db, "a@example.com", "Ada", "hash").await.unwrap();

        Session::create(&db, user.id, "live", "2999-01-01 00:00:00").await.unwrap();
        Session::create(&db, user.id, "stale", "2000-01-01 00:00:00").await.unwrap();

        let found = Session::find_user(&db, "live").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(Session::find_user(&db, "stale").await.unwrap().is_none());
        assert!(Session::find_user(&db, "missing").await.unwrap().is_none());

        assert_eq!(Session::purge_expired(&db).await.unwrap(), 1);
        assert!(Session::delete_by_token_hash(&db, "live").await.unwrap());
        assert!(Session::find_user(&db, "live").await.unwrap().is_none());
    }
}
