//! Comment models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created_at: String,
}

/// A comment joined with the author fields the post page shows
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CommentWithAuthor {
    pub id: i64,
    pub text: String,
    pub author_name: String,
    pub author_email: String,
    pub created_at: String,
}

impl Comment {
    pub async fn create(
        db: &SqlitePool,
        post_id: i64,
        author_id: i64,
        text: &str,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES (?, ?, ?)
            RETURNING id, post_id, author_id, text, created_at
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(db)
        .await
    }

    /// Comments on a post, oldest first
    pub async fn list_for_post(
        db: &SqlitePool,
        post_id: i64,
    ) -> Result<Vec<CommentWithAuthor>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT c.id, c.text, u.name AS author_name, u.email AS author_email, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = ?
            ORDER BY c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(db)
        .await
    }

    #[cfg(test)]
    pub async fn count_for_post(db: &SqlitePool, post_id: i64) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(db)
            .await
    }
}
