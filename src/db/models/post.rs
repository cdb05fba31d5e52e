//! Blog post models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BlogPost {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub subtitle: String,
    /// Human formatted, e.g. "August 24, 2024"
    pub date: String,
    /// Trusted HTML written by the admin
    pub body: String,
    pub img_url: String,
}

/// A post joined with its author's name for display
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PostWithAuthor {
    pub id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub title: String,
    pub subtitle: String,
    pub date: String,
    pub body: String,
    pub img_url: String,
}

/// Editable fields of a post
#[derive(Debug, Clone)]
pub struct PostContent<'a> {
    pub title: &'a str,
    pub subtitle: &'a str,
    pub body: &'a str,
    pub img_url: &'a str,
}

const SELECT_WITH_AUTHOR: &str = r#"
    SELECT p.id, p.author_id, u.name AS author_name, p.title, p.subtitle, p.date, p.body, p.img_url
    FROM blog_posts p
    JOIN users u ON u.id = p.author_id
"#;

impl BlogPost {
    /// Insert a post. Fails with a UNIQUE violation on a duplicate title.
    pub async fn create(
        db: &SqlitePool,
        author_id: i64,
        date: &str,
        content: &PostContent<'_>,
    ) -> Result<BlogPost, sqlx::Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO blog_posts (author_id, title, subtitle, date, body, img_url)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(author_id)
        .bind(content.title)
        .bind(content.subtitle)
        .bind(date)
        .bind(content.body)
        .bind(content.img_url)
        .execute(db)
        .await?
        .last_insert_rowid();

        Self::get_by_id(db, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Option<BlogPost>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, author_id, title, subtitle, date, body, img_url FROM blog_posts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn get_with_author(
        db: &SqlitePool,
        id: i64,
    ) -> Result<Option<PostWithAuthor>, sqlx::Error> {
        sqlx::query_as(&format!("{} WHERE p.id = ?", SELECT_WITH_AUTHOR))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// All posts in storage order
    pub async fn list_with_authors(db: &SqlitePool) -> Result<Vec<PostWithAuthor>, sqlx::Error> {
        sqlx::query_as(&format!("{} ORDER BY p.id ASC", SELECT_WITH_AUTHOR))
            .fetch_all(db)
            .await
    }

    /// Overwrite the editable fields, keeping author and date.
    pub async fn update(
        db: &SqlitePool,
        id: i64,
        content: &PostContent<'_>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE blog_posts
            SET title = ?, subtitle = ?, body = ?, img_url = ?
            WHERE id = ?
            "#,
        )
        .bind(content.title)
        .bind(content.subtitle)
        .bind(content.body)
        .bind(content.img_url)
        .bind(id)
        .execute(db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a post; its comments go with it (ON DELETE CASCADE).
    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_in_memory, Comment, User};

    fn content<'a>(title: &'a str) -> PostContent<'a> {
        PostContent {
            title,
            subtitle: "sub",
            body: "<p>body</p>",
            img_url: "https://example.com/cover.jpg",
        }
    }

    #[tokio::test]
    async fn test_create_list_and_update() {
        let db = init_in_memory().await.unwrap();
        let admin = User::create(&db, "a@example.com", "Ada", "hash").await.unwrap();

        let first = BlogPost::create(&db, admin.id, "May 01, 2024", &content("First"))
            .await
            .unwrap();
        BlogPost::create(&db, admin.id, "May 02, 2024", &content("Second"))
            .await
            .unwrap();

        let posts = BlogPost::list_with_authors(&db).await.unwrap();
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["First", "Second"]);
        assert_eq!(posts[0].author_name, "Ada");

        assert!(BlogPost::update(&db, first.id, &content("Renamed")).await.unwrap());
        let updated = BlogPost::get_by_id(&db, first.id).await.unwrap().unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.date, "May 01, 2024");
        assert_eq!(updated.author_id, admin.id);
    }

    #[tokio::test]
    async fn test_duplicate_title_rejected() {
        let db = init_in_memory().await.unwrap();
        let admin = User::create(&db, "a@example.com", "Ada", "hash").await.unwrap();
        BlogPost::create(&db, admin.id, "today", &content("Same")).await.unwrap();

        let err = BlogPost::create(&db, admin.id, "today", &content("Same"))
            .await
            .unwrap_err();
        assert!(matches!(err, sqlx::Error::Database(ref e) if e.is_unique_violation()));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_comments() {
        let db = init_in_memory().await.unwrap();
        let admin = User::create(&db, "a@example.com", "Ada", "hash").await.unwrap();
        let post = BlogPost::create(&db, admin.id, "today", &content("Doomed"))
            .await
            .unwrap();
        Comment::create(&db, post.id, admin.id, "first!").await.unwrap();

        assert!(BlogPost::delete(&db, post.id).await.unwrap());
        assert!(!BlogPost::delete(&db, post.id).await.unwrap());
        assert!(BlogPost::get_with_author(&db, post.id).await.unwrap().is_none());

        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_eq!(left, 0);
    }
}
