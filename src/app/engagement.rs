use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::notifications::insert_notification;
use crate::domain::engagement::{Comment, CommentView};
use crate::domain::notification::NotificationKind;
use crate::domain::post::MAX_TEXT_CHARS;
use crate::domain::user::AuthorSummary;
use crate::infra::db::{Db, Tx};

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Likes or unlikes the post for `user_id` and returns the new like state.
    pub async fn toggle_like(&self, user_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        let mut tx = self.db.begin().await?;
        let owner_id = post_owner(&mut tx, post_id).await?;

        let removed = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if removed {
            sqlx::query("UPDATE posts SET like_count = MAX(like_count - 1, 0) WHERE id = $1")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO likes (id, user_id, post_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(post_id)
        .bind(OffsetDateTime::now_utc())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        insert_notification(
            &mut tx,
            owner_id,
            user_id,
            NotificationKind::Like,
            Some(post_id),
            None,
        )
        .await?;

        tx.commit().await?;

        Ok(true)
    }

    pub async fn add_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        content: String,
    ) -> ServiceResult<Comment> {
        validate_text("comment", &content)?;

        let mut tx = self.db.begin().await?;
        let owner_id = post_owner(&mut tx, post_id).await?;

        let row = sqlx::query(
            "INSERT INTO comments (id, user_id, post_id, content, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, post_id, content, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(post_id)
        .bind(content)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&mut *tx)
        .await?;

        let comment = Comment {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            post_id: row.try_get("post_id")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        };

        sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        insert_notification(
            &mut tx,
            owner_id,
            user_id,
            NotificationKind::Comment,
            Some(post_id),
            Some(comment.id),
        )
        .await?;

        tx.commit().await?;

        Ok(comment)
    }

    /// Bookmarks carry no counter and send no notification.
    pub async fn toggle_bookmark(&self, user_id: Uuid, post_id: Uuid) -> ServiceResult<bool> {
        let mut tx = self.db.begin().await?;
        post_owner(&mut tx, post_id).await?;

        let removed = sqlx::query("DELETE FROM bookmarks WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if !removed {
            sqlx::query(
                "INSERT INTO bookmarks (id, user_id, post_id, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(post_id)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(!removed)
    }

    /// Comments on a post, newest first, each with its author.
    pub async fn list_comments(&self, post_id: Uuid) -> ServiceResult<Vec<CommentView>> {
        let rows = sqlx::query(
            "SELECT c.id, c.user_id, c.post_id, c.content, c.created_at, \
                    u.username, u.image \
             FROM comments c \
             JOIN users u ON u.id = c.user_id \
             WHERE c.post_id = $1 \
             ORDER BY c.rowid DESC",
        )
        .bind(post_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut comments = Vec::with_capacity(rows.len());
        for row in rows {
            let comment = Comment {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                post_id: row.try_get("post_id")?,
                content: row.try_get("content")?,
                created_at: row.try_get("created_at")?,
            };
            let user = AuthorSummary {
                id: comment.user_id,
                username: row.try_get("username")?,
                image: row.try_get("image")?,
            };
            comments.push(CommentView { comment, user });
        }

        Ok(comments)
    }
}

async fn post_owner(tx: &mut Tx<'_>, post_id: Uuid) -> ServiceResult<Uuid> {
    let owner_id: Option<Uuid> = sqlx::query_scalar("SELECT owner_id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut **tx)
        .await?;

    owner_id.ok_or_else(|| ServiceError::not_found("post not found"))
}

/// Captions and comments are capped at [`MAX_TEXT_CHARS`] characters.
pub(crate) fn validate_text(field: &str, text: &str) -> ServiceResult<()> {
    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ServiceError::validation(format!(
            "{field} must be at most {MAX_TEXT_CHARS} characters"
        )));
    }
    Ok(())
}
