use sqlx::Row;
use uuid::Uuid;

use crate::app::error::ServiceResult;
use crate::app::posts::post_from_row;
use crate::domain::post::FeedPost;
use crate::domain::user::AuthorSummary;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct FeedService {
    db: Db,
}

impl FeedService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Every post, newest first, annotated with its author and the viewer's like and
    /// bookmark state.
    pub async fn home_feed(&self, viewer_id: Uuid) -> ServiceResult<Vec<FeedPost>> {
        let rows = sqlx::query(
            "SELECT p.id, p.owner_id, p.storage_key, p.image_url, p.caption, \
                    p.like_count, p.comment_count, p.created_at, \
                    u.username AS author_username, u.image AS author_image, \
                    EXISTS (SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = $1) AS is_liked, \
                    EXISTS (SELECT 1 FROM bookmarks b WHERE b.post_id = p.id AND b.user_id = $1) AS is_bookmarked \
             FROM posts p \
             JOIN users u ON u.id = p.owner_id \
             ORDER BY p.rowid DESC",
        )
        .bind(viewer_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let post = post_from_row(&row)?;
            let author = AuthorSummary {
                id: post.owner_id,
                username: row.try_get("author_username")?,
                image: row.try_get("author_image")?,
            };
            items.push(FeedPost {
                post,
                author,
                is_liked: row.try_get("is_liked")?,
                is_bookmarked: row.try_get("is_bookmarked")?,
            });
        }

        Ok(items)
    }
}
