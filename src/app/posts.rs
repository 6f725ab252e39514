use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::engagement::validate_text;
use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::post::Post;
use crate::infra::db::Db;
use crate::infra::storage::AssetStore;

pub(crate) const POST_COLUMNS: &str =
    "id, owner_id, storage_key, image_url, caption, like_count, comment_count, created_at";

#[derive(Clone)]
pub struct PostService {
    db: Db,
    storage: Arc<dyn AssetStore>,
}

#[derive(Debug, Serialize)]
pub struct UploadTarget {
    pub storage_key: String,
    pub upload_url: String,
    pub expires_in_seconds: u64,
}

impl PostService {
    pub fn new(db: Db, storage: Arc<dyn AssetStore>) -> Self {
        Self { db, storage }
    }

    pub async fn create_upload(
        &self,
        owner_id: Uuid,
        expires_in_seconds: u64,
    ) -> ServiceResult<UploadTarget> {
        let storage_key = format!("uploads/{}/{}", owner_id, Uuid::new_v4());
        let upload_url = self
            .storage
            .upload_url(&storage_key, Duration::from_secs(expires_in_seconds))
            .await
            .map_err(ServiceError::Upstream)?;

        Ok(UploadTarget {
            storage_key,
            upload_url,
            expires_in_seconds,
        })
    }

    pub async fn create_post(
        &self,
        owner_id: Uuid,
        storage_key: String,
        caption: Option<String>,
    ) -> ServiceResult<Post> {
        if let Some(caption) = caption.as_deref() {
            validate_text("caption", caption)?;
        }

        let image_url = self
            .storage
            .public_url(&storage_key)
            .await
            .map_err(ServiceError::Upstream)?
            .ok_or_else(|| ServiceError::Upstream(anyhow::anyhow!("image not found")))?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO posts (id, owner_id, storage_key, image_url, caption, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&storage_key)
        .bind(image_url)
        .bind(caption)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&mut *tx)
        .await?;
        let post = post_from_row(&row)?;

        let updated = sqlx::query("UPDATE users SET post_count = post_count + 1 WHERE id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(ServiceError::not_found("user not found"));
        }

        tx.commit().await?;

        tracing::info!(post_id = %post.id, owner_id = %owner_id, "created post");
        Ok(post)
    }

    /// Removes the post, everything that references it and its stored image. Only the
    /// owner may delete; nothing is committed unless every step succeeds.
    ///
    /// The image is deleted before the commit so a storage failure rolls the rows back.
    /// A commit that fails after that leaves the post without its image; that case is
    /// accepted and logged.
    pub async fn delete_post(&self, actor_id: Uuid, post_id: Uuid) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;

        let row = sqlx::query("SELECT owner_id, storage_key FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ServiceError::not_found("post not found"))?;
        let owner_id: Uuid = row.try_get("owner_id")?;
        let storage_key: String = row.try_get("storage_key")?;

        if owner_id != actor_id {
            return Err(ServiceError::Authorization(
                "not allowed to delete this post".into(),
            ));
        }

        for statement in [
            "DELETE FROM notifications WHERE post_id = $1",
            "DELETE FROM likes WHERE post_id = $1",
            "DELETE FROM comments WHERE post_id = $1",
            "DELETE FROM bookmarks WHERE post_id = $1",
            "DELETE FROM posts WHERE id = $1",
        ] {
            sqlx::query(statement)
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE users SET post_count = MAX(post_count - 1, 0) WHERE id = $1")
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        self.storage
            .delete(&storage_key)
            .await
            .map_err(ServiceError::Upstream)?;

        tx.commit().await.map_err(|err| {
            tracing::error!(error = ?err, post_id = %post_id, storage_key = %storage_key, "commit failed after image was deleted");
            err
        })?;

        tracing::info!(post_id = %post_id, owner_id = %owner_id, "deleted post");
        Ok(())
    }

    /// All posts by `owner_id`, newest first.
    pub async fn list_by_user(&self, owner_id: Uuid) -> ServiceResult<Vec<Post>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(owner_id)
            .fetch_one(self.db.pool())
            .await?;
        if !exists {
            return Err(ServiceError::not_found("user not found"));
        }

        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE owner_id = $1 ORDER BY rowid DESC"
        ))
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await?;

        let posts = rows
            .iter()
            .map(post_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }
}

pub(crate) fn post_from_row(row: &SqliteRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        storage_key: row.try_get("storage_key")?,
        image_url: row.try_get("image_url")?,
        caption: row.try_get("caption")?,
        like_count: row.try_get("like_count")?,
        comment_count: row.try_get("comment_count")?,
        created_at: row.try_get("created_at")?,
    })
}
