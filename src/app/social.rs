use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::app::notifications::insert_notification;
use crate::domain::notification::NotificationKind;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Flips the follow edge from `follower_id` to `following_id` and returns the new
    /// state. Both counters move in the same transaction as the edge.
    pub async fn toggle_follow(&self, follower_id: Uuid, following_id: Uuid) -> ServiceResult<bool> {
        if follower_id == following_id {
            return Err(ServiceError::validation("cannot follow yourself"));
        }

        let mut tx = self.db.begin().await?;

        let target_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(following_id)
                .fetch_one(&mut *tx)
                .await?;
        if !target_exists {
            return Err(ServiceError::not_found("user not found"));
        }

        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower_id)
            .bind(following_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        let (delta, following) = if removed {
            (-1, false)
        } else {
            sqlx::query(
                "INSERT INTO follows (id, follower_id, following_id, created_at) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(follower_id)
            .bind(following_id)
            .bind(OffsetDateTime::now_utc())
            .execute(&mut *tx)
            .await?;
            (1, true)
        };

        sqlx::query("UPDATE users SET follower_count = MAX(follower_count + $2, 0) WHERE id = $1")
            .bind(following_id)
            .bind(delta)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE users SET following_count = MAX(following_count + $2, 0) WHERE id = $1")
            .bind(follower_id)
            .bind(delta)
            .execute(&mut *tx)
            .await?;

        if following {
            insert_notification(
                &mut tx,
                following_id,
                follower_id,
                NotificationKind::Follow,
                None,
                None,
            )
            .await?;
        }

        tx.commit().await?;

        Ok(following)
    }

    pub async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> ServiceResult<bool> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(exists)
    }
}
