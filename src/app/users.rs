use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::user::{NewUser, User};
use crate::infra::db::Db;

pub(crate) const USER_COLUMNS: &str = "id, external_id, username, fullname, email, bio, image, \
     follower_count, following_count, post_count, created_at";

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Inserts the user unless one with the same external id already exists.
    /// Returns whether a row was written.
    pub async fn provision(&self, new_user: NewUser) -> ServiceResult<bool> {
        let result = sqlx::query(
            "INSERT INTO users (id, external_id, username, fullname, email, image, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (external_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.external_id)
        .bind(&new_user.username)
        .bind(&new_user.fullname)
        .bind(&new_user.email)
        .bind(&new_user.image)
        .bind(OffsetDateTime::now_utc())
        .execute(self.db.pool())
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            tracing::info!(external_id = %new_user.external_id, username = %new_user.username, "provisioned user");
        } else {
            tracing::debug!(external_id = %new_user.external_id, "user already provisioned");
        }
        Ok(created)
    }

    pub async fn get(&self, user_id: Uuid) -> ServiceResult<User> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|row| user_from_row(&row))
            .transpose()?
            .ok_or_else(|| ServiceError::not_found("user not found"))
    }

    pub async fn get_by_external_id(&self, external_id: &str) -> ServiceResult<User> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| user_from_row(&row))
            .transpose()?
            .ok_or_else(|| ServiceError::not_found("user not found"))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        fullname: String,
        bio: Option<String>,
    ) -> ServiceResult<User> {
        let row = sqlx::query(&format!(
            "UPDATE users SET fullname = $2, bio = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(fullname)
        .bind(bio)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| user_from_row(&row))
            .transpose()?
            .ok_or_else(|| ServiceError::not_found("user not found"))
    }
}

pub(crate) fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        username: row.try_get("username")?,
        fullname: row.try_get("fullname")?,
        email: row.try_get("email")?,
        bio: row.try_get("bio")?,
        image: row.try_get("image")?,
        follower_count: row.try_get("follower_count")?,
        following_count: row.try_get("following_count")?,
        post_count: row.try_get("post_count")?,
        created_at: row.try_get("created_at")?,
    })
}
