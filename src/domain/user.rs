use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub username: String,
    pub fullname: String,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Identity fields copied from an identity-provider `user.created` event.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub external_id: String,
    pub username: String,
    pub fullname: String,
    pub email: Option<String>,
    pub image: Option<String>,
}

/// The slice of a user shown next to posts, comments and notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub image: Option<String>,
}
