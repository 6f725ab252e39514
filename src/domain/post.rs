use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::AuthorSummary;

/// Upper bound, in characters, for captions and comments.
pub const MAX_TEXT_CHARS: usize = 280;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub storage_key: String,
    pub image_url: String,
    pub caption: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// A post as seen by one viewer in the home feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: Post,
    pub author: AuthorSummary,
    pub is_liked: bool,
    pub is_bookmarked: bool,
}
