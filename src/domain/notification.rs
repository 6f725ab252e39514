use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::user::AuthorSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Follow,
    Comment,
}

impl NotificationKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "like" => Some(Self::Like),
            "follow" => Some(Self::Follow),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Follow => "follow",
            Self::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub receiver_id: Uuid,
    pub sender_id: Uuid,
    pub kind: NotificationKind,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPost {
    pub id: Uuid,
    pub image_url: String,
}

/// A notification joined with what the inbox needs to render it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: Notification,
    pub sender: AuthorSummary,
    pub post: Option<NotificationPost>,
    pub comment: Option<String>,
}
