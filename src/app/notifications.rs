use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::notification::{
    Notification, NotificationKind, NotificationPost, NotificationView,
};
use crate::domain::user::AuthorSummary;
use crate::infra::db::{Db, Tx};

#[derive(Clone)]
pub struct NotificationService {
    db: Db,
}

impl NotificationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// The receiver's inbox, newest first.
    pub async fn list(&self, receiver_id: Uuid) -> ServiceResult<Vec<NotificationView>> {
        let rows = sqlx::query(
            "SELECT n.id, n.receiver_id, n.sender_id, n.kind, n.post_id, n.comment_id, n.created_at, \
                    s.username AS sender_username, s.image AS sender_image, \
                    p.image_url AS post_image_url, c.content AS comment_content \
             FROM notifications n \
             JOIN users s ON s.id = n.sender_id \
             LEFT JOIN posts p ON p.id = n.post_id \
             LEFT JOIN comments c ON c.id = n.comment_id \
             WHERE n.receiver_id = $1 \
             ORDER BY n.rowid DESC",
        )
        .bind(receiver_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut notifications = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.try_get("kind")?;
            let kind = NotificationKind::from_db(&kind).ok_or_else(|| {
                ServiceError::Store(sqlx::Error::Decode(
                    format!("unknown notification kind: {kind}").into(),
                ))
            })?;

            let notification = Notification {
                id: row.try_get("id")?,
                receiver_id: row.try_get("receiver_id")?,
                sender_id: row.try_get("sender_id")?,
                kind,
                post_id: row.try_get("post_id")?,
                comment_id: row.try_get("comment_id")?,
                created_at: row.try_get("created_at")?,
            };
            let sender = AuthorSummary {
                id: notification.sender_id,
                username: row.try_get("sender_username")?,
                image: row.try_get("sender_image")?,
            };
            let post_image_url: Option<String> = row.try_get("post_image_url")?;
            let post = notification
                .post_id
                .zip(post_image_url)
                .map(|(id, image_url)| NotificationPost { id, image_url });

            notifications.push(NotificationView {
                notification,
                sender,
                post,
                comment: row.try_get("comment_content")?,
            });
        }

        Ok(notifications)
    }
}

/// Records a notification inside the caller's transaction. Actions a user takes on
/// their own content never notify them; returns whether a row was written.
pub(crate) async fn insert_notification(
    tx: &mut Tx<'_>,
    receiver_id: Uuid,
    sender_id: Uuid,
    kind: NotificationKind,
    post_id: Option<Uuid>,
    comment_id: Option<Uuid>,
) -> Result<bool, sqlx::Error> {
    if receiver_id == sender_id {
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO notifications (id, receiver_id, sender_id, kind, post_id, comment_id, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(Uuid::new_v4())
    .bind(receiver_id)
    .bind(sender_id)
    .bind(kind.as_db())
    .bind(post_id)
    .bind(comment_id)
    .bind(OffsetDateTime::now_utc())
    .execute(&mut **tx)
    .await?;

    Ok(true)
}
