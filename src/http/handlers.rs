use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::engagement::EngagementService;
use crate::app::feed::FeedService;
use crate::app::notifications::NotificationService;
use crate::app::posts::{PostService, UploadTarget};
use crate::app::social::SocialService;
use crate::app::users::UserService;
use crate::app::webhook::{user_from_event, WebhookEvent, WebhookHeaders, WebhookVerifier};
use crate::domain::engagement::{Comment, CommentView};
use crate::domain::notification::NotificationView;
use crate::domain::post::{FeedPost, Post};
use crate::domain::user::User;
use crate::http::extract::{AppJson, AppPath};
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Identity provider webhook
// ---------------------------------------------------------------------------

pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), AppError> {
    let secret = state.webhook_secret.as_deref().ok_or_else(|| {
        tracing::error!("webhook secret is not configured");
        AppError::bad_request("missing webhook secret")
    })?;

    let (Some(id), Some(timestamp), Some(signature)) = (
        header_str(&headers, "svix-id"),
        header_str(&headers, "svix-timestamp"),
        header_str(&headers, "svix-signature"),
    ) else {
        tracing::warn!("webhook delivery without svix headers");
        return Err(AppError::bad_request("invalid headers"));
    };

    let verifier = WebhookVerifier::new(secret)?;
    verifier
        .verify(
            &WebhookHeaders {
                id,
                timestamp,
                signature,
            },
            &body,
        )
        .map_err(|err| {
            tracing::warn!(error = %err, svix_id = %id, "webhook verification failed");
            AppError::bad_request("invalid signature")
        })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| AppError::bad_request("invalid payload"))?;

    let Some(new_user) = user_from_event(&event)? else {
        tracing::debug!(event_type = %event.event_type, "ignoring webhook event");
        return Ok((StatusCode::OK, "webhook received"));
    };

    UserService::new(state.db.clone())
        .provision(new_user)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, svix_id = %id, "failed to provision user");
            AppError::internal("mutation error")
        })?;

    Ok((StatusCode::OK, "webhook received"))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let user = UserService::new(state.db.clone()).get(auth.user_id).await?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub fullname: String,
    pub bio: Option<String>,
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    const MAX_FULLNAME_LEN: usize = 100;
    const MAX_BIO_LEN: usize = 500;

    let fullname = payload.fullname.trim().to_string();
    if fullname.chars().count() > MAX_FULLNAME_LEN {
        return Err(AppError::bad_request("fullname must be at most 100 characters"));
    }
    if let Some(ref bio) = payload.bio {
        if bio.chars().count() > MAX_BIO_LEN {
            return Err(AppError::bad_request("bio must be at most 500 characters"));
        }
    }

    let user = UserService::new(state.db.clone())
        .update_profile(auth.user_id, fullname, payload.bio)
        .await?;
    Ok(Json(user))
}

pub async fn get_user(
    AppPath(id): AppPath<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let user = UserService::new(state.db.clone()).get(id).await?;
    Ok(Json(user))
}

pub async fn get_user_by_external_id(
    AppPath(external_id): AppPath<String>,
    State(state): State<AppState>,
) -> Result<Json<User>, AppError> {
    let user = UserService::new(state.db.clone())
        .get_by_external_id(&external_id)
        .await?;
    Ok(Json(user))
}

pub async fn list_my_posts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, AppError> {
    let service = PostService::new(state.db.clone(), state.storage.clone());
    Ok(Json(service.list_by_user(auth.user_id).await?))
}

pub async fn list_user_posts(
    AppPath(id): AppPath<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Post>>, AppError> {
    let service = PostService::new(state.db.clone(), state.storage.clone());
    Ok(Json(service.list_by_user(id).await?))
}

#[derive(Serialize)]
pub struct FollowResponse {
    pub following: bool,
}

pub async fn follow_status(
    AppPath(id): AppPath<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowResponse>, AppError> {
    let following = SocialService::new(state.db.clone())
        .is_following(auth.user_id, id)
        .await?;
    Ok(Json(FollowResponse { following }))
}

pub async fn toggle_follow(
    AppPath(id): AppPath<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowResponse>, AppError> {
    let following = SocialService::new(state.db.clone())
        .toggle_follow(auth.user_id, id)
        .await?;
    tracing::debug!(follower_id = %auth.user_id, following_id = %id, following, "toggled follow");
    Ok(Json(FollowResponse { following }))
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

pub async fn create_upload_url(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UploadTarget>, AppError> {
    let service = PostService::new(state.db.clone(), state.storage.clone());
    let target = service
        .create_upload(auth.user_id, state.upload_url_ttl_seconds)
        .await?;
    Ok(Json(target))
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub storage_key: String,
    pub caption: Option<String>,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreatePostRequest>,
) -> Result<Json<Post>, AppError> {
    if payload.storage_key.trim().is_empty() {
        return Err(AppError::bad_request("storage_key is required"));
    }

    let service = PostService::new(state.db.clone(), state.storage.clone());
    let post = service
        .create_post(auth.user_id, payload.storage_key, payload.caption)
        .await?;
    Ok(Json(post))
}

pub async fn delete_post(
    AppPath(id): AppPath<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = PostService::new(state.db.clone(), state.storage.clone());
    service.delete_post(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct LikeResponse {
    pub liked: bool,
}

pub async fn toggle_like(
    AppPath(id): AppPath<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<LikeResponse>, AppError> {
    let liked = EngagementService::new(state.db.clone())
        .toggle_like(auth.user_id, id)
        .await?;
    Ok(Json(LikeResponse { liked }))
}

#[derive(Serialize)]
pub struct BookmarkResponse {
    pub bookmarked: bool,
}

pub async fn toggle_bookmark(
    AppPath(id): AppPath<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BookmarkResponse>, AppError> {
    let bookmarked = EngagementService::new(state.db.clone())
        .toggle_bookmark(auth.user_id, id)
        .await?;
    Ok(Json(BookmarkResponse { bookmarked }))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

pub async fn add_comment(
    AppPath(id): AppPath<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let comment = EngagementService::new(state.db.clone())
        .add_comment(auth.user_id, id, payload.content)
        .await?;
    Ok(Json(comment))
}

pub async fn list_comments(
    AppPath(id): AppPath<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    let comments = EngagementService::new(state.db.clone())
        .list_comments(id)
        .await?;
    Ok(Json(comments))
}

// ---------------------------------------------------------------------------
// Feed & notifications
// ---------------------------------------------------------------------------

pub async fn home_feed(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedPost>>, AppError> {
    let posts = FeedService::new(state.db.clone())
        .home_feed(auth.user_id)
        .await?;
    Ok(Json(posts))
}

pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<NotificationView>>, AppError> {
    let notifications = NotificationService::new(state.db.clone())
        .list(auth.user_id)
        .await?;
    Ok(Json(notifications))
}
