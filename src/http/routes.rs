use axum::{routing::get, routing::post, Router};
use axum::extract::DefaultBodyLimit;

use crate::http::handlers;
use crate::AppState;

const WEBHOOK_BODY_LIMIT_BYTES: usize = 256 * 1024;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn webhooks() -> Router<AppState> {
    Router::new()
        .route("/clerk-webhook", post(handlers::identity_webhook))
        .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT_BYTES))
}

pub fn me() -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(handlers::get_current_user).patch(handlers::update_profile),
        )
        .route("/me/posts", get(handlers::list_my_posts))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/:id", get(handlers::get_user))
        .route("/users/:id/posts", get(handlers::list_user_posts))
        .route(
            "/users/:id/follow",
            get(handlers::follow_status).post(handlers::toggle_follow),
        )
}

pub fn identities() -> Router<AppState> {
    Router::new().route(
        "/identities/:external_id/user",
        get(handlers::get_user_by_external_id),
    )
}

pub fn media() -> Router<AppState> {
    Router::new().route("/media/upload-url", post(handlers::create_upload_url))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id", axum::routing::delete(handlers::delete_post))
        .route("/posts/:id/like", post(handlers::toggle_like))
        .route("/posts/:id/bookmark", post(handlers::toggle_bookmark))
        .route(
            "/posts/:id/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::home_feed))
}

pub fn notifications() -> Router<AppState> {
    Router::new().route("/notifications", get(handlers::list_notifications))
}
