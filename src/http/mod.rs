use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod extract;
mod handlers;
mod routes;

pub use auth::AuthUser;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::webhooks())
        .merge(routes::me())
        .merge(routes::users())
        .merge(routes::identities())
        .merge(routes::media())
        .merge(routes::posts())
        .merge(routes::feed())
        .merge(routes::notifications())
        .with_state(state)
}
