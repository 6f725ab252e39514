pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use std::sync::Arc;

use crate::app::identity::IdentityVerifier;
use crate::infra::{db::Db, storage::AssetStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub storage: Arc<dyn AssetStore>,
    pub identity: IdentityVerifier,
    pub webhook_secret: Option<String>,
    pub upload_url_ttl_seconds: u64,
}
