pub mod engagement;
pub mod error;
pub mod feed;
pub mod identity;
pub mod notifications;
pub mod posts;
pub mod social;
pub mod users;
pub mod webhook;
