//! Telegram update handlers

pub mod download;
pub mod schema;
pub mod types;

pub use download::handle_url_message;
pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
