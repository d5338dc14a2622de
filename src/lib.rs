pub mod api_router;
pub mod attachments;
pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod security;
pub mod seed;
pub mod shared;
pub mod tickets;
pub mod users;
