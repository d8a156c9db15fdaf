//! HTTP handlers: public listings, media, auth, admin CRUD and health.

pub mod admin_handlers;
pub mod auth_handlers;
pub mod content_handlers;
pub mod health_handlers;
pub mod media_handlers;
