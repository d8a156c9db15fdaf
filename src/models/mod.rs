//! Core data models for the portfolio admin backend.
//!
//! Content records map to database tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`. Blobs and stored objects describe the image files
//! flowing through the ingestion pipeline.

pub mod bucket;
pub mod certificate;
pub mod media;
pub mod object;
pub mod project;
pub mod resource;
pub mod skill;
