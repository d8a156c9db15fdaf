//! Image ingestion pipeline and the collaborators it drives.

pub mod compressor;
pub mod notifier;
pub mod object_storage;
pub mod pipeline;
pub mod reclaimer;
pub mod records;
pub mod session;
pub mod uploader;
