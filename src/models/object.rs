//! Represents an uploaded file resident in a bucket.

use super::bucket::Bucket;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A file that was written to object storage and is addressable by URL.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Key within the bucket (`<epoch-millis>.<ext>`).
    pub key: String,

    /// Publicly resolvable URL derived from `(bucket, key)`.
    pub public_url: String,

    /// Bucket the object lives in.
    pub bucket: Bucket,
}

/// Metadata row kept by the local storage adapter for each payload on disk.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ObjectEntry {
    /// Bucket name (see [`Bucket::as_str`]).
    pub bucket: String,

    /// Object key within the bucket.
    pub key: String,

    /// Content type (MIME type) recorded at upload time.
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the payload.
    pub etag: String,

    /// Timestamp of the last write to this key.
    pub last_modified: DateTime<Utc>,
}
