//! Writes compressed images to their bucket under a timestamp-derived key.

use crate::{
    models::{bucket::Bucket, media::CompressedAsset, object::StoredObject},
    services::object_storage::ObjectStorage,
};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[error("upload to `{bucket}` failed: {reason}")]
pub struct UploadError {
    pub bucket: Bucket,
    pub reason: String,
}

#[derive(Clone)]
pub struct Uploader {
    storage: Arc<dyn ObjectStorage>,
}

impl Uploader {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Store `blob` as `<epoch-millis>.<suggested_ext>` and return its URL.
    ///
    /// Keys are not checked for collisions; a second upload in the same
    /// millisecond overwrites the first.
    pub async fn upload(
        &self,
        blob: &CompressedAsset,
        bucket: Bucket,
        suggested_ext: &str,
    ) -> Result<StoredObject, UploadError> {
        let key = object_key(Utc::now().timestamp_millis(), suggested_ext);

        self.storage
            .upload(
                bucket,
                &key,
                blob.bytes.clone(),
                Some(blob.mime_type.as_str()),
                true,
            )
            .await
            .map_err(|err| UploadError {
                bucket,
                reason: err.to_string(),
            })?;

        let public_url = self.storage.public_url(bucket, &key);
        debug!("uploaded {} bytes to {}", blob.size_bytes(), public_url);

        Ok(StoredObject {
            key,
            public_url,
            bucket,
        })
    }
}

/// `<millis>.<ext>`, or just `<millis>` when there is no extension.
pub fn object_key(millis: i64, ext: &str) -> String {
    let ext = ext.trim_start_matches('.');
    if ext.is_empty() {
        millis.to_string()
    } else {
        format!("{}.{}", millis, ext)
    }
}
