//! Deletes the stored image of a record that is about to be removed.
//!
//! The storage key is recovered from the last path segment of the record's
//! URL. A URL edited by hand to point elsewhere yields the wrong key, or
//! none at all; that case is logged and otherwise tolerated.

use crate::{models::bucket::Bucket, services::object_storage::ObjectStorage};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
#[error("could not delete `{key}` from `{bucket}`: {cause}")]
pub struct ReclaimError {
    pub bucket: Bucket,
    pub key: String,
    pub cause: String,
}

#[derive(Clone)]
pub struct Reclaimer {
    storage: Arc<dyn ObjectStorage>,
}

impl Reclaimer {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Remove the object behind `image_url` from `bucket`.
    ///
    /// Returns the key that was removed, or `None` when the URL is empty and
    /// nothing had to be done.
    pub async fn reclaim(
        &self,
        bucket: Bucket,
        image_url: &str,
    ) -> Result<Option<String>, ReclaimError> {
        let Some(key) = storage_key_from_url(image_url) else {
            if !image_url.is_empty() {
                warn!("no storage key in image URL `{}`; skipping reclaim", image_url);
            }
            return Ok(None);
        };

        self.storage
            .remove(bucket, &[key.to_string()])
            .await
            .map_err(|err| ReclaimError {
                bucket,
                key: key.to_string(),
                cause: err.to_string(),
            })?;

        debug!("reclaimed {}/{}", bucket, key);
        Ok(Some(key.to_string()))
    }
}

/// Trailing path segment of `url`, if non-empty.
pub fn storage_key_from_url(url: &str) -> Option<&str> {
    url.rsplit('/').next().filter(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::object_storage::{StorageError, StorageResult};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        removed: Mutex<Vec<(Bucket, Vec<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl ObjectStorage for Recording {
        async fn upload(
            &self,
            _bucket: Bucket,
            _key: &str,
            _body: Bytes,
            _content_type: Option<&str>,
            _overwrite: bool,
        ) -> StorageResult<()> {
            Ok(())
        }

        fn public_url(&self, bucket: Bucket, key: &str) -> String {
            format!("https://cdn.example.com/{}/{}", bucket, key)
        }

        async fn remove(&self, bucket: Bucket, keys: &[String]) -> StorageResult<()> {
            if self.fail {
                return Err(StorageError::InvalidObjectKey);
            }
            self.removed.lock().unwrap().push((bucket, keys.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn key_is_last_path_segment() {
        assert_eq!(
            storage_key_from_url("https://x.supabase.co/storage/v1/object/public/project-images/1700.png"),
            Some("1700.png")
        );
        assert_eq!(storage_key_from_url(""), None);
        assert_eq!(storage_key_from_url("https://cdn.example.com/dir/"), None);
        assert_eq!(storage_key_from_url("plain-name.png"), Some("plain-name.png"));
    }

    #[tokio::test]
    async fn empty_url_issues_no_delete() {
        let storage = Arc::new(Recording::default());
        let removed = Reclaimer::new(storage.clone())
            .reclaim(Bucket::ProjectImages, "")
            .await
            .unwrap();
        assert_eq!(removed, None);
        assert!(storage.removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn removes_key_from_owning_bucket() {
        let storage = Arc::new(Recording::default());
        let removed = Reclaimer::new(storage.clone())
            .reclaim(
                Bucket::CertificateImages,
                "https://cdn.example.com/certificate-images/42.webp",
            )
            .await
            .unwrap();
        assert_eq!(removed.as_deref(), Some("42.webp"));
        assert_eq!(
            *storage.removed.lock().unwrap(),
            vec![(Bucket::CertificateImages, vec!["42.webp".to_string()])]
        );
    }

    #[tokio::test]
    async fn storage_failure_is_reported() {
        let storage = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let err = Reclaimer::new(storage)
            .reclaim(Bucket::SkillIcons, "https://cdn.example.com/skill-icons/1.svg")
            .await
            .unwrap_err();
        assert_eq!(err.key, "1.svg");
        assert_eq!(err.bucket, Bucket::SkillIcons);
    }
}
