//! src/services/object_storage.rs
//!
//! Object storage boundary used by the ingestion pipeline, plus the local
//! adapter shipped with the server. Payloads live on disk sharded beneath
//! `base_path/{bucket}/{shard}/{shard}/{key}`; a small SQLite table keeps the
//! content type, size and etag so public URLs can be served with the right
//! headers.

use crate::models::{bucket::Bucket, object::ObjectEntry};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object `{key}` not found in bucket `{bucket}`")]
    ObjectNotFound { bucket: Bucket, key: String },
    #[error("object `{key}` already exists in bucket `{bucket}`")]
    ObjectExists { bucket: Bucket, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Operations the pipeline needs from an object storage service.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write `body` under `key`. With `overwrite`, an existing object with the
    /// same key is replaced instead of rejected.
    async fn upload(
        &self,
        bucket: Bucket,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
        overwrite: bool,
    ) -> StorageResult<()>;

    /// Public URL for `(bucket, key)`. Pure; does not check existence.
    fn public_url(&self, bucket: Bucket, key: &str) -> String;

    /// Remove the given keys. Keys that do not exist are ignored.
    async fn remove(&self, bucket: Bucket, keys: &[String]) -> StorageResult<()>;
}

/// Disk-backed [`ObjectStorage`] with SQLite metadata.
#[derive(Clone)]
pub struct LocalObjectStorage {
    /// Shared SQLite connection pool used for object metadata.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,

    /// Origin prepended to `/media/{bucket}/{key}` in public URLs.
    public_base_url: String,
}

const MAX_OBJECT_KEY_LEN: usize = 1024;

impl LocalObjectStorage {
    pub fn new(
        db: Arc<SqlitePool>,
        base_path: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Rejects empty, oversized, absolute or traversing keys.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StorageError::InvalidObjectKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StorageError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::InvalidObjectKey);
        }
        Ok(())
    }

    fn bucket_root(&self, bucket: Bucket) -> PathBuf {
        self.base_path.join(bucket.as_str())
    }

    /// Two-level shard directories from MD5(bucket/key).
    fn object_shards(bucket: Bucket, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, bucket: Bucket, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket, key);
        self.bucket_root(bucket).join(shard_a).join(shard_b).join(key)
    }

    async fn fetch_entry(&self, bucket: Bucket, key: &str) -> StorageResult<ObjectEntry> {
        sqlx::query_as::<_, ObjectEntry>(
            "SELECT bucket, key, content_type, size_bytes, etag, last_modified
             FROM objects WHERE bucket = ? AND key = ?",
        )
        .bind(bucket.as_str())
        .bind(key)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StorageError::ObjectNotFound {
                bucket,
                key: key.to_string(),
            },
            other => StorageError::Sqlx(other),
        })
    }

    /// Open an object for streaming out, together with its metadata.
    pub async fn open(&self, bucket: Bucket, key: &str) -> StorageResult<(ObjectEntry, File)> {
        self.ensure_key_safe(key)?;
        let entry = self.fetch_entry(bucket, key).await?;
        let file = File::open(self.object_path(bucket, key))
            .await
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    StorageError::ObjectNotFound {
                        bucket,
                        key: key.to_string(),
                    }
                } else {
                    StorageError::Io(err)
                }
            })?;
        Ok((entry, file))
    }

    /// Write to a temp file, fsync, then rename into place.
    async fn write_payload(&self, file_path: &Path, body: &[u8]) -> StorageResult<()> {
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let written = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(body).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(file_path).await?;
                fs::rename(&tmp_path, file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }
        Ok(())
    }

    /// Remove empty shard directories up to (not including) the bucket root.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(
        &self,
        bucket: Bucket,
        key: &str,
        body: Bytes,
        content_type: Option<&str>,
        overwrite: bool,
    ) -> StorageResult<()> {
        self.ensure_key_safe(key)?;
        let file_path = self.object_path(bucket, key);

        if !overwrite && fs::try_exists(&file_path).await? {
            return Err(StorageError::ObjectExists {
                bucket,
                key: key.to_string(),
            });
        }

        self.write_payload(&file_path, &body).await?;

        let etag = format!("{:x}", md5::compute(&body));
        let result = sqlx::query(
            r#"
            INSERT INTO objects (bucket, key, content_type, size_bytes, etag, last_modified)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(bucket, key) DO UPDATE SET
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                last_modified = excluded.last_modified
            "#,
        )
        .bind(bucket.as_str())
        .bind(key)
        .bind(content_type)
        .bind(body.len() as i64)
        .bind(&etag)
        .bind(Utc::now())
        .execute(&*self.db)
        .await;

        match result {
            Ok(_) => {
                debug!("stored {}/{} ({} bytes)", bucket, key, body.len());
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StorageError::Sqlx(err))
            }
        }
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/media/{}/{}", self.public_base_url, bucket, key)
    }

    async fn remove(&self, bucket: Bucket, keys: &[String]) -> StorageResult<()> {
        for key in keys {
            self.ensure_key_safe(key)?;

            sqlx::query("DELETE FROM objects WHERE bucket = ? AND key = ?")
                .bind(bucket.as_str())
                .bind(key)
                .execute(&*self.db)
                .await?;

            let file_path = self.object_path(bucket, key);
            match fs::remove_file(&file_path).await {
                Ok(_) => debug!("removed physical file {}", file_path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("file {} already missing", file_path.display());
                }
                Err(err) => return Err(StorageError::Io(err)),
            }

            if let Some(parent) = file_path.parent() {
                self.prune_empty_dirs(parent, &self.bucket_root(bucket)).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn storage(dir: &TempDir) -> LocalObjectStorage {
        let pool = db::connect_in_memory().await.unwrap();
        LocalObjectStorage::new(Arc::new(pool), dir.path(), "http://localhost:3000/")
    }

    #[tokio::test]
    async fn upload_then_open_round_trips_payload_and_metadata() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;

        storage
            .upload(
                Bucket::ProjectImages,
                "1700000000000.webp",
                Bytes::from_static(b"webp-bytes"),
                Some("image/webp"),
                true,
            )
            .await
            .unwrap();

        let (entry, mut file) = storage
            .open(Bucket::ProjectImages, "1700000000000.webp")
            .await
            .unwrap();
        assert_eq!(entry.content_type.as_deref(), Some("image/webp"));
        assert_eq!(entry.size_bytes, 10);
        assert_eq!(entry.etag, format!("{:x}", md5::compute(b"webp-bytes")));

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"webp-bytes");
    }

    #[tokio::test]
    async fn overwrite_replaces_existing_object() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let key = "42.png";

        for body in [&b"first"[..], &b"second"[..]] {
            storage
                .upload(Bucket::SkillIcons, key, Bytes::copy_from_slice(body), None, true)
                .await
                .unwrap();
        }

        let (entry, _) = storage.open(Bucket::SkillIcons, key).await.unwrap();
        assert_eq!(entry.size_bytes, 6);

        let err = storage
            .upload(Bucket::SkillIcons, key, Bytes::from_static(b"third"), None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectExists { .. }));
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_prunes_shards() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let key = "7.jpg".to_string();

        storage
            .upload(Bucket::CertificateImages, &key, Bytes::from_static(b"x"), None, true)
            .await
            .unwrap();
        storage
            .remove(Bucket::CertificateImages, std::slice::from_ref(&key))
            .await
            .unwrap();
        storage
            .remove(Bucket::CertificateImages, std::slice::from_ref(&key))
            .await
            .unwrap();

        assert!(matches!(
            storage.open(Bucket::CertificateImages, &key).await,
            Err(StorageError::ObjectNotFound { .. })
        ));
        let bucket_root = dir.path().join("certificate-images");
        let mut entries = fs::read_dir(&bucket_root).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_traversal_keys() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        let err = storage
            .upload(Bucket::ProjectImages, "../escape", Bytes::new(), None, true)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidObjectKey));
    }

    #[tokio::test]
    async fn public_url_is_derived_from_bucket_and_key() {
        let dir = TempDir::new().unwrap();
        let storage = storage(&dir).await;
        assert_eq!(
            storage.public_url(Bucket::SkillIcons, "1.svg"),
            "http://localhost:3000/media/skill-icons/1.svg"
        );
    }
}
