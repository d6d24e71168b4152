//! Blob storage for original uploads (S3 / MinIO).

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;

/// Object key for an uploaded original: `{owner_id}/{cv_id}/{filename}`.
pub fn object_key(owner_id: Uuid, cv_id: Uuid, filename: &str) -> String {
    format!("{owner_id}/{cv_id}/{filename}")
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key` and returns the retrievable path.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError>;

    async fn delete(&self, path: &str) -> Result<(), AppError>;

    /// Time-limited download URL; `None` when signing fails.
    async fn sign(&self, path: &str, ttl_secs: u64) -> Option<String>;
}

pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(key.to_string())
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 delete failed: {e}")))?;

        info!("Deleted s3://{}/{}", self.bucket, path);
        Ok(())
    }

    async fn sign(&self, path: &str, ttl_secs: u64) -> Option<String> {
        let presign = match PresigningConfig::expires_in(Duration::from_secs(ttl_secs)) {
            Ok(config) => config,
            Err(e) => {
                warn!("Invalid signed URL expiry {ttl_secs}s: {e}");
                return None;
            }
        };
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presign)
            .await
        {
            Ok(request) => Some(request.uri().to_string()),
            Err(e) => {
                warn!("Failed to sign URL for {path}: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory blob store. `fail_puts` / `fail_deletes` simulate an outage.
    #[derive(Default)]
    pub(crate) struct MemoryBlobStore {
        pub objects: Mutex<HashMap<String, Vec<u8>>>,
        pub fail_puts: bool,
        pub fail_deletes: bool,
    }

    #[async_trait]
    impl BlobStore for MemoryBlobStore {
        async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String, AppError> {
            if self.fail_puts {
                return Err(AppError::Storage("bucket unavailable".into()));
            }
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(key.to_string())
        }

        async fn delete(&self, path: &str) -> Result<(), AppError> {
            if self.fail_deletes {
                return Err(AppError::Storage("bucket unavailable".into()));
            }
            self.objects.lock().unwrap().remove(path);
            Ok(())
        }

        async fn sign(&self, path: &str, ttl_secs: u64) -> Option<String> {
            self.objects
                .lock()
                .unwrap()
                .contains_key(path)
                .then(|| format!("memory://{path}?expires={ttl_secs}"))
        }
    }

    #[test]
    fn test_object_key_layout() {
        let owner = Uuid::nil();
        let cv = Uuid::parse_str("6f1c2a4e-0000-4000-8000-000000000001").unwrap();
        assert_eq!(
            object_key(owner, cv, "jane.pdf"),
            "00000000-0000-0000-0000-000000000000/6f1c2a4e-0000-4000-8000-000000000001/jane.pdf"
        );
    }

    #[tokio::test]
    async fn test_memory_store_signs_only_existing_objects() {
        let store = MemoryBlobStore::default();
        let path = store.put("a/b/c.pdf", vec![1, 2], "application/pdf").await.unwrap();
        assert!(store.sign(&path, 60).await.is_some());
        store.delete(&path).await.unwrap();
        assert!(store.sign(&path, 60).await.is_none());
    }
}
