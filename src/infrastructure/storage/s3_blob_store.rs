use super::blob_store::{BlobStore, StorageError};
use async_trait::async_trait;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client as S3Client};
use std::sync::Arc;
use std::time::Duration;

/// AWS S3 implementation of the blob store, scoped to a single bucket
pub struct S3BlobStore {
    s3_client: Arc<S3Client>,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(s3_client: Arc<S3Client>, bucket: String) -> Self {
        Self { s3_client, bucket }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let result = self
            .s3_client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                if e.as_service_error().map(|se| se.is_no_such_key()).unwrap_or(false) {
                    return Ok(None);
                }
                tracing::error!(error = ?e, bucket = %self.bucket, key, "S3 get_object failed");
                return Err(StorageError::backend(key, format!("S3 get_object error: {}", e)));
            }
        };

        let body = output.body.collect().await.map_err(|e| {
            tracing::error!(error = %e, key, "Failed to collect S3 object body");
            StorageError::backend(key, format!("Failed to read object body: {}", e))
        })?;

        Ok(Some(body.into_bytes().to_vec()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let size = bytes.len();
        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, bucket = %self.bucket, key, size, "S3 put_object failed");
                StorageError::backend(key, format!("S3 put_object error: {}", e))
            })?;

        tracing::debug!(key, size, content_type, "Object stored");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        // S3 answers 204 for keys that do not exist
        self.s3_client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, bucket = %self.bucket, key, "S3 delete_object failed");
                StorageError::backend(key, format!("S3 delete_object error: {}", e))
            })?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .s3_client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(error = ?e, bucket = %self.bucket, prefix, "S3 list_objects_v2 failed");
                    StorageError::backend(prefix, format!("S3 list_objects_v2 error: {}", e))
                })?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .s3_client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => Ok(false),
            Err(e) => {
                tracing::error!(error = ?e, bucket = %self.bucket, key, "S3 head_object failed");
                Err(StorageError::backend(key, format!("S3 head_object error: {}", e)))
            }
        }
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::Invalid(format!("Invalid presigning TTL: {}", e)))?;

        let request = self
            .s3_client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, bucket = %self.bucket, key, "S3 presigning failed");
                StorageError::backend(key, format!("S3 presign error: {}", e))
            })?;

        Ok(request.uri().to_string())
    }
}
