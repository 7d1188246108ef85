//! S3 object store.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use tracing::debug;

use crate::error::{FnshipError, Result, SyncError};

use super::store::ObjectStore;

/// User metadata key holding the content hash.
pub const HASH_METADATA_KEY: &str = "sha256";

/// S3-backed object store.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    /// S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Key prefix, empty or ending in `/`.
    prefix: String,
}

impl S3ObjectStore {
    /// Creates a store for `bucket` from the ambient credential chain.
    pub async fn new(bucket: &str, prefix: &str, region: &str) -> Self {
        let config = aws_config::from_env()
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self::with_client(Client::new(&config), bucket, prefix)
    }

    /// Creates a store with an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: &str, prefix: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        }
    }

    /// Full key for a relative key.
    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn error(&self, operation: &'static str, key: &str, message: impl Into<String>) -> FnshipError {
        FnshipError::Sync(SyncError::s3(operation, &self.bucket, self.key(key), message))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&self.prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| self.error("list", "", DisplayErrorContext(&e).to_string()))?;
            for object in page.contents() {
                let Some(full) = object.key() else {
                    continue;
                };
                if let Some(relative) = full.strip_prefix(&self.prefix)
                    && !relative.is_empty()
                {
                    keys.push(relative.to_string());
                }
            }
        }

        debug!("Listed {} object(s) in {}", keys.len(), self.location());
        Ok(keys)
    }

    async fn object_hash(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key(key))
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .metadata()
                .and_then(|m| m.get(HASH_METADATA_KEY))
                .cloned()),
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(self.error("head", key, DisplayErrorContext(&service_err).to_string()))
                }
            }
        }
    }

    async fn upload(&self, key: &str, path: &Path, sha256: &str) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(key))
            .body(ByteStream::from(bytes))
            .metadata(HASH_METADATA_KEY, sha256)
            .send()
            .await
            .map_err(|e| self.error("put", key, DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.key(key))
            .send()
            .await
            .map_err(|e| self.error("delete", key, DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.prefix)
    }
}
