//! Object store trait definition.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Remote side of a bucket sync.
///
/// Keys are relative to the store's prefix.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every key under the prefix.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Returns the stored content hash of `key`, if the object carries one.
    async fn object_hash(&self, key: &str) -> Result<Option<String>>;

    /// Uploads `path` to `key`, recording `sha256` with the object.
    async fn upload(&self, key: &str, path: &Path, sha256: &str) -> Result<()>;

    /// Deletes `key`.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Returns a printable location such as `s3://bucket/prefix/`.
    fn location(&self) -> String;
}
