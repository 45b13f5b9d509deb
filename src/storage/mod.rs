pub mod memory_store;
pub mod s3_store;

use anyhow::Result;
use async_trait::async_trait;

/// Write access to an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `bucket`/`key`, replacing any existing object.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()>;
}
