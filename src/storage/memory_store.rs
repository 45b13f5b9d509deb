use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use crate::storage::ObjectStore;

/// An object written to a [`MemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

/// In-memory object store. Holds objects only for the lifetime of the store
/// instance; used for dry runs and local testing.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<Vec<StoredObject>>,
    fail_with: Option<String>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every write fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects
            .lock()
            .map(|objects| objects.clone())
            .unwrap_or_default()
    }

    pub fn put_count(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        if let Some(message) = &self.fail_with {
            anyhow::bail!("{}", message);
        }
        self.objects
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))?
            .push(StoredObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
                body,
                content_type: content_type.to_string(),
            });
        Ok(())
    }
}
