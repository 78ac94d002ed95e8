//! Raw key/value client contract for object stores.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::fs::stream::{BoxedReader, BoxedWriter};

/// Default number of keys requested per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// One object as reported by a listing or head request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key, relative to the bucket. Directory markers end in `/`.
    pub key: String,
    /// Object size in bytes
    pub size: u64,
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    /// Objects in this page
    pub objects: Vec<ObjectInfo>,
    /// Pass as `start_after` to fetch the next page; `None` on the last page
    pub next_start_after: Option<String>,
}

/// Client handle for one object-store service.
///
/// Keys are plain strings. A key ending in `/` is a directory marker; the
/// implementation decides how it is stored.
#[async_trait]
pub trait ObjectClient: Send + Sync + std::fmt::Debug {
    /// List keys under `prefix` (string prefix match, recursive), in key order.
    ///
    /// # Arguments
    /// * `start_after` - Only keys after this one are returned
    /// * `max_keys` - Upper bound on `objects.len()`
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage>;

    /// Fetch one object's metadata; `None` when it does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>>;

    /// Store an object, replacing any previous content.
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()>;

    /// Remove an object. Removing a missing object succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Open an object for sequential reading.
    async fn open_read(&self, bucket: &str, key: &str) -> Result<BoxedReader>;

    /// Open an object for writing. Content is committed on shutdown.
    async fn open_write(&self, bucket: &str, key: &str) -> Result<BoxedWriter>;

    /// Keys requested per listing page.
    fn page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    /// List every key under `prefix`, following pagination to the end.
    async fn list_all(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut start_after: Option<String> = None;
        loop {
            let page = self
                .list_objects(bucket, prefix, start_after.as_deref(), self.page_size())
                .await?;
            objects.extend(page.objects);
            match page.next_start_after {
                Some(next) => start_after = Some(next),
                None => break,
            }
        }
        Ok(objects)
    }
}
