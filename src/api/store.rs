//! [`ObjectClient`] implementation over the `object_store` crate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::buffered::{BufReader, BufWriter};
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore, PutPayload};

use super::client::{DEFAULT_PAGE_SIZE, ObjectClient, ObjectInfo, ObjectPage};
use crate::config::ObjectStoreConfig;
use crate::error::{Result, StorageError};
use crate::fs::stream::{BoxedReader, BoxedWriter};

/// Object name a directory marker `a/b/` is stored under (`a/b/$folder$`).
///
/// `object_store` paths cannot end in a delimiter, so markers get a leaf.
pub const MARKER_SUFFIX: &str = "$folder$";

/// Object client backed by one [`ObjectStore`] per bucket.
///
/// Buckets are either registered explicitly with [`with_bucket`] or built on
/// first use from an [`ObjectStoreConfig`] with `AmazonS3Builder`.
///
/// [`with_bucket`]: ObjectStoreClient::with_bucket
pub struct ObjectStoreClient {
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
    config: Option<ObjectStoreConfig>,
    page_size: usize,
}

impl ObjectStoreClient {
    /// Create a client with no buckets and no S3 settings.
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
            config: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Create a client that builds S3 stores from `config` on demand.
    pub fn from_config(config: ObjectStoreConfig) -> Self {
        Self {
            config: Some(config),
            ..Self::new()
        }
    }

    /// Serve `bucket` from an existing store.
    ///
    /// # Example
    /// ```
    /// use std::sync::Arc;
    /// use object_store::memory::InMemory;
    /// use unistore::api::ObjectStoreClient;
    ///
    /// let client = ObjectStoreClient::new().with_bucket("test", Arc::new(InMemory::new()));
    /// ```
    pub fn with_bucket(self, bucket: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        if let Ok(mut stores) = self.stores.lock() {
            stores.insert(bucket.into(), store);
        }
        self
    }

    /// Set the number of keys requested per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut stores = self
            .stores
            .lock()
            .map_err(|_| StorageError::Custom("object store registry poisoned".to_string()))?;

        if let Some(store) = stores.get(bucket) {
            return Ok(store.clone());
        }

        let config = self.config.as_ref().ok_or_else(|| {
            StorageError::BackendUnavailable(format!("no object store for bucket [{}]", bucket))
        })?;
        let store: Arc<dyn ObjectStore> = Arc::new(build_s3(config, bucket)?);
        stores.insert(bucket.to_string(), store.clone());
        Ok(store)
    }
}

impl Default for ObjectStoreClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets: Vec<String> = self
            .stores
            .lock()
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("ObjectStoreClient")
            .field("buckets", &buckets)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

fn build_s3(config: &ObjectStoreConfig, bucket: &str) -> Result<object_store::aws::AmazonS3> {
    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(bucket)
        .with_region(&config.region)
        .with_allow_http(config.allow_http);

    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }
    if let Some(access_key_id) = &config.access_key_id {
        builder = builder.with_access_key_id(access_key_id);
    }
    if let Some(secret_access_key) = &config.secret_access_key {
        builder = builder.with_secret_access_key(secret_access_key);
    }
    if let Some(token) = &config.session_token {
        builder = builder.with_token(token);
    }

    Ok(builder.build()?)
}

/// Map a key to the store location, giving directory markers their leaf.
fn to_location(key: &str) -> Result<Path> {
    let raw = if key.ends_with('/') {
        format!("{}{}", key, MARKER_SUFFIX)
    } else {
        key.to_string()
    };
    Path::parse(&raw).map_err(|e| StorageError::InvalidPath(format!("{}: {}", key, e)))
}

/// Inverse of [`to_location`].
fn to_key(location: &Path) -> String {
    let raw = location.as_ref();
    match raw.strip_suffix(MARKER_SUFFIX) {
        Some(dir) if dir.ends_with('/') => dir.to_string(),
        _ => raw.to_string(),
    }
}

/// Deepest complete directory of a string prefix: `a/b/c` lists under `a/b`.
fn list_root(prefix: &str) -> Result<Option<Path>> {
    match prefix.rfind('/') {
        Some(idx) => Ok(Some(
            Path::parse(&prefix[..idx])
                .map_err(|e| StorageError::InvalidPath(format!("{}: {}", prefix, e)))?,
        )),
        None => Ok(None),
    }
}

fn info(meta: &ObjectMeta) -> ObjectInfo {
    ObjectInfo {
        key: to_key(&meta.location),
        size: meta.size as u64,
    }
}

fn missing(bucket: &str, key: &str, e: object_store::Error) -> StorageError {
    match e {
        object_store::Error::NotFound { .. } => {
            StorageError::NotFound(format!("s3://{}/{}", bucket, key))
        }
        other => other.into(),
    }
}

#[async_trait]
impl ObjectClient for ObjectStoreClient {
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        start_after: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage> {
        let store = self.store(bucket)?;
        let root = list_root(prefix)?;
        let offset = start_after.map(to_location).transpose()?;

        // Pages follow store location order, so the offset of the next page is
        // the location of the last key handed out.
        let mut listing = match &offset {
            Some(offset) => store.list_with_offset(root.as_ref(), offset),
            None => store.list(root.as_ref()),
        };

        let max_keys = max_keys.max(1);
        let mut page = ObjectPage::default();
        while let Some(meta) = listing.next().await {
            let meta = meta?;
            let object = info(&meta);
            if !object.key.starts_with(prefix) {
                continue;
            }
            if page.objects.len() == max_keys {
                page.next_start_after = page.objects.last().map(|o| o.key.clone());
                break;
            }
            page.objects.push(object);
        }

        Ok(page)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectInfo>> {
        let store = self.store(bucket)?;
        match store.head(&to_location(key)?).await {
            Ok(meta) => Ok(Some(ObjectInfo {
                key: key.to_string(),
                size: meta.size as u64,
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        let store = self.store(bucket)?;
        store
            .put(&to_location(key)?, PutPayload::from(body))
            .await?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let store = self.store(bucket)?;
        match store.delete(&to_location(key)?).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn open_read(&self, bucket: &str, key: &str) -> Result<BoxedReader> {
        let store = self.store(bucket)?;
        let meta = store
            .head(&to_location(key)?)
            .await
            .map_err(|e| missing(bucket, key, e))?;
        Ok(Box::new(BufReader::new(store, &meta)))
    }

    async fn open_write(&self, bucket: &str, key: &str) -> Result<BoxedWriter> {
        let store = self.store(bucket)?;
        Ok(Box::new(BufWriter::new(store, to_location(key)?)))
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}
