//! Objects exposed as files.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::directory::ObjectDirectory;
use super::key::ObjectPath;
use crate::api::ObjectClient;
use crate::error::{Result, StorageError};
use crate::fs::entry::{DeleteOptions, StorageDirectory, StorageFile, settle};
use crate::fs::stream::{AccessType, FileStream, StreamSlot};
use crate::log::Logger;

/// A single object in an object store.
///
/// Write streams upload as they go and commit on close; content written to a
/// stream that is never closed is lost.
#[derive(Debug)]
pub struct ObjectFile {
    path: ObjectPath,
    client: Arc<dyn ObjectClient>,
    logger: Logger,
    stream: StreamSlot,
}

impl ObjectFile {
    /// Create a handle for `path`. A trailing `/` is rejected.
    pub fn new(path: &str, client: Arc<dyn ObjectClient>, logger: Logger) -> Result<Self> {
        if path.ends_with('/') {
            return Err(StorageError::InvalidPath(format!(
                "file path [{}] ends in a separator",
                path
            )));
        }
        let path = ObjectPath::parse(path)?;
        if path.is_bucket_root() {
            return Err(StorageError::InvalidPath(format!(
                "[{}] has no object key",
                path.full_name()
            )));
        }
        Ok(Self::from_path(path, client, logger))
    }

    pub(super) fn from_path(path: ObjectPath, client: Arc<dyn ObjectClient>, logger: Logger) -> Self {
        Self {
            path,
            client,
            logger,
            stream: StreamSlot::new(),
        }
    }

    /// Bucket this object lives in.
    pub fn bucket(&self) -> &str {
        self.path.bucket()
    }

    /// Object key.
    pub fn key(&self) -> &str {
        self.path.key()
    }

    async fn open_backend(&self, access: AccessType) -> Result<FileStream> {
        match access {
            AccessType::Read => {
                let reader = self
                    .client
                    .open_read(self.bucket(), self.key())
                    .await
                    .map_err(|e| {
                        if e.is_not_found() {
                            StorageError::NotFound(self.full_name().to_string())
                        } else {
                            e
                        }
                    })?;
                Ok(FileStream::reader(self.full_name(), reader))
            }
            AccessType::Write => {
                let writer = self.client.open_write(self.bucket(), self.key()).await?;
                Ok(FileStream::writer(self.full_name(), writer))
            }
        }
    }

    /// Put an empty object, then leave a write stream open on it.
    async fn truncate(&mut self, overwrite: bool) -> Result<()> {
        if !overwrite && self.exists().await? {
            return Err(StorageError::AlreadyExists(self.full_name().to_string()));
        }
        self.stream.close().await?;
        self.client
            .put_object(self.bucket(), self.key(), Bytes::new())
            .await?;
        let stream = self.open_backend(AccessType::Write).await?;
        self.stream.put(stream);
        Ok(())
    }

    async fn remove(&mut self) -> Result<bool> {
        self.stream.close().await?;
        if !self.exists().await? {
            return Ok(false);
        }
        self.client.delete_object(self.bucket(), self.key()).await?;
        Ok(true)
    }
}

#[async_trait]
impl StorageFile for ObjectFile {
    fn full_name(&self) -> &str {
        self.path.full_name()
    }

    fn name(&self) -> &str {
        self.path.name()
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }

    async fn create(&mut self, overwrite: bool) -> Result<()> {
        match self.truncate(overwrite).await {
            Ok(()) => {
                self.logger
                    .info(format!("File [{}] Was Created.", self.full_name()));
                Ok(())
            }
            Err(e) => {
                self.logger.error(&e);
                Err(e)
            }
        }
    }

    async fn delete(&mut self, options: DeleteOptions) -> Result<()> {
        let result = self.remove().await.map(|removed| {
            if removed && options.verbose {
                self.logger
                    .info(format!("File [{}] Was Deleted.", self.full_name()));
            }
        });
        settle(&self.logger, result, options.stop_on_error)
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self
            .client
            .head_object(self.bucket(), self.key())
            .await?
            .is_some())
    }

    async fn open_stream(&mut self, access: AccessType) -> Result<&mut FileStream> {
        if self.stream.holds(access)? {
            return self.stream.current();
        }
        let stream = self.open_backend(access).await?;
        Ok(self.stream.put(stream))
    }

    async fn close_stream(&mut self) -> Result<()> {
        self.stream.close().await
    }

    fn stream_access(&self) -> Option<AccessType> {
        self.stream.access()
    }

    fn create_file(&self, path: &str) -> Result<Box<dyn StorageFile>> {
        Ok(Box::new(ObjectFile::new(
            path,
            self.client.clone(),
            self.logger.clone(),
        )?))
    }

    fn create_directory(&self, path: &str) -> Result<Box<dyn StorageDirectory>> {
        Ok(Box::new(ObjectDirectory::new(
            path,
            self.client.clone(),
            self.logger.clone(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ObjectStoreClient;
    use object_store::memory::InMemory;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn file(path: &str) -> ObjectFile {
        let client: Arc<dyn ObjectClient> =
            Arc::new(ObjectStoreClient::new().with_bucket("bucket", Arc::new(InMemory::new())));
        ObjectFile::new(path, client, Logger::new(Arc::new(crate::log::MemorySink::new())))
            .unwrap()
    }

    #[test]
    fn test_rejects_directory_paths() {
        let client: Arc<dyn ObjectClient> = Arc::new(ObjectStoreClient::new());
        let err = ObjectFile::new("s3://bucket/dir/", client.clone(), Logger::default())
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
        assert!(ObjectFile::new("s3://bucket", client, Logger::default()).is_err());
    }

    #[tokio::test]
    async fn test_create_leaves_write_stream_open() {
        let mut f = file("s3://bucket/docs/new.txt");
        assert_eq!(f.name(), "new.txt");
        assert!(!f.exists().await.unwrap());

        f.create(true).await.unwrap();
        assert!(f.exists().await.unwrap());
        assert_eq!(f.stream_access(), Some(AccessType::Write));

        f.open_stream(AccessType::Write)
            .await
            .unwrap()
            .write_all(b"committed on close")
            .await
            .unwrap();
        f.close_stream().await.unwrap();

        let mut text = String::new();
        f.open_stream(AccessType::Read)
            .await
            .unwrap()
            .read_to_string(&mut text)
            .await
            .unwrap();
        assert_eq!(text, "committed on close");

        assert!(f.create(false).await.unwrap_err().is_already_exists());
    }

    #[tokio::test]
    async fn test_read_missing_and_mode_switch() {
        let mut f = file("s3://bucket/absent.bin");
        let err = f.open_stream(AccessType::Read).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(ref p) if p == "s3://bucket/absent.bin"));

        f.open_stream(AccessType::Write).await.unwrap();
        let err = f.open_stream(AccessType::Read).await.unwrap_err();
        assert!(matches!(err, StorageError::WrongAccess(_)));
        f.close_stream().await.unwrap();
        f.close_stream().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete() {
        let mut f = file("s3://bucket/x.txt");
        f.create(true).await.unwrap();
        f.delete(DeleteOptions::default()).await.unwrap();
        assert!(!f.exists().await.unwrap());
        assert!(!f.is_open());
        f.delete(DeleteOptions::default()).await.unwrap();
    }
}
