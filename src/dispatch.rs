//! Path-to-backend resolution.

use std::sync::Arc;

use crate::api::{ObjectClient, ObjectStoreClient};
use crate::config::StorageConfig;
use crate::error::{Result, StorageError};
use crate::fs::{
    DeleteOptions, LocalDirectory, LocalFile, ObjectDirectory, ObjectFile, StorageDirectory,
    StorageFile,
};
use crate::log::Logger;
use crate::path::{self, OBJECT_SCHEME, PathKind};

/// Client handles injected into every entry the dispatcher builds.
#[derive(Debug, Clone, Default)]
pub struct Clients {
    /// Object-store client; object paths fail with `BackendUnavailable` without it
    pub object: Option<Arc<dyn ObjectClient>>,
    /// Logger handed to every entry
    pub logger: Logger,
}

impl Clients {
    /// Local-only clients with the given logger.
    pub fn new(logger: Logger) -> Self {
        Self {
            object: None,
            logger,
        }
    }

    /// Serve object-store paths through `client`.
    pub fn with_object_client(mut self, client: Arc<dyn ObjectClient>) -> Self {
        self.object = Some(client);
        self
    }

    /// Build clients from configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        let object = config.object_store.clone().map(|settings| {
            let client = ObjectStoreClient::from_config(settings)
                .with_page_size(config.list_page_size);
            Arc::new(client) as Arc<dyn ObjectClient>
        });
        Self {
            object,
            logger: config.logger(),
        }
    }

    fn object_client(&self, path: &str) -> Result<Arc<dyn ObjectClient>> {
        self.object.clone().ok_or_else(|| {
            StorageError::BackendUnavailable(format!(
                "no object-store client configured for [{}]",
                path
            ))
        })
    }
}

/// Builds the right file or directory handle for a path.
///
/// # Example
/// ```no_run
/// use unistore::{Clients, Dispatcher, DirectoryExt, TransferOptions};
///
/// # async fn example() -> unistore::Result<()> {
/// let dispatcher = Dispatcher::new(Clients::default());
/// let source = dispatcher.directory("/var/reports/")?;
/// let target = dispatcher.create_directory("/backup/reports/", false).await?;
/// source.copy_to(target.as_ref(), TransferOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    clients: Clients,
}

impl Dispatcher {
    /// Create a dispatcher over `clients`.
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }

    /// Create a dispatcher from configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(Clients::from_config(config))
    }

    /// The injected clients.
    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    /// Classify `path`, rejecting empty paths and unknown schemes.
    pub fn classify(&self, path: &str) -> Result<PathKind> {
        let kind = path::classify(path);
        match kind {
            PathKind::Unknown => Err(StorageError::Unsupported("empty path".to_string())),
            _ if kind.is_object() => match path::scheme(path) {
                Some(scheme) if scheme == OBJECT_SCHEME => Ok(kind),
                Some(scheme) => Err(StorageError::Unsupported(format!(
                    "scheme [{}] in [{}]",
                    scheme, path
                ))),
                None => Err(StorageError::Unsupported(path.to_string())),
            },
            _ => Ok(kind),
        }
    }

    /// File handle for `path`. No I/O.
    pub fn file(&self, path: &str) -> Result<Box<dyn StorageFile>> {
        let logger = self.clients.logger.clone();
        match self.classify(path)? {
            PathKind::LocalFile | PathKind::NetworkFile => Ok(Box::new(LocalFile::new(path, logger)?)),
            PathKind::ObjectFile => Ok(Box::new(ObjectFile::new(
                path,
                self.clients.object_client(path)?,
                logger,
            )?)),
            _ => Err(StorageError::InvalidPath(format!(
                "[{}] names a directory",
                path
            ))),
        }
    }

    /// Directory handle for `path`. No I/O.
    pub fn directory(&self, path: &str) -> Result<Box<dyn StorageDirectory>> {
        let logger = self.clients.logger.clone();
        match self.classify(path)? {
            PathKind::LocalDirectory | PathKind::NetworkDirectory => {
                Ok(Box::new(LocalDirectory::new(path, logger)?))
            }
            PathKind::ObjectDirectory => Ok(Box::new(ObjectDirectory::new(
                path,
                self.clients.object_client(path)?,
                logger,
            )?)),
            _ => Err(StorageError::InvalidPath(format!(
                "[{}] names a file; directories end in a separator",
                path
            ))),
        }
    }

    /// Create the file at `path`. A write stream may be left open on the
    /// returned handle.
    pub async fn create_file(&self, path: &str, overwrite: bool) -> Result<Box<dyn StorageFile>> {
        let mut file = self.file(path)?;
        file.create(overwrite).await?;
        Ok(file)
    }

    /// Create the directory at `path`.
    pub async fn create_directory(
        &self,
        path: &str,
        fail_if_exists: bool,
    ) -> Result<Box<dyn StorageDirectory>> {
        let directory = self.directory(path)?;
        directory.create(fail_if_exists).await?;
        Ok(directory)
    }

    /// Delete whatever `path` names.
    pub async fn delete(&self, path: &str, options: DeleteOptions) -> Result<()> {
        if self.classify(path)?.is_directory() {
            self.directory(path)?.delete(options).await
        } else {
            self.file(path)?.delete(options).await
        }
    }

    /// Check if whatever `path` names exists.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        if self.classify(path)?.is_directory() {
            self.directory(path)?.exists().await
        } else {
            self.file(path)?.exists().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{DirectoryExt, FileExt};
    use crate::log::MemorySink;
    use object_store::memory::InMemory;
    use tempfile::TempDir;

    fn dispatcher() -> Dispatcher {
        let client = ObjectStoreClient::new().with_bucket("bucket", Arc::new(InMemory::new()));
        Dispatcher::new(
            Clients::new(Logger::new(Arc::new(MemorySink::new())))
                .with_object_client(Arc::new(client)),
        )
    }

    #[test]
    fn test_resolution_errors() {
        let local_only = Dispatcher::new(Clients::new(Logger::new(Arc::new(MemorySink::new()))));
        assert!(matches!(
            local_only.directory("s3://bucket/dir/").unwrap_err(),
            StorageError::BackendUnavailable(_)
        ));
        assert!(matches!(
            local_only.file("").unwrap_err(),
            StorageError::Unsupported(_)
        ));
        assert!(matches!(
            local_only.file("gs://bucket/key").unwrap_err(),
            StorageError::Unsupported(_)
        ));
        assert!(matches!(
            local_only.file("/tmp/dir/").unwrap_err(),
            StorageError::InvalidPath(_)
        ));
        assert!(matches!(
            local_only.directory("/tmp/file.txt").unwrap_err(),
            StorageError::InvalidPath(_)
        ));
    }

    #[test]
    fn test_builds_matching_backend() {
        let dispatcher = dispatcher();
        let dir = dispatcher.directory("S3://bucket/a/").unwrap();
        assert_eq!(dir.root(), "S3://");
        assert_eq!(dir.name(), "a");

        let network = dispatcher.directory(r"\\server\share\x\").unwrap();
        assert_eq!(network.root(), r"\\server\share\");

        let file = dispatcher.file("s3://bucket/a/b.txt").unwrap();
        assert_eq!(file.name(), "b.txt");
    }

    #[tokio::test]
    async fn test_path_helpers() {
        let dispatcher = dispatcher();
        let tmp = TempDir::new().unwrap();
        let local = format!("{}/made/", tmp.path().to_str().unwrap());

        dispatcher.create_directory(&local, false).await.unwrap();
        assert!(dispatcher.exists(&local).await.unwrap());

        let mut file = dispatcher
            .create_file("s3://bucket/made/x.txt", true)
            .await
            .unwrap();
        file.close_stream().await.unwrap();
        file.write_all_text("dispatched").await.unwrap();
        assert!(dispatcher.exists("s3://bucket/made/x.txt").await.unwrap());
        assert!(dispatcher.exists("s3://bucket/made/").await.unwrap());

        let bucket_dir = dispatcher.directory("s3://bucket/made/").unwrap();
        assert!(!bucket_dir.is_empty().await.unwrap());

        dispatcher
            .delete("s3://bucket/made/", DeleteOptions::default())
            .await
            .unwrap();
        assert!(!dispatcher.exists("s3://bucket/made/x.txt").await.unwrap());
        dispatcher
            .delete(&local, DeleteOptions::default())
            .await
            .unwrap();
        assert!(!dispatcher.exists(&local).await.unwrap());
    }

    #[test]
    fn test_from_config() {
        let config = StorageConfig::from_toml_str("log_label = \"cfg\"").unwrap();
        let dispatcher = Dispatcher::from_config(&config);
        assert!(dispatcher.clients().object.is_none());
        assert_eq!(dispatcher.clients().logger.label(), Some("cfg"));

        let config = StorageConfig::from_toml_str(
            "[object_store]\nendpoint = \"http://localhost:9000\"\nallow_http = true",
        )
        .unwrap();
        assert!(Dispatcher::from_config(&config).clients().object.is_some());
    }
}
