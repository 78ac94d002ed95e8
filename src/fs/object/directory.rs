//! Pseudo-directories over an object store.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::file::ObjectFile;
use super::key::ObjectPath;
use crate::api::ObjectClient;
use crate::error::{Result, StorageError};
use crate::fs::entry::{DeleteOptions, StorageDirectory, StorageFile, settle};
use crate::log::Logger;
use crate::path::with_trailing_separator;

/// A directory in an object store.
///
/// The directory exists when its marker object (`key/`) exists or when any
/// object lives under its prefix. The bucket root always exists if the
/// bucket can be listed.
#[derive(Debug, Clone)]
pub struct ObjectDirectory {
    path: ObjectPath,
    parent: Option<String>,
    client: Arc<dyn ObjectClient>,
    logger: Logger,
}

impl ObjectDirectory {
    /// Create a handle for `path`, appending a trailing `/` if missing.
    pub fn new(path: &str, client: Arc<dyn ObjectClient>, logger: Logger) -> Result<Self> {
        let path = ObjectPath::parse(&with_trailing_separator(path, '/'))?;
        Ok(Self::from_path(path, client, logger))
    }

    fn from_path(path: ObjectPath, client: Arc<dyn ObjectClient>, logger: Logger) -> Self {
        Self {
            parent: path.parent(),
            path,
            client,
            logger,
        }
    }

    fn directory_named(&self, name: &str) -> ObjectDirectory {
        Self::from_path(self.path.child(name, true), self.client.clone(), self.logger.clone())
    }

    fn file_named(&self, name: &str) -> ObjectFile {
        ObjectFile::from_path(self.path.child(name, false), self.client.clone(), self.logger.clone())
    }

    /// A child name must be one non-empty key segment.
    fn check_name(&self, name: &str) -> Result<()> {
        if name.is_empty() || name.contains('/') {
            return Err(StorageError::InvalidPath(format!(
                "[{}] is not an entry name in [{}]",
                name,
                self.full_name()
            )));
        }
        Ok(())
    }

    /// Bucket this directory lives in.
    pub fn bucket(&self) -> &str {
        self.path.bucket()
    }

    /// Key prefix of this directory; empty at the bucket root.
    pub fn key(&self) -> &str {
        self.path.key()
    }

    /// Names of immediate children, split into directories and files.
    ///
    /// Child directories come from marker keys and from the first segment of
    /// deeper keys alike.
    async fn children(&self) -> Result<(Vec<String>, Vec<String>)> {
        let prefix = self.path.key();
        let objects = self.client.list_all(self.bucket(), prefix).await?;

        let mut dirs = BTreeSet::new();
        let mut files = Vec::new();
        for object in objects {
            let Some(relative) = object.key.strip_prefix(prefix) else {
                continue;
            };
            match relative.split_once('/') {
                Some((dir, _)) if !dir.is_empty() => {
                    dirs.insert(dir.to_string());
                }
                Some(_) => {}
                None if !relative.is_empty() => files.push(relative.to_string()),
                None => {}
            }
        }

        Ok((dirs.into_iter().collect(), files))
    }

    async fn remove(&self, recurse: bool) -> Result<bool> {
        if !self.exists().await? {
            return Ok(false);
        }

        if recurse {
            let objects = self.client.list_all(self.bucket(), self.key()).await?;
            for object in objects {
                self.client.delete_object(self.bucket(), &object.key).await?;
            }
        } else {
            // The store would happily drop the marker and orphan the children.
            let (dirs, files) = self.children().await?;
            if !dirs.is_empty() || !files.is_empty() {
                return Err(StorageError::NotEmpty(self.full_name().to_string()));
            }
        }

        if !self.path.is_bucket_root() {
            self.client.delete_object(self.bucket(), self.key()).await?;
        }
        Ok(true)
    }
}

#[async_trait]
impl StorageDirectory for ObjectDirectory {
    fn full_name(&self) -> &str {
        self.path.full_name()
    }

    fn name(&self) -> &str {
        self.path.name()
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn root(&self) -> &str {
        self.path.root()
    }

    fn separator(&self) -> char {
        '/'
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }

    async fn create(&self, fail_if_exists: bool) -> Result<()> {
        if self.exists().await? {
            if fail_if_exists {
                return Err(StorageError::AlreadyExists(self.full_name().to_string()));
            }
            return Ok(());
        }
        self.client
            .put_object(self.bucket(), self.key(), Bytes::new())
            .await?;
        self.logger
            .info(format!("Directory [{}] Was Created.", self.full_name()));
        Ok(())
    }

    async fn delete(&self, options: DeleteOptions) -> Result<()> {
        let result = self.remove(options.recurse).await.map(|removed| {
            if removed && options.verbose {
                self.logger
                    .info(format!("Directory [{}] Was Deleted.", self.full_name()));
            }
        });
        settle(&self.logger, result, options.stop_on_error)
    }

    async fn exists(&self) -> Result<bool> {
        if !self.path.is_bucket_root()
            && self
                .client
                .head_object(self.bucket(), self.key())
                .await?
                .is_some()
        {
            return Ok(true);
        }
        let page = self
            .client
            .list_objects(self.bucket(), self.key(), None, 1)
            .await?;
        Ok(self.path.is_bucket_root() || !page.objects.is_empty())
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

    fn child_file(&self, name: &str) -> Result<Box<dyn StorageFile>> {
        self.check_name(name)?;
        Ok(Box::new(self.file_named(name)))
    }

    fn child_directory(&self, name: &str) -> Result<Box<dyn StorageDirectory>> {
        self.check_name(name)?;
        Ok(Box::new(self.directory_named(name)))
    }

    async fn get_directories(&self) -> Result<Vec<Box<dyn StorageDirectory>>> {
        let (dirs, _) = self.children().await?;
        Ok(dirs
            .iter()
            .map(|name| Box::new(self.directory_named(name)) as Box<dyn StorageDirectory>)
            .collect())
    }

    async fn get_files(&self) -> Result<Vec<Box<dyn StorageFile>>> {
        let (_, files) = self.children().await?;
        Ok(files
            .iter()
            .map(|name| Box::new(self.file_named(name)) as Box<dyn StorageFile>)
            .collect())
    }
}
