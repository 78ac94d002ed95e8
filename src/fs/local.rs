//! Local and network-share filesystem backend.

use std::io::ErrorKind;
use std::path::{Component, Path};

use async_trait::async_trait;

use super::entry::{DeleteOptions, StorageDirectory, StorageFile, settle};
use super::stream::{AccessType, FileStream, StreamSlot};
use crate::error::{Result, StorageError};
use crate::log::Logger;
use crate::path::{is_network, is_separator, last_segment};

/// Make a local path absolute without touching the disk. Network paths are
/// already absolute.
fn absolute(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(StorageError::InvalidPath("empty path".to_string()));
    }
    if is_network(raw) {
        return Ok(raw.to_string());
    }
    std::path::absolute(raw)?
        .into_os_string()
        .into_string()
        .map_err(|p| StorageError::InvalidPath(p.to_string_lossy().into_owned()))
}

/// What counts as a separator in `path`: both kinds on network shares, the
/// platform's own otherwise.
fn separator_test(path: &str) -> fn(char) -> bool {
    if is_network(path) {
        is_separator
    } else {
        std::path::is_separator
    }
}

fn separator_for(path: &str) -> char {
    if is_network(path) {
        '\\'
    } else {
        std::path::MAIN_SEPARATOR
    }
}

/// `\\server\share\` of a network path.
fn network_root(path: &str) -> String {
    let mut parts = path
        .trim_start_matches(is_separator)
        .split(is_separator)
        .filter(|s| !s.is_empty());
    match (parts.next(), parts.next()) {
        (Some(server), Some(share)) => format!(r"\\{}\{}\", server, share),
        (Some(server), None) => format!(r"\\{}\", server),
        _ => r"\\".to_string(),
    }
}

/// Drive prefix and root directory of a local path (`/`, `C:\`).
fn local_root(path: &str) -> String {
    let mut root = std::path::PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => root.push(component),
            _ => break,
        }
    }
    root.to_string_lossy().into_owned()
}

/// Parent of a separator-terminated or plain path, keeping the separator.
fn parent_of(full_name: &str, root: &str) -> Option<String> {
    if full_name.len() <= root.len() {
        return None;
    }
    let splits = separator_test(full_name);
    let trimmed = full_name.trim_end_matches(splits);
    let idx = trimmed.rfind(splits)?;
    let parent = &full_name[..=idx];
    (parent.len() >= root.len()).then(|| parent.to_string())
}

fn not_found(full_name: &str, e: std::io::Error) -> StorageError {
    if e.kind() == ErrorKind::NotFound {
        StorageError::NotFound(full_name.to_string())
    } else {
        e.into()
    }
}

/// A directory on a local disk or network share.
#[derive(Debug, Clone)]
pub struct LocalDirectory {
    full_name: String,
    name: String,
    parent: Option<String>,
    root: String,
    separator: char,
    logger: Logger,
}

impl LocalDirectory {
    /// Create a handle for `path`, appending a trailing separator if missing.
    pub fn new(path: &str, logger: Logger) -> Result<Self> {
        let separator = separator_for(path);
        let mut full_name = absolute(path)?;
        if !full_name.ends_with(separator_test(&full_name)) {
            full_name.push(separator);
        }
        let root = if is_network(&full_name) {
            network_root(&full_name)
        } else {
            local_root(&full_name)
        };

        Ok(Self {
            name: last_segment(&full_name, separator_test(&full_name)).to_string(),
            parent: parent_of(&full_name, &root),
            root,
            separator,
            full_name,
            logger,
        })
    }

    /// Handle for the child directory `name`, taken as is.
    fn directory_named(&self, name: &str) -> LocalDirectory {
        LocalDirectory {
            full_name: format!("{}{}{}", self.full_name, name, self.separator),
            name: name.to_string(),
            parent: Some(self.full_name.clone()),
            root: self.root.clone(),
            separator: self.separator,
            logger: self.logger.clone(),
        }
    }

    /// Handle for the child file `name`, taken as is.
    fn file_named(&self, name: &str) -> LocalFile {
        LocalFile {
            full_name: format!("{}{}", self.full_name, name),
            name: name.to_string(),
            logger: self.logger.clone(),
            stream: StreamSlot::new(),
        }
    }

    /// A child name must stay one entry directly below this directory.
    fn check_name(&self, name: &str) -> Result<()> {
        let splits = separator_test(&self.full_name);
        if name.is_empty() || name == "." || name == ".." || name.contains(splits) {
            return Err(StorageError::InvalidPath(format!(
                "[{}] is not an entry name in [{}]",
                name, self.full_name
            )));
        }
        Ok(())
    }

    async fn remove(&self, recurse: bool) -> Result<bool> {
        if !self.exists().await? {
            return Ok(false);
        }
        if recurse {
            tokio::fs::remove_dir_all(&self.full_name).await?;
        } else {
            let mut entries = tokio::fs::read_dir(&self.full_name).await?;
            if entries.next_entry().await?.is_some() {
                return Err(StorageError::NotEmpty(self.full_name.clone()));
            }
            tokio::fs::remove_dir(&self.full_name).await?;
        }
        Ok(true)
    }

    /// Names of immediate children, split into directories and files.
    async fn children(&self) -> Result<(Vec<String>, Vec<String>)> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.full_name)
            .await
            .map_err(|e| not_found(&self.full_name, e))?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follow symlinks so a linked directory lists as a directory.
            let meta = match tokio::fs::metadata(entry.path()).await {
                Ok(meta) => meta,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if meta.is_dir() {
                dirs.push(name);
            } else {
                files.push(name);
            }
        }

        Ok((dirs, files))
    }
}

#[async_trait]
impl StorageDirectory for LocalDirectory {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn root(&self) -> &str {
        &self.root
    }

    fn separator(&self) -> char {
        self.separator
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }

    async fn create(&self, fail_if_exists: bool) -> Result<()> {
        if self.exists().await? {
            if fail_if_exists {
                return Err(StorageError::AlreadyExists(self.full_name.clone()));
            }
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.full_name).await?;
        self.logger
            .info(format!("Directory [{}] Was Created.", self.full_name));
        Ok(())
    }

    async fn delete(&self, options: DeleteOptions) -> Result<()> {
        let result = self.remove(options.recurse).await.map(|removed| {
            if removed && options.verbose {
                self.logger
                    .info(format!("Directory [{}] Was Deleted.", self.full_name));
            }
        });
        settle(&self.logger, result, options.stop_on_error)
    }

    async fn exists(&self) -> Result<bool> {
        match tokio::fs::metadata(&self.full_name).await {
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn create_file(&self, path: &str) -> Result<Box<dyn StorageFile>> {
        Ok(Box::new(LocalFile::new(path, self.logger.clone())?))
    }

    fn create_directory(&self, path: &str) -> Result<Box<dyn StorageDirectory>> {
        Ok(Box::new(LocalDirectory::new(path, self.logger.clone())?))
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

/// A file on a local disk or network share.
#[derive(Debug)]
pub struct LocalFile {
    full_name: String,
    name: String,
    logger: Logger,
    stream: StreamSlot,
}

impl LocalFile {
    /// Create a handle for `path`. A trailing separator is rejected.
    pub fn new(path: &str, logger: Logger) -> Result<Self> {
        if path.ends_with(separator_test(path)) {
            return Err(StorageError::InvalidPath(format!(
                "file path [{}] ends in a separator",
                path
            )));
        }
        let full_name = absolute(path)?;
        Ok(Self {
            name: last_segment(&full_name, separator_test(&full_name)).to_string(),
            full_name,
            logger,
            stream: StreamSlot::new(),
        })
    }

    async fn open_backend(&self, access: AccessType) -> Result<FileStream> {
        match access {
            AccessType::Read => {
                let file = tokio::fs::File::open(&self.full_name)
                    .await
                    .map_err(|e| not_found(&self.full_name, e))?;
                Ok(FileStream::reader(&self.full_name, Box::new(file)))
            }
            AccessType::Write => {
                if let Some(parent) = Path::new(&self.full_name).parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let file = tokio::fs::File::create(&self.full_name).await?;
                Ok(FileStream::writer(&self.full_name, Box::new(file)))
            }
        }
    }

    /// Replace the file with an empty one, leaving the write stream open.
    async fn truncate(&mut self, overwrite: bool) -> Result<()> {
        if !overwrite && self.exists().await? {
            return Err(StorageError::AlreadyExists(self.full_name.clone()));
        }
        self.stream.close().await?;
        let stream = self.open_backend(AccessType::Write).await?;
        self.stream.put(stream);
        Ok(())
    }

    async fn remove(&mut self) -> Result<bool> {
        self.stream.close().await?;
        match tokio::fs::remove_file(&self.full_name).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StorageFile for LocalFile {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }

    async fn create(&mut self, overwrite: bool) -> Result<()> {
        match self.truncate(overwrite).await {
            Ok(()) => {
                self.logger
                    .info(format!("File [{}] Was Created.", self.full_name));
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
                    .info(format!("File [{}] Was Deleted.", self.full_name));
            }
        });
        settle(&self.logger, result, options.stop_on_error)
    }

    async fn exists(&self) -> Result<bool> {
        match tokio::fs::metadata(&self.full_name).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
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
        Ok(Box::new(LocalFile::new(path, self.logger.clone())?))
    }

    fn create_directory(&self, path: &str) -> Result<Box<dyn StorageDirectory>> {
        Ok(Box::new(LocalDirectory::new(path, self.logger.clone())?))
    }
}
