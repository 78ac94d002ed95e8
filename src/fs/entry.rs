//! The file and directory contract every backend implements.

use async_trait::async_trait;

use super::stream::{AccessType, FileStream};
use crate::error::Result;
use crate::log::Logger;
use crate::path;

/// Flags for directory and file deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Remove everything below a directory as well. Ignored for files.
    pub recurse: bool,
    /// Return the first error instead of logging it and carrying on
    pub stop_on_error: bool,
    /// Log each removal
    pub verbose: bool,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            recurse: true,
            stop_on_error: true,
            verbose: true,
        }
    }
}

impl DeleteOptions {
    /// Set `recurse`.
    pub fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Set `stop_on_error`.
    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Set `verbose`.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Flags for copy and move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    /// Descend below the immediate children (copy only; moves always recurse)
    pub recurse: bool,
    /// Replace files that already exist at the destination
    pub overwrite: bool,
    /// Return the first error instead of logging it and carrying on
    pub stop_on_error: bool,
    /// Log a line per transferred entry
    pub verbose: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            recurse: true,
            overwrite: true,
            stop_on_error: true,
            verbose: true,
        }
    }
}

impl TransferOptions {
    /// Set `recurse`.
    pub fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    /// Set `overwrite`.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set `stop_on_error`.
    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Set `verbose`.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// A directory handle on some backend.
///
/// Handles are cheap: building one performs no I/O and the directory need not
/// exist. `full_name` always ends in a separator; every other identity field
/// is derived from it once, at construction.
#[async_trait]
pub trait StorageDirectory: Send + Sync + std::fmt::Debug {
    /// Canonical path or URL, separator-terminated.
    fn full_name(&self) -> &str;

    /// Last path segment.
    fn name(&self) -> &str;

    /// Full name of the containing directory; `None` at a root.
    fn parent(&self) -> Option<&str>;

    /// Backend root token (`/`, `C:\`, `s3://`, ...).
    fn root(&self) -> &str;

    /// Separator used when joining paths on this backend.
    fn separator(&self) -> char;

    /// Logger inherited by every child handle.
    fn logger(&self) -> &Logger;

    /// Create the directory. Existing directories are left alone unless
    /// `fail_if_exists`, which turns them into `AlreadyExists`.
    async fn create(&self, fail_if_exists: bool) -> Result<()>;

    /// Remove the directory.
    ///
    /// Without `recurse`, a populated directory fails with `NotEmpty` and is
    /// left untouched. Errors are always logged; they are returned only when
    /// `stop_on_error` is set.
    async fn delete(&self, options: DeleteOptions) -> Result<()>;

    /// Check if the directory exists.
    async fn exists(&self) -> Result<bool>;

    /// Same-backend file handle for `path`. No I/O.
    fn create_file(&self, path: &str) -> Result<Box<dyn StorageFile>>;

    /// Same-backend directory handle for `path`. No I/O.
    fn create_directory(&self, path: &str) -> Result<Box<dyn StorageDirectory>>;

    /// Handle for the child file called `name`. No I/O.
    ///
    /// The name is used verbatim; one that is empty or contains this backend's
    /// separator fails with `InvalidPath`.
    fn child_file(&self, name: &str) -> Result<Box<dyn StorageFile>>;

    /// Handle for the child directory called `name`. No I/O.
    fn child_directory(&self, name: &str) -> Result<Box<dyn StorageDirectory>>;

    /// Immediate child directories, freshly listed.
    async fn get_directories(&self) -> Result<Vec<Box<dyn StorageDirectory>>>;

    /// Immediate child files, freshly listed.
    async fn get_files(&self) -> Result<Vec<Box<dyn StorageFile>>>;

    /// Join segments with this backend's separator.
    ///
    /// # Example
    /// ```ignore
    /// dir.path_combine(&["s3://bucket/root/", "child/", "leaf/"]);
    /// // "s3://bucket/root/child/leaf/"
    /// ```
    fn path_combine(&self, segments: &[&str]) -> String {
        path::combine(segments, self.separator())
    }
}

/// A file handle on some backend.
///
/// A handle owns at most one open stream. Streams are released only by
/// [`close_stream`](StorageFile::close_stream) (or by operations that close
/// internally); dropping a handle with an open write stream loses the write.
#[async_trait]
pub trait StorageFile: Send + Sync + std::fmt::Debug {
    /// Canonical path or URL, never separator-terminated.
    fn full_name(&self) -> &str;

    /// File name.
    fn name(&self) -> &str;

    /// Logger inherited by every child handle.
    fn logger(&self) -> &Logger;

    /// Create the file, empty.
    ///
    /// An existing file fails with `AlreadyExists` unless `overwrite`.
    /// A write stream may be left open afterwards.
    async fn create(&mut self, overwrite: bool) -> Result<()>;

    /// Remove the file, closing any open stream first. Missing files are a
    /// no-op. `options.recurse` is ignored.
    async fn delete(&mut self, options: DeleteOptions) -> Result<()>;

    /// Check if the file exists.
    async fn exists(&self) -> Result<bool>;

    /// Open the single stream of this handle.
    ///
    /// Opening again in the same mode returns the stream already open. Reading
    /// a missing file fails with `NotFound`; writing creates or truncates.
    async fn open_stream(&mut self, access: AccessType) -> Result<&mut FileStream>;

    /// Close the open stream. No-op when nothing is open.
    async fn close_stream(&mut self) -> Result<()>;

    /// Mode of the open stream, if any.
    fn stream_access(&self) -> Option<AccessType>;

    /// Check if a stream is open.
    fn is_open(&self) -> bool {
        self.stream_access().is_some()
    }

    /// Same-backend file handle for `path`. No I/O.
    fn create_file(&self, path: &str) -> Result<Box<dyn StorageFile>>;

    /// Same-backend directory handle for `path`. No I/O.
    fn create_directory(&self, path: &str) -> Result<Box<dyn StorageDirectory>>;
}

/// Log a failed step and decide whether it ends the operation.
pub(crate) fn settle(logger: &Logger, result: Result<()>, stop_on_error: bool) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            logger.error(&e);
            if stop_on_error {
                Err(e)
            } else {
                Ok(())
            }
        }
    }
}
