//! # unistore
//!
//! One file/directory abstraction over local filesystems, network shares and
//! S3-compatible object storage.
//!
//! ## Features
//!
//! - **Path classification**: `s3://bucket/key` paths go to the object store,
//!   `\\server\share\` paths and everything else go to the local filesystem.
//!   A trailing `/` or `\` marks a directory.
//! - **Uniform handles**: [`StorageDirectory`] and [`StorageFile`] behave the
//!   same on every backend, including byte streams opened for read or write.
//! - **Tree operations**: copy, move, purge and inspect whole directory trees,
//!   within one backend or across two.
//!   - Per-call `recurse`, `overwrite`, `stop_on_error` and `verbose` options.
//!   - Failures are logged once and either propagated or counted.
//! - **Implicit object directories**: prefixes that only exist because deeper
//!   keys do are listed and treated as real directories.
//!
//! ## Example: Copy a local tree into a bucket
//!
//! ```no_run
//! use unistore::{DirectoryExt, Dispatcher, StorageConfig, TransferOptions};
//!
//! # async fn example() -> unistore::Result<()> {
//! let config = StorageConfig::from_file("storage.toml")?;
//! let dispatcher = Dispatcher::from_config(&config);
//!
//! let source = dispatcher.directory("/srv/exports/")?;
//! let target = dispatcher.directory("s3://archive/exports/")?;
//! source.copy_to(target.as_ref(), TransferOptions::default()).await?;
//!
//! let total = target.total_objects().await?;
//! println!("{} entries copied", total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Example: Whole-file content
//!
//! ```no_run
//! use unistore::{Dispatcher, FileExt};
//!
//! # async fn example() -> unistore::Result<()> {
//! let dispatcher = Dispatcher::default();
//! let mut notes = dispatcher.file("/tmp/notes.txt")?;
//! notes.write_all_lines(&["first", "second"]).await?;
//! assert_eq!(notes.read_all_lines().await?, ["first", "second"]);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fs;
pub mod log;
pub mod path;

// Re-export commonly used types
pub use api::{ObjectClient, ObjectStoreClient};
pub use config::{LogTarget, ObjectStoreConfig, StorageConfig};
pub use dispatch::{Clients, Dispatcher};
pub use error::{Result, StorageError};
pub use fs::{
    AccessType, DeleteOptions, DirectoryExt, FileExt, FileStream, LocalDirectory, LocalFile,
    ObjectDirectory, ObjectFile, StorageDirectory, StorageFile, TransferOptions,
};
pub use log::{CallbackSink, LogSink, Logger, MemorySink, StdoutSink, TracingSink};
pub use path::PathKind;
