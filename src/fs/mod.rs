//! File and directory handles over every supported backend.

pub mod entry;
pub mod local;
pub mod object;
mod operations;
pub mod stream;

pub use entry::{DeleteOptions, StorageDirectory, StorageFile, TransferOptions};
pub use local::{LocalDirectory, LocalFile};
pub use object::{ObjectDirectory, ObjectFile, ObjectPath};
pub use operations::{DirectoryExt, FileExt};
pub use stream::{AccessType, FileStream};
