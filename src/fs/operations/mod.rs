//! Backend-agnostic operations built on the entry contract.

mod transfer;
mod tree;

pub use transfer::FileExt;
pub use tree::DirectoryExt;
