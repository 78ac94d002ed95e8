//! Object-store backend: directories synthesized from key prefixes.

mod directory;
mod file;
mod key;

pub use directory::ObjectDirectory;
pub use file::ObjectFile;
pub use key::ObjectPath;
