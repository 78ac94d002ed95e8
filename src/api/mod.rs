//! Object-store client layer injected into object-backed entries.

pub mod client;
pub mod store;

pub use client::{DEFAULT_PAGE_SIZE, ObjectClient, ObjectInfo, ObjectPage};
pub use store::{MARKER_SUFFIX, ObjectStoreClient};
