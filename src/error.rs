//! Error types for the unistore library.

use thiserror::Error;

/// Main error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The target of an operation is absent when it must be present.
    #[error("[{0}] Does Not Exist.")]
    NotFound(String),

    /// Creation collided with an existing entry and overwriting was not allowed.
    #[error("[{0}] Already Exists.")]
    AlreadyExists(String),

    /// Non-recursive delete of a populated directory.
    #[error("Directory [{0}] Is Not Empty.")]
    NotEmpty(String),

    /// No client handle is configured for the backend a path needs.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The path scheme is not recognised.
    #[error("Unsupported path: {0}")]
    Unsupported(String),

    /// The path breaks the separator convention for the requested entry kind.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A stream was used against its access mode.
    #[error("Wrong stream access: {0}")]
    WrongAccess(String),

    /// Local I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Object store client error.
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Custom error message.
    #[error("{0}")]
    Custom(String),
}

impl StorageError {
    /// Check whether this error means the target was missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            StorageError::ObjectStore(object_store::Error::NotFound { .. }) => true,
            _ => false,
        }
    }

    /// Check whether this error is a creation collision.
    pub fn is_already_exists(&self) -> bool {
        match self {
            StorageError::AlreadyExists(_) => true,
            StorageError::Io(e) => e.kind() == std::io::ErrorKind::AlreadyExists,
            StorageError::ObjectStore(object_store::Error::AlreadyExists { .. }) => true,
            _ => false,
        }
    }

    /// Check whether this error came from a non-recursive delete guard.
    pub fn is_not_empty(&self) -> bool {
        matches!(self, StorageError::NotEmpty(_))
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
