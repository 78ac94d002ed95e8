//! Decomposition of `scheme://bucket/key` paths.

use crate::error::{Result, StorageError};
use crate::path::{self, SCHEME_DELIMITER};

/// Immutable identity of an object-store path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    full_name: String,
    root: String,
    bucket: String,
    key: String,
}

impl ObjectPath {
    /// Parse a path like `s3://bucket/some/key`.
    ///
    /// Only `/` separates segments; every other character, whitespace and
    /// backslashes included, belongs to the key.
    pub fn parse(raw: &str) -> Result<Self> {
        if path::scheme(raw).is_none() {
            return Err(StorageError::InvalidPath(format!(
                "[{}] is not an object-store path",
                raw
            )));
        }

        let split = raw
            .find(SCHEME_DELIMITER)
            .map(|idx| idx + SCHEME_DELIMITER.len())
            .ok_or_else(|| StorageError::InvalidPath(raw.to_string()))?;
        let (root, rest) = raw.split_at(split);
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(StorageError::InvalidPath(format!("[{}] has no bucket", raw)));
        }

        Ok(Self {
            root: root.to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            full_name: raw.to_string(),
        })
    }

    /// The path as given, with `/` separators.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// `scheme://`
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Bucket name
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key; empty at the bucket root.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Check if the path is the bucket itself.
    pub fn is_bucket_root(&self) -> bool {
        self.key.is_empty()
    }

    /// Full name of `key` in the same bucket.
    pub fn sibling(&self, key: &str) -> String {
        format!("{}{}/{}", self.root, self.bucket, key)
    }

    /// Path of the entry `name` directly below this directory path.
    ///
    /// `self` must be separator-terminated; `name` is appended verbatim.
    pub fn child(&self, name: &str, directory: bool) -> Self {
        let suffix = if directory { "/" } else { "" };
        Self {
            full_name: format!("{}{}{}", self.full_name, name, suffix),
            root: self.root.clone(),
            bucket: self.bucket.clone(),
            key: format!("{}{}{}", self.key, name, suffix),
        }
    }

    /// Full name of the containing directory; `None` for the bucket root.
    pub fn parent(&self) -> Option<String> {
        if self.is_bucket_root() {
            return None;
        }
        let trimmed = self.key.trim_end_matches('/');
        let parent_key = match trimmed.rfind('/') {
            Some(idx) => &trimmed[..=idx],
            None => "",
        };
        Some(self.sibling(parent_key))
    }

    /// Last key segment, or the bucket name at the bucket root.
    pub fn name(&self) -> &str {
        if self.is_bucket_root() {
            &self.bucket
        } else {
            path::last_segment(&self.key, |c| c == '/')
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decomposes() {
        let p = ObjectPath::parse("s3://bucket/root/child/leaf.txt").unwrap();
        assert_eq!(p.root(), "s3://");
        assert_eq!(p.bucket(), "bucket");
        assert_eq!(p.key(), "root/child/leaf.txt");
        assert_eq!(p.name(), "leaf.txt");
        assert_eq!(p.parent().as_deref(), Some("s3://bucket/root/child/"));
    }

    #[test]
    fn test_bucket_root() {
        let p = ObjectPath::parse("s3://bucket/").unwrap();
        assert!(p.is_bucket_root());
        assert_eq!(p.name(), "bucket");
        assert_eq!(p.parent(), None);

        let top = ObjectPath::parse("s3://bucket/top/").unwrap();
        assert_eq!(top.parent().as_deref(), Some("s3://bucket/"));
        assert_eq!(top.name(), "top");
    }

    #[test]
    fn test_parse_rejects() {
        assert!(ObjectPath::parse("/local/path").is_err());
        assert!(ObjectPath::parse("s3:///key").is_err());
    }

    #[test]
    fn test_keys_kept_verbatim() {
        let p = ObjectPath::parse(r"s3://bucket/dir\a ").unwrap();
        assert_eq!(p.key(), r"dir\a ");
        assert_eq!(p.name(), r"dir\a ");
        assert_eq!(p.parent().as_deref(), Some("s3://bucket/"));

        let dir = ObjectPath::parse("s3://bucket/dir/").unwrap();
        let child = dir.child(" b ", false);
        assert_eq!(child.full_name(), "s3://bucket/dir/ b ");
        assert_eq!(child.key(), "dir/ b ");
        assert_eq!(child.name(), " b ");
        assert_eq!(dir.child("sub", true).key(), "dir/sub/");
    }
}
