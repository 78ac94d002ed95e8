//! Path classification and joining.
//!
//! A path that ends in a separator (`/` or `\`) names a directory; anything
//! else names a file. Everything in this crate relies on that convention.

/// Delimiter between a URL scheme and the rest of the path.
pub const SCHEME_DELIMITER: &str = "://";

/// Scheme served by the object-store backend.
pub const OBJECT_SCHEME: &str = "s3";

/// Backend family and entry kind a path denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    /// Empty path
    Unknown,
    /// File on a local filesystem
    LocalFile,
    /// Directory on a local filesystem
    LocalDirectory,
    /// File on a network share (`\\server\share\...`)
    NetworkFile,
    /// Directory on a network share
    NetworkDirectory,
    /// Object in an object store (`scheme://bucket/key`)
    ObjectFile,
    /// Pseudo-directory in an object store
    ObjectDirectory,
}

impl PathKind {
    /// Check if this kind is a directory variant.
    pub fn is_directory(&self) -> bool {
        matches!(
            self,
            PathKind::LocalDirectory | PathKind::NetworkDirectory | PathKind::ObjectDirectory
        )
    }

    /// Check if this kind is a file variant.
    pub fn is_file(&self) -> bool {
        matches!(
            self,
            PathKind::LocalFile | PathKind::NetworkFile | PathKind::ObjectFile
        )
    }

    /// Check if this kind lives in an object store.
    pub fn is_object(&self) -> bool {
        matches!(self, PathKind::ObjectFile | PathKind::ObjectDirectory)
    }
}

/// Determine the backend family and entry kind of a path.
pub fn classify(path: &str) -> PathKind {
    if path.is_empty() {
        return PathKind::Unknown;
    }

    let directory = is_directory(path);
    if scheme(path).is_some() {
        if directory {
            PathKind::ObjectDirectory
        } else {
            PathKind::ObjectFile
        }
    } else if is_network(path) {
        if directory {
            PathKind::NetworkDirectory
        } else {
            PathKind::NetworkFile
        }
    } else if directory {
        PathKind::LocalDirectory
    } else {
        PathKind::LocalFile
    }
}

/// Check if a character is a path separator.
pub fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Check if a path names a directory (ends in a separator).
pub fn is_directory(path: &str) -> bool {
    path.ends_with(is_separator)
}

/// Check if a path names a file (non-empty, no trailing separator).
pub fn is_file(path: &str) -> bool {
    !path.is_empty() && !is_directory(path)
}

/// Extract the URL scheme (`s3` in `s3://bucket/key`), lowercased.
///
/// Single letters are not schemes, so `C://data` stays a local path.
pub fn scheme(path: &str) -> Option<String> {
    let (candidate, _) = path.split_once(SCHEME_DELIMITER)?;
    let mut chars = candidate.chars();
    let first = chars.next()?;
    let valid = candidate.len() > 1
        && first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| candidate.to_ascii_lowercase())
}

/// Check if a path points at a network share.
pub fn is_network(path: &str) -> bool {
    path.starts_with(r"\\")
}

/// Join path segments with exactly one separator between them.
///
/// Only `separator` is stripped at segment boundaries; everything else in a
/// segment, whitespace included, is part of a name. Empty segments are
/// skipped. The result ends in a separator only when the last segment did.
pub fn combine(segments: &[&str], separator: char) -> String {
    let parts: Vec<&str> = segments.iter().copied().filter(|s| !s.is_empty()).collect();

    let mut combined = String::new();
    for (i, part) in parts.iter().enumerate() {
        let last = i + 1 == parts.len();
        if i == 0 {
            combined.push_str(part);
        } else {
            combined.push_str(part.trim_matches(separator));
        }

        let wants_separator = !last || part.ends_with(separator);
        if wants_separator && !combined.ends_with(separator) {
            combined.push(separator);
        }
    }

    combined
}

/// Append `separator` unless the path already ends in it.
pub(crate) fn with_trailing_separator(path: &str, separator: char) -> String {
    let mut path = path.to_string();
    if !path.ends_with(separator) {
        path.push(separator);
    }
    path
}

/// Last non-empty segment of a path, ignoring a trailing separator.
///
/// `splits` decides what counts as a separator on the path's backend.
pub(crate) fn last_segment<F>(path: &str, splits: F) -> &str
where
    F: Fn(char) -> bool + Copy,
{
    let trimmed = path.trim_end_matches(splits);
    match trimmed.rfind(splits) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
