//! Request path to filesystem path mapping.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Path resolution failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("request path is not valid UTF-8 once decoded")]
    InvalidEncoding,

    #[error("request path contains a NUL byte")]
    NulByte,

    #[error("request path escapes the site root: {0}")]
    Traversal(String),
}

/// Decode `uri_path` and collapse its `.` and `..` segments.
///
/// The result starts with `/` and has no empty, `.` or `..` segments, so routes
/// and files are looked up on the same spelling of the path.
///
/// # Errors
///
/// Returns [`ResolveError`] if the decoded path is not UTF-8, contains a NUL
/// byte, or climbs above the root.
pub fn normalize_path(uri_path: &str) -> Result<String, ResolveError> {
    let decoded = percent_decode_str(uri_path)
        .decode_utf8()
        .map_err(|_| ResolveError::InvalidEncoding)?;
    if decoded.contains('\0') {
        return Err(ResolveError::NulByte);
    }

    let segments = segments(&decoded).ok_or_else(|| ResolveError::Traversal(uri_path.to_owned()))?;
    Ok(format!("/{}", segments.join("/")))
}

/// Path segments of `path` with dot segments applied, `None` if `..` escapes.
fn segments(path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }
    Some(segments)
}

/// Maps a normalized request path to the file it names.
pub trait PathResolver: Send + Sync {
    /// Resolve `path`, as returned by [`normalize_path`], to a filesystem path.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the path cannot be mapped.
    fn resolve(&self, path: &str) -> Result<PathBuf, ResolveError>;
}

/// Resolves request paths below a site root directory.
#[derive(Clone, Debug)]
pub struct RootResolver {
    root: PathBuf,
}

impl RootResolver {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PathResolver for RootResolver {
    fn resolve(&self, path: &str) -> Result<PathBuf, ResolveError> {
        if path.contains('\0') {
            return Err(ResolveError::NulByte);
        }
        let segments = segments(path).ok_or_else(|| ResolveError::Traversal(path.to_owned()))?;
        Ok(segments
            .iter()
            .fold(self.root.clone(), |root, segment| root.join(segment)))
    }
}
