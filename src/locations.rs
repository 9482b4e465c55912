//! Resource location resolution
//!
//! `schemaLocation` values on include/import directives are resolved
//! relative to the location of the document that carries them.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Resource location - can be a URL, file path, or string identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ftp, etc.)
    Url(Url),
    /// String identifier (for in-memory resources)
    String(String),
}

impl Location {
    /// Create a location from a string (auto-detect type)
    pub fn parse(s: &str) -> Self {
        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Location::Path(path);
                }
            } else if url.scheme().len() > 1 {
                // single-letter schemes are Windows drive letters
                return Location::Url(url);
            }
        }

        let path = PathBuf::from(s);
        if path.exists() || s.starts_with('/') || s.starts_with('.') || s.contains('/') {
            return Location::Path(path);
        }

        Location::String(s.to_string())
    }

    /// Resolve a reference relative to this location
    pub fn join(&self, reference: &str) -> Result<Location> {
        if let Ok(url) = Url::parse(reference) {
            if url.scheme() != "file" && url.scheme().len() > 1 {
                return Ok(Location::Url(url));
            }
        }

        match self {
            Location::Path(base) => Ok(Location::Path(join_path(base, reference))),
            Location::Url(base) => Ok(Location::Url(base.join(reference)?)),
            Location::String(_) => Ok(Location::parse(reference)),
        }
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::String(s) => s.clone(),
        }
    }

    /// Stable identifier used to recognise the same document reached twice
    pub fn identifier(&self) -> Result<String> {
        match self {
            Location::Path(p) => {
                let absolute = match p.canonicalize() {
                    Ok(canonical) => canonical,
                    Err(_) if p.is_absolute() => p.clone(),
                    Err(_) => std::env::current_dir()?.join(p),
                };
                Url::from_file_path(&absolute)
                    .map(|u| u.to_string())
                    .map_err(|_| {
                        Error::Resource(format!(
                            "cannot form a file URL from '{}'",
                            absolute.display()
                        ))
                    })
            }
            Location::Url(u) => Ok(u.to_string()),
            Location::String(s) => Ok(s.clone()),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

fn join_path(base: &Path, reference: &str) -> PathBuf {
    let reference = Path::new(reference);
    if reference.is_absolute() {
        return reference.to_path_buf();
    }
    match base.parent() {
        Some(dir) => dir.join(reference),
        None => reference.to_path_buf(),
    }
}
