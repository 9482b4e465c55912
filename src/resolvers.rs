//! Schema resolvers
//!
//! A resolver supplies one schema document: a stable identifier, a display
//! name, the document text, and resolution of the `schemaLocation` values
//! found in that document's include/import directives.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::locations::Location;

/// Source of one schema document
pub trait SchemaResolver: fmt::Debug {
    /// Stable identifier; two resolvers with the same identifier supply the same document
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Open the document text
    fn content(&self) -> Result<Box<dyn Read + '_>>;

    /// Resolve a `schemaLocation` found in this document
    ///
    /// Returns `Ok(None)` when nothing exists at the location. Errors are
    /// reserved for locations that cannot be handled at all.
    fn resolve(
        &self,
        location: &str,
        namespace_hint: Option<&str>,
    ) -> Result<Option<Arc<dyn SchemaResolver>>>;
}

/// Read a resolver's content to a string
pub fn read_content(resolver: &dyn SchemaResolver, max_size: usize) -> Result<String> {
    let mut reader = resolver.content()?;
    let mut bytes = Vec::new();
    reader
        .by_ref()
        .take(max_size as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| {
            Error::Resource(format!("Failed to read schema '{}': {}", resolver.name(), e))
        })?;
    if bytes.len() > max_size {
        return Err(Error::LimitExceeded(format!(
            "schema '{}' exceeds maximum size of {} bytes",
            resolver.name(),
            max_size
        )));
    }
    String::from_utf8(bytes)
        .map_err(|e| Error::Resource(format!("schema '{}' is not UTF-8: {}", resolver.name(), e)))
}

/// Resolver for schema files on the local file system
#[derive(Debug, Clone)]
pub struct FileResolver {
    path: PathBuf,
    id: String,
    name: String,
}

impl FileResolver {
    /// Create a resolver for a file path
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let location = Location::Path(path.clone());
        let id = location.identifier()?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self { path, id, name })
    }

    /// Path of the schema file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SchemaResolver for FileResolver {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn content(&self) -> Result<Box<dyn Read + '_>> {
        let file = File::open(&self.path).map_err(|e| {
            Error::Resource(format!("Failed to read file '{}': {}", self.path.display(), e))
        })?;
        Ok(Box::new(file))
    }

    fn resolve(
        &self,
        location: &str,
        _namespace_hint: Option<&str>,
    ) -> Result<Option<Arc<dyn SchemaResolver>>> {
        match Location::Path(self.path.clone()).join(location)? {
            Location::Path(path) => {
                if path.is_file() {
                    Ok(Some(Arc::new(FileResolver::new(path)?)))
                } else {
                    Ok(None)
                }
            }
            Location::Url(url) => Err(Error::Resource(format!(
                "Remote resources are not allowed: {}",
                url
            ))),
            Location::String(_) => Ok(None),
        }
    }
}

/// Shared set of in-memory schema texts keyed by identifier
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    documents: IndexMap<String, String>,
}

impl MemoryLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document (builder style)
    pub fn with(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.add(id, text);
        self
    }

    /// Add a document
    pub fn add(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(id.into(), text.into());
    }

    /// Text of a document
    pub fn get(&self, id: &str) -> Option<&str> {
        self.documents.get(id).map(|s| s.as_str())
    }

    /// Check if a document is present
    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Freeze the library and create a resolver for one of its documents
    pub fn resolver(self: &Arc<Self>, id: &str) -> Option<MemoryResolver> {
        self.contains(id).then(|| MemoryResolver {
            id: id.to_string(),
            library: Arc::clone(self),
        })
    }

    /// Resolvers for every document, in insertion order
    pub fn resolvers(self: &Arc<Self>) -> Vec<Arc<dyn SchemaResolver>> {
        self.documents
            .keys()
            .map(|id| {
                Arc::new(MemoryResolver {
                    id: id.clone(),
                    library: Arc::clone(self),
                }) as Arc<dyn SchemaResolver>
            })
            .collect()
    }
}

/// Resolver over a [`MemoryLibrary`]
///
/// `schemaLocation` values are looked up verbatim as library identifiers.
#[derive(Debug, Clone)]
pub struct MemoryResolver {
    id: String,
    library: Arc<MemoryLibrary>,
}

impl MemoryResolver {
    /// Resolver for a single stand-alone text
    pub fn standalone(id: impl Into<String>, text: impl Into<String>) -> Self {
        let id = id.into();
        let library = Arc::new(MemoryLibrary::new().with(id.clone(), text));
        Self { id, library }
    }
}

impl SchemaResolver for MemoryResolver {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.id
    }

    fn content(&self) -> Result<Box<dyn Read + '_>> {
        let text = self
            .library
            .get(&self.id)
            .ok_or_else(|| Error::Resource(format!("no in-memory schema '{}'", self.id)))?;
        Ok(Box::new(Cursor::new(text.as_bytes())))
    }

    fn resolve(
        &self,
        location: &str,
        _namespace_hint: Option<&str>,
    ) -> Result<Option<Arc<dyn SchemaResolver>>> {
        Ok(self
            .library
            .resolver(location)
            .map(|r| Arc::new(r) as Arc<dyn SchemaResolver>))
    }
}
