//! Schema documents

use std::fmt;
use std::sync::Arc;

use crate::resolvers::SchemaResolver;
use crate::validators::registers::NameRegister;

use super::components::ComponentId;

/// One loaded schema document
pub struct SchemaDocument {
    /// Identifier of the resolver the document was read from
    pub identifier: String,
    /// Display name
    pub name: String,
    /// `targetNamespace` as declared
    pub target_namespace: Option<String>,
    /// Namespace the document is validated in
    ///
    /// Equals the target namespace unless the document is a chameleon
    /// pulled into a namespace by an include or a load override.
    pub effective_namespace: Option<String>,
    /// `xs:schema` root component
    pub root: ComponentId,
    /// Content supplier, also used to resolve the document's directives
    pub resolver: Arc<dyn SchemaResolver>,
    /// Global definitions of this document
    pub register: NameRegister,
    /// Created by the loader instead of read from an input
    pub synthetic: bool,
}

impl SchemaDocument {
    /// Create a document whose effective namespace is its target namespace
    pub fn new(
        resolver: Arc<dyn SchemaResolver>,
        target_namespace: Option<String>,
        root: ComponentId,
    ) -> Self {
        Self {
            identifier: resolver.id().to_string(),
            name: resolver.name().to_string(),
            effective_namespace: target_namespace.clone(),
            target_namespace,
            root,
            resolver,
            register: NameRegister::new(),
            synthetic: false,
        }
    }

    /// Check for a declared target namespace
    pub fn has_target_namespace(&self) -> bool {
        self.target_namespace.is_some()
    }

    /// Check if the document is a chameleon with an assigned namespace
    pub fn is_chameleon(&self) -> bool {
        self.target_namespace.is_none() && self.effective_namespace.is_some()
    }
}

impl fmt::Debug for SchemaDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDocument")
            .field("identifier", &self.identifier)
            .field("target_namespace", &self.target_namespace)
            .field("effective_namespace", &self.effective_namespace)
            .field("root", &self.root)
            .field("synthetic", &self.synthetic)
            .field("names", &self.register.local().len())
            .finish()
    }
}
