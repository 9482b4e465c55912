//! Schema loading and pass orchestration
//!
//! [`SchemaLoader::load`] reads the input documents, follows their include,
//! import and redefine directives through each document's resolver, assigns
//! chameleon documents their effective namespace and returns the documents
//! in validation order. [`validate_schemas`] then runs the four passes over
//! that order.

use std::collections::VecDeque;
use std::sync::Arc;

use quick_xml::escape::escape;
use tracing::{debug, info};

use crate::documents::Document;
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::model::{unmarshal, ComponentId, ComponentKind, DocumentId, SchemaDocument, Unmarshalled};
use crate::resolvers::{read_content, MemoryResolver, SchemaResolver};
use crate::XSD_NAMESPACE;

use super::context::ValidationContext;
use super::prevalidation::prevalidate_pass;
use super::problems::{ProblemLocation, Severity};
use super::registration::{merge_pass, register_pass};
use super::validation::validate_pass;

/// Prefix of the identifier given to synthesized wrapper documents
pub const WRAPPER_PREFIX: &str = "wrapper:";

/// Loads schema document sets into a validation context
#[derive(Debug, Clone, Default)]
pub struct SchemaLoader {
    limits: Limits,
}

impl SchemaLoader {
    /// Create a loader with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Get the limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load a document set and return it in validation order
    ///
    /// Namespaced documents come first, then the wrapper synthesized for
    /// `override_namespace` (only when no loaded document declares a target
    /// namespace), then the documents without one. Inputs keep their order
    /// and precede the documents they pulled in.
    ///
    /// On failure every document added by this call is dropped again; what
    /// the context held before is kept.
    pub fn load(
        &self,
        resolvers: &[Arc<dyn SchemaResolver>],
        override_namespace: Option<&str>,
        ctx: &mut ValidationContext,
    ) -> Result<Vec<DocumentId>> {
        let checkpoint = ctx.checkpoint();
        self.load_set(resolvers, override_namespace, ctx)
            .map_err(|e| {
                ctx.rollback(checkpoint);
                e
            })
    }

    fn load_set(
        &self,
        resolvers: &[Arc<dyn SchemaResolver>],
        override_namespace: Option<&str>,
        ctx: &mut ValidationContext,
    ) -> Result<Vec<DocumentId>> {
        let start = ctx.document_count();

        let mut inputs = Vec::new();
        for resolver in resolvers {
            let id = match ctx.document_by_identifier(resolver.id()) {
                Some(id) => id,
                None => self.load_document(Arc::clone(resolver), start, ctx)?,
            };
            if !inputs.contains(&id) {
                inputs.push(id);
            }
        }

        // Directives of documents loaded along the way are queued by position
        let mut next = start;
        while next < ctx.document_count() {
            self.resolve_directives(DocumentId(next), start, ctx)?;
            next += 1;
        }
        bind_namespace_imports(ctx, start);

        let referenced = (start..ctx.document_count())
            .map(DocumentId)
            .filter(|id| !inputs.contains(id));
        let all: Vec<DocumentId> = inputs.iter().copied().chain(referenced).collect();
        let (namespaced, plain): (Vec<DocumentId>, Vec<DocumentId>) = all
            .into_iter()
            .partition(|id| ctx.document(*id).has_target_namespace());

        let wrapper = match override_namespace {
            Some(namespace) if namespaced.is_empty() && !plain.is_empty() => {
                let members: Vec<DocumentId> = inputs
                    .iter()
                    .copied()
                    .filter(|id| !ctx.document(*id).has_target_namespace())
                    .collect();
                Some(self.synthesize_wrapper(namespace, &members, start, ctx)?)
            }
            _ => None,
        };
        propagate_chameleon_namespaces(ctx);

        let mut ordered = namespaced;
        ordered.extend(wrapper);
        ordered.extend(plain);
        info!(
            inputs = inputs.len(),
            loaded = ctx.document_count() - start,
            wrapper = wrapper.is_some(),
            "schema document set loaded"
        );
        Ok(ordered)
    }

    fn load_document(
        &self,
        resolver: Arc<dyn SchemaResolver>,
        start: usize,
        ctx: &mut ValidationContext,
    ) -> Result<DocumentId> {
        self.limits
            .check_documents(ctx.document_count() - start + 1)?;
        let identifier = resolver.id().to_string();
        let text = read_content(resolver.as_ref(), self.limits.max_schema_size)?;

        let parsed = Document::parse_with_depth(text.as_bytes(), self.limits.max_depth)
            .map_err(|e| in_document(e, &identifier))?;
        let Unmarshalled {
            components,
            root,
            target_namespace,
            issues,
        } = unmarshal(
            &parsed,
            ctx.next_document_id(),
            ctx.component_count(),
            &self.limits,
        )
        .map_err(|e| in_document(e, &identifier))?;

        let count = components.len();
        let document = SchemaDocument::new(resolver, target_namespace, root);
        let id = ctx.add_document(document, components)?;
        for issue in issues {
            ctx.add_error(
                ProblemLocation::new(identifier.clone(), issue.position),
                issue.message,
            );
        }
        info!(
            document = %identifier,
            namespace = ctx.document(id).target_namespace.as_deref().unwrap_or(""),
            components = count,
            "loaded schema document"
        );
        Ok(id)
    }

    /// Bind the located directives of one document, loading their targets
    fn resolve_directives(
        &self,
        document: DocumentId,
        start: usize,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        let owner = ctx.document(document);
        let resolver = Arc::clone(&owner.resolver);
        let directives: Vec<(ComponentId, String, Option<String>)> = ctx
            .component(owner.root)
            .children
            .iter()
            .filter_map(|child| {
                let kind = &ctx.component(*child).kind;
                let directive = kind.schema_location()?;
                if directive.target.is_some() {
                    return None;
                }
                let location = directive.location.clone()?;
                let hint = match kind {
                    ComponentKind::Import(l) => l.namespace.clone(),
                    _ => owner.effective_namespace.clone(),
                };
                Some((*child, location, hint))
            })
            .collect();

        for (directive, location, hint) in directives {
            let target = match resolver.resolve(&location, hint.as_deref()) {
                Ok(Some(target)) => target,
                Ok(None) => {
                    debug!(location = %location, "schema location not found");
                    continue;
                }
                Err(e) => {
                    ctx.add_warning(
                        directive,
                        format!("cannot resolve schema location '{}': {}", location, e),
                    );
                    continue;
                }
            };
            let target = match ctx.document_by_identifier(target.id()) {
                Some(id) => id,
                None => self.load_document(target, start, ctx)?,
            };
            if let Some(l) = ctx.component_mut(directive).kind.schema_location_mut() {
                l.target = Some(target);
            }
        }
        Ok(())
    }

    /// Create the document including every namespace-less input under
    /// `namespace`
    fn synthesize_wrapper(
        &self,
        namespace: &str,
        members: &[DocumentId],
        start: usize,
        ctx: &mut ValidationContext,
    ) -> Result<DocumentId> {
        let identifier = format!("{}{}", WRAPPER_PREFIX, namespace);
        if let Some(existing) = ctx.document_by_identifier(&identifier) {
            return Ok(existing);
        }

        let mut text = format!(
            r#"<xs:schema xmlns:xs="{}" targetNamespace="{}">"#,
            XSD_NAMESPACE,
            escape(namespace)
        );
        for member in members {
            text.push_str(&format!(
                r#"<xs:include schemaLocation="{}"/>"#,
                escape(ctx.document(*member).identifier.as_str())
            ));
        }
        text.push_str("</xs:schema>");

        let resolver = Arc::new(MemoryResolver::standalone(identifier.clone(), text));
        let wrapper = self.load_document(resolver, start, ctx)?;
        let includes = ctx.component(ctx.document(wrapper).root).children.clone();
        for (include, member) in includes.iter().zip(members) {
            if let ComponentKind::Include(l) = &mut ctx.component_mut(*include).kind {
                l.target = Some(*member);
                l.synthetic = true;
            }
        }
        ctx.document_mut(wrapper).synthetic = true;
        for member in members {
            ctx.document_mut(*member).effective_namespace = Some(namespace.to_string());
        }
        debug!(
            wrapper = %identifier,
            members = members.len(),
            "synthesized wrapper schema"
        );
        Ok(wrapper)
    }
}

fn in_document(error: Error, identifier: &str) -> Error {
    match error {
        Error::Parse(e) => Error::Parse(e.with_document(identifier)),
        other => other,
    }
}

/// Bind imports that name only a namespace to the document declaring it
fn bind_namespace_imports(ctx: &mut ValidationContext, start: usize) {
    for index in start..ctx.document_count() {
        let document = DocumentId(index);
        let imports: Vec<(ComponentId, String)> = ctx
            .component(ctx.document(document).root)
            .children
            .iter()
            .filter_map(|child| match &ctx.component(*child).kind {
                ComponentKind::Import(l) if l.target.is_none() && l.location.is_none() => {
                    l.namespace.clone().map(|ns| (*child, ns))
                }
                _ => None,
            })
            .collect();

        for (import, namespace) in imports {
            let Some(target) = ctx.document_for_namespace(&namespace) else {
                continue;
            };
            if target == document {
                continue;
            }
            if let Some(l) = ctx.component_mut(import).kind.schema_location_mut() {
                l.target = Some(target);
            }
        }
    }
}

/// Push effective namespaces through include edges onto chameleons
fn propagate_chameleon_namespaces(ctx: &mut ValidationContext) {
    let mut queue: VecDeque<DocumentId> = ctx
        .documents()
        .filter(|(_, d)| d.effective_namespace.is_some())
        .map(|(id, _)| id)
        .collect();

    while let Some(document) = queue.pop_front() {
        let Some(namespace) = ctx.document(document).effective_namespace.clone() else {
            continue;
        };
        let edges: Vec<(ComponentId, DocumentId)> = ctx
            .component(ctx.document(document).root)
            .children
            .iter()
            .filter_map(|child| match &ctx.component(*child).kind {
                ComponentKind::Include(l) | ComponentKind::Redefine(l) => {
                    l.target.map(|t| (*child, t))
                }
                _ => None,
            })
            .collect();

        for (include, target) in edges {
            let included = ctx.document(target);
            if included.has_target_namespace() {
                continue;
            }
            match included.effective_namespace.clone() {
                None => {
                    debug!(
                        document = %included.identifier,
                        namespace = %namespace,
                        "chameleon schema takes including namespace"
                    );
                    ctx.document_mut(target).effective_namespace = Some(namespace.clone());
                    queue.push_back(target);
                }
                Some(existing) if existing != namespace => {
                    let message = format!(
                        "chameleon schema '{}' is already included into namespace '{}' and cannot also take '{}'",
                        included.identifier, existing, namespace
                    );
                    ctx.add_unimplemented(include, message);
                }
                Some(_) => {}
            }
        }
    }
}

/// Load a document set with default limits
pub fn load(
    resolvers: &[Arc<dyn SchemaResolver>],
    override_namespace: Option<&str>,
    ctx: &mut ValidationContext,
) -> Result<Vec<DocumentId>> {
    SchemaLoader::new().load(resolvers, override_namespace, ctx)
}

/// Run the four passes over documents in validation order
///
/// Never fails: every finding is recorded in the context.
pub fn validate_schemas(documents: &[DocumentId], ctx: &mut ValidationContext) {
    ctx.report(&format!("validating {} schema documents", documents.len()));
    prevalidate_pass(ctx, documents);
    register_pass(ctx, documents);
    merge_pass(ctx, documents);
    validate_pass(ctx, documents);
    info!(
        fatal = ctx.count(Severity::Fatal),
        errors = ctx.count(Severity::Error),
        warnings = ctx.count(Severity::Warning),
        unimplemented = ctx.count(Severity::Unimplemented),
        pruned = ctx.skipped_count(),
        "schema validation finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::MemoryLibrary;
    use pretty_assertions::assert_eq;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn inputs(library: MemoryLibrary, ids: &[&str]) -> Vec<Arc<dyn SchemaResolver>> {
        let library = Arc::new(library);
        ids.iter()
            .filter_map(|id| library.resolver(id))
            .map(|r| Arc::new(r) as Arc<dyn SchemaResolver>)
            .collect()
    }

    fn identifiers(ctx: &ValidationContext, docs: &[DocumentId]) -> Vec<String> {
        docs.iter()
            .map(|d| ctx.document(*d).identifier.clone())
            .collect()
    }

    #[test]
    fn test_override_synthesizes_wrapper_first() {
        let resolvers = inputs(
            MemoryLibrary::new()
                .with(
                    "a.xsd",
                    format!(r#"<xs:schema {XS}><xs:element name="a" type="T"/></xs:schema>"#),
                )
                .with(
                    "b.xsd",
                    format!(r#"<xs:schema {XS}><xs:complexType name="T"/></xs:schema>"#),
                ),
            &["a.xsd", "b.xsd"],
        );
        let mut ctx = ValidationContext::new();
        let docs = load(&resolvers, Some("urn:x"), &mut ctx).unwrap();
        assert_eq!(identifiers(&ctx, &docs), vec!["wrapper:urn:x", "a.xsd", "b.xsd"]);

        let wrapper = ctx.document(docs[0]);
        assert!(wrapper.synthetic);
        assert_eq!(wrapper.target_namespace.as_deref(), Some("urn:x"));
        let targets: Vec<_> = ctx
            .component(wrapper.root)
            .children
            .iter()
            .map(|c| match &ctx.component(*c).kind {
                ComponentKind::Include(l) => {
                    assert!(l.synthetic);
                    l.target
                }
                other => panic!("unexpected {}", other.tag()),
            })
            .collect();
        assert_eq!(targets, vec![Some(docs[1]), Some(docs[2])]);
        for doc in &docs[1..] {
            assert_eq!(ctx.document(*doc).effective_namespace.as_deref(), Some("urn:x"));
            assert_eq!(ctx.document(*doc).target_namespace, None);
        }

        validate_schemas(&docs, &mut ctx);
        assert_eq!(ctx.error_count(), 0, "{:?}", ctx.problems());
    }

    #[test]
    fn test_no_wrapper_when_a_namespace_is_declared() {
        let resolvers = inputs(
            MemoryLibrary::new()
                .with("plain.xsd", format!(r#"<xs:schema {XS}/>"#))
                .with(
                    "ns.xsd",
                    format!(r#"<xs:schema {XS} targetNamespace="urn:n"/>"#),
                ),
            &["plain.xsd", "ns.xsd"],
        );
        let mut ctx = ValidationContext::new();
        let docs = load(&resolvers, Some("urn:x"), &mut ctx).unwrap();
        assert_eq!(identifiers(&ctx, &docs), vec!["ns.xsd", "plain.xsd"]);
        assert_eq!(ctx.document(docs[1]).effective_namespace, None);
    }

    #[test]
    fn test_referenced_documents_follow_their_partition() {
        let resolvers = inputs(
            MemoryLibrary::new()
                .with(
                    "main.xsd",
                    format!(
                        r#"<xs:schema {XS} targetNamespace="urn:m">
                             <xs:include schemaLocation="cham.xsd"/>
                             <xs:import namespace="urn:o" schemaLocation="other.xsd"/>
                           </xs:schema>"#
                    ),
                )
                .with("cham.xsd", format!(r#"<xs:schema {XS}/>"#))
                .with(
                    "other.xsd",
                    format!(r#"<xs:schema {XS} targetNamespace="urn:o"/>"#),
                )
                .with("loose.xsd", format!(r#"<xs:schema {XS}/>"#)),
            &["loose.xsd", "main.xsd"],
        );
        let mut ctx = ValidationContext::new();
        let docs = load(&resolvers, None, &mut ctx).unwrap();
        assert_eq!(
            identifiers(&ctx, &docs),
            vec!["main.xsd", "other.xsd", "loose.xsd", "cham.xsd"]
        );
        let cham = ctx.document_by_identifier("cham.xsd").unwrap();
        assert!(ctx.document(cham).is_chameleon());
        assert_eq!(ctx.document(cham).effective_namespace.as_deref(), Some("urn:m"));
        let loose = ctx.document_by_identifier("loose.xsd").unwrap();
        assert_eq!(ctx.document(loose).effective_namespace, None);
    }

    #[test]
    fn test_chameleon_included_into_two_namespaces() {
        let resolvers = inputs(
            MemoryLibrary::new()
                .with(
                    "a.xsd",
                    format!(
                        r#"<xs:schema {XS} targetNamespace="urn:a"><xs:include schemaLocation="c.xsd"/></xs:schema>"#
                    ),
                )
                .with(
                    "b.xsd",
                    format!(
                        r#"<xs:schema {XS} targetNamespace="urn:b"><xs:include schemaLocation="c.xsd"/></xs:schema>"#
                    ),
                )
                .with("c.xsd", format!(r#"<xs:schema {XS}/>"#)),
            &["a.xsd", "b.xsd"],
        );
        let mut ctx = ValidationContext::new();
        load(&resolvers, None, &mut ctx).unwrap();
        assert_eq!(ctx.count(Severity::Unimplemented), 1);
        let c = ctx.document_by_identifier("c.xsd").unwrap();
        assert_eq!(ctx.document(c).effective_namespace.as_deref(), Some("urn:a"));
    }

    #[test]
    fn test_cyclic_includes_load_once() {
        let resolvers = inputs(
            MemoryLibrary::new()
                .with(
                    "a.xsd",
                    format!(
                        r#"<xs:schema {XS} targetNamespace="urn:c"><xs:include schemaLocation="b.xsd"/></xs:schema>"#
                    ),
                )
                .with(
                    "b.xsd",
                    format!(
                        r#"<xs:schema {XS} targetNamespace="urn:c"><xs:include schemaLocation="a.xsd"/></xs:schema>"#
                    ),
                ),
            &["a.xsd", "b.xsd", "a.xsd"],
        );
        let mut ctx = ValidationContext::new();
        let docs = load(&resolvers, None, &mut ctx).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(ctx.document_count(), 2);
        assert!(ctx.is_duplicate_namespace("urn:c"));
    }

    #[test]
    fn test_namespace_only_import_binds_to_loaded_document() {
        let resolvers = inputs(
            MemoryLibrary::new()
                .with(
                    "a.xsd",
                    format!(
                        r#"<xs:schema {XS} targetNamespace="urn:a"><xs:import namespace="urn:b"/></xs:schema>"#
                    ),
                )
                .with(
                    "b.xsd",
                    format!(r#"<xs:schema {XS} targetNamespace="urn:b"/>"#),
                ),
            &["a.xsd", "b.xsd"],
        );
        let mut ctx = ValidationContext::new();
        let docs = load(&resolvers, None, &mut ctx).unwrap();
        let import = ctx.component(ctx.document(docs[0]).root).children[0];
        let target = ctx.component(import).kind.schema_location().and_then(|l| l.target);
        assert_eq!(target, Some(docs[1]));
    }

    #[test]
    fn test_unmarshal_issues_become_errors() {
        let resolvers = inputs(
            MemoryLibrary::new().with(
                "a.xsd",
                format!(r#"<xs:schema {XS}><xs:element name="e" type="nope:T"/></xs:schema>"#),
            ),
            &["a.xsd"],
        );
        let mut ctx = ValidationContext::new();
        load(&resolvers, None, &mut ctx).unwrap();
        assert_eq!(ctx.count(Severity::Error), 1);
        let problem = &ctx.problems()[0];
        assert_eq!(problem.subject.component(), None);
        assert_eq!(problem.location.document.as_deref(), Some("a.xsd"));
    }

    #[test]
    fn test_load_level_failures() {
        let mut ctx = ValidationContext::new();
        let malformed = inputs(
            MemoryLibrary::new().with("bad.xsd", "<xs:schema"),
            &["bad.xsd"],
        );
        assert!(load(&malformed, None, &mut ctx).is_err());

        let not_schema = inputs(
            MemoryLibrary::new().with("doc.xml", "<root/>"),
            &["doc.xml"],
        );
        match load(&not_schema, None, &mut ctx) {
            Err(Error::Parse(e)) => assert_eq!(e.document.as_deref(), Some("doc.xml")),
            other => panic!("unexpected {:?}", other),
        }

        let chained = inputs(
            MemoryLibrary::new()
                .with(
                    "a.xsd",
                    format!(r#"<xs:schema {XS}><xs:include schemaLocation="b.xsd"/></xs:schema>"#),
                )
                .with("b.xsd", format!(r#"<xs:schema {XS}/>"#)),
            &["a.xsd"],
        );
        let limits = Limits {
            max_documents: 1,
            ..Limits::default()
        };
        let mut ctx = ValidationContext::new();
        let result = SchemaLoader::new().with_limits(limits).load(&chained, None, &mut ctx);
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }

    #[test]
    fn test_failed_load_leaves_context_as_before() {
        let library = Arc::new(
            MemoryLibrary::new()
                .with(
                    "keep.xsd",
                    format!(r#"<xs:schema {XS} targetNamespace="urn:k"/>"#),
                )
                .with(
                    "a.xsd",
                    format!(
                        r#"<xs:schema {XS} targetNamespace="urn:a">
                             <xs:element name="a" type="nope:T"/>
                             <xs:include schemaLocation="broken.xsd"/>
                           </xs:schema>"#
                    ),
                )
                .with("broken.xsd", "<xs:schema"),
        );
        let resolver = |id: &str| -> Vec<Arc<dyn SchemaResolver>> {
            vec![Arc::new(library.resolver(id).unwrap()) as Arc<dyn SchemaResolver>]
        };

        let mut ctx = ValidationContext::new();
        load(&resolver("keep.xsd"), None, &mut ctx).unwrap();
        let components = ctx.component_count();

        assert!(load(&resolver("a.xsd"), None, &mut ctx).is_err());
        assert_eq!(ctx.document_count(), 1);
        assert_eq!(ctx.component_count(), components);
        assert!(ctx.problems().is_empty());
        assert_eq!(ctx.error_count(), 0);
        assert_eq!(ctx.document_by_identifier("a.xsd"), None);
        assert_eq!(ctx.document_for_namespace("urn:a"), None);
        assert_eq!(ctx.document_for_namespace("urn:k"), Some(DocumentId(0)));

        // The same identifier loads cleanly once its include is fixed
        let fixed = Arc::new(MemoryLibrary::new().with(
            "a.xsd",
            format!(r#"<xs:schema {XS} targetNamespace="urn:a"/>"#),
        ));
        let docs = load(&fixed.resolvers(), None, &mut ctx).unwrap();
        assert_eq!(docs, vec![DocumentId(1)]);
        assert_eq!(ctx.document_for_namespace("urn:a"), Some(DocumentId(1)));
    }
}
