//! Name registration and merge passes
//!
//! Registration records every global definition in the register of the
//! document that declares it, under the document's effective namespace.
//! Merging then makes definitions visible across documents: a document sees
//! every definition of the documents it shares an include graph with, plus
//! the include graphs of the documents any of them imports.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::model::{ComponentId, ComponentKind, DocumentId};
use crate::namespaces::QName;

use super::context::ValidationContext;
use super::registers::{CategoryTables, NameCategory, NameConflict};
use super::walker::{SchemaVisitor, TreeWalker};

/// Category a global definition is registered under
pub fn category_of(kind: &ComponentKind) -> Option<NameCategory> {
    match kind {
        ComponentKind::Element(_) => Some(NameCategory::Element),
        ComponentKind::Attribute(_) => Some(NameCategory::Attribute),
        ComponentKind::Group(_) => Some(NameCategory::Group),
        ComponentKind::AttributeGroup(_) => Some(NameCategory::AttributeGroup),
        ComponentKind::ComplexType(_) | ComponentKind::SimpleType(_) => Some(NameCategory::Type),
        _ => None,
    }
}

/// Run the name registration pass over a document set
pub fn register_pass(ctx: &mut ValidationContext, documents: &[DocumentId]) {
    ctx.clear_traversed();
    let errors = ctx.error_count();
    let mut registrar = Registrar { registered: 0 };
    TreeWalker::walk_documents(ctx, documents, &mut registrar);
    info!(
        registered = registrar.registered,
        duplicates = ctx.error_count() - errors,
        "name registration pass finished"
    );
}

struct Registrar {
    registered: usize,
}

impl SchemaVisitor for Registrar {
    fn visit(&mut self, ctx: &mut ValidationContext, id: ComponentId) -> bool {
        let component = ctx.component(id);
        match &component.kind {
            ComponentKind::Schema(_) | ComponentKind::Include(_) | ComponentKind::Import(_) => {
                return true
            }
            ComponentKind::Redefine(_) => return false,
            _ => {}
        }

        let (Some(category), Some(local)) = (category_of(&component.kind), component.kind.name())
        else {
            return false;
        };
        let document = component.document;
        let name = QName::new(
            ctx.document(document).effective_namespace.clone(),
            local.to_string(),
        );

        let result = ctx
            .document_mut(document)
            .register
            .register(category, name, id);
        match result {
            Ok(()) => self.registered += 1,
            Err(conflict) => report_conflict(ctx, &conflict),
        }
        false
    }
}

fn report_conflict(ctx: &mut ValidationContext, conflict: &NameConflict) {
    let first = ctx.location_of(conflict.existing);
    ctx.add_error(
        conflict.rejected,
        format!(
            "duplicate {} '{}', already defined at {}",
            conflict.category, conflict.name, first
        ),
    );
}

/// Include/redefine and import edges of every loaded document
struct DirectiveGraph {
    includes: HashMap<DocumentId, Vec<DocumentId>>,
    imports: HashMap<DocumentId, Vec<DocumentId>>,
}

impl DirectiveGraph {
    fn build(ctx: &ValidationContext) -> Self {
        let mut includes: HashMap<DocumentId, Vec<DocumentId>> = HashMap::new();
        let mut imports: HashMap<DocumentId, Vec<DocumentId>> = HashMap::new();
        for (id, document) in ctx.documents() {
            for child in &ctx.component(document.root).children {
                match &ctx.component(*child).kind {
                    ComponentKind::Include(l) | ComponentKind::Redefine(l) => {
                        if let Some(target) = l.target {
                            // Inclusion joins both documents into one schema
                            includes.entry(id).or_default().push(target);
                            includes.entry(target).or_default().push(id);
                        }
                    }
                    ComponentKind::Import(l) => {
                        if let Some(target) = l.target {
                            imports.entry(id).or_default().push(target);
                        }
                    }
                    _ => {}
                }
            }
        }
        Self { includes, imports }
    }

    /// Documents joined to `start` through include edges, `start` first
    fn include_closure(&self, start: DocumentId) -> Vec<DocumentId> {
        let mut seen = HashSet::from([start]);
        let mut closure = vec![start];
        let mut next = 0;
        while next < closure.len() {
            let current = closure[next];
            next += 1;
            for target in self.includes.get(&current).into_iter().flatten() {
                if seen.insert(*target) {
                    closure.push(*target);
                }
            }
        }
        closure
    }

    /// Documents whose definitions `document` sees besides its own
    fn sources(&self, document: DocumentId) -> Vec<DocumentId> {
        let schema = self.include_closure(document);
        let mut sources: Vec<DocumentId> = schema[1..].to_vec();
        let mut seen: HashSet<DocumentId> = schema.iter().copied().collect();
        for member in &schema {
            for imported in self.imports.get(member).into_iter().flatten() {
                for source in self.include_closure(*imported) {
                    if seen.insert(source) {
                        sources.push(source);
                    }
                }
            }
        }
        sources
    }
}

/// Run the name merge pass over a document set
///
/// A definition reached through several include paths is the same
/// component and merges silently; a different definition under an already
/// visible name is reported once per pair.
pub fn merge_pass(ctx: &mut ValidationContext, documents: &[DocumentId]) {
    ctx.clear_traversed();
    let graph = DirectiveGraph::build(ctx);
    let mut reported: HashSet<(ComponentId, ComponentId)> = HashSet::new();
    let mut merged = 0;

    for &document in documents {
        let sources = graph.sources(document);
        let tables: Vec<CategoryTables> = sources
            .iter()
            .map(|s| ctx.document(*s).register.local().clone())
            .collect();

        let mut conflicts = Vec::new();
        {
            let register = &mut ctx.document_mut(document).register;
            for table in &tables {
                conflicts.extend(register.merge(table));
            }
            merged += register.visible().len() - register.local().len();
        }

        for conflict in conflicts {
            let pair = if conflict.existing < conflict.rejected {
                (conflict.existing, conflict.rejected)
            } else {
                (conflict.rejected, conflict.existing)
            };
            if reported.insert(pair) {
                report_conflict(ctx, &conflict);
            }
        }
        debug!(
            document = %ctx.document(document).identifier,
            sources = sources.len(),
            "merged visible names"
        );
    }
    info!(merged, conflicts = reported.len(), "name merge pass finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::problems::Severity;
    use crate::validators::{load, prevalidate_pass, MemoryLibrary};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn schema(ns: &str, body: &str) -> String {
        format!(r#"<xs:schema {XS} targetNamespace="{ns}">{body}</xs:schema>"#)
    }

    fn run(library: MemoryLibrary, inputs: &[&str]) -> (ValidationContext, Vec<DocumentId>) {
        let library = Arc::new(library);
        let resolvers: Vec<_> = inputs
            .iter()
            .filter_map(|id| library.resolver(id))
            .map(|r| Arc::new(r) as Arc<dyn crate::resolvers::SchemaResolver>)
            .collect();
        let mut ctx = ValidationContext::new();
        let docs = load(&resolvers, None, &mut ctx).unwrap();
        prevalidate_pass(&mut ctx, &docs);
        register_pass(&mut ctx, &docs);
        (ctx, docs)
    }

    fn qn(ns: &str, local: &str) -> QName {
        QName::namespaced(ns, local)
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let (ctx, docs) = run(
            MemoryLibrary::new().with(
                "a.xsd",
                schema(
                    "urn:a",
                    r#"<xs:complexType name="T"/><xs:simpleType name="T"><xs:list itemType="xs:int"/></xs:simpleType>
                       <xs:element name="T"/>"#,
                ),
            ),
            &["a.xsd"],
        );
        assert_eq!(ctx.count(Severity::Error), 1);

        let root = ctx.document(docs[0]).root;
        let children = &ctx.component(root).children;
        assert_eq!(
            ctx.lookup(docs[0], NameCategory::Type, &qn("urn:a", "T")),
            Some(children[0])
        );
        assert_eq!(ctx.problems()[0].subject.component(), Some(children[1]));
        assert!(ctx.problems()[0].message.starts_with("duplicate type '{urn:a}T'"));
    }

    #[test]
    fn test_locals_and_redefine_children_are_not_registered() {
        let (ctx, docs) = run(
            MemoryLibrary::new()
                .with(
                    "a.xsd",
                    schema(
                        "urn:a",
                        r#"<xs:redefine schemaLocation="b.xsd"><xs:complexType name="R"/></xs:redefine>
                           <xs:element name="top"><xs:complexType><xs:sequence>
                             <xs:element name="inner"/>
                           </xs:sequence></xs:complexType></xs:element>"#,
                    ),
                )
                .with("b.xsd", schema("urn:a", r#"<xs:complexType name="R"/>"#)),
            &["a.xsd"],
        );
        let register = &ctx.document(docs[0]).register;
        assert_eq!(register.local().len(), 1);
        assert!(register.lookup_local(NameCategory::Element, &qn("urn:a", "top")).is_some());
    }

    #[test]
    fn test_merge_makes_included_and_imported_names_visible() {
        let (mut ctx, docs) = run(
            MemoryLibrary::new()
                .with(
                    "main.xsd",
                    schema(
                        "urn:a",
                        r#"<xs:include schemaLocation="part.xsd"/>
                           <xs:import namespace="urn:b" schemaLocation="other.xsd"/>
                           <xs:element name="main"/>"#,
                    ),
                )
                .with("part.xsd", schema("urn:a", r#"<xs:element name="part"/>"#))
                .with(
                    "other.xsd",
                    schema(
                        "urn:b",
                        r#"<xs:include schemaLocation="other-part.xsd"/><xs:element name="other"/>"#,
                    ),
                )
                .with("other-part.xsd", schema("urn:b", r#"<xs:element name="deep"/>"#)),
            &["main.xsd"],
        );
        let main = docs[0];
        assert!(ctx
            .lookup(main, NameCategory::Element, &qn("urn:a", "part"))
            .is_none());

        merge_pass(&mut ctx, &docs);
        for (ns, name) in [("urn:a", "part"), ("urn:b", "other"), ("urn:b", "deep")] {
            assert!(
                ctx.lookup(main, NameCategory::Element, &qn(ns, name)).is_some(),
                "{} not visible",
                name
            );
        }
        let part = ctx.document_by_identifier("part.xsd").unwrap();
        assert!(ctx
            .lookup(part, NameCategory::Element, &qn("urn:a", "main"))
            .is_some());
        assert_eq!(ctx.count(Severity::Error), 0);
    }

    #[test]
    fn test_include_diamond_is_not_a_duplicate() {
        let (mut ctx, docs) = run(
            MemoryLibrary::new()
                .with(
                    "top.xsd",
                    schema(
                        "urn:d",
                        r#"<xs:include schemaLocation="left.xsd"/><xs:include schemaLocation="right.xsd"/>"#,
                    ),
                )
                .with(
                    "left.xsd",
                    schema("urn:d", r#"<xs:include schemaLocation="base.xsd"/>"#),
                )
                .with(
                    "right.xsd",
                    schema("urn:d", r#"<xs:include schemaLocation="base.xsd"/>"#),
                )
                .with("base.xsd", schema("urn:d", r#"<xs:complexType name="Shared"/>"#)),
            &["top.xsd"],
        );
        merge_pass(&mut ctx, &docs);
        assert_eq!(ctx.count(Severity::Error), 0);
        assert!(ctx
            .lookup(docs[0], NameCategory::Type, &qn("urn:d", "Shared"))
            .is_some());
    }

    #[test]
    fn test_conflicting_definitions_across_includes_reported_once() {
        let (mut ctx, docs) = run(
            MemoryLibrary::new()
                .with(
                    "a.xsd",
                    schema(
                        "urn:c",
                        r#"<xs:include schemaLocation="b.xsd"/><xs:complexType name="T"/>"#,
                    ),
                )
                .with("b.xsd", schema("urn:c", r#"<xs:complexType name="T"/>"#)),
            &["a.xsd"],
        );
        merge_pass(&mut ctx, &docs);
        assert_eq!(ctx.count(Severity::Error), 1);

        let b = ctx.document_by_identifier("b.xsd").unwrap();
        let b_type = ctx.component(ctx.document(b).root).children[0];
        assert_eq!(ctx.problems()[0].subject.component(), Some(b_type));
    }
}
