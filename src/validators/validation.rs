//! Validation pass
//!
//! Resolves every cross-reference against the visible names of the
//! referencing document and checks that include and import directives were
//! bound to compatible documents. Runs after the merge pass; before it, only
//! a document's own definitions are visible.

use tracing::info;

use crate::model::{
    ComponentId, ComponentKind, DocumentId, QNameRef, SchemaLocation,
};

use super::builtins::{builtin_type, is_xml_attribute, BuiltinKind};
use super::context::ValidationContext;
use super::problems::Findings;
use super::registers::NameCategory;
use super::walker::{SchemaVisitor, TreeWalker};

/// Run the validation pass over a document set
pub fn validate_pass(ctx: &mut ValidationContext, documents: &[DocumentId]) {
    ctx.clear_traversed();
    let errors = ctx.error_count();
    let pruned = ctx.skipped_count();
    let visited = TreeWalker::walk_documents(ctx, documents, &mut Validator);
    info!(
        visited,
        errors = ctx.error_count() - errors,
        pruned = ctx.skipped_count() - pruned,
        "validation pass finished"
    );
}

struct Validator;

impl SchemaVisitor for Validator {
    fn visit(&mut self, ctx: &mut ValidationContext, id: ComponentId) -> bool {
        let mut findings = Findings::default();
        let descend = Resolver::new(ctx, id).validate(&mut findings);
        findings.apply(ctx, id);
        descend
    }
}

/// Type a reference resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeShape {
    Simple,
    Complex,
}

/// Where a derivation sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DerivationSite {
    ComplexContent,
    SimpleContent,
    SimpleType,
}

/// Name resolution for one component
struct Resolver<'a> {
    ctx: &'a ValidationContext,
    id: ComponentId,
    document: DocumentId,
}

impl<'a> Resolver<'a> {
    fn new(ctx: &'a ValidationContext, id: ComponentId) -> Self {
        Self {
            ctx,
            id,
            document: ctx.component(id).document,
        }
    }

    fn find(&self, category: NameCategory, reference: &QNameRef) -> Option<ComponentId> {
        self.ctx.lookup(self.document, category, &reference.qname)
    }

    fn find_type(&self, reference: &QNameRef) -> Option<TypeShape> {
        if let Some(builtin) = builtin_type(&reference.qname) {
            return Some(match builtin {
                BuiltinKind::Simple => TypeShape::Simple,
                BuiltinKind::Complex => TypeShape::Complex,
            });
        }
        let found = self.find(NameCategory::Type, reference)?;
        match self.ctx.component(found).kind {
            ComponentKind::SimpleType(_) => Some(TypeShape::Simple),
            _ => Some(TypeShape::Complex),
        }
    }

    fn require(
        &self,
        category: NameCategory,
        reference: &Option<QNameRef>,
        what: &str,
        f: &mut Findings,
    ) {
        if let Some(reference) = reference.as_ref().filter(|r| !r.unresolvable) {
            if self.find(category, reference).is_none() {
                f.error(unresolved(what, reference));
            }
        }
    }

    fn require_type(&self, reference: &Option<QNameRef>, what: &str, f: &mut Findings) {
        if let Some(reference) = reference.as_ref().filter(|r| !r.unresolvable) {
            if self.find_type(reference).is_none() {
                f.error(unresolved(what, reference));
            }
        }
    }

    fn require_simple_type(&self, reference: &QNameRef, what: &str, f: &mut Findings) {
        if reference.unresolvable {
            return;
        }
        match self.find_type(reference) {
            Some(TypeShape::Simple) => {}
            Some(TypeShape::Complex) => f.error(format!(
                "{} '{}' must be a simple type",
                what, reference.text
            )),
            None => f.error(unresolved(what, reference)),
        }
    }

    fn derivation_site(&self) -> Option<DerivationSite> {
        let parent = self.ctx.component(self.id).parent?;
        match self.ctx.component(parent).kind {
            ComponentKind::ComplexContent(_) => Some(DerivationSite::ComplexContent),
            ComponentKind::SimpleContent(_) => Some(DerivationSite::SimpleContent),
            ComponentKind::SimpleType(_) => Some(DerivationSite::SimpleType),
            _ => None,
        }
    }

    fn validate(&self, f: &mut Findings) -> bool {
        let kind = &self.ctx.component(self.id).kind;
        match kind {
            ComponentKind::Schema(_) => {}
            ComponentKind::Element(e) => {
                self.require(NameCategory::Element, &e.def_ref.reference, "element reference", f);
                self.require_type(&e.type_ref, "element type", f);
                self.require(
                    NameCategory::Element,
                    &e.substitution_group,
                    "substitution group head",
                    f,
                );
            }
            ComponentKind::Attribute(a) => {
                if let Some(reference) = &a.def_ref.reference {
                    if !reference.unresolvable
                        && !is_xml_attribute(&reference.qname)
                        && self.find(NameCategory::Attribute, reference).is_none()
                    {
                        f.error(unresolved("attribute reference", reference));
                    }
                }
                if let Some(type_ref) = &a.type_ref {
                    self.require_simple_type(type_ref, "attribute type", f);
                }
            }
            ComponentKind::ComplexType(_) | ComponentKind::SimpleType(_) => {}
            ComponentKind::Group(g) => {
                self.require(NameCategory::Group, &g.def_ref.reference, "group reference", f)
            }
            ComponentKind::AttributeGroup(g) => self.require(
                NameCategory::AttributeGroup,
                &g.def_ref.reference,
                "attribute group reference",
                f,
            ),
            ComponentKind::Include(l) => self.include(l, f),
            ComponentKind::Import(l) => self.import(l, f),
            ComponentKind::Redefine(_) => return false,
            ComponentKind::Compositor(_)
            | ComponentKind::Any(_)
            | ComponentKind::AnyAttribute(_)
            | ComponentKind::ComplexContent(_)
            | ComponentKind::SimpleContent(_) => {}
            ComponentKind::Extension(d) | ComponentKind::Restriction(d) => {
                if let Some(base) = &d.base {
                    self.derivation_base(base, f);
                }
            }
            ComponentKind::List(l) => {
                if let Some(item) = &l.item_type {
                    self.require_simple_type(item, "list item type", f);
                }
            }
            ComponentKind::Union(u) => {
                for member in &u.member_types {
                    self.require_simple_type(member, "union member type", f);
                }
            }
            ComponentKind::Facet(_) | ComponentKind::Notation(_) => return false,
            ComponentKind::IdentityConstraint(c) => {
                if let Some(refer) = &c.refer {
                    f.unimplemented(format!(
                        "keyref 'refer' to '{}' is not resolved",
                        refer.text
                    ));
                }
                return false;
            }
            ComponentKind::Unknown(_) => return false,
        }
        true
    }

    fn derivation_base(&self, base: &QNameRef, f: &mut Findings) {
        if base.unresolvable {
            return;
        }
        match self.derivation_site() {
            Some(DerivationSite::ComplexContent) => match self.find_type(base) {
                Some(TypeShape::Complex) => {}
                Some(TypeShape::Simple) => f.error(format!(
                    "complex content cannot derive from simple type '{}'",
                    base.text
                )),
                None => f.fatal(format!(
                    "base type '{}' is not defined; the content model cannot be checked",
                    base.text
                )),
            },
            Some(DerivationSite::SimpleContent) => {
                if self.find_type(base).is_none() {
                    f.error(unresolved("base type", base));
                }
            }
            Some(DerivationSite::SimpleType) => {
                self.require_simple_type(base, "restriction base", f)
            }
            None => {}
        }
    }

    fn namespace(&self) -> Option<&str> {
        self.ctx
            .document(self.document)
            .effective_namespace
            .as_deref()
    }

    fn include(&self, l: &SchemaLocation, f: &mut Findings) {
        let Some(target) = l.target else {
            if let Some(location) = &l.location {
                f.error(format!("included schema '{}' could not be loaded", location));
            }
            return;
        };
        let included = self.ctx.document(target);
        if let Some(namespace) = &included.target_namespace {
            if Some(namespace.as_str()) != self.namespace() {
                f.error(format!(
                    "included schema '{}' has target namespace '{}', expected {}",
                    included.identifier,
                    namespace,
                    describe_namespace(self.namespace())
                ));
            }
        }
    }

    fn import(&self, l: &SchemaLocation, f: &mut Findings) {
        if l.namespace.as_deref() == self.namespace() {
            f.error(format!(
                "a schema cannot import its own namespace {}",
                describe_namespace(self.namespace())
            ));
            return;
        }
        let Some(target) = l.target else {
            let what = l
                .location
                .as_deref()
                .or(l.namespace.as_deref())
                .unwrap_or("(no namespace)");
            f.warning(format!("imported schema '{}' could not be loaded", what));
            return;
        };
        let imported = self.ctx.document(target);
        if imported.target_namespace != l.namespace {
            f.error(format!(
                "import of {} loaded '{}' with target namespace {}",
                describe_namespace(l.namespace.as_deref()),
                imported.identifier,
                describe_namespace(imported.target_namespace.as_deref())
            ));
        }
    }
}

fn unresolved(what: &str, reference: &QNameRef) -> String {
    format!("{} '{}' is not defined ({})", what, reference.text, reference.qname)
}

fn describe_namespace(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("'{}'", ns),
        None => "no namespace".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators::problems::Severity;
    use crate::validators::{load, merge_pass, prevalidate_pass, register_pass, MemoryLibrary};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn check(library: MemoryLibrary, input: &str) -> ValidationContext {
        let library = Arc::new(library);
        let resolvers = library
            .resolver(input)
            .map(|r| vec![Arc::new(r) as Arc<dyn crate::resolvers::SchemaResolver>])
            .unwrap();
        let mut ctx = ValidationContext::new();
        let docs = load(&resolvers, None, &mut ctx).unwrap();
        prevalidate_pass(&mut ctx, &docs);
        register_pass(&mut ctx, &docs);
        merge_pass(&mut ctx, &docs);
        validate_pass(&mut ctx, &docs);
        ctx
    }

    fn single(body: &str) -> ValidationContext {
        check(
            MemoryLibrary::new().with(
                "t.xsd",
                format!(
                    r#"<xs:schema {XS} xmlns:t="urn:t" targetNamespace="urn:t">{body}</xs:schema>"#
                ),
            ),
            "t.xsd",
        )
    }

    fn messages(ctx: &ValidationContext, severity: Severity) -> Vec<String> {
        ctx.problems()
            .iter()
            .filter(|p| p.severity == severity)
            .map(|p| p.message.clone())
            .collect()
    }

    #[test]
    fn test_references_resolve() {
        let ctx = single(
            r#"<xs:element name="root" type="t:Root"/>
               <xs:element name="item" type="xs:string" substitutionGroup="t:root"/>
               <xs:attribute name="code" type="t:Code"/>
               <xs:complexType name="Root">
                 <xs:sequence><xs:element ref="t:item"/><xs:group ref="t:G"/></xs:sequence>
                 <xs:attribute ref="t:code"/>
                 <xs:attribute ref="xml:lang"/>
                 <xs:attributeGroup ref="t:AG"/>
               </xs:complexType>
               <xs:simpleType name="Code"><xs:restriction base="xs:token"/></xs:simpleType>
               <xs:simpleType name="Codes"><xs:list itemType="t:Code"/></xs:simpleType>
               <xs:simpleType name="Either"><xs:union memberTypes="t:Code xs:int"/></xs:simpleType>
               <xs:group name="G"><xs:sequence/></xs:group>
               <xs:attributeGroup name="AG"/>"#,
        );
        assert_eq!(messages(&ctx, Severity::Error), Vec::<String>::new());
        assert_eq!(ctx.error_count(), 0);
    }

    #[test]
    fn test_unresolved_references() {
        let ctx = single(
            r#"<xs:element name="a" type="t:Missing"/>
               <xs:element name="b" substitutionGroup="t:nothing"/>
               <xs:complexType name="C">
                 <xs:sequence><xs:element ref="t:gone"/><xs:group ref="t:NoGroup"/></xs:sequence>
                 <xs:attribute ref="t:noAttr"/>
                 <xs:attributeGroup ref="t:NoAG"/>
               </xs:complexType>"#,
        );
        let errors = messages(&ctx, Severity::Error);
        assert_eq!(errors.len(), 6);
        assert_eq!(
            errors[0],
            "element type 't:Missing' is not defined ({urn:t}Missing)"
        );
    }

    #[test]
    fn test_attribute_and_simple_type_references_must_be_simple() {
        let ctx = single(
            r#"<xs:complexType name="C"/>
               <xs:attribute name="a" type="t:C"/>
               <xs:attribute name="b" type="xs:anyType"/>
               <xs:simpleType name="L"><xs:list itemType="t:C"/></xs:simpleType>
               <xs:simpleType name="R"><xs:restriction base="t:C"/></xs:simpleType>"#,
        );
        let errors = messages(&ctx, Severity::Error);
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| e.ends_with("must be a simple type")));
    }

    #[test]
    fn test_unresolved_complex_content_base_is_fatal_and_pruned() {
        let ctx = single(
            r#"<xs:complexType name="C">
                 <xs:complexContent>
                   <xs:extension base="t:Missing">
                     <xs:sequence><xs:element ref="t:alsoMissing"/></xs:sequence>
                   </xs:extension>
                 </xs:complexContent>
               </xs:complexType>
               <xs:element name="e" type="t:Nope"/>"#,
        );
        assert_eq!(ctx.count(Severity::Fatal), 1);
        assert_eq!(ctx.skipped_count(), 1);
        // The pruned element reference is never checked; the sibling is
        assert_eq!(
            messages(&ctx, Severity::Error),
            vec!["element type 't:Nope' is not defined ({urn:t}Nope)".to_string()]
        );
    }

    #[test]
    fn test_undeclared_prefix_is_reported_once() {
        let ctx = single(
            r#"<xs:element name="e" type="nope:T"/>
               <xs:complexType name="C">
                 <xs:complexContent><xs:extension base="nope:B"/></xs:complexContent>
               </xs:complexType>"#,
        );
        let errors = messages(&ctx, Severity::Error);
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors.iter().all(|e| e.contains("Unknown prefix: nope")));
        assert_eq!(ctx.count(Severity::Fatal), 0);
    }

    #[test]
    fn test_complex_content_from_simple_type() {
        let ctx = single(
            r#"<xs:complexType name="C">
                 <xs:complexContent><xs:restriction base="xs:string"/></xs:complexContent>
               </xs:complexType>
               <xs:complexType name="S">
                 <xs:simpleContent><xs:extension base="xs:decimal"/></xs:simpleContent>
               </xs:complexType>"#,
        );
        assert_eq!(
            messages(&ctx, Severity::Error),
            vec!["complex content cannot derive from simple type 'xs:string'".to_string()]
        );
        assert_eq!(ctx.count(Severity::Fatal), 0);
    }

    #[test]
    fn test_include_and_import_checks() {
        let ctx = check(
            MemoryLibrary::new()
                .with(
                    "main.xsd",
                    format!(
                        r#"<xs:schema {XS} targetNamespace="urn:a">
                             <xs:include schemaLocation="other-ns.xsd"/>
                             <xs:include schemaLocation="missing.xsd"/>
                             <xs:import namespace="urn:b" schemaLocation="wrong-ns.xsd"/>
                             <xs:import namespace="urn:a"/>
                             <xs:import namespace="urn:nowhere" schemaLocation="nowhere.xsd"/>
                           </xs:schema>"#
                    ),
                )
                .with(
                    "other-ns.xsd",
                    format!(r#"<xs:schema {XS} targetNamespace="urn:z"/>"#),
                )
                .with(
                    "wrong-ns.xsd",
                    format!(r#"<xs:schema {XS} targetNamespace="urn:c"/>"#),
                ),
            "main.xsd",
        );
        let errors = messages(&ctx, Severity::Error);
        assert_eq!(errors.len(), 4, "{:?}", errors);
        assert!(errors[0].contains("has target namespace 'urn:z'"));
        assert!(errors[1].contains("'missing.xsd' could not be loaded"));
        assert!(errors[2].contains("with target namespace 'urn:c'"));
        assert!(errors[3].contains("cannot import its own namespace"));
        assert_eq!(
            messages(&ctx, Severity::Warning),
            vec!["imported schema 'nowhere.xsd' could not be loaded".to_string()]
        );
    }

    #[test]
    fn test_keyref_refer_is_unimplemented() {
        let ctx = single(
            r#"<xs:element name="e">
                 <xs:key name="k"><xs:selector xpath="a"/><xs:field xpath="@id"/></xs:key>
                 <xs:keyref name="r" refer="t:k"><xs:selector xpath="b"/><xs:field xpath="@ref"/></xs:keyref>
               </xs:element>"#,
        );
        let notices = messages(&ctx, Severity::Unimplemented);
        assert_eq!(
            notices
                .iter()
                .filter(|m| m.starts_with("keyref 'refer'"))
                .count(),
            1
        );
        assert_eq!(ctx.error_count(), 0);
    }
}
