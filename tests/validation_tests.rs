//! End-to-end validation tests over in-memory schema sets

use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use xsd_check::model::{ComponentId, ComponentKind, DocumentId};
use xsd_check::namespaces::QName;
use xsd_check::validators::{
    load, merge_pass, prevalidate_pass, register_pass, validate_pass, validate_schemas,
    MemoryLibrary, NameCategory, RecordingHandler, SchemaResolver, Severity, ValidationContext,
};

const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

fn schema(namespace: &str, body: &str) -> String {
    format!(
        r#"<xs:schema {XS} xmlns:t="{namespace}" targetNamespace="{namespace}">{body}</xs:schema>"#
    )
}

fn plain_schema(body: &str) -> String {
    format!(r#"<xs:schema {XS}>{body}</xs:schema>"#)
}

fn resolvers(library: MemoryLibrary, ids: &[&str]) -> Vec<Arc<dyn SchemaResolver>> {
    let library = Arc::new(library);
    ids.iter()
        .filter_map(|id| library.resolver(id))
        .map(|r| Arc::new(r) as Arc<dyn SchemaResolver>)
        .collect()
}

fn validate(library: MemoryLibrary, ids: &[&str]) -> (ValidationContext, Vec<DocumentId>) {
    let mut ctx = ValidationContext::new();
    let docs = load(&resolvers(library, ids), None, &mut ctx).unwrap();
    validate_schemas(&docs, &mut ctx);
    (ctx, docs)
}

fn messages(ctx: &ValidationContext, severity: Severity) -> Vec<String> {
    ctx.problems()
        .iter()
        .filter(|p| p.severity == severity)
        .map(|p| p.message.clone())
        .collect()
}

fn global(ctx: &ValidationContext, doc: DocumentId, index: usize) -> ComponentId {
    ctx.component(ctx.document(doc).root).children[index]
}

#[test]
fn test_duplicate_definitions_in_every_category() {
    let cases = [
        (NameCategory::Element, r#"<xs:element name="x"/>"#),
        (NameCategory::Attribute, r#"<xs:attribute name="x"/>"#),
        (NameCategory::Group, r#"<xs:group name="x"><xs:sequence/></xs:group>"#),
        (NameCategory::AttributeGroup, r#"<xs:attributeGroup name="x"/>"#),
        (NameCategory::Type, r#"<xs:complexType name="x"/>"#),
    ];
    for (category, definition) in cases {
        let (ctx, docs) = validate(
            MemoryLibrary::new().with(
                "d.xsd",
                schema("urn:d", &format!("{definition}{definition}")),
            ),
            &["d.xsd"],
        );
        let errors: Vec<_> = ctx
            .problems()
            .iter()
            .filter(|p| p.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1, "{category}: {errors:?}");
        assert_eq!(errors[0].subject.component(), Some(global(&ctx, docs[0], 1)));
        assert_eq!(
            ctx.lookup(docs[0], category, &QName::namespaced("urn:d", "x")),
            Some(global(&ctx, docs[0], 0))
        );
    }
}

#[test]
fn test_duplicate_across_included_documents() {
    let (ctx, _) = validate(
        MemoryLibrary::new()
            .with(
                "main.xsd",
                schema(
                    "urn:d",
                    r#"<xs:include schemaLocation="part.xsd"/><xs:simpleType name="Code"><xs:restriction base="xs:string"/></xs:simpleType>"#,
                ),
            )
            .with(
                "part.xsd",
                schema("urn:d", r#"<xs:complexType name="Code"/>"#),
            ),
        &["main.xsd"],
    );
    let errors = messages(&ctx, Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("duplicate type '{urn:d}Code'"));
}

#[test]
fn test_same_name_in_different_namespaces_is_fine() {
    let (ctx, _) = validate(
        MemoryLibrary::new()
            .with(
                "a.xsd",
                schema(
                    "urn:a",
                    r#"<xs:import namespace="urn:b" schemaLocation="b.xsd"/><xs:element name="x"/>"#,
                ),
            )
            .with("b.xsd", schema("urn:b", r#"<xs:element name="x"/>"#)),
        &["a.xsd"],
    );
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.problems());
}

fn occurs_errors(min: &str, max: &str) -> usize {
    let (ctx, _) = validate(
        MemoryLibrary::new().with(
            "o.xsd",
            schema(
                "urn:o",
                &format!(
                    r#"<xs:complexType name="T"><xs:sequence>
                         <xs:element name="e" minOccurs="{min}" maxOccurs="{max}"/>
                       </xs:sequence></xs:complexType>"#
                ),
            ),
        ),
        &["o.xsd"],
    );
    messages(&ctx, Severity::Error)
        .iter()
        .filter(|m| m.contains("must not be greater than maxOccurs"))
        .count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_occurs_bounds(min in 0u32..50, max in 0u32..50) {
        let expected = usize::from(min > max);
        prop_assert_eq!(occurs_errors(&min.to_string(), &max.to_string()), expected);
    }

    #[test]
    fn prop_unbounded_max_accepts_any_min(min in 0u32..10_000) {
        prop_assert_eq!(occurs_errors(&min.to_string(), "unbounded"), 0);
    }
}

#[test]
fn test_all_with_other_token_keeps_all() {
    let (ctx, docs) = validate(
        MemoryLibrary::new().with(
            "e.xsd",
            schema("urn:e", r##"<xs:element name="e" block="#all extension"/>"##),
        ),
        &["e.xsd"],
    );
    assert_eq!(ctx.count(Severity::Error), 1);
    match &ctx.component(global(&ctx, docs[0], 0)).kind {
        ComponentKind::Element(e) => {
            assert!(e.block.value.is_all());
            assert_eq!(e.block.value.to_text().as_deref(), Some("#all"));
        }
        other => panic!("unexpected {}", other.tag()),
    }
}

#[test]
fn test_enumeration_sets_round_trip_through_prevalidation() {
    let (ctx, docs) = validate(
        MemoryLibrary::new().with(
            "e.xsd",
            schema(
                "urn:e",
                r##"<xs:element name="a" final="restriction  extension"/>
                    <xs:element name="b" block="#all"/>"##,
            ),
        ),
        &["e.xsd"],
    );
    assert_eq!(ctx.error_count(), 0);
    let ComponentKind::Element(a) = &ctx.component(global(&ctx, docs[0], 0)).kind else {
        panic!("expected an element");
    };
    assert_eq!(a.final_.value.to_text().as_deref(), Some("extension restriction"));
    let ComponentKind::Element(b) = &ctx.component(global(&ctx, docs[0], 1)).kind else {
        panic!("expected an element");
    };
    assert!(b.block.value.is_all());
}

fn import_pair() -> MemoryLibrary {
    MemoryLibrary::new()
        .with(
            "a.xsd",
            format!(
                r#"<xs:schema {XS} xmlns:b="urn:b" targetNamespace="urn:a">
                     <xs:import namespace="urn:b" schemaLocation="b.xsd"/>
                     <xs:element name="root" type="b:Shared"/>
                   </xs:schema>"#
            ),
        )
        .with("b.xsd", schema("urn:b", r#"<xs:complexType name="Shared"/>"#))
}

fn unresolved_count(ctx: &ValidationContext) -> usize {
    messages(ctx, Severity::Error)
        .iter()
        .filter(|m| m.contains("is not defined"))
        .count()
}

#[test]
fn test_merge_must_run_before_validate() {
    let mut ctx = ValidationContext::new();
    let docs = load(&resolvers(import_pair(), &["a.xsd"]), None, &mut ctx).unwrap();
    validate_schemas(&docs, &mut ctx);
    assert_eq!(unresolved_count(&ctx), 0);
    assert_eq!(ctx.error_count(), 0);

    // Negative control: same set, merge skipped
    let mut ctx = ValidationContext::new();
    let docs = load(&resolvers(import_pair(), &["a.xsd"]), None, &mut ctx).unwrap();
    prevalidate_pass(&mut ctx, &docs);
    register_pass(&mut ctx, &docs);
    validate_pass(&mut ctx, &docs);
    assert_eq!(unresolved_count(&ctx), 1);

    // Merging afterwards and validating again resolves it
    merge_pass(&mut ctx, &docs);
    let before = unresolved_count(&ctx);
    validate_pass(&mut ctx, &docs);
    assert_eq!(unresolved_count(&ctx), before);
}

#[test]
fn test_chameleon_wrapper_synthesis() {
    let library = MemoryLibrary::new()
        .with(
            "one.xsd",
            plain_schema(r#"<xs:element name="one" type="Two"/>"#),
        )
        .with(
            "two.xsd",
            plain_schema(r#"<xs:complexType name="Two"/>"#),
        );
    let mut ctx = ValidationContext::new();
    let docs = load(&resolvers(library, &["one.xsd", "two.xsd"]), Some("urn:x"), &mut ctx).unwrap();

    assert_eq!(docs.len(), 3);
    let wrapper = ctx.document(docs[0]);
    assert!(wrapper.synthetic);
    assert_eq!(wrapper.target_namespace.as_deref(), Some("urn:x"));

    let included: Vec<_> = ctx
        .component(wrapper.root)
        .children
        .iter()
        .map(|c| match &ctx.component(*c).kind {
            ComponentKind::Include(l) => l.target,
            other => panic!("unexpected {}", other.tag()),
        })
        .collect();
    assert_eq!(included, vec![Some(docs[1]), Some(docs[2])]);
    for doc in &docs[1..] {
        assert_eq!(ctx.document(*doc).effective_namespace.as_deref(), Some("urn:x"));
    }

    validate_schemas(&docs, &mut ctx);
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.problems());
    assert!(ctx
        .lookup(docs[1], NameCategory::Type, &QName::namespaced("urn:x", "Two"))
        .is_some());
}

#[test]
fn test_chameleon_include_takes_including_namespace() {
    let (ctx, _) = validate(
        MemoryLibrary::new()
            .with(
                "main.xsd",
                schema(
                    "urn:m",
                    r#"<xs:include schemaLocation="common.xsd"/>
                       <xs:element name="order" type="t:Address"/>"#,
                ),
            )
            .with(
                "common.xsd",
                plain_schema(
                    r#"<xs:complexType name="Address"><xs:sequence>
                         <xs:element name="street" type="Street"/>
                       </xs:sequence></xs:complexType>
                       <xs:simpleType name="Street"><xs:restriction base="xs:string"/></xs:simpleType>"#,
                ),
            ),
        &["main.xsd"],
    );
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.problems());
}

#[test]
fn test_unresolved_base_fatal_prunes_later_runs() {
    let (mut ctx, docs) = validate(
        MemoryLibrary::new().with(
            "f.xsd",
            schema(
                "urn:f",
                r#"<xs:complexType name="C"><xs:complexContent>
                     <xs:extension base="t:Missing">
                       <xs:sequence><xs:element ref="t:alsoMissing" minOccurs="lots"/></xs:sequence>
                     </xs:extension>
                   </xs:complexContent></xs:complexType>
                   <xs:element name="e" type="t:Nope"/>"#,
            ),
        ),
        &["f.xsd"],
    );

    let content = ctx.component(global(&ctx, docs[0], 0)).children[0];
    let extension = ctx.component(content).children[0];
    assert_eq!(ctx.count(Severity::Fatal), 1);
    assert!(ctx.is_skipped(extension));
    // Prevalidation ran before the base was found missing
    let first = messages(&ctx, Severity::Error);
    assert_eq!(first.len(), 2, "{:?}", first);
    assert!(first.iter().any(|m| m.contains("minOccurs")));
    assert!(!first.iter().any(|m| m.contains("alsoMissing")));

    prevalidate_pass(&mut ctx, &docs);
    validate_pass(&mut ctx, &docs);

    // Only the unpruned element is checked again
    assert_eq!(ctx.count(Severity::Fatal), 1);
    let second = messages(&ctx, Severity::Error);
    assert_eq!(second.len(), 3, "{:?}", second);
    assert_eq!(second.iter().filter(|m| m.contains("minOccurs")).count(), 1);
    assert_eq!(second.iter().filter(|m| m.contains("t:Nope")).count(), 2);
}

#[test]
fn test_fatal_prunes_subtree_in_later_passes() {
    let mut ctx = ValidationContext::new();
    let docs = load(
        &resolvers(
            MemoryLibrary::new().with(
                "f.xsd",
                schema(
                    "urn:f",
                    r#"<xs:complexType name="T">
                         <xs:sequence><xs:element ref="t:missing"/></xs:sequence>
                         <xs:attribute name="a" type="t:AlsoMissing"/>
                       </xs:complexType>"#,
                ),
            ),
            &["f.xsd"],
        ),
        None,
        &mut ctx,
    )
    .unwrap();

    let sequence = ctx.component(global(&ctx, docs[0], 0)).children[0];
    ctx.add_fatal(sequence, "content model cannot be analyzed");
    validate_schemas(&docs, &mut ctx);

    // Only the sibling attribute is checked
    assert_eq!(
        messages(&ctx, Severity::Error),
        vec!["attribute type 't:AlsoMissing' is not defined ({urn:f}AlsoMissing)".to_string()]
    );
    assert!(ctx.is_skipped(sequence));
}

#[test]
fn test_cyclic_includes_validate_once() {
    let (ctx, docs) = validate(
        MemoryLibrary::new()
            .with(
                "a.xsd",
                schema(
                    "urn:c",
                    r#"<xs:include schemaLocation="b.xsd"/><xs:element name="a" type="t:B"/>"#,
                ),
            )
            .with(
                "b.xsd",
                schema(
                    "urn:c",
                    r#"<xs:include schemaLocation="a.xsd"/><xs:complexType name="B"/>"#,
                ),
            ),
        &["a.xsd"],
    );
    assert_eq!(docs.len(), 2);
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.problems());
}

#[test]
fn test_include_diamond_has_no_duplicates() {
    let (ctx, _) = validate(
        MemoryLibrary::new()
            .with(
                "top.xsd",
                schema(
                    "urn:d",
                    r#"<xs:include schemaLocation="left.xsd"/>
                       <xs:include schemaLocation="right.xsd"/>
                       <xs:element name="top" type="t:Base"/>"#,
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
            .with("base.xsd", schema("urn:d", r#"<xs:complexType name="Base"/>"#)),
        &["top.xsd"],
    );
    assert_eq!(ctx.error_count(), 0, "{:?}", ctx.problems());
}

#[test]
fn test_reset_keeps_handler_between_runs() {
    let recording = RecordingHandler::new();
    let mut ctx = ValidationContext::with_handler(recording.clone());

    let docs = load(
        &resolvers(
            MemoryLibrary::new().with(
                "bad.xsd",
                schema("urn:r", r#"<xs:element name="e" type="t:Missing"/>"#),
            ),
            &["bad.xsd"],
        ),
        None,
        &mut ctx,
    )
    .unwrap();
    validate_schemas(&docs, &mut ctx);
    assert!(ctx.report_to_handler());
    assert_eq!(recording.count(Severity::Error), 1);

    ctx.reset();
    assert!(ctx.has_handler());
    let docs = load(&resolvers(import_pair(), &["a.xsd"]), None, &mut ctx).unwrap();
    validate_schemas(&docs, &mut ctx);
    assert!(!ctx.report_to_handler());
    assert_eq!(recording.count(Severity::Error), 1);
    assert_eq!(recording.reports().len(), 2);
}
