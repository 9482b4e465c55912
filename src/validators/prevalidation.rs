//! Prevalidation pass
//!
//! Checks every component against the rules that need nothing but the
//! component itself, its parent and its children: attribute conversions
//! (occurrence bounds, form choices, enumeration sets), attribute
//! combinations, and content shape. Unprefixed QName references are given
//! the owning document's effective namespace here, so the later passes see
//! fully qualified references.

use tracing::info;

use crate::model::{
    AttributeDecl, AttributeGroupDef, AttributeUse, ComplexTypeDef, ComponentId,
    ComponentKind, Compositor, CompositorKind, Count, DefRefAttrs, Derivation, DocumentId,
    ElementDecl, EnumSetAttr, EnumSymbol, Facet, FormAttr, FormChoice, GroupDef,
    IdentityConstraint, ListDef, NotationDecl, OccursAttrs, ProcessContents, SchemaAttrs,
    SchemaLocation, SimpleTypeDef, UnionDef, WhiteSpace, Wildcard,
};
use crate::model::values::{parse_boolean, parse_symbol};
use crate::names::is_valid_ncname;

use super::context::ValidationContext;
use super::problems::Findings;
use super::walker::{SchemaVisitor, TreeWalker};

/// Run the prevalidation pass over a document set
pub fn prevalidate_pass(ctx: &mut ValidationContext, documents: &[DocumentId]) {
    ctx.clear_traversed();
    let errors = ctx.error_count();
    let visited = TreeWalker::walk_documents(ctx, documents, &mut Prevalidator);
    info!(
        visited,
        errors = ctx.error_count() - errors,
        "prevalidation pass finished"
    );
}

struct Prevalidator;

impl SchemaVisitor for Prevalidator {
    fn visit(&mut self, ctx: &mut ValidationContext, id: ComponentId) -> bool {
        let scope = Scope::of(ctx, id);
        let mut kind = ctx.component(id).kind.clone();
        let mut findings = Findings::default();

        patch_references(&mut kind, scope.namespace.as_deref());
        let descend = prevalidate(&mut kind, &scope, &mut findings);
        ctx.component_mut(id).kind = kind;

        findings.apply(ctx, id);
        descend
    }
}

/// Surroundings of the component being checked
struct Scope {
    global: bool,
    parent_tag: Option<String>,
    child_tags: Vec<String>,
    namespace: Option<String>,
}

impl Scope {
    fn of(ctx: &ValidationContext, id: ComponentId) -> Self {
        let component = ctx.component(id);
        let parent = component.parent.map(|p| &ctx.component(p).kind);
        Self {
            global: matches!(parent, Some(ComponentKind::Schema(_))),
            parent_tag: parent.map(|k| k.tag().to_string()),
            child_tags: component
                .children
                .iter()
                .map(|c| ctx.component(*c).kind.tag().to_string())
                .collect(),
            namespace: ctx.document(component.document).effective_namespace.clone(),
        }
    }

    fn parent_is(&self, tag: &str) -> bool {
        self.parent_tag.as_deref() == Some(tag)
    }

    fn has_child(&self, tag: &str) -> bool {
        self.child_tags.iter().any(|t| t == tag)
    }

    fn count_children(&self, tags: &[&str]) -> usize {
        self.child_tags
            .iter()
            .filter(|t| tags.contains(&t.as_str()))
            .count()
    }
}

fn patch_references(kind: &mut ComponentKind, namespace: Option<&str>) {
    let Some(namespace) = namespace else {
        return;
    };
    for reference in kind.qname_refs_mut() {
        if reference.needs_namespace() {
            reference.qname.namespace = Some(namespace.to_string());
        }
    }
}

fn prevalidate(kind: &mut ComponentKind, scope: &Scope, f: &mut Findings) -> bool {
    match kind {
        ComponentKind::Schema(s) => schema(s, f),
        ComponentKind::Element(e) => element(e, scope, f),
        ComponentKind::Attribute(a) => attribute(a, scope, f),
        ComponentKind::ComplexType(t) => complex_type(t, scope, f),
        ComponentKind::SimpleType(t) => simple_type(t, scope, f),
        ComponentKind::Group(g) => group(g, scope, f),
        ComponentKind::AttributeGroup(g) => attribute_group(g, scope, f),
        ComponentKind::Include(l) => require_location(l, "include", f),
        ComponentKind::Import(_) => {}
        ComponentKind::Redefine(l) => {
            require_location(l, "redefine", f);
            f.unimplemented("xs:redefine is not supported; redefined components are not checked");
            return false;
        }
        ComponentKind::Compositor(c) => compositor(c, scope, f),
        ComponentKind::Any(w) => {
            occurs(&mut w.occurs, f);
            wildcard(w, f);
        }
        ComponentKind::AnyAttribute(w) => wildcard(w, f),
        ComponentKind::ComplexContent(m) => {
            boolean(&m.mixed, "mixed", f);
            content_model(scope, "complexContent", f);
        }
        ComponentKind::SimpleContent(_) => content_model(scope, "simpleContent", f),
        ComponentKind::Extension(d) => {
            if d.base.is_none() {
                f.error("extension must have a 'base'");
            }
        }
        ComponentKind::Restriction(d) => restriction(d, scope, f),
        ComponentKind::List(l) => list(l, scope, f),
        ComponentKind::Union(u) => union(u, scope, f),
        ComponentKind::Facet(facet) => facet_value(facet, f),
        ComponentKind::Notation(n) => notation(n, f),
        ComponentKind::IdentityConstraint(c) => {
            identity_constraint(c, f);
            return false;
        }
        ComponentKind::Unknown(tag) => {
            f.error(format!("xs:{} is not a schema component", tag));
            return false;
        }
    }
    true
}

// Attribute groups and conversions

fn occurs(o: &mut OccursAttrs, f: &mut Findings) {
    o.min = None;
    o.max = None;

    if let Some(text) = &o.min_text {
        match text.parse::<Count>() {
            Ok(count) if count.is_unbounded() => f.error("minOccurs cannot be 'unbounded'"),
            Ok(count) => o.min = Some(count),
            Err(_) => f.error(format!("minOccurs '{}' is not a non-negative integer", text)),
        }
    }
    if let Some(text) = &o.max_text {
        match text.parse::<Count>() {
            Ok(count) => o.max = Some(count),
            Err(_) => f.error(format!(
                "maxOccurs '{}' is not a non-negative integer or 'unbounded'",
                text
            )),
        }
    }

    if let (Some(Count::Bounded(min)), Some(Count::Bounded(max))) = (o.min, o.max) {
        if min > max {
            f.error(format!(
                "minOccurs ({}) must not be greater than maxOccurs ({})",
                min, max
            ));
        }
    }
}

fn def_ref(d: &DefRefAttrs, tag: &str, scope: &Scope, f: &mut Findings) {
    match (&d.name, &d.reference) {
        (Some(_), Some(_)) => f.error(format!("{} cannot have both 'name' and 'ref'", tag)),
        (None, Some(_)) if scope.global => {
            f.error(format!("global {} must be a definition, not a reference", tag))
        }
        (None, None) if scope.global => f.error(format!("global {} must have a name", tag)),
        (None, None) => f.error(format!("{} must have a 'name' or a 'ref'", tag)),
        _ => {}
    }
    ncname(&d.name, f);
}

fn form(attr: &mut FormAttr, name: &str, f: &mut Findings) {
    attr.form = None;
    if let Some(text) = &attr.text {
        match parse_symbol::<FormChoice>(text) {
            Ok(value) => attr.form = Some(value),
            Err(message) => f.error(format!("invalid {}: {}", name, message)),
        }
    }
}

fn enum_set<E: EnumSymbol>(attr: &mut EnumSetAttr<E>, name: &str, f: &mut Findings) {
    for message in attr.value.parse_text(attr.text.as_deref()) {
        f.error(format!("invalid {}: {}", name, message));
    }
}

fn boolean(value: &Option<String>, name: &str, f: &mut Findings) {
    if let Some(text) = value {
        if parse_boolean(text).is_none() {
            f.error(format!("{} '{}' is not a boolean", name, text));
        }
    }
}

fn ncname(name: &Option<String>, f: &mut Findings) {
    if let Some(name) = name {
        if !is_valid_ncname(name) {
            f.error(format!("'{}' is not a valid NCName", name));
        }
    }
}

fn named_definition(name: &Option<String>, tag: &str, scope: &Scope, f: &mut Findings) {
    if scope.global && name.is_none() {
        f.error(format!("global {} must have a name", tag));
    } else if !scope.global && name.is_some() {
        f.error(format!("local {} cannot have a name", tag));
    }
    ncname(name, f);
}

// Components

fn schema(s: &mut SchemaAttrs, f: &mut Findings) {
    if s.target_namespace.as_deref() == Some("") {
        f.error("targetNamespace must not be empty; omit it for a schema without namespace");
    }
    form(&mut s.element_form_default, "elementFormDefault", f);
    form(&mut s.attribute_form_default, "attributeFormDefault", f);
    enum_set(&mut s.block_default, "blockDefault", f);
    enum_set(&mut s.final_default, "finalDefault", f);
}

fn element(e: &mut ElementDecl, scope: &Scope, f: &mut Findings) {
    def_ref(&e.def_ref, "element", scope, f);
    occurs(&mut e.occurs, f);
    form(&mut e.form, "form", f);
    enum_set(&mut e.block, "block", f);
    enum_set(&mut e.final_, "final", f);
    boolean(&e.nillable, "nillable", f);
    boolean(&e.abstract_, "abstract", f);

    let inline_type = scope.has_child("complexType") || scope.has_child("simpleType");
    if scope.global {
        if e.occurs.is_present() {
            f.error("global element cannot have minOccurs or maxOccurs");
        }
        if e.form.text.is_some() {
            f.error("global element cannot have 'form'");
        }
    } else {
        let mut global_only = Vec::new();
        if e.abstract_.is_some() {
            global_only.push("abstract");
        }
        if e.substitution_group.is_some() {
            global_only.push("substitutionGroup");
        }
        if e.final_.text.is_some() {
            global_only.push("final");
        }
        if !global_only.is_empty() {
            f.error(format!("local element cannot have {}", global_only.join(", ")));
        }
    }

    if e.def_ref.reference.is_some() {
        let mut present = Vec::new();
        if e.type_ref.is_some() {
            present.push("type");
        }
        if inline_type {
            present.push("an inline type");
        }
        if e.block.text.is_some() {
            present.push("block");
        }
        if e.nillable.is_some() {
            present.push("nillable");
        }
        if e.default.is_some() {
            present.push("default");
        }
        if e.fixed.is_some() {
            present.push("fixed");
        }
        if e.form.text.is_some() {
            present.push("form");
        }
        if !present.is_empty() {
            f.error(format!("element reference cannot have {}", present.join(", ")));
        }
    } else if e.type_ref.is_some() && inline_type {
        f.error("element cannot have both a 'type' attribute and an inline type");
    }

    if e.default.is_some() && e.fixed.is_some() {
        f.error("element cannot have both 'default' and 'fixed'");
    }
    if scope.parent_is("all") && e.occurs.max.map_or(false, |max| max.greater_than(1)) {
        f.error("element in an all group cannot have maxOccurs greater than 1");
    }
}

fn attribute(a: &mut AttributeDecl, scope: &Scope, f: &mut Findings) {
    def_ref(&a.def_ref, "attribute", scope, f);
    form(&mut a.form, "form", f);

    a.usage = None;
    if let Some(text) = &a.use_text {
        match parse_symbol::<AttributeUse>(text) {
            Ok(usage) => a.usage = Some(usage),
            Err(message) => f.error(format!("invalid use: {}", message)),
        }
    }

    if scope.global {
        if a.use_text.is_some() {
            f.error("global attribute cannot have 'use'");
        }
        if a.form.text.is_some() {
            f.error("global attribute cannot have 'form'");
        }
    }

    let inline_type = scope.has_child("simpleType");
    if a.def_ref.reference.is_some() {
        let mut present = Vec::new();
        if a.type_ref.is_some() {
            present.push("type");
        }
        if inline_type {
            present.push("an inline simpleType");
        }
        if a.form.text.is_some() {
            present.push("form");
        }
        if !present.is_empty() {
            f.error(format!("attribute reference cannot have {}", present.join(", ")));
        }
    } else if a.type_ref.is_some() && inline_type {
        f.error("attribute cannot have both a 'type' attribute and an inline simpleType");
    }

    if a.default.is_some() && a.fixed.is_some() {
        f.error("attribute cannot have both 'default' and 'fixed'");
    }
    if a.default.is_some() && a.use_text.is_some() && a.usage != Some(AttributeUse::Optional) {
        f.error("attribute with a default value must have use='optional'");
    }
}

fn complex_type(t: &mut ComplexTypeDef, scope: &Scope, f: &mut Findings) {
    named_definition(&t.name, "complexType", scope, f);
    boolean(&t.mixed, "mixed", f);
    boolean(&t.abstract_, "abstract", f);
    enum_set(&mut t.block, "block", f);
    enum_set(&mut t.final_, "final", f);

    let content_models = scope.count_children(&["complexContent", "simpleContent"]);
    if content_models > 1 {
        f.error("complexType can have only one complexContent or simpleContent");
    } else if content_models == 1
        && scope.count_children(&[
            "sequence",
            "choice",
            "all",
            "group",
            "attribute",
            "attributeGroup",
            "anyAttribute",
        ]) > 0
    {
        f.error("complexType with complexContent or simpleContent cannot have other content");
    }
}

fn simple_type(t: &mut SimpleTypeDef, scope: &Scope, f: &mut Findings) {
    named_definition(&t.name, "simpleType", scope, f);
    enum_set(&mut t.final_, "final", f);
    if scope.count_children(&["restriction", "list", "union"]) != 1 {
        f.error("simpleType must contain exactly one restriction, list or union");
    }
}

fn group(g: &mut GroupDef, scope: &Scope, f: &mut Findings) {
    def_ref(&g.def_ref, "group", scope, f);
    occurs(&mut g.occurs, f);
    if scope.global {
        if g.occurs.is_present() {
            f.error("global group cannot have minOccurs or maxOccurs");
        }
        if scope.count_children(&["sequence", "choice", "all"]) != 1 {
            f.error("group definition must contain exactly one sequence, choice or all");
        }
    } else if g.def_ref.name.is_some() && g.def_ref.reference.is_none() {
        f.error("local group must be a reference");
    }
}

fn attribute_group(g: &mut AttributeGroupDef, scope: &Scope, f: &mut Findings) {
    def_ref(&g.def_ref, "attributeGroup", scope, f);
    if !scope.global && g.def_ref.name.is_some() && g.def_ref.reference.is_none() {
        f.error("local attributeGroup must be a reference");
    }
}

fn require_location(l: &SchemaLocation, tag: &str, f: &mut Findings) {
    if l.location.as_deref().map_or(true, |s| s.trim().is_empty()) {
        f.error(format!("xs:{} must have a schemaLocation", tag));
    }
}

fn compositor(c: &mut Compositor, scope: &Scope, f: &mut Findings) {
    occurs(&mut c.occurs, f);
    if c.kind != CompositorKind::All {
        return;
    }
    if let Some(max) = c.occurs.max {
        if !max.equals(1) {
            f.error("all group must have maxOccurs=1");
        }
    }
    if let Some(min) = c.occurs.min {
        if min.greater_than(1) {
            f.error("all group must have minOccurs 0 or 1");
        }
    }
    if scope.parent_is("sequence") || scope.parent_is("choice") {
        f.error("all group cannot be nested in a sequence or choice");
    }
    if scope.child_tags.iter().any(|t| t != "element") {
        f.error("all group can only contain elements");
    }
}

fn wildcard(w: &Wildcard, f: &mut Findings) {
    if let Some(text) = &w.process_contents {
        if let Err(message) = parse_symbol::<ProcessContents>(text) {
            f.error(format!("invalid processContents: {}", message));
        }
    }
    let Some(namespace) = &w.namespace else {
        return;
    };
    let tokens: Vec<&str> = namespace.split_whitespace().collect();
    if tokens.len() > 1 && tokens.iter().any(|t| *t == "##any" || *t == "##other") {
        f.error(format!(
            "'##any' and '##other' cannot be combined with other values in namespace '{}'",
            namespace
        ));
    }
    for token in tokens {
        if token.starts_with("##")
            && !matches!(token, "##any" | "##other" | "##targetNamespace" | "##local")
        {
            f.error(format!("unknown namespace token '{}'", token));
        }
    }
}

fn content_model(scope: &Scope, tag: &str, f: &mut Findings) {
    if scope.count_children(&["extension", "restriction"]) != 1 {
        f.error(format!(
            "{} must contain exactly one extension or restriction",
            tag
        ));
    }
}

fn restriction(d: &Derivation, scope: &Scope, f: &mut Findings) {
    if scope.parent_is("simpleType") {
        match (d.base.is_some(), scope.has_child("simpleType")) {
            (true, true) => {
                f.error("restriction cannot have both a 'base' and an inline simpleType")
            }
            (false, false) => f.error("restriction must have a 'base' or an inline simpleType"),
            _ => {}
        }
    } else if d.base.is_none() {
        f.error("restriction must have a 'base'");
    }
}

fn list(l: &ListDef, scope: &Scope, f: &mut Findings) {
    match (l.item_type.is_some(), scope.has_child("simpleType")) {
        (true, true) => f.error("list cannot have both an 'itemType' and an inline simpleType"),
        (false, false) => f.error("list must have an 'itemType' or an inline simpleType"),
        _ => {}
    }
}

fn union(u: &UnionDef, scope: &Scope, f: &mut Findings) {
    if u.member_types.is_empty() && !scope.has_child("simpleType") {
        f.error("union must have 'memberTypes' or inline simple types");
    }
}

fn facet_value(facet: &Facet, f: &mut Findings) {
    let Some(value) = &facet.value else {
        f.error(format!("facet xs:{} must have a 'value'", facet.name));
        return;
    };
    match facet.name.as_str() {
        "length" | "minLength" | "maxLength" | "fractionDigits" => {
            if value.trim().parse::<u64>().is_err() {
                f.error(format!(
                    "{} must be a non-negative integer, got '{}'",
                    facet.name, value
                ));
            }
        }
        "totalDigits" => {
            if !matches!(value.trim().parse::<u64>(), Ok(n) if n > 0) {
                f.error(format!("totalDigits must be a positive integer, got '{}'", value));
            }
        }
        "whiteSpace" => {
            if let Err(message) = parse_symbol::<WhiteSpace>(value) {
                f.error(format!("invalid whiteSpace: {}", message));
            }
        }
        _ => {}
    }
}

fn notation(n: &NotationDecl, f: &mut Findings) {
    if n.name.is_none() {
        f.error("notation must have a name");
    }
    ncname(&n.name, f);
    if n.public.is_none() && n.system.is_none() {
        f.error("notation must have 'public' or 'system'");
    }
}

fn identity_constraint(c: &IdentityConstraint, f: &mut Findings) {
    if c.name.is_none() {
        f.error(format!("xs:{} must have a name", c.tag));
    }
    ncname(&c.name, f);
    f.unimplemented(format!("identity constraint xs:{} is not enforced", c.tag));
}
