//! Element tree to schema components
//!
//! The unmarshaller copies attribute text into the component model without
//! judging it: conversions (counts, form choices, enumeration sets) and
//! every rule check happen in the prevalidation pass. The only failures
//! detected here are the ones that prevent building a component at all,
//! such as a QName attribute using an undeclared prefix or an element
//! from a foreign namespace. Those come back as [`UnmarshalIssue`]s with a
//! position but no component.

use tracing::debug;

use crate::documents::{Document, Element, TextPosition};
use crate::error::{ParseError, Result};
use crate::limits::Limits;
use crate::names::split_qname;
use crate::namespaces::QName;
use crate::XSD_NAMESPACE;

use super::components::*;

/// Facet element names
pub const FACET_NAMES: &[&str] = &[
    "length",
    "minLength",
    "maxLength",
    "pattern",
    "enumeration",
    "whiteSpace",
    "maxInclusive",
    "maxExclusive",
    "minInclusive",
    "minExclusive",
    "totalDigits",
    "fractionDigits",
];

/// Problem found while building components, tied only to a text position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmarshalIssue {
    /// Position of the offending start tag
    pub position: Option<TextPosition>,
    /// Description
    pub message: String,
}

/// Components of one document, ready to be appended to the arena
#[derive(Debug)]
pub struct Unmarshalled {
    /// Components in arena order, the root first
    pub components: Vec<Component>,
    /// Root component id
    pub root: ComponentId,
    /// Declared target namespace (an empty attribute counts as absent)
    pub target_namespace: Option<String>,
    /// Problems without a component
    pub issues: Vec<UnmarshalIssue>,
}

/// Build the components of a parsed document
///
/// Component ids start at `base`, the current arena length, so the result
/// can be appended to the arena unchanged.
pub fn unmarshal(
    document: &Document,
    owner: DocumentId,
    base: usize,
    limits: &Limits,
) -> Result<Unmarshalled> {
    let root = document
        .root()
        .ok_or_else(|| ParseError::new("Document has no root element"))?;

    if root.local_name() != "schema" || root.namespace() != Some(XSD_NAMESPACE) {
        let mut err = ParseError::new(format!(
            "Expected xs:schema root element, got {}",
            root.qname
        ));
        if let Some(position) = root.position {
            err = err.with_location(position.to_string());
        }
        return Err(err.into());
    }

    let mut builder = Builder {
        owner,
        base,
        components: Vec::new(),
        issues: Vec::new(),
    };
    let schema_attrs = SchemaAttrs {
        target_namespace: attr(root, "targetNamespace"),
        element_form_default: form_attr(root, "elementFormDefault"),
        attribute_form_default: form_attr(root, "attributeFormDefault"),
        block_default: EnumSetAttr::new(attr(root, "blockDefault")),
        final_default: EnumSetAttr::new(attr(root, "finalDefault")),
        version: attr(root, "version"),
    };
    let target_namespace = schema_attrs
        .target_namespace
        .clone()
        .filter(|ns| !ns.is_empty());

    let root_id = builder.push(ComponentKind::Schema(schema_attrs), None, root.position);
    builder.children(root, root_id);
    limits.check_components(builder.components.len())?;

    debug!(
        components = builder.components.len(),
        issues = builder.issues.len(),
        "unmarshalled schema document"
    );

    Ok(Unmarshalled {
        components: builder.components,
        root: root_id,
        target_namespace,
        issues: builder.issues,
    })
}

struct Builder {
    owner: DocumentId,
    base: usize,
    components: Vec<Component>,
    issues: Vec<UnmarshalIssue>,
}

impl Builder {
    fn push(
        &mut self,
        kind: ComponentKind,
        parent: Option<ComponentId>,
        position: Option<TextPosition>,
    ) -> ComponentId {
        let id = ComponentId(self.base + self.components.len());
        self.components
            .push(Component::new(kind, parent, self.owner, position));
        if let Some(parent) = parent {
            self.components[parent.index() - self.base].children.push(id);
        }
        id
    }

    fn issue(&mut self, element: &Element, message: String) {
        self.issues.push(UnmarshalIssue {
            position: element.position,
            message,
        });
    }

    fn children(&mut self, element: &Element, parent: ComponentId) {
        for child in &element.children {
            if child.namespace() != Some(XSD_NAMESPACE) {
                self.issue(
                    child,
                    format!(
                        "element {} is not allowed in a schema outside of xs:appinfo",
                        child.qname
                    ),
                );
                continue;
            }
            match child.local_name() {
                "annotation" | "selector" | "field" => continue,
                _ => {}
            }
            let kind = self.kind(child);
            let descend = !matches!(kind, ComponentKind::Unknown(_));
            let id = self.push(kind, Some(parent), child.position);
            if descend {
                self.children(child, id);
            }
        }
    }

    fn kind(&mut self, e: &Element) -> ComponentKind {
        match e.local_name() {
            "element" => ComponentKind::Element(ElementDecl {
                def_ref: self.def_ref(e),
                occurs: occurs(e),
                type_ref: self.qname_ref(e, "type"),
                substitution_group: self.qname_ref(e, "substitutionGroup"),
                form: form_attr(e, "form"),
                block: EnumSetAttr::new(attr(e, "block")),
                final_: EnumSetAttr::new(attr(e, "final")),
                nillable: attr(e, "nillable"),
                abstract_: attr(e, "abstract"),
                default: attr(e, "default"),
                fixed: attr(e, "fixed"),
            }),
            "attribute" => ComponentKind::Attribute(AttributeDecl {
                def_ref: self.def_ref(e),
                type_ref: self.qname_ref(e, "type"),
                form: form_attr(e, "form"),
                use_text: attr(e, "use"),
                usage: None,
                default: attr(e, "default"),
                fixed: attr(e, "fixed"),
            }),
            "complexType" => ComponentKind::ComplexType(ComplexTypeDef {
                name: attr(e, "name"),
                mixed: attr(e, "mixed"),
                abstract_: attr(e, "abstract"),
                block: EnumSetAttr::new(attr(e, "block")),
                final_: EnumSetAttr::new(attr(e, "final")),
            }),
            "simpleType" => ComponentKind::SimpleType(SimpleTypeDef {
                name: attr(e, "name"),
                final_: EnumSetAttr::new(attr(e, "final")),
            }),
            "group" => ComponentKind::Group(GroupDef {
                def_ref: self.def_ref(e),
                occurs: occurs(e),
            }),
            "attributeGroup" => ComponentKind::AttributeGroup(AttributeGroupDef {
                def_ref: self.def_ref(e),
            }),
            "include" => ComponentKind::Include(schema_location(e)),
            "import" => ComponentKind::Import(schema_location(e)),
            "redefine" => ComponentKind::Redefine(schema_location(e)),
            "sequence" => compositor(e, CompositorKind::Sequence),
            "choice" => compositor(e, CompositorKind::Choice),
            "all" => compositor(e, CompositorKind::All),
            "any" => ComponentKind::Any(wildcard(e)),
            "anyAttribute" => ComponentKind::AnyAttribute(Wildcard {
                occurs: OccursAttrs::default(),
                ..wildcard(e)
            }),
            "complexContent" => ComponentKind::ComplexContent(ContentModel {
                mixed: attr(e, "mixed"),
            }),
            "simpleContent" => ComponentKind::SimpleContent(ContentModel { mixed: None }),
            "extension" => ComponentKind::Extension(Derivation {
                base: self.qname_ref(e, "base"),
            }),
            "restriction" => ComponentKind::Restriction(Derivation {
                base: self.qname_ref(e, "base"),
            }),
            "list" => ComponentKind::List(ListDef {
                item_type: self.qname_ref(e, "itemType"),
            }),
            "union" => ComponentKind::Union(UnionDef {
                member_types: self.qname_list(e, "memberTypes"),
            }),
            "notation" => ComponentKind::Notation(NotationDecl {
                name: attr(e, "name"),
                public: attr(e, "public"),
                system: attr(e, "system"),
            }),
            "key" | "keyref" | "unique" => ComponentKind::IdentityConstraint(IdentityConstraint {
                tag: e.local_name().to_string(),
                name: attr(e, "name"),
                refer: self.qname_ref(e, "refer"),
            }),
            name if FACET_NAMES.contains(&name) => ComponentKind::Facet(Facet {
                name: name.to_string(),
                value: attr(e, "value"),
            }),
            other => ComponentKind::Unknown(other.to_string()),
        }
    }

    fn def_ref(&mut self, e: &Element) -> DefRefAttrs {
        DefRefAttrs {
            name: attr(e, "name"),
            reference: self.qname_ref(e, "ref"),
        }
    }

    fn qname_ref(&mut self, e: &Element, attribute: &str) -> Option<QNameRef> {
        let text = e.get_attribute(attribute)?.trim().to_string();
        Some(self.resolve(e, attribute, &text))
    }

    fn qname_list(&mut self, e: &Element, attribute: &str) -> Vec<QNameRef> {
        let Some(text) = e.get_attribute(attribute) else {
            return Vec::new();
        };
        text.split_whitespace()
            .map(|token| self.resolve(e, attribute, token))
            .collect()
    }

    /// Resolve QName text against the element's namespace scope
    ///
    /// An undeclared prefix is reported here once; the reference is marked
    /// unresolvable so later passes stay quiet about it.
    fn resolve(&mut self, e: &Element, attribute: &str, text: &str) -> QNameRef {
        let (prefix, local) = split_qname(text);
        match e.namespaces.resolve(text) {
            Ok(qname) => QNameRef::new(text, qname, prefix.is_some()),
            Err(err) => {
                self.issue(
                    e,
                    format!("{} attribute '{}' of xs:{}: {}", attribute, text, e.local_name(), err),
                );
                QNameRef::undeclared(text, local)
            }
        }
    }
}

fn attr(e: &Element, name: &str) -> Option<String> {
    e.get_attribute(name).map(str::to_string)
}

fn form_attr(e: &Element, name: &str) -> FormAttr {
    FormAttr {
        text: attr(e, name),
        form: None,
    }
}

fn occurs(e: &Element) -> OccursAttrs {
    OccursAttrs {
        min_text: attr(e, "minOccurs"),
        max_text: attr(e, "maxOccurs"),
        min: None,
        max: None,
    }
}

fn compositor(e: &Element, kind: CompositorKind) -> ComponentKind {
    ComponentKind::Compositor(Compositor {
        kind,
        occurs: occurs(e),
    })
}

fn wildcard(e: &Element) -> Wildcard {
    Wildcard {
        namespace: attr(e, "namespace"),
        process_contents: attr(e, "processContents"),
        occurs: occurs(e),
    }
}

fn schema_location(e: &Element) -> SchemaLocation {
    SchemaLocation {
        namespace: attr(e, "namespace"),
        location: attr(e, "schemaLocation"),
        target: None,
        synthetic: false,
    }
}
