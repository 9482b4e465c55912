//! Schema components
//!
//! Every construct of a schema document is a [`Component`] in an arena
//! owned by the validation context. A component knows its owning document,
//! its parent (a non-owning back reference) and its children; what it *is*
//! lives in the closed [`ComponentKind`] sum type, so each validation pass
//! is one exhaustive match over the kinds.

use std::fmt;

use crate::documents::TextPosition;
use crate::namespaces::QName;

use super::values::{
    AllEnumSet, AttributeUse, BlockValue, Count, DerivationValue, EnumSymbol, FinalValue,
    FormChoice, SimpleFinalValue,
};

/// Index of a component in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    /// Arena index
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Index of a document in the context arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub(crate) usize);

impl DocumentId {
    /// Arena index
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A QName-valued attribute as written, plus its resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QNameRef {
    /// Attribute text
    pub text: String,
    /// Resolved name
    pub qname: QName,
    /// Whether the text carried a namespace prefix
    pub prefixed: bool,
    /// The prefix was undeclared; the name can never resolve
    pub unresolvable: bool,
}

impl QNameRef {
    /// Create a reference
    pub fn new(text: impl Into<String>, qname: QName, prefixed: bool) -> Self {
        Self {
            text: text.into(),
            qname,
            prefixed,
            unresolvable: false,
        }
    }

    /// A reference whose prefix is not declared in scope
    pub fn undeclared(text: impl Into<String>, local: &str) -> Self {
        Self {
            text: text.into(),
            qname: QName::local(local),
            prefixed: true,
            unresolvable: true,
        }
    }

    /// Whether the namespace still has to come from the owning document
    pub fn needs_namespace(&self) -> bool {
        !self.prefixed && self.qname.namespace.is_none()
    }
}

impl fmt::Display for QNameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// `minOccurs` / `maxOccurs` attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccursAttrs {
    /// Raw `minOccurs`
    pub min_text: Option<String>,
    /// Raw `maxOccurs`
    pub max_text: Option<String>,
    /// Converted `minOccurs`
    pub min: Option<Count>,
    /// Converted `maxOccurs`
    pub max: Option<Count>,
}

impl OccursAttrs {
    /// Check if either bound was written
    pub fn is_present(&self) -> bool {
        self.min_text.is_some() || self.max_text.is_some()
    }
}

/// `name` / `ref` attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefRefAttrs {
    /// Definition name
    pub name: Option<String>,
    /// Reference to a global definition
    pub reference: Option<QNameRef>,
}

/// `form`, `elementFormDefault` or `attributeFormDefault`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormAttr {
    /// Raw text
    pub text: Option<String>,
    /// Converted value
    pub form: Option<FormChoice>,
}

/// Enumeration-set attribute such as `block` or `final`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSetAttr<E: EnumSymbol> {
    /// Raw text
    pub text: Option<String>,
    /// Converted value
    pub value: AllEnumSet<E>,
}

impl<E: EnumSymbol> EnumSetAttr<E> {
    /// Create from raw text
    pub fn new(text: Option<String>) -> Self {
        Self {
            text,
            value: AllEnumSet::new(),
        }
    }
}

impl<E: EnumSymbol> Default for EnumSetAttr<E> {
    fn default() -> Self {
        Self::new(None)
    }
}

/// `xs:schema` root
#[derive(Debug, Clone, Default)]
pub struct SchemaAttrs {
    /// `targetNamespace` as written
    pub target_namespace: Option<String>,
    /// `elementFormDefault`
    pub element_form_default: FormAttr,
    /// `attributeFormDefault`
    pub attribute_form_default: FormAttr,
    /// `blockDefault`
    pub block_default: EnumSetAttr<BlockValue>,
    /// `finalDefault`
    pub final_default: EnumSetAttr<FinalValue>,
    /// `version`
    pub version: Option<String>,
}

/// `xs:element`
#[derive(Debug, Clone, Default)]
pub struct ElementDecl {
    /// `name` / `ref`
    pub def_ref: DefRefAttrs,
    /// `minOccurs` / `maxOccurs`
    pub occurs: OccursAttrs,
    /// `type`
    pub type_ref: Option<QNameRef>,
    /// `substitutionGroup`
    pub substitution_group: Option<QNameRef>,
    /// `form`
    pub form: FormAttr,
    /// `block`
    pub block: EnumSetAttr<BlockValue>,
    /// `final`
    pub final_: EnumSetAttr<DerivationValue>,
    /// `nillable`
    pub nillable: Option<String>,
    /// `abstract`
    pub abstract_: Option<String>,
    /// `default`
    pub default: Option<String>,
    /// `fixed`
    pub fixed: Option<String>,
}

/// `xs:attribute`
#[derive(Debug, Clone, Default)]
pub struct AttributeDecl {
    /// `name` / `ref`
    pub def_ref: DefRefAttrs,
    /// `type`
    pub type_ref: Option<QNameRef>,
    /// `form`
    pub form: FormAttr,
    /// Raw `use`
    pub use_text: Option<String>,
    /// Converted `use`
    pub usage: Option<AttributeUse>,
    /// `default`
    pub default: Option<String>,
    /// `fixed`
    pub fixed: Option<String>,
}

/// `xs:complexType`
#[derive(Debug, Clone, Default)]
pub struct ComplexTypeDef {
    /// `name`
    pub name: Option<String>,
    /// `mixed`
    pub mixed: Option<String>,
    /// `abstract`
    pub abstract_: Option<String>,
    /// `block`
    pub block: EnumSetAttr<DerivationValue>,
    /// `final`
    pub final_: EnumSetAttr<DerivationValue>,
}

/// `xs:simpleType`
#[derive(Debug, Clone, Default)]
pub struct SimpleTypeDef {
    /// `name`
    pub name: Option<String>,
    /// `final`
    pub final_: EnumSetAttr<SimpleFinalValue>,
}

/// `xs:group`, either a definition or a reference
#[derive(Debug, Clone, Default)]
pub struct GroupDef {
    /// `name` / `ref`
    pub def_ref: DefRefAttrs,
    /// `minOccurs` / `maxOccurs` (references only)
    pub occurs: OccursAttrs,
}

/// `xs:attributeGroup`, either a definition or a reference
#[derive(Debug, Clone, Default)]
pub struct AttributeGroupDef {
    /// `name` / `ref`
    pub def_ref: DefRefAttrs,
}

/// `xs:include`, `xs:import` or `xs:redefine`
#[derive(Debug, Clone, Default)]
pub struct SchemaLocation {
    /// `namespace` (imports)
    pub namespace: Option<String>,
    /// `schemaLocation`
    pub location: Option<String>,
    /// Document the directive was bound to while loading
    pub target: Option<DocumentId>,
    /// Added by the loader rather than read from text
    pub synthetic: bool,
}

/// Model group compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorKind {
    /// `xs:sequence`
    Sequence,
    /// `xs:choice`
    Choice,
    /// `xs:all`
    All,
}

impl CompositorKind {
    /// Element local name
    pub fn tag(&self) -> &'static str {
        match self {
            CompositorKind::Sequence => "sequence",
            CompositorKind::Choice => "choice",
            CompositorKind::All => "all",
        }
    }
}

/// `xs:sequence`, `xs:choice` or `xs:all`
#[derive(Debug, Clone)]
pub struct Compositor {
    /// Which compositor
    pub kind: CompositorKind,
    /// `minOccurs` / `maxOccurs`
    pub occurs: OccursAttrs,
}

/// `xs:any` or `xs:anyAttribute`
#[derive(Debug, Clone, Default)]
pub struct Wildcard {
    /// `namespace`
    pub namespace: Option<String>,
    /// `processContents`
    pub process_contents: Option<String>,
    /// `minOccurs` / `maxOccurs` (`xs:any` only)
    pub occurs: OccursAttrs,
}

/// `xs:complexContent` or `xs:simpleContent`
#[derive(Debug, Clone, Default)]
pub struct ContentModel {
    /// `mixed` (complex content only)
    pub mixed: Option<String>,
}

/// `xs:extension` or `xs:restriction`
#[derive(Debug, Clone, Default)]
pub struct Derivation {
    /// `base`
    pub base: Option<QNameRef>,
}

/// `xs:list`
#[derive(Debug, Clone, Default)]
pub struct ListDef {
    /// `itemType`
    pub item_type: Option<QNameRef>,
}

/// `xs:union`
#[derive(Debug, Clone, Default)]
pub struct UnionDef {
    /// `memberTypes`
    pub member_types: Vec<QNameRef>,
}

/// A constraining facet such as `xs:enumeration` or `xs:maxLength`
#[derive(Debug, Clone, Default)]
pub struct Facet {
    /// Facet element local name
    pub name: String,
    /// `value`
    pub value: Option<String>,
}

/// `xs:notation`
#[derive(Debug, Clone, Default)]
pub struct NotationDecl {
    /// `name`
    pub name: Option<String>,
    /// `public`
    pub public: Option<String>,
    /// `system`
    pub system: Option<String>,
}

/// `xs:key`, `xs:keyref` or `xs:unique`
#[derive(Debug, Clone, Default)]
pub struct IdentityConstraint {
    /// Element local name
    pub tag: String,
    /// `name`
    pub name: Option<String>,
    /// `refer` (keyref only)
    pub refer: Option<QNameRef>,
}

/// What a component is
#[derive(Debug, Clone)]
pub enum ComponentKind {
    /// Document root
    Schema(SchemaAttrs),
    /// Element declaration or reference
    Element(ElementDecl),
    /// Attribute declaration or reference
    Attribute(AttributeDecl),
    /// Complex type definition
    ComplexType(ComplexTypeDef),
    /// Simple type definition
    SimpleType(SimpleTypeDef),
    /// Model group definition or reference
    Group(GroupDef),
    /// Attribute group definition or reference
    AttributeGroup(AttributeGroupDef),
    /// Same-namespace inclusion
    Include(SchemaLocation),
    /// Other-namespace import
    Import(SchemaLocation),
    /// Inclusion with redefinitions
    Redefine(SchemaLocation),
    /// Sequence, choice or all
    Compositor(Compositor),
    /// Element wildcard
    Any(Wildcard),
    /// Attribute wildcard
    AnyAttribute(Wildcard),
    /// Complex content model
    ComplexContent(ContentModel),
    /// Simple content model
    SimpleContent(ContentModel),
    /// Derivation by extension
    Extension(Derivation),
    /// Derivation by restriction
    Restriction(Derivation),
    /// List simple type
    List(ListDef),
    /// Union simple type
    Union(UnionDef),
    /// Constraining facet
    Facet(Facet),
    /// Notation declaration
    Notation(NotationDecl),
    /// Identity constraint
    IdentityConstraint(IdentityConstraint),
    /// Element of the schema namespace with no model counterpart
    Unknown(String),
}

impl ComponentKind {
    /// Element local name this kind is read from
    pub fn tag(&self) -> &str {
        match self {
            ComponentKind::Schema(_) => "schema",
            ComponentKind::Element(_) => "element",
            ComponentKind::Attribute(_) => "attribute",
            ComponentKind::ComplexType(_) => "complexType",
            ComponentKind::SimpleType(_) => "simpleType",
            ComponentKind::Group(_) => "group",
            ComponentKind::AttributeGroup(_) => "attributeGroup",
            ComponentKind::Include(_) => "include",
            ComponentKind::Import(_) => "import",
            ComponentKind::Redefine(_) => "redefine",
            ComponentKind::Compositor(c) => c.kind.tag(),
            ComponentKind::Any(_) => "any",
            ComponentKind::AnyAttribute(_) => "anyAttribute",
            ComponentKind::ComplexContent(_) => "complexContent",
            ComponentKind::SimpleContent(_) => "simpleContent",
            ComponentKind::Extension(_) => "extension",
            ComponentKind::Restriction(_) => "restriction",
            ComponentKind::List(_) => "list",
            ComponentKind::Union(_) => "union",
            ComponentKind::Facet(f) => &f.name,
            ComponentKind::Notation(_) => "notation",
            ComponentKind::IdentityConstraint(c) => &c.tag,
            ComponentKind::Unknown(tag) => tag,
        }
    }

    /// Name given by a `name` attribute, if this kind has one
    pub fn name(&self) -> Option<&str> {
        match self {
            ComponentKind::Element(e) => e.def_ref.name.as_deref(),
            ComponentKind::Attribute(a) => a.def_ref.name.as_deref(),
            ComponentKind::ComplexType(t) => t.name.as_deref(),
            ComponentKind::SimpleType(t) => t.name.as_deref(),
            ComponentKind::Group(g) => g.def_ref.name.as_deref(),
            ComponentKind::AttributeGroup(g) => g.def_ref.name.as_deref(),
            ComponentKind::Notation(n) => n.name.as_deref(),
            ComponentKind::IdentityConstraint(c) => c.name.as_deref(),
            _ => None,
        }
    }

    /// `ref` attribute, if this kind has one
    pub fn reference(&self) -> Option<&QNameRef> {
        self.def_ref().and_then(|d| d.reference.as_ref())
    }

    /// `name` / `ref` group, if this kind carries one
    pub fn def_ref(&self) -> Option<&DefRefAttrs> {
        match self {
            ComponentKind::Element(e) => Some(&e.def_ref),
            ComponentKind::Attribute(a) => Some(&a.def_ref),
            ComponentKind::Group(g) => Some(&g.def_ref),
            ComponentKind::AttributeGroup(g) => Some(&g.def_ref),
            _ => None,
        }
    }

    /// Include/import/redefine directive, if this is one
    pub fn schema_location(&self) -> Option<&SchemaLocation> {
        match self {
            ComponentKind::Include(l) | ComponentKind::Import(l) | ComponentKind::Redefine(l) => {
                Some(l)
            }
            _ => None,
        }
    }

    /// Mutable include/import/redefine directive
    pub fn schema_location_mut(&mut self) -> Option<&mut SchemaLocation> {
        match self {
            ComponentKind::Include(l) | ComponentKind::Import(l) | ComponentKind::Redefine(l) => {
                Some(l)
            }
            _ => None,
        }
    }

    /// Every QName-valued reference this kind carries, mutably
    ///
    /// Used to give unprefixed references the owning document's namespace.
    pub fn qname_refs_mut(&mut self) -> Vec<&mut QNameRef> {
        let mut refs = Vec::new();
        match self {
            ComponentKind::Element(e) => {
                refs.extend(e.def_ref.reference.as_mut());
                refs.extend(e.type_ref.as_mut());
                refs.extend(e.substitution_group.as_mut());
            }
            ComponentKind::Attribute(a) => {
                refs.extend(a.def_ref.reference.as_mut());
                refs.extend(a.type_ref.as_mut());
            }
            ComponentKind::Group(g) => refs.extend(g.def_ref.reference.as_mut()),
            ComponentKind::AttributeGroup(g) => refs.extend(g.def_ref.reference.as_mut()),
            ComponentKind::Extension(d) | ComponentKind::Restriction(d) => {
                refs.extend(d.base.as_mut())
            }
            ComponentKind::List(l) => refs.extend(l.item_type.as_mut()),
            ComponentKind::Union(u) => refs.extend(u.member_types.iter_mut()),
            ComponentKind::IdentityConstraint(c) => refs.extend(c.refer.as_mut()),
            _ => {}
        }
        refs
    }
}

/// One node of a schema document tree
#[derive(Debug, Clone)]
pub struct Component {
    /// What the component is
    pub kind: ComponentKind,
    /// Owning component (None for the schema root)
    pub parent: Option<ComponentId>,
    /// Child components in document order
    pub children: Vec<ComponentId>,
    /// Owning document
    pub document: DocumentId,
    /// Position of the start tag
    pub position: Option<TextPosition>,
}

impl Component {
    /// Create a component with no children
    pub fn new(
        kind: ComponentKind,
        parent: Option<ComponentId>,
        document: DocumentId,
        position: Option<TextPosition>,
    ) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            document,
            position,
        }
    }

    /// Short description used in problem messages
    pub fn describe(&self) -> String {
        let tag = self.kind.tag();
        if let Some(name) = self.kind.name() {
            format!("{} '{}'", tag, name)
        } else if let Some(reference) = self.kind.reference() {
            format!("{} reference '{}'", tag, reference)
        } else {
            tag.to_string()
        }
    }
}
