//! Schema object model
//!
//! Parsed schema documents are stored as an arena of [`Component`]s, each
//! tagged with a [`ComponentKind`]. The [`unmarshal`] module builds them
//! from an XML element tree.

pub mod components;
pub mod schema;
pub mod unmarshal;
pub mod values;

pub use components::{
    AttributeDecl, AttributeGroupDef, Component, ComponentId, ComponentKind, ComplexTypeDef,
    Compositor, CompositorKind, ContentModel, DefRefAttrs, Derivation, DocumentId, ElementDecl,
    EnumSetAttr, Facet, FormAttr, GroupDef, IdentityConstraint, ListDef, NotationDecl,
    OccursAttrs, QNameRef, SchemaAttrs, SchemaLocation, SimpleTypeDef, UnionDef, Wildcard,
};
pub use schema::SchemaDocument;
pub use unmarshal::{unmarshal, UnmarshalIssue, Unmarshalled};
pub use values::{
    AllEnumSet, AttributeUse, BlockValue, Count, DerivationValue, EnumFlags, EnumSymbol,
    FinalValue, FormChoice, ProcessContents, SimpleFinalValue, WhiteSpace,
};
