//! XSD built-in types
//!
//! References into the XML Schema namespace and to the `xml:` attributes
//! resolve without a definition in any loaded document.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::namespaces::QName;
use crate::{XML_NAMESPACE, XSD_NAMESPACE};

/// XSD anyType type name
pub const XSD_ANY_TYPE: &str = "anyType";
/// XSD anySimpleType type name
pub const XSD_ANY_SIMPLE_TYPE: &str = "anySimpleType";

/// Built-in simple type names of XSD 1.0
pub const SIMPLE_TYPE_NAMES: &[&str] = &[
    XSD_ANY_SIMPLE_TYPE,
    // String types
    "string",
    "normalizedString",
    "token",
    "language",
    "Name",
    "NCName",
    "ID",
    "IDREF",
    "IDREFS",
    "ENTITY",
    "ENTITIES",
    "NMTOKEN",
    "NMTOKENS",
    // Boolean
    "boolean",
    // Numeric types
    "decimal",
    "integer",
    "long",
    "int",
    "short",
    "byte",
    "nonNegativeInteger",
    "positiveInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
    "nonPositiveInteger",
    "negativeInteger",
    "float",
    "double",
    // Date and time
    "duration",
    "dateTime",
    "time",
    "date",
    "gYearMonth",
    "gYear",
    "gMonthDay",
    "gDay",
    "gMonth",
    // Binary
    "hexBinary",
    "base64Binary",
    // Other
    "anyURI",
    "QName",
    "NOTATION",
];

/// Attributes of the `xml:` namespace
pub const XML_ATTRIBUTE_NAMES: &[&str] = &["lang", "space", "base", "id"];

static SIMPLE_TYPES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| SIMPLE_TYPE_NAMES.iter().copied().collect());

/// Kind of a built-in type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// `xs:anyType`
    Complex,
    /// Any other built-in type
    Simple,
}

/// Look up a built-in type by qualified name
pub fn builtin_type(name: &QName) -> Option<BuiltinKind> {
    if !name.is_in(XSD_NAMESPACE) {
        return None;
    }
    if name.local_name == XSD_ANY_TYPE {
        Some(BuiltinKind::Complex)
    } else if SIMPLE_TYPES.contains(name.local_name.as_str()) {
        Some(BuiltinKind::Simple)
    } else {
        None
    }
}

/// Check for one of the predefined `xml:` attributes
pub fn is_xml_attribute(name: &QName) -> bool {
    name.is_in(XML_NAMESPACE) && XML_ATTRIBUTE_NAMES.contains(&name.local_name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(
            builtin_type(&QName::namespaced(XSD_NAMESPACE, "string")),
            Some(BuiltinKind::Simple)
        );
        assert_eq!(
            builtin_type(&QName::namespaced(XSD_NAMESPACE, "anyType")),
            Some(BuiltinKind::Complex)
        );
        assert_eq!(builtin_type(&QName::namespaced(XSD_NAMESPACE, "strin")), None);
        assert_eq!(builtin_type(&QName::local("string")), None);
    }

    #[test]
    fn test_xml_attributes() {
        assert!(is_xml_attribute(&QName::namespaced(XML_NAMESPACE, "lang")));
        assert!(!is_xml_attribute(&QName::namespaced(XML_NAMESPACE, "other")));
        assert!(!is_xml_attribute(&QName::local("lang")));
    }
}
