//! XML document reading
//!
//! Schema text is read into a small generic element tree before it is
//! unmarshalled into schema components. Element names are resolved against
//! the namespace declarations in scope, every element keeps the namespace
//! context it was declared in (QName-valued attributes are resolved later
//! against it), and every element records its line and column.

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fmt;

/// Line and column of an element start tag (both 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPosition {
    /// Line number
    pub line: usize,
    /// Column number
    pub column: usize,
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// XML Element in the document tree
#[derive(Debug, Clone)]
pub struct Element {
    /// Element qualified name, namespace resolved
    pub qname: QName,
    /// Element attributes (unprefixed attributes have no namespace)
    pub attributes: HashMap<QName, String>,
    /// Text content (if any)
    pub text: Option<String>,
    /// Child elements
    pub children: Vec<Element>,
    /// Namespace context in scope at this element
    pub namespaces: NamespaceContext,
    /// Position of the start tag
    pub position: Option<TextPosition>,
}

impl Element {
    /// Create a new element
    pub fn new(qname: QName) -> Self {
        Self {
            qname,
            attributes: HashMap::new(),
            text: None,
            children: Vec::new(),
            namespaces: NamespaceContext::new(),
            position: None,
        }
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        &self.qname.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&str> {
        self.qname.namespace.as_deref()
    }

    /// Get an unprefixed attribute value by local name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(&QName::local(name))
            .map(|s| s.as_str())
    }

    /// Get an attribute value by qualified name
    pub fn get_attribute_qname(&self, qname: &QName) -> Option<&str> {
        self.attributes.get(qname).map(|s| s.as_str())
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Set text content
    pub fn set_text(&mut self, text: String) {
        self.text = Some(text);
    }

    /// Find child elements by local name
    pub fn find_children(&self, local_name: &str) -> Vec<&Element> {
        self.children
            .iter()
            .filter(|e| e.local_name() == local_name)
            .collect()
    }
}

/// XML Document representation
#[derive(Debug, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

/// Attribute whose namespace is resolved once the whole start tag is read
struct RawAttribute {
    name: String,
    value: String,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        Self::parse_with_depth(xml, usize::MAX)
    }

    /// Parse an XML document, failing if elements nest deeper than `max_depth`
    pub fn parse_with_depth(xml: &[u8], max_depth: usize) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let lines = LineIndex::new(xml);
        let mut doc = Document::new();
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let before = reader.buffer_position();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    if element_stack.len() >= max_depth {
                        return Err(Error::LimitExceeded(format!(
                            "element nesting deeper than {}",
                            max_depth
                        )));
                    }
                    let scope = element_stack.last().map(|p| &p.namespaces);
                    let mut element = Self::parse_element(&e, scope)?;
                    element.position = Some(lines.position(skip_whitespace(xml, before)));
                    element_stack.push(element);
                }
                Ok(Event::End(_)) => {
                    if let Some(current) = element_stack.pop() {
                        if let Some(parent) = element_stack.last_mut() {
                            parent.add_child(current);
                        } else {
                            // This is the root element
                            doc.root = Some(current);
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let scope = element_stack.last().map(|p| &p.namespaces);
                    let mut element = Self::parse_element(&e, scope)?;
                    element.position = Some(lines.position(skip_whitespace(xml, before)));
                    if let Some(parent) = element_stack.last_mut() {
                        parent.add_child(element);
                    } else {
                        // Empty root element
                        doc.root = Some(element);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?
                            .to_string();
                        if !text.trim().is_empty() {
                            current.set_text(text);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    let position = lines.position(reader.buffer_position());
                    return Err(Error::Xml(format!(
                        "Error parsing XML at {}: {}",
                        position, e
                    )));
                }
                _ => {} // Ignore other events (comments, processing instructions, etc.)
            }
            buf.clear();
        }

        if !element_stack.is_empty() {
            return Err(Error::Xml("unexpected end of document".to_string()));
        }

        Ok(doc)
    }

    /// Parse element from BytesStart event
    fn parse_element(start: &BytesStart, scope: Option<&NamespaceContext>) -> Result<Element> {
        let name_bytes = start.name();
        let name = std::str::from_utf8(name_bytes.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut namespaces = scope.map(NamespaceContext::child).unwrap_or_default();
        let mut raw_attributes = Vec::new();

        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?;

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();

            // Handle namespace declarations
            if attr_name == "xmlns" {
                namespaces.set_default_namespace(&attr_value);
            } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
                namespaces.add_prefix(prefix, &attr_value);
            } else {
                raw_attributes.push(RawAttribute {
                    name: attr_name.to_string(),
                    value: attr_value,
                });
            }
        }

        let qname = namespaces.resolve(&name)?;
        let mut element = Element::new(qname);

        for raw in raw_attributes {
            // Unprefixed attributes are in no namespace, whatever the default
            let attr_qname = if raw.name.contains(':') {
                namespaces.resolve(&raw.name)?
            } else {
                QName::local(raw.name)
            };
            element.attributes.insert(attr_qname, raw.value);
        }

        element.namespaces = namespaces;
        Ok(element)
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Get the root element mutably
    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.root.as_mut()
    }
}

fn skip_whitespace(xml: &[u8], mut offset: usize) -> usize {
    while offset < xml.len() && xml[offset].is_ascii_whitespace() {
        offset += 1;
    }
    offset
}

/// Byte offset to line/column mapping
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(xml: &[u8]) -> Self {
        let mut starts = vec![0];
        starts.extend(
            xml.iter()
                .enumerate()
                .filter(|(_, b)| **b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    fn position(&self, offset: usize) -> TextPosition {
        let line = match self.starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        TextPosition {
            line: line + 1,
            column: offset - self.starts[line] + 1,
        }
    }
}
