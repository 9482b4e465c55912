//! Per-document name registers
//!
//! Each schema document owns a [`NameRegister`] mapping qualified names of
//! global definitions to components, one table per [`NameCategory`]. The
//! register keeps the document's *local* definitions apart from the
//! *visible* ones: local entries are what other documents merge in through
//! include/import, visible entries (local plus merged) are what references
//! in this document resolve against.

use std::fmt;

use indexmap::IndexMap;

use crate::model::ComponentId;
use crate::namespaces::QName;

/// Symbol space of a global definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameCategory {
    /// Global element declarations
    Element,
    /// Global attribute declarations
    Attribute,
    /// Model group definitions
    Group,
    /// Attribute group definitions
    AttributeGroup,
    /// Simple and complex type definitions
    Type,
}

impl NameCategory {
    /// Every category
    pub const ALL: [NameCategory; 5] = [
        NameCategory::Element,
        NameCategory::Attribute,
        NameCategory::Group,
        NameCategory::AttributeGroup,
        NameCategory::Type,
    ];

    fn slot(self) -> usize {
        match self {
            NameCategory::Element => 0,
            NameCategory::Attribute => 1,
            NameCategory::Group => 2,
            NameCategory::AttributeGroup => 3,
            NameCategory::Type => 4,
        }
    }
}

impl fmt::Display for NameCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NameCategory::Element => "element",
            NameCategory::Attribute => "attribute",
            NameCategory::Group => "group",
            NameCategory::AttributeGroup => "attribute group",
            NameCategory::Type => "type",
        };
        f.write_str(text)
    }
}

/// Name tables for every category
#[derive(Debug, Clone, Default)]
pub struct CategoryTables {
    tables: [IndexMap<QName, ComponentId>; 5],
}

impl CategoryTables {
    /// Look up a name
    pub fn get(&self, category: NameCategory, name: &QName) -> Option<ComponentId> {
        self.tables[category.slot()].get(name).copied()
    }

    /// Insert a name unless present; returns the existing entry when present
    fn insert(
        &mut self,
        category: NameCategory,
        name: QName,
        component: ComponentId,
    ) -> Option<ComponentId> {
        let table = &mut self.tables[category.slot()];
        if let Some(existing) = table.get(&name) {
            return Some(*existing);
        }
        table.insert(name, component);
        None
    }

    /// Iterate over one category in registration order
    pub fn iter(&self, category: NameCategory) -> impl Iterator<Item = (&QName, &ComponentId)> {
        self.tables[category.slot()].iter()
    }

    /// Total number of names
    pub fn len(&self) -> usize {
        self.tables.iter().map(IndexMap::len).sum()
    }

    /// Check if no name is present
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self) {
        for table in &mut self.tables {
            table.clear();
        }
    }
}

/// Registration outcome for a name already taken by another component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConflict {
    /// Category of the clash
    pub category: NameCategory,
    /// Clashing name
    pub name: QName,
    /// Component that already holds the name
    pub existing: ComponentId,
    /// Component whose registration was refused
    pub rejected: ComponentId,
}

/// Symbol table of one schema document
#[derive(Debug, Clone, Default)]
pub struct NameRegister {
    local: CategoryTables,
    visible: CategoryTables,
}

impl NameRegister {
    /// Create an empty register
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global definition of this document
    ///
    /// The first registration of a name wins; a later one is refused and
    /// reported as a conflict.
    pub fn register(
        &mut self,
        category: NameCategory,
        name: QName,
        component: ComponentId,
    ) -> std::result::Result<(), NameConflict> {
        if let Some(existing) = self.visible.get(category, &name) {
            return Err(NameConflict {
                category,
                name,
                existing,
                rejected: component,
            });
        }
        self.local.insert(category, name.clone(), component);
        self.visible.insert(category, name, component);
        Ok(())
    }

    /// Merge another document's local definitions into the visible tables
    ///
    /// A name already bound to the same component is skipped; a name bound
    /// to a different component is a conflict and keeps the existing entry.
    pub fn merge(&mut self, other: &CategoryTables) -> Vec<NameConflict> {
        let mut conflicts = Vec::new();
        for category in NameCategory::ALL {
            for (name, component) in other.iter(category) {
                match self.visible.insert(category, name.clone(), *component) {
                    Some(existing) if existing != *component => conflicts.push(NameConflict {
                        category,
                        name: name.clone(),
                        existing,
                        rejected: *component,
                    }),
                    _ => {}
                }
            }
        }
        conflicts
    }

    /// Look up a name among local and merged definitions
    pub fn lookup(&self, category: NameCategory, name: &QName) -> Option<ComponentId> {
        self.visible.get(category, name)
    }

    /// Look up a name among this document's own definitions
    pub fn lookup_local(&self, category: NameCategory, name: &QName) -> Option<ComponentId> {
        self.local.get(category, name)
    }

    /// This document's own definitions
    pub fn local(&self) -> &CategoryTables {
        &self.local
    }

    /// Local and merged definitions
    pub fn visible(&self) -> &CategoryTables {
        &self.visible
    }

    /// Drop every registration
    pub fn clear(&mut self) {
        self.local.clear();
        self.visible.clear();
    }
}
