//! Logical schema model supplied by the host once at startup.
//!
//! A [`Schema`] is a read-only set of [`LogicalCollection`] definitions. Each
//! attribute declares a storage type used by the result caster, an optional
//! physical column alias, and optionally an [`EdgeRelation`] linking it to
//! another collection through a dedicated edge collection.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{ArqoError, Result};

/// Declared storage type of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    /// UTF-8 string.
    String,
    /// Integer or float.
    Number,
    /// Boolean.
    Boolean,
    /// Nested document.
    Object,
    /// Structured array; string-encoded values are re-parsed by the caster.
    Array,
    /// Calendar date, RFC 3339 on the wire.
    Date,
    /// Date with time-of-day, RFC 3339 on the wire.
    #[serde(rename = "datetime")]
    DateTime,
    /// Reference to a document in another collection.
    Reference,
}

/// Traversal direction of an edge relation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges in either direction.
    #[default]
    Any,
    /// Follow edges from the owning collection outwards.
    Outbound,
    /// Follow edges pointing into the owning collection.
    Inbound,
}

impl Direction {
    /// AQL traversal keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::Outbound => "OUTBOUND",
            Self::Inbound => "INBOUND",
        }
    }
}

/// Inline edge relation declared on an attribute.
#[derive(Clone, Debug, Deserialize)]
pub struct EdgeRelation {
    /// Target logical collection name.
    pub target: String,
    /// Physical edge collection the link documents live in.
    pub edge_collection: String,
    /// Traversal direction, from the owning collection's point of view.
    #[serde(default)]
    pub direction: Direction,
}

/// One declared attribute of a logical collection.
#[derive(Clone, Debug, Deserialize)]
pub struct Attribute {
    /// Declared type, used by the result caster.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Physical column alias, when the stored key differs from the logical
    /// attribute name.
    #[serde(default)]
    pub column_name: Option<String>,
    /// Marks this attribute as the alias target of the store-native primary
    /// key. At most one attribute per collection may set it.
    #[serde(default)]
    pub primary_key: bool,
    /// Relation to another collection, stored through an edge collection.
    #[serde(default)]
    pub edge: Option<EdgeRelation>,
}

impl Attribute {
    /// Plain attribute of the given type.
    pub fn new(attr_type: AttributeType) -> Self {
        Self {
            attr_type,
            column_name: None,
            primary_key: false,
            edge: None,
        }
    }

    /// Attaches an edge relation.
    pub fn with_edge(mut self, edge: EdgeRelation) -> Self {
        self.edge = Some(edge);
        self
    }

    /// Sets the physical column alias.
    pub fn with_column_name(mut self, column: impl Into<String>) -> Self {
        self.column_name = Some(column.into());
        self
    }
}

/// Host-declared description of one entity type.
#[derive(Clone, Debug, Deserialize)]
pub struct LogicalCollection {
    /// Logical name, as the host refers to it.
    pub name: String,
    /// Physical collection name when it differs from the logical name.
    #[serde(default)]
    pub collection: Option<String>,
    /// Ordered attribute map. `BTreeMap` keeps diffing and compilation
    /// deterministic.
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl LogicalCollection {
    /// Collection with no attributes declared yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute.
    pub fn attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Physical collection name.
    pub fn physical(&self) -> &str {
        self.collection.as_deref().unwrap_or(&self.name)
    }

    /// Name of the attribute aliasing the store-native primary key.
    pub fn id_field(&self) -> &str {
        self.attributes
            .iter()
            .find(|(_, a)| a.primary_key)
            .map_or("id", |(name, _)| name.as_str())
    }

    /// Maps a physical column key back to its logical attribute, honoring
    /// column aliases.
    pub fn attribute_for_column(&self, column: &str) -> Option<(&str, &Attribute)> {
        if let Some((name, attr)) = self
            .attributes
            .iter()
            .find(|(_, a)| a.column_name.as_deref() == Some(column))
        {
            return Some((name.as_str(), attr));
        }
        self.attributes
            .get_key_value(column)
            .map(|(name, attr)| (name.as_str(), attr))
    }

    /// Iterates the edge relations declared on this collection's attributes.
    pub fn relations(&self) -> impl Iterator<Item = &EdgeRelation> {
        self.attributes.values().filter_map(|a| a.edge.as_ref())
    }
}

/// Edge definition registered with a named graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeDefinition {
    /// Edge collection holding the link documents.
    pub collection: String,
    /// Source vertex collections.
    pub from: Vec<String>,
    /// Target vertex collections.
    pub to: Vec<String>,
}

/// Store-level graph: a name plus the edge definitions usable by traversals.
#[derive(Clone, Debug)]
pub struct NamedGraph {
    /// Graph name.
    pub name: String,
    /// Edge definitions, in declaration order.
    pub edge_definitions: Vec<EdgeDefinition>,
}

/// Read-only set of logical collections for one connection.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    collections: BTreeMap<String, LogicalCollection>,
}

impl Schema {
    /// Validates and assembles a schema from host-supplied definitions.
    pub fn new(collections: Vec<LogicalCollection>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for col in collections {
            let pk_count = col.attributes.values().filter(|a| a.primary_key).count();
            if pk_count > 1 {
                return Err(ArqoError::Model(format!(
                    "collection `{}` marks {pk_count} primary-key attributes, at most one allowed",
                    col.name
                )));
            }
            if map.insert(col.name.clone(), col).is_some() {
                return Err(ArqoError::Model("duplicate collection name".into()));
            }
        }
        let schema = Self { collections: map };
        for col in schema.collections.values() {
            for rel in col.relations() {
                if !schema.collections.contains_key(&rel.target) {
                    return Err(ArqoError::Model(format!(
                        "collection `{}` declares a relation to undeclared collection `{}`",
                        col.name, rel.target
                    )));
                }
            }
        }
        Ok(schema)
    }

    /// Looks up a collection by logical name.
    pub fn get(&self, name: &str) -> Option<&LogicalCollection> {
        self.collections.get(name)
    }

    /// Iterates all collections in name order.
    pub fn collections(&self) -> impl Iterator<Item = &LogicalCollection> {
        self.collections.values()
    }

    /// Looks up a collection by physical name, falling back to logical name.
    pub fn by_physical(&self, physical: &str) -> Option<&LogicalCollection> {
        self.collections
            .values()
            .find(|c| c.physical() == physical)
            .or_else(|| self.get(physical))
    }

    /// Finds the edge collection governing a `(source, target)` collection
    /// pair, by matching declared relations. Accepts logical or physical
    /// names on either side.
    pub fn edge_collection_between(&self, source: &str, target: &str) -> Option<&str> {
        let col = self.by_physical(source)?;
        col.relations()
            .find(|rel| rel.target == target || self.get(&rel.target).map(LogicalCollection::physical) == Some(target))
            .map(|rel| rel.edge_collection.as_str())
    }

    /// Assembles the named-graph view of every declared relation.
    pub fn named_graph(&self, name: impl Into<String>) -> NamedGraph {
        let mut edge_definitions: Vec<EdgeDefinition> = Vec::new();
        for col in self.collections.values() {
            for rel in col.relations() {
                let target_physical = self
                    .get(&rel.target)
                    .map_or(rel.target.as_str(), LogicalCollection::physical);
                let def = EdgeDefinition {
                    collection: rel.edge_collection.clone(),
                    from: vec![col.physical().to_string()],
                    to: vec![target_physical.to_string()],
                };
                if !edge_definitions.contains(&def) {
                    edge_definitions.push(def);
                }
            }
        }
        NamedGraph {
            name: name.into(),
            edge_definitions,
        }
    }
}
