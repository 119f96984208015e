//! Static node-type catalog contract.
//!
//! The catalog itself lives outside the engine (it is seeded from data
//! tables the editor ships with); the engine only performs
//! validation-free lookups through the [`Catalog`] trait.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Client,
    Compute,
    Storage,
    Messaging,
    Ai,
    External,
}

/// Infrastructure resource category a node type may declare. Nodes of
/// these types turn into generated configuration during scaffolding.
///
/// Variant order is the grouping order used by generated artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingKind {
    PersistentStore,
    Cache,
    ObjectStore,
    Queue,
    VectorIndex,
    AiInference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleDirection {
    Source,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPoint {
    pub id: String,
    pub direction: HandleDirection,
    pub side: Side,
}

impl ConnectionPoint {
    pub fn new(id: impl Into<String>, direction: HandleDirection, side: Side) -> Self {
        ConnectionPoint {
            id: id.into(),
            direction,
            side,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypeDefinition {
    pub category: Category,
    #[serde(default)]
    pub connection_points: Vec<ConnectionPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_kind: Option<BindingKind>,
}

impl TypeDefinition {
    /// Whether nodes of this type are the primary compute entry point
    /// of a scaffolded project.
    pub fn is_compute(&self) -> bool {
        self.category == Category::Compute
    }
}

pub trait Catalog {
    fn get_type_definition(&self, type_id: &str) -> Option<&TypeDefinition>;
}

/// In-memory catalog backing embedders and tests.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entries: HashMap<String, TypeDefinition>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    pub fn insert(&mut self, type_id: impl Into<String>, definition: TypeDefinition) {
        self.entries.insert(type_id.into(), definition);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Catalog for TypeRegistry {
    fn get_type_definition(&self, type_id: &str) -> Option<&TypeDefinition> {
        self.entries.get(type_id)
    }
}

impl<S: Into<String>> FromIterator<(S, TypeDefinition)> for TypeRegistry {
    fn from_iter<T: IntoIterator<Item = (S, TypeDefinition)>>(iter: T) -> Self {
        let mut registry = TypeRegistry::new();
        for (id, def) in iter {
            registry.insert(id, def);
        }
        registry
    }
}
