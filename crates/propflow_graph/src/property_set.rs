// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `ins` and `outs` bags of a component.

use crate::error::GraphError;
use crate::property::{Direction, Property};
use crate::schema::PropertySchema;
use crate::value::Value;
use indexmap::IndexMap;

/// Insertion-ordered mapping from key to property
#[derive(Debug)]
pub struct PropertySet {
    owner: String,
    direction: Direction,
    properties: IndexMap<String, Property>,
}

impl PropertySet {
    /// Create an empty set; `owner` prefixes every property path
    pub fn new(owner: impl Into<String>, direction: Direction) -> Self {
        Self {
            owner: owner.into(),
            direction,
            properties: IndexMap::new(),
        }
    }

    /// Name used as the path prefix
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Inputs or outputs
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Declare more properties; existing entries are never replaced.
    ///
    /// The whole batch is validated first. On error the set is unchanged.
    pub fn append<K, I>(&mut self, schemas: I) -> Result<&mut Self, GraphError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, PropertySchema)>,
    {
        let mut batch: IndexMap<String, Property> = IndexMap::new();
        for (key, schema) in schemas {
            let key = key.into();
            if self.properties.contains_key(&key) || batch.contains_key(&key) {
                return Err(GraphError::DuplicateProperty {
                    owner: self.owner.clone(),
                    key,
                });
            }
            let property = Property::new(key.clone(), &self.owner, self.direction, schema)?;
            batch.insert(key, property);
        }
        self.properties.extend(batch);
        Ok(self)
    }

    /// Get a property by key
    pub fn get(&self, key: &str) -> Result<&Property, GraphError> {
        self.properties.get(key).ok_or_else(|| self.unknown(key))
    }

    pub(crate) fn get_index_mut(&mut self, index: usize) -> Option<&mut Property> {
        self.properties.get_index_mut(index).map(|(_, p)| p)
    }

    /// Get a property by declaration position
    pub fn get_index(&self, index: usize) -> Option<&Property> {
        self.properties.get_index(index).map(|(_, p)| p)
    }

    /// Declaration position of a key
    pub fn index_of(&self, key: &str) -> Result<usize, GraphError> {
        self.properties
            .get_index_of(key)
            .ok_or_else(|| self.unknown(key))
    }

    /// Find a property by its path
    pub fn find_by_path(&self, path: &str) -> Option<(usize, &Property)> {
        self.properties
            .values()
            .enumerate()
            .find(|(_, p)| p.path() == path)
    }

    /// Check if a key is declared
    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Properties in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Whether any property is flagged as changed
    pub fn any_changed(&self) -> bool {
        self.properties.values().any(Property::changed)
    }

    /// Current values keyed by property key
    pub fn values(&self) -> IndexMap<String, Value> {
        self.properties
            .iter()
            .map(|(key, p)| (key.clone(), p.value().clone()))
            .collect()
    }

    pub(crate) fn clear_changed(&mut self) {
        for property in self.properties.values_mut() {
            property.clear_changed();
        }
    }

    fn unknown(&self, key: &str) -> GraphError {
        GraphError::UnknownProperty {
            owner: self.owner.clone(),
            key: key.to_string(),
        }
    }
}
