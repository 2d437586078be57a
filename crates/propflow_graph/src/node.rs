// SPDX-License-Identifier: MIT OR Apache-2.0
//! Nodes group components and give their properties an address.

use crate::component::ComponentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// A named group of components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique node ID
    pub id: NodeId,
    /// Node name, the default path prefix of its components' properties
    pub name: String,
    components: Vec<ComponentId>,
}

impl Node {
    /// Create a new empty node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            components: Vec::new(),
        }
    }

    /// Components in creation order
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Check if a component belongs to this node
    pub fn contains(&self, component: ComponentId) -> bool {
        self.components.contains(&component)
    }

    pub(crate) fn add_component(&mut self, component: ComponentId) {
        self.components.push(component);
    }

    pub(crate) fn remove_component(&mut self, component: ComponentId) {
        self.components.retain(|c| *c != component);
    }
}
