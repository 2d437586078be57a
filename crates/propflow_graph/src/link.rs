// SPDX-License-Identifier: MIT OR Apache-2.0
//! Link (edge) definitions for the graph.

use crate::component::ComponentId;
use crate::property::Direction;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId(pub Uuid);

impl LinkId {
    /// Create a new random link ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

/// Address of a property inside the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyRef {
    /// Owning component
    pub component: ComponentId,
    /// Inputs or outputs
    pub direction: Direction,
    /// Position in the set, in declaration order
    pub index: usize,
}

impl PropertyRef {
    /// Address an input property
    pub fn input(component: ComponentId, index: usize) -> Self {
        Self {
            component,
            direction: Direction::Input,
            index,
        }
    }

    /// Address an output property
    pub fn output(component: ComponentId, index: usize) -> Self {
        Self {
            component,
            direction: Direction::Output,
            index,
        }
    }
}

/// A directed connection from an output property to an input property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Unique link ID
    pub id: LinkId,
    /// Source property
    pub source: PropertyRef,
    /// Element read from the source (`None` for the whole value)
    pub source_index: Option<usize>,
    /// Destination property
    pub dest: PropertyRef,
    /// Element written in the destination (`None` for the whole value)
    pub dest_index: Option<usize>,
}

impl Link {
    /// Create a new link
    pub fn new(
        source: PropertyRef,
        source_index: Option<usize>,
        dest: PropertyRef,
        dest_index: Option<usize>,
    ) -> Self {
        Self {
            id: LinkId::new(),
            source,
            source_index,
            dest,
            dest_index,
        }
    }

    /// Check if this link involves a specific component
    pub fn involves_component(&self, component: ComponentId) -> bool {
        self.source.component == component || self.dest.component == component
    }

    /// Check if this link involves a specific property
    pub fn involves_property(&self, property: PropertyRef) -> bool {
        self.source == property || self.dest == property
    }

    /// Whether this link connects two properties of the same component
    pub fn is_self_link(&self) -> bool {
        self.source.component == self.dest.component
    }
}
