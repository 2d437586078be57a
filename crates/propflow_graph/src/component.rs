// SPDX-License-Identifier: MIT OR Apache-2.0
//! Components: addressable units owning an input and an output property set.

use crate::error::GraphError;
use crate::node::NodeId;
use crate::property::{Direction, Property};
use crate::property_set::PropertySet;
use crate::schema::PropertySchema;
use crate::system::UpdateContext;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentId(pub Uuid);

impl ComponentId {
    /// Create a new random component ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::new()
    }
}

/// The logic attached to a component
///
/// `declare` runs once when the component is created and builds its property
/// sets. During a system tick, `update` runs when any input changed or the
/// component was marked dirty, then `tick` runs unconditionally. Both only
/// reach other components through the outputs they write.
pub trait Behavior: 'static {
    /// Type name, used by registries and documents
    fn type_name(&self) -> &str;

    /// Declare the input and output properties
    fn declare(&self, ins: &mut PropertySet, outs: &mut PropertySet) -> Result<(), GraphError>;

    /// React to changed inputs
    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), GraphError> {
        let _ = ctx;
        Ok(())
    }

    /// Per-frame hook; returns true if outputs were written
    fn tick(&mut self, ctx: &mut UpdateContext<'_>) -> Result<bool, GraphError> {
        let _ = ctx;
        Ok(false)
    }

    /// Called on removal, after every link has been detached
    fn dispose(&mut self) {}
}

/// Per-tick state of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentState {
    /// Nothing to do
    Clean,
    /// Needs an update (new, or marked externally)
    #[default]
    Dirty,
    /// `update` is running
    Updating,
}

/// A component instance in the graph
pub struct Component {
    id: ComponentId,
    node: NodeId,
    name: String,
    type_name: String,
    ins: PropertySet,
    outs: PropertySet,
    state: ComponentState,
    behavior: Option<Box<dyn Behavior>>,
}

impl Component {
    pub(crate) fn new(
        node: NodeId,
        name: String,
        behavior: Box<dyn Behavior>,
    ) -> Result<Self, GraphError> {
        let mut ins = PropertySet::new(name.clone(), Direction::Input);
        let mut outs = PropertySet::new(name.clone(), Direction::Output);
        behavior.declare(&mut ins, &mut outs)?;

        Ok(Self {
            id: ComponentId::new(),
            node,
            name,
            type_name: behavior.type_name().to_string(),
            ins,
            outs,
            state: ComponentState::Dirty,
            behavior: Some(behavior),
        })
    }

    /// Unique component ID
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Owning node
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Name used as the prefix of property paths
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type name of the attached behavior
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Input properties
    pub fn ins(&self) -> &PropertySet {
        &self.ins
    }

    /// Output properties
    pub fn outs(&self) -> &PropertySet {
        &self.outs
    }

    /// Inputs or outputs
    pub fn properties(&self, direction: Direction) -> &PropertySet {
        match direction {
            Direction::Input => &self.ins,
            Direction::Output => &self.outs,
        }
    }

    /// Current state
    pub fn state(&self) -> ComponentState {
        self.state
    }

    /// Whether the next tick should run `update`
    pub fn needs_update(&self) -> bool {
        self.state == ComponentState::Dirty || self.ins.any_changed()
    }

    pub(crate) fn properties_mut(&mut self, direction: Direction) -> &mut PropertySet {
        match direction {
            Direction::Input => &mut self.ins,
            Direction::Output => &mut self.outs,
        }
    }

    pub(crate) fn property_mut(&mut self, direction: Direction, index: usize) -> Option<&mut Property> {
        self.properties_mut(direction).get_index_mut(index)
    }

    pub(crate) fn set_state(&mut self, state: ComponentState) {
        self.state = state;
    }

    pub(crate) fn take_behavior(&mut self) -> Option<Box<dyn Behavior>> {
        self.behavior.take()
    }

    pub(crate) fn restore_behavior(&mut self, behavior: Box<dyn Behavior>) {
        self.behavior = Some(behavior);
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("ins", &self.ins)
            .field("outs", &self.outs)
            .field("state", &self.state)
            .finish()
    }
}

/// A behavior that only declares properties and has no logic of its own
#[derive(Debug, Clone, Default)]
pub struct Declared {
    type_name: String,
    ins: Vec<(String, PropertySchema)>,
    outs: Vec<(String, PropertySchema)>,
}

impl Declared {
    /// Create an empty declaration
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ins: Vec::new(),
            outs: Vec::new(),
        }
    }

    /// Add an input
    pub fn with_input(mut self, key: impl Into<String>, schema: PropertySchema) -> Self {
        self.ins.push((key.into(), schema));
        self
    }

    /// Add an output
    pub fn with_output(mut self, key: impl Into<String>, schema: PropertySchema) -> Self {
        self.outs.push((key.into(), schema));
        self
    }
}

impl Behavior for Declared {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn declare(&self, ins: &mut PropertySet, outs: &mut PropertySet) -> Result<(), GraphError> {
        ins.append(self.ins.iter().cloned())?;
        outs.append(self.outs.iter().cloned())?;
        Ok(())
    }
}

/// Factory producing a fresh behavior instance
pub type BehaviorFactory = Box<dyn Fn() -> Box<dyn Behavior>>;

/// Registry of available component types
pub struct ComponentRegistry {
    /// Registered factories by type name
    factories: IndexMap<String, BehaviorFactory>,
}

impl ComponentRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Register a behavior type by its default instance
    pub fn register<B: Behavior + Default>(&mut self) {
        let type_name = B::default().type_name().to_string();
        self.register_factory(type_name, || Box::new(B::default()) as Box<dyn Behavior>);
    }

    /// Register a factory under a type name
    pub fn register_factory<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Behavior> + 'static,
    {
        self.factories.insert(type_name.into(), Box::new(factory));
    }

    /// Check if a type is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names, in registration order
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Create a behavior from a type name
    pub fn create(&self, type_name: &str) -> Result<Box<dyn Behavior>, GraphError> {
        self.factories
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| GraphError::UnknownComponentType(type_name.to_string()))
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
