// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, components and links.
//!
//! The graph owns every property. Writes that must travel across links
//! (`set_value`, `set`, `push`, `reset`) are graph operations: the new value is
//! validated, every outgoing payload is converted, and only then is anything
//! stored. Propagation is a single hop; values move further only when the
//! receiving component runs its update during a system tick.

use crate::component::{Behavior, Component, ComponentId, ComponentState};
use crate::error::{GraphError, LinkIssue};
use crate::link::{Link, LinkId, PropertyRef};
use crate::node::{Node, NodeId};
use crate::property::{Direction, ListenerId, Property};
use crate::settings::CyclePolicy;
use crate::value::{Scalar, Value};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};

/// A property graph
#[derive(Debug)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in creation order
    nodes: IndexMap<NodeId, Node>,
    /// Components in creation order
    components: IndexMap<ComponentId, Component>,
    /// Links in creation order
    links: IndexMap<LinkId, Link>,
    /// Last computed update order, dropped whenever the topology changes
    order: Option<Vec<ComponentId>>,
    /// Whether `order` was built by breaking a cycle
    order_has_cycle: bool,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            components: IndexMap::new(),
            links: IndexMap::new(),
            order: None,
            order_has_cycle: false,
        }
    }

    /// Add a node to the graph
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let node = Node::new(name);
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Result<&Node, GraphError> {
        self.nodes
            .get(&node_id)
            .ok_or(GraphError::UnknownNode(node_id))
    }

    /// Find a node by name
    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.nodes.values().find(|n| n.name == name)
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Remove a node together with its components
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<Node, GraphError> {
        let components = self.node(node_id)?.components().to_vec();
        for component in components {
            self.remove_component(component)?;
        }
        self.nodes
            .shift_remove(&node_id)
            .ok_or(GraphError::UnknownNode(node_id))
    }

    /// Create a component on a node; its properties are prefixed by the node name
    pub fn create_component(
        &mut self,
        node_id: NodeId,
        behavior: impl Behavior,
    ) -> Result<ComponentId, GraphError> {
        self.create_boxed_component(node_id, None, Box::new(behavior))
    }

    /// Create a component whose properties are prefixed by `name`
    pub fn create_named_component(
        &mut self,
        node_id: NodeId,
        name: impl Into<String>,
        behavior: impl Behavior,
    ) -> Result<ComponentId, GraphError> {
        self.create_boxed_component(node_id, Some(name.into()), Box::new(behavior))
    }

    /// Create a component from a boxed behavior
    pub fn create_boxed_component(
        &mut self,
        node_id: NodeId,
        name: Option<String>,
        behavior: Box<dyn Behavior>,
    ) -> Result<ComponentId, GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::UnknownNode(node_id))?;
        let name = name.unwrap_or_else(|| node.name.clone());

        let component = Component::new(node_id, name, behavior)?;
        let id = component.id();
        node.add_component(id);

        tracing::debug!(
            "Created component '{}' ({}) with {} ins, {} outs",
            component.name(),
            component.type_name(),
            component.ins().len(),
            component.outs().len()
        );

        self.components.insert(id, component);
        self.invalidate_order();
        Ok(id)
    }

    /// Get a component by ID
    pub fn component(&self, id: ComponentId) -> Result<&Component, GraphError> {
        self.components
            .get(&id)
            .ok_or(GraphError::UnknownComponent(id))
    }

    pub(crate) fn component_mut(&mut self, id: ComponentId) -> Result<&mut Component, GraphError> {
        self.components
            .get_mut(&id)
            .ok_or(GraphError::UnknownComponent(id))
    }

    /// Component IDs in the last sorted order, or in creation order if unsorted
    pub fn component_ids(&self) -> Vec<ComponentId> {
        match &self.order {
            Some(order) => order.clone(),
            None => self.components.keys().copied().collect(),
        }
    }

    /// Components in the last sorted order, or in creation order if unsorted
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        let ids = self.component_ids();
        ids.into_iter().filter_map(move |id| self.components.get(&id))
    }

    /// Get the number of components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Find a component by name
    pub fn find_component(&self, name: &str) -> Option<&Component> {
        self.components.values().find(|c| c.name() == name)
    }

    /// Components with a given type name, in creation order
    pub fn components_of_type<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a Component> {
        self.components
            .values()
            .filter(move |c| c.type_name() == type_name)
    }

    /// Remove a component after detaching all of its links
    pub fn remove_component(&mut self, id: ComponentId) -> Result<(), GraphError> {
        self.unlink_all_properties(id)?;

        let mut component = self
            .components
            .shift_remove(&id)
            .ok_or(GraphError::UnknownComponent(id))?;
        if let Some(mut behavior) = component.take_behavior() {
            behavior.dispose();
        }
        if let Some(node) = self.nodes.get_mut(&component.node()) {
            node.remove_component(id);
        }

        tracing::debug!("Removed component '{}'", component.name());
        self.invalidate_order();
        Ok(())
    }

    /// Force a component to update on the next tick
    pub fn mark_dirty(&mut self, id: ComponentId) -> Result<(), GraphError> {
        self.component_mut(id)?.set_state(ComponentState::Dirty);
        Ok(())
    }

    /// Address an input property by key
    pub fn input(&self, component: ComponentId, key: &str) -> Result<PropertyRef, GraphError> {
        let index = self.component(component)?.ins().index_of(key)?;
        Ok(PropertyRef::input(component, index))
    }

    /// Address an output property by key
    pub fn output(&self, component: ComponentId, key: &str) -> Result<PropertyRef, GraphError> {
        let index = self.component(component)?.outs().index_of(key)?;
        Ok(PropertyRef::output(component, index))
    }

    /// Find an input property by path
    pub fn find_input(&self, path: &str) -> Option<PropertyRef> {
        self.find_property(path, Direction::Input)
    }

    /// Find an output property by path
    pub fn find_output(&self, path: &str) -> Option<PropertyRef> {
        self.find_property(path, Direction::Output)
    }

    fn find_property(&self, path: &str, direction: Direction) -> Option<PropertyRef> {
        self.components.values().find_map(|c| {
            c.properties(direction)
                .find_by_path(path)
                .map(|(index, _)| PropertyRef {
                    component: c.id(),
                    direction,
                    index,
                })
        })
    }

    /// Get a property
    pub fn property(&self, property: PropertyRef) -> Result<&Property, GraphError> {
        let component = self.component(property.component)?;
        let set = component.properties(property.direction);
        set.get_index(property.index)
            .ok_or_else(|| GraphError::UnknownProperty {
                owner: component.name().to_string(),
                key: format!("#{}", property.index),
            })
    }

    fn property_mut(&mut self, property: PropertyRef) -> Result<&mut Property, GraphError> {
        let component = self
            .components
            .get_mut(&property.component)
            .ok_or(GraphError::UnknownComponent(property.component))?;
        let owner = component.name().to_string();
        component
            .property_mut(property.direction, property.index)
            .ok_or_else(|| GraphError::UnknownProperty {
                owner,
                key: format!("#{}", property.index),
            })
    }

    /// Get the current value of a property
    pub fn value(&self, property: PropertyRef) -> Result<&Value, GraphError> {
        Ok(self.property(property)?.value())
    }

    /// Assign a value, flag it as changed and propagate it over outgoing links
    pub fn set_value(&mut self, property: PropertyRef, value: impl Into<Value>) -> Result<(), GraphError> {
        self.write(property, Some(value.into()), true)
    }

    /// Flag as changed and propagate the current value (also fires events)
    pub fn set(&mut self, property: PropertyRef) -> Result<(), GraphError> {
        self.write(property, None, true)
    }

    /// Assign and propagate a value without flagging the property itself as changed
    pub fn push(&mut self, property: PropertyRef, value: impl Into<Value>) -> Result<(), GraphError> {
        self.write(property, Some(value.into()), false)
    }

    /// Restore the schema default, with propagation
    pub fn reset(&mut self, property: PropertyRef) -> Result<(), GraphError> {
        let default = self.property(property)?.schema().default.clone();
        self.write(property, Some(default), true)
    }

    /// Overwrite one element in place; call [`Graph::set`] to announce it
    pub fn set_element(
        &mut self,
        property: PropertyRef,
        index: usize,
        value: impl Into<Scalar>,
    ) -> Result<(), GraphError> {
        self.property_mut(property)?.write_element(index, value.into())
    }

    /// Assign several values of one set; applied in declaration order
    pub fn set_values<K, I>(
        &mut self,
        component: ComponentId,
        direction: Direction,
        values: I,
    ) -> Result<(), GraphError>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let set = self.component(component)?.properties(direction);
        let mut batch = Vec::new();
        for (key, value) in values {
            let index = set.index_of(key.as_ref())?;
            batch.push((index, value));
        }
        batch.sort_by_key(|(index, _)| *index);

        for (index, value) in batch {
            let property = PropertyRef {
                component,
                direction,
                index,
            };
            self.set_value(property, value)?;
        }
        Ok(())
    }

    fn write(
        &mut self,
        property: PropertyRef,
        value: Option<Value>,
        raise_changed: bool,
    ) -> Result<(), GraphError> {
        let source = self.property(property)?;
        if let Some(value) = &value {
            source.check_value(value)?;
        }
        let outgoing = value.as_ref().unwrap_or_else(|| source.value());

        // Convert every payload before storing anything
        let mut deliveries = Vec::with_capacity(source.out_links().len());
        for slot in source.out_links() {
            let Some(link) = self.links.get(&slot.link) else {
                continue;
            };
            let dest = self.property(link.dest)?;
            let payload = source.payload(outgoing, link.source_index, dest, link.dest_index)?;
            deliveries.push((link.dest, link.dest_index, payload));
        }

        let source = self.property_mut(property)?;
        match value {
            Some(value) => source.store(value, raise_changed),
            None => source.mark_changed(),
        }

        for (dest, index, payload) in deliveries {
            self.property_mut(dest)?.receive(index, payload);
        }
        Ok(())
    }

    /// Attach a listener called with every value written to a property
    pub fn add_listener<F>(&mut self, property: PropertyRef, listener: F) -> Result<ListenerId, GraphError>
    where
        F: FnMut(&Value) + 'static,
    {
        Ok(self.property_mut(property)?.add_listener(Box::new(listener)))
    }

    /// Detach a listener; returns false if it was not attached
    pub fn remove_listener(&mut self, property: PropertyRef, id: ListenerId) -> Result<bool, GraphError> {
        Ok(self.property_mut(property)?.remove_listener(id))
    }

    /// Check if a link is allowed
    pub fn can_link(
        &self,
        source: PropertyRef,
        dest: PropertyRef,
        source_index: Option<usize>,
        dest_index: Option<usize>,
    ) -> bool {
        self.check_link(source, dest, source_index, dest_index).is_ok()
    }

    /// Check if a link is allowed, reporting why not
    ///
    /// This includes converting the current source value, so a link that
    /// passes here is accepted by [`Graph::link`].
    pub fn check_link(
        &self,
        source: PropertyRef,
        dest: PropertyRef,
        source_index: Option<usize>,
        dest_index: Option<usize>,
    ) -> Result<(), GraphError> {
        let from = self.property(source)?;
        let to = self.property(dest)?;
        from.check_link_to(to, source_index, dest_index)
            .map_err(|issue| incompatible(from, to, issue))?;
        from.payload(from.value(), source_index, to, dest_index)?;
        Ok(())
    }

    /// Link two properties and propagate the source value once
    pub fn link(
        &mut self,
        source: PropertyRef,
        dest: PropertyRef,
        source_index: Option<usize>,
        dest_index: Option<usize>,
    ) -> Result<LinkId, GraphError> {
        let from = self.property(source)?;
        let to = self.property(dest)?;
        from.check_link_to(to, source_index, dest_index)
            .map_err(|issue| incompatible(from, to, issue))?;
        let payload = from.payload(from.value(), source_index, to, dest_index)?;

        tracing::debug!(
            "Linking {}{} -> {}{}",
            from.path(),
            index_suffix(source_index),
            to.path(),
            index_suffix(dest_index)
        );

        let link = Link::new(source, source_index, dest, dest_index);
        let id = link.id;
        if link.is_self_link() {
            tracing::warn!("Linking {} into its own component creates a cycle", to.path());
        }

        self.property_mut(source)?.attach_out_link(id, source_index);
        let to = self.property_mut(dest)?;
        to.attach_in_link(id, dest_index);
        to.receive(dest_index, payload);

        self.links.insert(id, link);
        self.invalidate_order();
        Ok(id)
    }

    /// Link whole values
    pub fn link_properties(&mut self, source: PropertyRef, dest: PropertyRef) -> Result<LinkId, GraphError> {
        self.link(source, dest, None, None)
    }

    /// Link, first removing whatever links occupy the destination slot
    pub fn replace_link(
        &mut self,
        source: PropertyRef,
        dest: PropertyRef,
        source_index: Option<usize>,
        dest_index: Option<usize>,
    ) -> Result<LinkId, GraphError> {
        let from = self.property(source)?;
        let to = self.property(dest)?;
        match from.check_link_to(to, source_index, dest_index) {
            Ok(()) | Err(LinkIssue::SlotOccupied) => {}
            Err(issue) => return Err(incompatible(from, to, issue)),
        }
        // The occupants stay if the new value cannot be delivered
        from.payload(from.value(), source_index, to, dest_index)?;

        let displaced: Vec<LinkId> = to
            .in_links()
            .iter()
            .filter(|slot| slot.index.is_none() || dest_index.is_none() || slot.index == dest_index)
            .map(|slot| slot.link)
            .collect();
        for link in displaced {
            self.remove_link(link);
        }

        self.link(source, dest, source_index, dest_index)
    }

    /// Remove every link running from `source` to `dest`; returns how many were removed
    pub fn unlink(&mut self, source: PropertyRef, dest: PropertyRef) -> usize {
        let ids: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| l.source == source && l.dest == dest)
            .map(|l| l.id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove_link(id)).count()
    }

    /// Remove a link from both of its endpoints
    pub fn remove_link(&mut self, link_id: LinkId) -> Option<Link> {
        let link = self.links.shift_remove(&link_id)?;
        for endpoint in [link.source, link.dest] {
            if let Ok(property) = self.property_mut(endpoint) {
                property.detach_link(link_id);
            }
        }
        tracing::debug!("Removed link {:?}", link_id);
        self.invalidate_order();
        Some(link)
    }

    /// Remove every link attached to a property
    pub fn unlink_property(&mut self, property: PropertyRef) -> Result<usize, GraphError> {
        self.property(property)?;
        let ids: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| l.involves_property(property))
            .map(|l| l.id)
            .collect();
        Ok(ids.into_iter().filter_map(|id| self.remove_link(id)).count())
    }

    /// Remove every link attached to any property of a component
    pub fn unlink_all_properties(&mut self, component: ComponentId) -> Result<usize, GraphError> {
        self.component(component)?;
        let ids: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| l.involves_component(component))
            .map(|l| l.id)
            .collect();
        Ok(ids.into_iter().filter_map(|id| self.remove_link(id)).count())
    }

    /// Get a link by ID
    pub fn get_link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.get(&link_id)
    }

    /// Get all links
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Get links leaving a property
    pub fn links_from(&self, property: PropertyRef) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.source == property)
    }

    /// Get links entering a property
    pub fn links_to(&self, property: PropertyRef) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.dest == property)
    }

    /// Get the number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Components feeding at least one input of `id`, in creation order
    pub fn predecessors(&self, id: ComponentId) -> Vec<ComponentId> {
        let sources: HashSet<ComponentId> = self
            .links
            .values()
            .filter(|l| l.dest.component == id)
            .map(|l| l.source.component)
            .collect();
        self.components
            .keys()
            .filter(|c| sources.contains(c))
            .copied()
            .collect()
    }

    /// Components consuming at least one output of `id`, in creation order
    pub fn dependents(&self, id: ComponentId) -> Vec<ComponentId> {
        let dests: HashSet<ComponentId> = self
            .links
            .values()
            .filter(|l| l.source.component == id)
            .map(|l| l.dest.component)
            .collect();
        self.components
            .keys()
            .filter(|c| dests.contains(c))
            .copied()
            .collect()
    }

    /// Whether a valid sorted order is cached
    pub fn is_sorted(&self) -> bool {
        self.order.is_some() && !self.order_has_cycle
    }

    /// Drop the cached order; the next ordered traversal sorts again
    pub fn invalidate_order(&mut self) {
        self.order = None;
        self.order_has_cycle = false;
    }

    /// Sort components so every link's source precedes its destination
    pub fn sort(&mut self) -> Result<Vec<ComponentId>, GraphError> {
        self.sort_with(CyclePolicy::Fail)
    }

    /// Sort, handling cycles according to `policy`
    pub fn sort_with(&mut self, policy: CyclePolicy) -> Result<Vec<ComponentId>, GraphError> {
        if let Some(order) = &self.order {
            if self.order_has_cycle && policy == CyclePolicy::Fail {
                return self.topological_order();
            }
            return Ok(order.clone());
        }

        let mut has_cycle = false;
        let order = match self.topological_order() {
            Ok(order) => order,
            Err(GraphError::CyclicDependency {
                resolved,
                unresolved,
            }) if policy == CyclePolicy::InsertionOrder => {
                tracing::warn!(
                    "Graph '{}' has a cycle through {} components; appending them in insertion order",
                    self.name,
                    unresolved.len()
                );
                has_cycle = true;
                resolved.into_iter().chain(unresolved).collect()
            }
            Err(e) => return Err(e),
        };

        tracing::debug!("Sorted {} components in graph '{}'", order.len(), self.name);
        self.order = Some(order.clone());
        self.order_has_cycle = has_cycle;
        Ok(order)
    }

    /// Compute the update order without caching it
    ///
    /// Kahn's algorithm seeded in creation order. Components that become ready
    /// at the same time are queued in creation order, so unconstrained
    /// components keep their relative order.
    pub fn topological_order(&self) -> Result<Vec<ComponentId>, GraphError> {
        let ids: Vec<ComponentId> = self.components.keys().copied().collect();
        let position: HashMap<ComponentId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut pending = vec![0usize; ids.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
        let mut edges = HashSet::new();

        for link in self.links.values() {
            let (Some(&from), Some(&to)) = (
                position.get(&link.source.component),
                position.get(&link.dest.component),
            ) else {
                continue;
            };
            if edges.insert((from, to)) {
                dependents[from].push(to);
                pending[to] += 1;
            }
        }
        for list in &mut dependents {
            list.sort_unstable();
        }

        let mut ready: VecDeque<usize> = (0..ids.len()).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(ids.len());

        while let Some(current) = ready.pop_front() {
            order.push(current);
            for &next in &dependents[current] {
                pending[next] -= 1;
                if pending[next] == 0 {
                    ready.push_back(next);
                }
            }
        }

        if order.len() < ids.len() {
            let unresolved = (0..ids.len())
                .filter(|&i| pending[i] > 0)
                .map(|i| ids[i])
                .collect();
            return Err(GraphError::CyclicDependency {
                resolved: order.into_iter().map(|i| ids[i]).collect(),
                unresolved,
            });
        }

        Ok(order.into_iter().map(|i| ids[i]).collect())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

fn incompatible(from: &Property, to: &Property, issue: LinkIssue) -> GraphError {
    GraphError::LinkIncompatible {
        from: from.path().to_string(),
        to: to.path().to_string(),
        issue,
    }
}

fn index_suffix(index: Option<usize>) -> String {
    index.map(|i| format!("[{i}]")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Declared;
    use crate::schema::PropertySchema;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sample() -> Declared {
        Declared::new("Sample")
            .with_input("num0", PropertySchema::number("Number0", 0.0))
            .with_input("vec4", PropertySchema::vector("Vec4", [1.0, 2.0, 3.0, 4.0]))
            .with_input("str0", PropertySchema::string("String0", ""))
            .with_output("num0", PropertySchema::number("Number0", 0.0))
            .with_output("vec4", PropertySchema::vector("Vec4", [0.0; 4]))
            .with_output("str0", PropertySchema::string("String0", ""))
    }

    fn pair() -> (Graph, ComponentId, ComponentId) {
        let mut graph = Graph::new("Test");
        let a = graph.create_node("A");
        let b = graph.create_node("B");
        let a = graph.create_component(a, sample()).unwrap();
        let b = graph.create_component(b, sample()).unwrap();
        (graph, a, b)
    }

    #[test]
    fn test_link_propagates_immediately() {
        let (mut graph, a, b) = pair();
        let out = graph.output(a, "num0").unwrap();
        let input = graph.input(b, "num0").unwrap();

        graph.set_value(out, 7.0).unwrap();
        graph.link_properties(out, input).unwrap();

        assert_eq!(graph.value(input).unwrap().as_number(), Some(7.0));
        assert!(graph.property(input).unwrap().changed());
        assert_eq!(graph.property(out).unwrap().out_links().len(), 1);
        assert_eq!(graph.property(input).unwrap().in_links().len(), 1);
    }

    #[test]
    fn test_occupied_slot_requires_replace() {
        let (mut graph, a, b) = pair();
        let c_node = graph.create_node("C");
        let c = graph.create_component(c_node, sample()).unwrap();
        let input = graph.input(c, "num0").unwrap();
        let from_a = graph.output(a, "num0").unwrap();
        let from_b = graph.output(b, "num0").unwrap();

        graph.link_properties(from_a, input).unwrap();
        let err = graph.link_properties(from_b, input).unwrap_err();
        assert!(matches!(
            err,
            GraphError::LinkIncompatible {
                issue: LinkIssue::SlotOccupied,
                ..
            }
        ));

        graph.replace_link(from_b, input, None, None).unwrap();
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.links_to(input).next().unwrap().source, from_b);
        assert!(graph.property(from_a).unwrap().out_links().is_empty());
    }

    #[test]
    fn test_empty_string_links_to_number() {
        let (mut graph, a, b) = pair();
        let text = graph.output(a, "str0").unwrap();
        let input = graph.input(b, "num0").unwrap();
        graph.set_value(input, 9.0).unwrap();

        assert!(graph.can_link(text, input, None, None));
        graph.link_properties(text, input).unwrap();
        assert_eq!(graph.value(input).unwrap().as_number(), Some(0.0));

        graph.set_value(text, "2.5").unwrap();
        assert_eq!(graph.value(input).unwrap().as_number(), Some(2.5));
    }

    #[test]
    fn test_can_link_agrees_with_link() {
        let (mut graph, a, b) = pair();
        let text = graph.output(a, "str0").unwrap();
        let input = graph.input(b, "num0").unwrap();
        graph.set_value(text, "abc").unwrap();

        assert!(!graph.can_link(text, input, None, None));
        assert!(matches!(
            graph.check_link(text, input, None, None),
            Err(GraphError::ConversionFailed { .. })
        ));
        assert!(graph.link_properties(text, input).is_err());
        assert_eq!(graph.link_count(), 0);
    }

    #[test]
    fn test_failed_replace_keeps_existing_link() {
        let (mut graph, a, b) = pair();
        let c_node = graph.create_node("C");
        let c = graph.create_component(c_node, sample()).unwrap();
        let input = graph.input(c, "num0").unwrap();
        let from_a = graph.output(a, "num0").unwrap();
        let text = graph.output(b, "str0").unwrap();

        graph.set_value(from_a, 3.0).unwrap();
        let kept = graph.link_properties(from_a, input).unwrap();
        graph.set_value(text, "abc").unwrap();

        let err = graph.replace_link(text, input, None, None).unwrap_err();
        assert!(matches!(err, GraphError::ConversionFailed { .. }));
        assert_eq!(graph.link_count(), 1);
        assert!(graph.get_link(kept).is_some());
        assert_eq!(graph.property(from_a).unwrap().out_links().len(), 1);
        assert_eq!(graph.value(input).unwrap().as_number(), Some(3.0));

        graph.set_value(from_a, 4.0).unwrap();
        assert_eq!(graph.value(input).unwrap().as_number(), Some(4.0));
    }

    #[test]
    fn test_independent_element_links() {
        let (mut graph, a, b) = pair();
        let c_node = graph.create_node("C");
        let c = graph.create_component(c_node, sample()).unwrap();
        let vec4 = graph.input(c, "vec4").unwrap();

        graph.link(graph.output(a, "num0").unwrap(), vec4, None, Some(0)).unwrap();
        graph.link(graph.output(b, "num0").unwrap(), vec4, None, Some(3)).unwrap();
        assert!(!graph.can_link(graph.output(b, "vec4").unwrap(), vec4, None, None));

        graph.set_value(graph.output(a, "num0").unwrap(), 10.0).unwrap();
        graph.set_value(graph.output(b, "num0").unwrap(), 40.0).unwrap();
        assert_eq!(
            graph.value(vec4).unwrap().as_numbers(),
            Some(vec![10.0, 2.0, 3.0, 40.0])
        );
    }

    #[test]
    fn test_failed_conversion_leaves_everything_untouched() {
        let (mut graph, a, b) = pair();
        let str_out = graph.output(a, "str0").unwrap();
        let num_in = graph.input(b, "num0").unwrap();

        graph.set_value(str_out, "5").unwrap();
        graph.link_properties(str_out, num_in).unwrap();
        assert_eq!(graph.value(num_in).unwrap().as_number(), Some(5.0));

        let err = graph.set_value(str_out, "five").unwrap_err();
        assert!(matches!(err, GraphError::ConversionFailed { .. }));
        assert_eq!(graph.value(str_out).unwrap().as_str(), Some("5"));
        assert_eq!(graph.value(num_in).unwrap().as_number(), Some(5.0));
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        let (mut graph, a, _) = pair();
        let vec4 = graph.output(a, "vec4").unwrap();

        let err = graph.set_value(vec4, Value::from([1.0, 2.0])).unwrap_err();
        assert!(matches!(err, GraphError::InvalidValue { .. }));
        assert_eq!(graph.value(vec4).unwrap().as_numbers(), Some(vec![0.0; 4]));
        assert!(!graph.property(vec4).unwrap().changed());
    }

    #[test]
    fn test_set_values_uses_declaration_order() {
        let (mut graph, a, _) = pair();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for key in ["num0", "str0"] {
            let property = graph.input(a, key).unwrap();
            let sink = Rc::clone(&seen);
            graph
                .add_listener(property, move |_| sink.borrow_mut().push(key))
                .unwrap();
        }

        graph
            .set_values(
                a,
                Direction::Input,
                [("str0", Value::from("x")), ("num0", Value::from(3.0))],
            )
            .unwrap();
        assert_eq!(*seen.borrow(), vec!["num0", "str0"]);

        let err = graph
            .set_values(a, Direction::Input, [("nope", Value::from(1.0))])
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownProperty { .. }));
    }

    #[test]
    fn test_push_does_not_flag_source() {
        let (mut graph, a, b) = pair();
        let out = graph.output(a, "num0").unwrap();
        let input = graph.input(b, "num0").unwrap();
        graph.link_properties(out, input).unwrap();
        graph.component_mut(b).unwrap().properties_mut(Direction::Input).clear_changed();

        graph.push(out, 9.0).unwrap();
        assert!(!graph.property(out).unwrap().changed());
        assert!(graph.property(input).unwrap().changed());
        assert_eq!(graph.value(input).unwrap().as_number(), Some(9.0));
    }

    #[test]
    fn test_reset_restores_default() {
        let (mut graph, a, _) = pair();
        let vec4 = graph.input(a, "vec4").unwrap();
        graph.set_value(vec4, Value::from([0.0; 4])).unwrap();
        assert!(!graph.property(vec4).unwrap().is_default());

        graph.reset(vec4).unwrap();
        assert!(graph.property(vec4).unwrap().is_default());
    }

    #[test]
    fn test_remove_component_detaches_links() {
        let (mut graph, a, b) = pair();
        let out = graph.output(a, "num0").unwrap();
        graph.link_properties(out, graph.input(b, "num0").unwrap()).unwrap();

        graph.remove_component(b).unwrap();
        assert_eq!(graph.link_count(), 0);
        assert!(graph.property(out).unwrap().out_links().is_empty());
        assert!(graph.find_node("B").unwrap().components().is_empty());
        assert!(matches!(
            graph.component(b),
            Err(GraphError::UnknownComponent(_))
        ));
    }

    #[test]
    fn test_unlink_missing_is_noop() {
        let (mut graph, a, b) = pair();
        let out = graph.output(a, "num0").unwrap();
        let input = graph.input(b, "num0").unwrap();
        assert_eq!(graph.unlink(out, input), 0);
        assert_eq!(graph.unlink_all_properties(a).unwrap(), 0);
    }

    #[test]
    fn test_branching_sort_keeps_creation_order() {
        let mut graph = Graph::new("Branches");
        let node = graph.create_node("N");
        let ids: Vec<ComponentId> = (0..5)
            .map(|i| {
                graph
                    .create_named_component(node, format!("C{i}"), sample())
                    .unwrap()
            })
            .collect();

        // 3 feeds 1 and 0, 4 feeds 2
        let link = |graph: &mut Graph, from: usize, to: usize| {
            let out = graph.output(ids[from], "num0").unwrap();
            let input = graph.input(ids[to], "num0").unwrap();
            graph.link_properties(out, input).unwrap();
        };
        link(&mut graph, 3, 1);
        link(&mut graph, 3, 0);
        link(&mut graph, 4, 2);

        let order = graph.sort().unwrap();
        let expected: Vec<ComponentId> = [3, 4, 0, 1, 2].iter().map(|&i| ids[i]).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_cycle_detection_and_fallback() {
        let (mut graph, a, b) = pair();
        graph
            .link_properties(graph.output(a, "num0").unwrap(), graph.input(b, "num0").unwrap())
            .unwrap();
        graph
            .link_properties(graph.output(b, "num0").unwrap(), graph.input(a, "num0").unwrap())
            .unwrap();

        match graph.sort() {
            Err(GraphError::CyclicDependency {
                resolved,
                unresolved,
            }) => {
                assert!(resolved.is_empty());
                assert_eq!(unresolved, vec![a, b]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
        assert!(!graph.is_sorted());

        let order = graph.sort_with(CyclePolicy::InsertionOrder).unwrap();
        assert_eq!(order, vec![a, b]);
        assert!(!graph.is_sorted());
        assert_eq!(graph.component_ids(), vec![a, b]);

        assert!(matches!(
            graph.sort(),
            Err(GraphError::CyclicDependency { .. })
        ));
        assert_eq!(graph.sort_with(CyclePolicy::InsertionOrder).unwrap(), vec![a, b]);
    }

    #[test]
    fn test_link_invalidates_order() {
        let (mut graph, a, b) = pair();
        assert_eq!(graph.sort().unwrap(), vec![a, b]);

        graph
            .link_properties(graph.output(b, "num0").unwrap(), graph.input(a, "num0").unwrap())
            .unwrap();
        assert!(!graph.is_sorted());
        assert_eq!(graph.sort().unwrap(), vec![b, a]);
        assert_eq!(graph.predecessors(a), vec![b]);
        assert_eq!(graph.dependents(b), vec![a]);
    }
}
