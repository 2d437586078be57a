// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed, named value slots owned by components.
//!
//! A [`Property`] holds the current value, the `changed` flag consumed by its
//! owner during the update pass, the links attached to it and the listeners
//! observing it. Mutations that must propagate across links go through the
//! [`Graph`](crate::Graph), which owns every property and link.

use crate::error::{GraphError, LinkIssue};
use crate::link::LinkId;
use crate::schema::PropertySchema;
use crate::value::{convert_value, ConversionHints, Scalar, Value, ValueKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Whether a property belongs to a component's inputs or outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Input property (`ins`)
    Input,
    /// Output property (`outs`)
    Output,
}

/// Unique identifier for a value listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub Uuid);

impl ListenerId {
    /// Create a new random listener ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked with the new value whenever a property is written
pub type Listener = Box<dyn FnMut(&Value)>;

/// A link attached to one endpoint, with the element index used on that side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSlot {
    /// The link
    pub link: LinkId,
    /// Element index on this endpoint (`None` for the whole value)
    pub index: Option<usize>,
}

/// A typed value slot
pub struct Property {
    key: String,
    path: String,
    direction: Direction,
    schema: PropertySchema,
    value: Value,
    changed: bool,
    in_links: Vec<LinkSlot>,
    out_links: Vec<LinkSlot>,
    listeners: IndexMap<ListenerId, Listener>,
}

impl Property {
    /// Create a property; its path is `<owner>.<HumanName>`
    pub fn new(
        key: impl Into<String>,
        owner: &str,
        direction: Direction,
        schema: PropertySchema,
    ) -> Result<Self, GraphError> {
        schema.validate()?;

        Ok(Self {
            key: key.into(),
            path: format!("{owner}.{}", schema.path_segment()),
            direction,
            value: schema.default.clone(),
            schema,
            changed: false,
            in_links: Vec::new(),
            out_links: Vec::new(),
            listeners: IndexMap::new(),
        })
    }

    /// Key used to access this property from its set
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path of this property (`Node.HumanName`)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Input or output
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Schema this property was declared with
    pub fn schema(&self) -> &PropertySchema {
        &self.schema
    }

    /// Value kind
    pub fn kind(&self) -> ValueKind {
        self.schema.kind
    }

    /// Number of elements
    pub fn element_count(&self) -> usize {
        self.schema.element_count
    }

    /// Current value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether the value changed since the owner last consumed it
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Whether this is an event property
    pub fn is_event(&self) -> bool {
        self.schema.event
    }

    /// Whether the current value equals the schema default
    pub fn is_default(&self) -> bool {
        self.value == self.schema.default
    }

    /// Links for which this property is the destination
    pub fn in_links(&self) -> &[LinkSlot] {
        &self.in_links
    }

    /// Links for which this property is the source
    pub fn out_links(&self) -> &[LinkSlot] {
        &self.out_links
    }

    /// Whether any link is attached
    pub fn is_linked(&self) -> bool {
        !self.in_links.is_empty() || !self.out_links.is_empty()
    }

    /// Whether some inbound link drives this property
    pub fn has_in_links(&self) -> bool {
        !self.in_links.is_empty()
    }

    /// Number of attached listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Read the whole value or one element of it (always a copy)
    pub fn read(&self, index: Option<usize>) -> Option<Value> {
        match index {
            Some(i) => self.value.element(i).cloned().map(Value::Scalar),
            None => Some(self.value.clone()),
        }
    }

    /// Check that a value fits this property's kind and arity
    pub fn check_value(&self, value: &Value) -> Result<(), GraphError> {
        value
            .check(self.kind(), self.element_count())
            .map_err(|reason| GraphError::InvalidValue {
                path: self.path.clone(),
                reason,
            })
    }

    /// Check if a link from this property to `dest` is allowed by kind, index
    /// and slot. [`Graph::can_link`](crate::Graph::can_link) also checks the
    /// current value converts.
    pub fn can_link_to(
        &self,
        dest: &Property,
        source_index: Option<usize>,
        dest_index: Option<usize>,
    ) -> bool {
        self.check_link_to(dest, source_index, dest_index).is_ok()
    }

    /// Check a link from this property to `dest`, naming the first problem found
    pub fn check_link_to(
        &self,
        dest: &Property,
        source_index: Option<usize>,
        dest_index: Option<usize>,
    ) -> Result<(), LinkIssue> {
        if self.direction != Direction::Output || dest.direction != Direction::Input {
            return Err(LinkIssue::Direction);
        }

        if !self.kind().can_convert_to(dest.kind()) {
            return Err(LinkIssue::TypeMismatch {
                from: self.kind(),
                to: dest.kind(),
            });
        }

        if let Some(index) = source_index {
            if index >= self.element_count() {
                return Err(LinkIssue::SourceIndexOutOfRange {
                    index,
                    count: self.element_count(),
                });
            }
        }
        if let Some(index) = dest_index {
            if index >= dest.element_count() {
                return Err(LinkIssue::DestIndexOutOfRange {
                    index,
                    count: dest.element_count(),
                });
            }
        }

        let sent = if source_index.is_some() { 1 } else { self.element_count() };
        let received = if dest_index.is_some() { 1 } else { dest.element_count() };
        if sent != received {
            return Err(LinkIssue::ElementCountMismatch {
                from: sent,
                to: received,
            });
        }

        if dest.slot_occupied(dest_index) {
            return Err(LinkIssue::SlotOccupied);
        }

        Ok(())
    }

    /// Whether an inbound link already drives the given slot
    pub fn slot_occupied(&self, index: Option<usize>) -> bool {
        self.in_links
            .iter()
            .any(|slot| slot.index.is_none() || index.is_none() || slot.index == index)
    }

    /// Build the value a link carries from `value` into `dest`
    pub(crate) fn payload(
        &self,
        value: &Value,
        source_index: Option<usize>,
        dest: &Property,
        dest_index: Option<usize>,
    ) -> Result<Value, GraphError> {
        let sent = match source_index {
            Some(i) => value.element(i).cloned().map(Value::Scalar).ok_or_else(|| {
                GraphError::InvalidValue {
                    path: self.path.clone(),
                    reason: format!("no element at index {i}"),
                }
            })?,
            None => value.clone(),
        };

        let hints = ConversionHints {
            source_options: self.schema.options(),
            dest_options: dest.schema.options(),
        };
        let converted =
            convert_value(&sent, dest.kind(), hints).map_err(|error| GraphError::ConversionFailed {
                path: dest.path.clone(),
                error,
            })?;

        let expected = if dest_index.is_some() { 1 } else { dest.element_count() };
        converted
            .check(dest.kind(), expected)
            .map_err(|reason| GraphError::InvalidValue {
                path: dest.path.clone(),
                reason,
            })?;

        Ok(converted)
    }

    /// Replace the value and notify listeners
    pub(crate) fn store(&mut self, value: Value, raise_changed: bool) {
        self.value = value;
        if raise_changed {
            self.changed = true;
        }
        self.notify();
    }

    /// Write a link payload into the whole value or one element
    pub(crate) fn receive(&mut self, index: Option<usize>, payload: Value) {
        match (index, payload) {
            (Some(i), Value::Scalar(scalar)) => {
                if let Some(slot) = self.value.element_mut(i) {
                    *slot = scalar;
                }
            }
            (_, payload) => self.value = payload,
        }
        self.changed = true;
        self.notify();
    }

    /// Overwrite one element in place without raising `changed` or notifying
    pub(crate) fn write_element(&mut self, index: usize, scalar: Scalar) -> Result<(), GraphError> {
        if scalar.kind() != self.kind() {
            return Err(GraphError::InvalidValue {
                path: self.path.clone(),
                reason: format!("expected {} element, got {}", self.kind(), scalar.kind()),
            });
        }
        let count = self.element_count();
        let slot = self
            .value
            .element_mut(index)
            .ok_or_else(|| GraphError::InvalidValue {
                path: self.path.clone(),
                reason: format!("index {index} out of range for {count} elements"),
            })?;
        *slot = scalar;
        Ok(())
    }

    /// Flag as changed without altering the value
    pub(crate) fn mark_changed(&mut self) {
        self.changed = true;
        self.notify();
    }

    pub(crate) fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub(crate) fn attach_in_link(&mut self, link: LinkId, index: Option<usize>) {
        self.in_links.push(LinkSlot { link, index });
    }

    pub(crate) fn attach_out_link(&mut self, link: LinkId, index: Option<usize>) {
        self.out_links.push(LinkSlot { link, index });
    }

    pub(crate) fn detach_link(&mut self, link: LinkId) {
        self.in_links.retain(|slot| slot.link != link);
        self.out_links.retain(|slot| slot.link != link);
    }

    pub(crate) fn add_listener(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.insert(id, listener);
        id
    }

    pub(crate) fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.shift_remove(&id).is_some()
    }

    fn notify(&mut self) {
        let Self {
            listeners, value, ..
        } = self;
        for listener in listeners.values_mut() {
            listener(&*value);
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("key", &self.key)
            .field("path", &self.path)
            .field("direction", &self.direction)
            .field("kind", &self.schema.kind)
            .field("value", &self.value)
            .field("changed", &self.changed)
            .field("in_links", &self.in_links.len())
            .field("out_links", &self.out_links.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(key: &str, schema: PropertySchema) -> Property {
        Property::new(key, "A", Direction::Output, schema).unwrap()
    }

    fn input(key: &str, schema: PropertySchema) -> Property {
        Property::new(key, "B", Direction::Input, schema).unwrap()
    }

    #[test]
    fn test_path_and_default() {
        let property = output("num0", PropertySchema::number("Number 0", 42.0));
        assert_eq!(property.path(), "A.Number0");
        assert_eq!(property.value(), &Value::from(42.0));
        assert!(property.is_default());
        assert!(!property.changed());
    }

    #[test]
    fn test_link_checks() {
        let num = output("num0", PropertySchema::number("Number0", 0.0));
        let vec4 = output("vec4", PropertySchema::vector("Vec4", [0.0; 4]));
        let obj = output("obj", PropertySchema::object("Object"));
        let num_in = input("num0", PropertySchema::number("Number0", 0.0));
        let vec4_in = input("vec4", PropertySchema::vector("Vec4", [0.0; 4]));
        let vec3_in = input("vec3", PropertySchema::vector("Vec3", [0.0; 3]));

        assert!(num.can_link_to(&num_in, None, None));
        assert!(vec4.can_link_to(&num_in, Some(1), None));
        assert!(num.can_link_to(&vec4_in, None, Some(2)));
        assert!(vec4.can_link_to(&vec3_in, Some(0), Some(2)));

        assert_eq!(
            num_in.check_link_to(&num, None, None),
            Err(LinkIssue::Direction)
        );
        assert_eq!(
            vec4.check_link_to(&vec3_in, None, None),
            Err(LinkIssue::ElementCountMismatch { from: 4, to: 3 })
        );
        assert_eq!(
            vec4.check_link_to(&num_in, Some(4), None),
            Err(LinkIssue::SourceIndexOutOfRange { index: 4, count: 4 })
        );
        assert!(matches!(
            obj.check_link_to(&num_in, None, None),
            Err(LinkIssue::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_slot_occupancy() {
        let mut vec4_in = input("vec4", PropertySchema::vector("Vec4", [0.0; 4]));
        vec4_in.attach_in_link(LinkId::new(), Some(1));

        assert!(vec4_in.slot_occupied(Some(1)));
        assert!(!vec4_in.slot_occupied(Some(2)));
        assert!(vec4_in.slot_occupied(None));
    }

    #[test]
    fn test_receive_element() {
        let mut vec4_in = input("vec4", PropertySchema::vector("Vec4", [1.0, 2.0, 3.0, 4.0]));
        vec4_in.receive(Some(2), Value::from(789.0));
        assert_eq!(vec4_in.value(), &Value::from([1.0, 2.0, 789.0, 4.0]));
        assert!(vec4_in.changed());
    }

    #[test]
    fn test_write_element_rejects_wrong_kind() {
        let mut vec3 = output("vec3", PropertySchema::vector("Vec3", [0.0; 3]));
        assert!(vec3.write_element(0, Scalar::from("x")).is_err());
        assert!(vec3.write_element(3, Scalar::from(1.0)).is_err());
        assert!(vec3.write_element(2, Scalar::from(1.0)).is_ok());
        assert!(!vec3.changed());
    }

    #[test]
    fn test_listeners() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut property = output("num0", PropertySchema::number("Number0", 0.0));
        let sink = Rc::clone(&seen);
        let id = property.add_listener(Box::new(move |value| sink.borrow_mut().push(value.clone())));

        property.store(Value::from(1.0), true);
        assert!(property.remove_listener(id));
        property.store(Value::from(2.0), true);

        assert_eq!(*seen.borrow(), vec![Value::from(1.0)]);
    }
}
