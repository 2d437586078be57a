// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed property dataflow graph for `PropFlow`.
//!
//! Components own named, typed input and output properties. Links carry a
//! value from an output to an input the moment the output is written, with
//! type conversion and per-element addressing. A [`System`] updates
//! components in dependency order once per tick.
//!
//! ## Architecture
//!
//! The framework is built on an arena graph model with:
//! - Typed property schemas and values
//! - Link validation and immediate propagation
//! - Topological update ordering with cycle reporting
//! - Serialization support

pub mod component;
pub mod document;
pub mod error;
pub mod graph;
pub mod library;
pub mod link;
pub mod node;
pub mod property;
pub mod property_set;
pub mod schema;
pub mod settings;
pub mod system;
pub mod value;

pub use component::{Behavior, Component, ComponentId, ComponentRegistry, ComponentState, Declared};
pub use document::{DocumentError, GraphDocument};
pub use error::{GraphError, GraphResult, LinkIssue};
pub use graph::Graph;
pub use library::create_standard_registry;
pub use link::{Link, LinkId, PropertyRef};
pub use node::{Node, NodeId};
pub use property::{Direction, ListenerId, Property};
pub use property_set::PropertySet;
pub use schema::PropertySchema;
pub use settings::{CyclePolicy, SystemSettings};
pub use system::{FrameInfo, System, TickReport, UpdateContext};
pub use value::{ConversionError, ConversionHints, Scalar, Value, ValueKind};
