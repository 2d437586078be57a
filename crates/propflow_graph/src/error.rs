// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the property graph.

use crate::component::ComponentId;
use crate::node::NodeId;
use crate::value::{ConversionError, ValueKind};

/// Why a link between two properties was refused
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkIssue {
    /// Links run from an output to an input
    #[error("links must run from an output to an input")]
    Direction,

    /// No conversion exists between the two kinds
    #[error("no conversion from {from} to {to}")]
    TypeMismatch {
        /// Source kind
        from: ValueKind,
        /// Destination kind
        to: ValueKind,
    },

    /// Source element index out of range
    #[error("source index {index} out of range for {count} elements")]
    SourceIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Source element count
        count: usize,
    },

    /// Destination element index out of range
    #[error("destination index {index} out of range for {count} elements")]
    DestIndexOutOfRange {
        /// Requested index
        index: usize,
        /// Destination element count
        count: usize,
    },

    /// The transported element counts differ
    #[error("element count mismatch: {from} vs {to}")]
    ElementCountMismatch {
        /// Elements read from the source
        from: usize,
        /// Elements written to the destination
        to: usize,
    },

    /// The destination slot is already driven by another link
    #[error("destination slot is already linked")]
    SlotOccupied,
}

/// Errors raised by graph operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Link refused
    #[error("cannot link '{from}' to '{to}': {issue}")]
    LinkIncompatible {
        /// Source property path
        from: String,
        /// Destination property path
        to: String,
        /// Reason
        issue: LinkIssue,
    },

    /// Value has the wrong kind or arity
    #[error("invalid value for '{path}': {reason}")]
    InvalidValue {
        /// Property path
        path: String,
        /// Reason
        reason: String,
    },

    /// Conversion across a link failed
    #[error("conversion into '{path}' failed: {error}")]
    ConversionFailed {
        /// Destination property path
        path: String,
        /// Underlying conversion error
        error: ConversionError,
    },

    /// Links form a cycle
    #[error("cyclic dependency: {} of {} components could not be ordered", unresolved.len(), resolved.len() + unresolved.len())]
    CyclicDependency {
        /// Components ordered before the cycle blocked progress
        resolved: Vec<ComponentId>,
        /// Components on or behind a cycle, in insertion order
        unresolved: Vec<ComponentId>,
    },

    /// Undeclared property key
    #[error("'{owner}' has no property '{key}'")]
    UnknownProperty {
        /// Owning component name
        owner: String,
        /// Requested key
        key: String,
    },

    /// Key declared twice in the same set
    #[error("'{owner}' already declares '{key}'")]
    DuplicateProperty {
        /// Owning component name
        owner: String,
        /// Duplicate key
        key: String,
    },

    /// Schema is internally inconsistent
    #[error("invalid schema for '{name}': {reason}")]
    InvalidSchema {
        /// Human readable property name
        name: String,
        /// Reason
        reason: String,
    },

    /// Component not found
    #[error("Component not found: {0:?}")]
    UnknownComponent(ComponentId),

    /// Node not found
    #[error("Node not found: {0:?}")]
    UnknownNode(NodeId),

    /// No factory registered for a component type
    #[error("unknown component type '{0}'")]
    UnknownComponentType(String),

    /// Error raised by a component's own logic
    #[error("{0}")]
    Custom(String),
}

/// Result alias for graph operations
pub type GraphResult<T> = Result<T, GraphError>;
