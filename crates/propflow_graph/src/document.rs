// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph documents: a serializable description of nodes, components,
//! input values and links.
//!
//! Links are stored by property path, so component names must be unique
//! within a document for links to resolve to the intended property.

use crate::component::ComponentRegistry;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::property::Direction;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Current document format version
pub const DOCUMENT_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    DOCUMENT_FORMAT_VERSION
}

/// Serializable description of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Format version
    #[serde(default = "default_version")]
    pub version: u32,
    /// Graph name
    pub name: String,
    /// Nodes in creation order
    #[serde(default)]
    pub nodes: Vec<NodeDocument>,
    /// Links in creation order
    #[serde(default)]
    pub links: Vec<LinkDocument>,
}

/// A node and its components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Node name
    pub name: String,
    /// Components in creation order
    #[serde(default)]
    pub components: Vec<ComponentDocument>,
}

/// A component instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDocument {
    /// Registered type name
    pub type_name: String,
    /// Explicit name, when it differs from the node name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Input values that differ from their defaults
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub ins: IndexMap<String, Value>,
}

/// A link between two property paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDocument {
    /// Source output path
    pub from: String,
    /// Source element index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_index: Option<usize>,
    /// Destination input path
    pub to: String,
    /// Destination element index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_index: Option<usize>,
}

/// Errors raised while reading, writing or instantiating documents
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON text could not be parsed
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON text could not be written
    #[error("RON write error: {0}")]
    RonWrite(#[from] ron::Error),

    /// JSON text could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rebuilding the graph failed
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A link path matches no property
    #[error("no property at path '{0}'")]
    UnresolvedPath(String),

    /// Document written by a newer version
    #[error("document version {0} is newer than supported version {DOCUMENT_FORMAT_VERSION}")]
    UnsupportedVersion(u32),
}

impl GraphDocument {
    /// Create an empty document
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: DOCUMENT_FORMAT_VERSION,
            name: name.into(),
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Capture a graph; linked and event inputs are left out since they are not state
    pub fn from_graph(graph: &Graph) -> Self {
        let mut names = HashSet::new();
        let mut nodes = Vec::with_capacity(graph.node_count());

        for node in graph.nodes() {
            let mut components = Vec::with_capacity(node.components().len());
            for component in node.components().iter().filter_map(|id| graph.component(*id).ok()) {
                if !names.insert(component.name().to_string()) {
                    tracing::warn!(
                        "Component name '{}' is not unique; links may not resolve on load",
                        component.name()
                    );
                }

                let ins = component
                    .ins()
                    .iter()
                    .filter(|p| !p.has_in_links() && !p.is_event() && !p.is_default())
                    .map(|p| (p.key().to_string(), p.value().clone()))
                    .collect();

                components.push(ComponentDocument {
                    type_name: component.type_name().to_string(),
                    name: (component.name() != node.name).then(|| component.name().to_string()),
                    ins,
                });
            }
            nodes.push(NodeDocument {
                name: node.name.clone(),
                components,
            });
        }

        let links = graph
            .links()
            .filter_map(|link| {
                let from = graph.property(link.source).ok()?;
                let to = graph.property(link.dest).ok()?;
                Some(LinkDocument {
                    from: from.path().to_string(),
                    from_index: link.source_index,
                    to: to.path().to_string(),
                    to_index: link.dest_index,
                })
            })
            .collect();

        Self {
            version: DOCUMENT_FORMAT_VERSION,
            name: graph.name.clone(),
            nodes,
            links,
        }
    }

    /// Build a graph, creating components through `registry`
    pub fn instantiate(&self, registry: &ComponentRegistry) -> Result<Graph, DocumentError> {
        if self.version > DOCUMENT_FORMAT_VERSION {
            return Err(DocumentError::UnsupportedVersion(self.version));
        }

        let mut graph = Graph::new(self.name.clone());
        for node in &self.nodes {
            let node_id = graph.create_node(node.name.clone());
            for component in &node.components {
                let behavior = registry.create(&component.type_name)?;
                let id = graph.create_boxed_component(node_id, component.name.clone(), behavior)?;
                graph.set_values(
                    id,
                    Direction::Input,
                    component.ins.iter().map(|(key, value)| (key.as_str(), value.clone())),
                )?;
            }
        }

        for link in &self.links {
            let from = graph
                .find_output(&link.from)
                .ok_or_else(|| DocumentError::UnresolvedPath(link.from.clone()))?;
            let to = graph
                .find_input(&link.to)
                .ok_or_else(|| DocumentError::UnresolvedPath(link.to.clone()))?;
            graph.link(from, to, link.from_index, link.to_index)?;
        }

        tracing::info!(
            "Instantiated graph '{}': {} components, {} links",
            graph.name,
            graph.component_count(),
            graph.link_count()
        );
        Ok(graph)
    }

    /// Parse a RON document
    pub fn from_ron_str(content: &str) -> Result<Self, DocumentError> {
        Ok(ron::from_str(content)?)
    }

    /// Write as pretty RON
    pub fn to_ron_string(&self) -> Result<String, DocumentError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Write as pretty JSON
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a file; `.json` files are read as JSON, anything else as RON
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json_str(&content)
        } else {
            Self::from_ron_str(&content)
        }
    }

    /// Save to a file, picking the format from the extension like [`GraphDocument::load`]
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let content = if is_json(path) {
            self.to_json_string()?
        } else {
            self.to_ron_string()?
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::create_standard_registry;
    use crate::system::System;

    fn sample_document() -> GraphDocument {
        let mut doc = GraphDocument::new("Sample");
        doc.nodes.push(NodeDocument {
            name: "Math".to_string(),
            components: vec![
                ComponentDocument {
                    type_name: "Add".to_string(),
                    name: Some("First".to_string()),
                    ins: IndexMap::from([
                        ("a".to_string(), Value::from(2.0)),
                        ("b".to_string(), Value::from(3.0)),
                    ]),
                },
                ComponentDocument {
                    type_name: "Add".to_string(),
                    name: Some("Second".to_string()),
                    ins: IndexMap::from([("b".to_string(), Value::from(10.0))]),
                },
            ],
        });
        doc.links.push(LinkDocument {
            from: "First.Sum".to_string(),
            from_index: None,
            to: "Second.A".to_string(),
            to_index: None,
        });
        doc
    }

    #[test]
    fn test_instantiate_and_run() {
        let graph = sample_document()
            .instantiate(&create_standard_registry())
            .unwrap();
        assert_eq!(graph.component_count(), 2);
        assert_eq!(graph.link_count(), 1);

        let mut system = System::new(graph);
        system.tick(0.0).unwrap();

        let out = system.graph().find_output("Second.Sum").unwrap();
        assert_eq!(system.graph().value(out).unwrap().as_number(), Some(15.0));
    }

    #[test]
    fn test_capture_matches_source() {
        let graph = sample_document()
            .instantiate(&create_standard_registry())
            .unwrap();
        assert_eq!(GraphDocument::from_graph(&graph), sample_document());
    }

    #[test]
    fn test_ron_text_round_trip() {
        let text = sample_document().to_ron_string().unwrap();
        assert_eq!(GraphDocument::from_ron_str(&text).unwrap(), sample_document());
    }

    #[test]
    fn test_json_text_round_trip() {
        let text = sample_document().to_json_string().unwrap();
        assert_eq!(GraphDocument::from_json_str(&text).unwrap(), sample_document());
    }

    #[test]
    fn test_unresolved_link_path() {
        let mut doc = sample_document();
        doc.links[0].to = "Nowhere.A".to_string();
        let result = doc.instantiate(&create_standard_registry());
        assert!(matches!(result, Err(DocumentError::UnresolvedPath(path)) if path == "Nowhere.A"));
    }

    #[test]
    fn test_unknown_type() {
        let mut doc = sample_document();
        doc.nodes[0].components[0].type_name = "Teleporter".to_string();
        let result = doc.instantiate(&create_standard_registry());
        assert!(matches!(
            result,
            Err(DocumentError::Graph(GraphError::UnknownComponentType(_)))
        ));
    }

    #[test]
    fn test_newer_version_rejected() {
        let mut doc = sample_document();
        doc.version = DOCUMENT_FORMAT_VERSION + 1;
        assert!(matches!(
            doc.instantiate(&create_standard_registry()),
            Err(DocumentError::UnsupportedVersion(_))
        ));
    }
}
