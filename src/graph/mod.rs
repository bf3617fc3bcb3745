//! Schema Node Graph
//!
//! Parsed JSON Schema documents stored in a single arena. Every sub-schema is a
//! `SchemaNode` addressed by `NodeId`; parent links are plain arena indexes, so a
//! child never owns or outlives the tree it belongs to.
//!
//! The graph is read-only to the type resolution engine except for the
//! write-once `generated_type` memo on each node. The memo holds a node's final
//! type and keeps a node referenced by several `$ref`s from being processed
//! twice; cycles are broken by the generator's own in-progress placeholders.
//! Because the memo is never reset, a graph must not be reused across two
//! resolution passes; load it again instead.

pub mod loader;
pub mod resolver;

pub use loader::{load_paths, LoadedBundle};
pub use resolver::{PointerResolver, ReferenceResolver};

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::codegen::TypeRef;

/// Index of a node inside a `SchemaGraph`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// The three ways `additionalProperties` can appear on an object schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdditionalProperties {
    /// Keyword not present
    #[default]
    Absent,
    /// `true` (anything goes) or `false` (no extra keys)
    Bool(bool),
    /// A typed sub-schema describing every extra value
    Schema(NodeId),
}

/// One parsed unit of a JSON Schema document.
#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    /// `$id` (or draft-04 `id`)
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub format: String,
    /// Key used to reach this node from its parent (property or definition name)
    pub json_key: String,
    /// Structural path segment: `#`, `definitions/<key>`, `properties/<key>`, `items`, `additionalProperties`
    pub path_element: String,
    /// JSON pointer from the document root, e.g. `#/definitions/address`
    pub pointer: String,
    /// Index into `SchemaGraph::documents`
    pub document: usize,
    pub parent: Option<NodeId>,
    pub properties: BTreeMap<String, NodeId>,
    pub items: Option<NodeId>,
    pub required: BTreeSet<String>,
    pub additional_properties: AdditionalProperties,
    pub definitions: BTreeMap<String, NodeId>,
    /// `$ref`, empty when absent
    pub reference: String,
    /// Declared type tags, in document order
    pub schema_types: Vec<String>,
    /// Resolved type, written once by the generator
    pub generated_type: OnceCell<TypeRef>,
}

impl SchemaNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether the node sits directly under a `definitions` (or `$defs`) block
    pub fn is_definition(&self) -> bool {
        self.path_element.starts_with("definitions") || self.path_element.starts_with("$defs")
    }

    pub fn is_required(&self, property: &str) -> bool {
        self.required.contains(property)
    }

    /// Record/ID string for the node: `$id` when declared, JSON pointer otherwise.
    pub fn schema_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.pointer)
    }

    /// Declared type tags after filling in a missing `type`.
    ///
    /// A schema without `type` but with properties (and no `$ref`) is an object;
    /// one with `items` is an array. The bool is true for a genuine union.
    pub fn effective_types(&self) -> (Vec<&str>, bool) {
        if self.schema_types.is_empty() {
            if self.reference.is_empty() && !self.properties.is_empty() {
                return (vec!["object"], false);
            }
            if self.items.is_some() {
                return (vec!["array"], false);
            }
            return (Vec::new(), false);
        }
        let types: Vec<&str> = self.schema_types.iter().map(String::as_str).collect();
        let union = types.len() > 1;
        (types, union)
    }
}

/// A loaded document: where it came from and its root node.
#[derive(Debug, Clone)]
pub struct Document {
    /// Base name the document was registered under (usually its path)
    pub base: String,
    pub root: NodeId,
}

/// Arena of schema nodes across every loaded document.
#[derive(Debug, Default)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    documents: Vec<Document>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<&SchemaNode> {
        self.node(id).parent.map(|p| self.node(p))
    }

    pub fn document(&self, index: usize) -> &Document {
        &self.documents[index]
    }

    /// Document that owns `id`
    pub fn document_of(&self, id: NodeId) -> &Document {
        self.document(self.node(id).document)
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Root node of every document, in load order
    pub fn roots(&self) -> Vec<NodeId> {
        self.documents.iter().map(|d| d.root).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub(crate) fn push_node(&mut self, node: SchemaNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    pub(crate) fn push_document(&mut self, document: Document) -> usize {
        self.documents.push(document);
        self.documents.len() - 1
    }
}
