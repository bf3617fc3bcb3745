//! Reference Resolution
//!
//! The generator only sees `ReferenceResolver`: initialize once, then turn a
//! `$ref` node into its target node. `PointerResolver` is the default: it
//! indexes every node by (document, JSON pointer) plus any declared `$id`.
//! A reference without a document part stays inside the referencing document;
//! a document part matches a document base, its file name, or a root `$id`.

use std::collections::HashMap;
use tracing::trace;

use super::{NodeId, SchemaGraph};
use crate::error::{MappingError, Result};

/// Contract the type resolution engine consumes.
pub trait ReferenceResolver {
    /// Build lookup tables. Must be called once before any `resolve`.
    fn init(&mut self, graph: &SchemaGraph) -> Result<()>;

    /// Target of the `$ref` held by `node`.
    fn resolve(&self, graph: &SchemaGraph, node: NodeId) -> Result<NodeId>;

    /// Human-readable location of `node`, for error messages only.
    fn path_for(&self, graph: &SchemaGraph, node: NodeId) -> String {
        let doc = graph.document_of(node);
        format!("{}{}", doc.base, graph.node(node).pointer)
    }
}

/// Resolves `$ref`s through JSON pointers and `$id`s.
#[derive(Debug, Default)]
pub struct PointerResolver {
    /// (document index, `#<pointer>`) -> node
    pointers: HashMap<(usize, String), NodeId>,
    /// declared `$id` of a sub-schema -> node
    ids: HashMap<String, NodeId>,
    /// document key -> document index; keys are the base, its file name and root `$id`
    documents: HashMap<String, usize>,
    initialized: bool,
}

impl PointerResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, document: usize, pointer: &str) -> Option<NodeId> {
        self.pointers.get(&(document, pointer.to_string())).copied()
    }

    fn find_document(&self, reference: &str) -> Option<usize> {
        let trimmed = reference.trim_start_matches("./");
        self.documents
            .get(trimmed)
            .or_else(|| self.documents.get(file_name(trimmed)))
            .copied()
    }
}

impl ReferenceResolver for PointerResolver {
    fn init(&mut self, graph: &SchemaGraph) -> Result<()> {
        self.pointers.clear();
        self.ids.clear();
        self.documents.clear();

        for (index, doc) in graph.documents().iter().enumerate() {
            let base = doc.base.trim_start_matches("./");
            self.documents.entry(base.to_string()).or_insert(index);
            self.documents.entry(file_name(base).to_string()).or_insert(index);
            if let Some(id) = &graph.node(doc.root).id {
                let id = id.trim_end_matches('#');
                self.documents.entry(id.to_string()).or_insert(index);
                self.documents.entry(file_name(id).to_string()).or_insert(index);
            }
        }

        for id in graph.node_ids() {
            let node = graph.node(id);
            self.pointers.insert((node.document, node.pointer.clone()), id);
            // Sub-schemas may declare their own `$id` and be referenced by it
            if let (Some(declared), false) = (&node.id, node.is_root()) {
                self.ids.insert(declared.clone(), id);
            }
        }

        self.initialized = true;
        trace!(
            pointers = self.pointers.len(),
            ids = self.ids.len(),
            "reference index built"
        );
        Ok(())
    }

    fn resolve(&self, graph: &SchemaGraph, node: NodeId) -> Result<NodeId> {
        if !self.initialized {
            return Err(MappingError::ResolverNotInitialized);
        }
        let reference = graph.node(node).reference.as_str();

        let broken = || MappingError::BrokenReference {
            path: self.path_for(graph, node),
            reference: reference.to_string(),
        };

        if let Some(&target) = self.ids.get(reference) {
            return Ok(target);
        }

        let (document_part, fragment) = match reference.split_once('#') {
            Some((doc, frag)) => (doc, frag),
            None => (reference, ""),
        };
        let document = if document_part.is_empty() {
            graph.node(node).document
        } else {
            self.find_document(document_part).ok_or_else(broken)?
        };
        let pointer = format!("#{}", fragment.trim_end_matches('/'));

        self.lookup(document, &pointer).ok_or_else(broken)
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
