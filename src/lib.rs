//! Schema Index Mapping
//!
//! Builds a statically-typed data model from JSON Schema documents, then
//! derives search-index mappings from that model so that generated record
//! types and the index mapping always describe the same shapes.
//!
//! ## Pipeline
//!
//! ```text
//! *.json ──► graph::loader ──► SchemaGraph
//!                                 │
//!                                 ▼
//!              codegen::Generator (ReferenceResolver + Namer)
//!                                 │
//!                                 ▼
//!                             TypeModel
//!                                 │
//!                                 ▼
//!                       mapping::MappingRenderer ──► module text
//! ```
//!
//! ## Example
//!
//! ```
//! use schema_index_mapping::{build_model, CodegenConfig, MappingRenderer, RenderConfig, SchemaGraph};
//! use serde_json::json;
//!
//! let mut graph = SchemaGraph::new();
//! graph.add_document("person.json", &json!({
//!     "title": "Person",
//!     "type": "object",
//!     "properties": { "name": { "type": "string" } }
//! })).unwrap();
//!
//! let model = build_model(&graph, &CodegenConfig::default()).unwrap();
//! let config = RenderConfig::default();
//! let mappings = MappingRenderer::new(&model, &config).render();
//! assert_eq!(mappings[0].mapping["properties"]["name"]["type"], "keyword");
//! ```

pub mod checksum;
pub mod codegen;
pub mod config;
pub mod error;
pub mod graph;
pub mod mapping;

pub use checksum::Checksum;
pub use codegen::{
    build_model, AdditionalType, Alias, CodegenConfig, Field, Generator, NamingConfig, Struct,
    TypeModel, TypeRef,
};
pub use config::GeneratorConfig;
pub use error::{MappingError, Result};
pub use graph::{load_paths, LoadedBundle, NodeId, PointerResolver, ReferenceResolver, SchemaGraph};
pub use mapping::{EsType, MappingRenderer, RecordMapping, RenderConfig};
