//! Type Model Generation
//!
//! Builds the `TypeModel` from a `SchemaGraph`.
//!
//! Architecture:
//! - SchemaGraph: parsed documents, read-only except for each node's memo cell
//! - ReferenceResolver: turns `$ref` nodes into their targets
//! - Namer: deterministic identifiers and anonymous names
//! - Generator: one depth-first pass, records and aliases land in the model
//!
//! The key constraint: a node is resolved at most once. While a node is being
//! resolved it is marked in progress with a placeholder (the record pointer for
//! an object, the array's own name for an array, the dynamic type for a union),
//! and re-entering it yields that placeholder, which is what lets
//! self-referencing schemas terminate. A chain of `$ref`s that loops back on
//! itself has no placeholder and is an error. The node's memo only ever holds
//! the final type.

pub mod config;
pub mod model;
pub mod names;
pub mod types;

pub use config::{CodegenConfig, Convention, NamingConfig, StringFormat};
pub use model::{AdditionalType, Alias, Field, Struct, TypeModel, ADDITIONAL_PROPERTIES_FIELD, NOT_SERIALIZED};
pub use names::{to_identifier, Namer, ROOT_NAME};
pub use types::TypeRef;

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

use crate::error::{MappingError, Result};
use crate::graph::{AdditionalProperties, NodeId, PointerResolver, ReferenceResolver, SchemaGraph};

// =============================================================================
// Generator
// =============================================================================

/// Resolves schema nodes into records and aliases.
///
/// One generator runs one pass over one graph. Both the anonymous-name counter
/// and the nodes' memo cells are scoped to that pass.
pub struct Generator<'g, R: ReferenceResolver = PointerResolver> {
    graph: &'g SchemaGraph,
    resolver: R,
    namer: Namer,
    /// `format` -> custom string type
    formats: BTreeMap<String, StringFormat>,
    model: TypeModel,
    /// Nodes being resolved; `None` marks a bare `$ref` with nothing to stand in
    in_progress: HashMap<NodeId, Option<TypeRef>>,
    /// In-progress nodes whose placeholder was handed out
    reentered: HashSet<NodeId>,
}

impl<'g> Generator<'g, PointerResolver> {
    pub fn new(graph: &'g SchemaGraph, config: &CodegenConfig) -> Self {
        Self::with_resolver(graph, config, PointerResolver::new())
    }
}

impl<'g, R: ReferenceResolver> Generator<'g, R> {
    /// Use a custom reference resolver
    pub fn with_resolver(graph: &'g SchemaGraph, config: &CodegenConfig, resolver: R) -> Self {
        Self {
            graph,
            resolver,
            namer: Namer::new(&config.naming),
            formats: config.format_table(),
            model: TypeModel::new(),
            in_progress: HashMap::new(),
            reentered: HashSet::new(),
        }
    }

    /// Resolve every document root of the graph.
    ///
    /// A root that does not resolve to a record of its own name (an array, a
    /// collapsed map, a primitive, a union) is registered as an alias.
    pub fn create_types(&mut self) -> Result<()> {
        self.resolver.init(self.graph)?;

        for root in self.graph.roots() {
            let name = self.namer.schema_name("", self.graph, root);
            let root_type = self.resolve(&name, root)?;
            debug!(name = %name, ty = %root_type, "resolved root schema");

            if !root_type.is_pointer_to(&name) && self.model.get_alias(&name).is_none() {
                let node = self.graph.node(root);
                self.model.insert_alias(Alias {
                    name: name.clone(),
                    json_name: String::new(),
                    ty: root_type,
                    required: false,
                    description: node.description.clone(),
                    format: node.format.clone(),
                });
            }
        }

        if let Some(name) = self.model.collisions().first() {
            return Err(MappingError::NameCollision {
                name: name.to_string(),
            });
        }

        debug!(
            structs = self.model.structs.len(),
            aliases = self.model.aliases.len(),
            anonymous = self.namer.anonymous_count(),
            "type model complete"
        );
        Ok(())
    }

    /// Type of the schema at `id`, named `name` if it becomes a record or alias.
    ///
    /// Returns the memoized type when the node was already resolved, and the
    /// node's placeholder when it is still being resolved further up the stack.
    pub fn resolve(&mut self, name: &str, id: NodeId) -> Result<TypeRef> {
        if let Some(known) = self.known(id)? {
            return Ok(known);
        }

        let graph = self.graph;
        let node = graph.node(id);
        let (tags, union) = node.effective_types();
        let placeholder = match tags.first().copied() {
            _ if union => Some(TypeRef::Any),
            Some("object") => Some(TypeRef::pointer_to(name)?),
            Some("array") => Some(TypeRef::Named(name.to_string())),
            Some(other) => Some(TypeRef::primitive(other).unwrap_or(TypeRef::Any)),
            None if node.reference.is_empty() => Some(TypeRef::Any),
            None => None,
        };
        self.in_progress.insert(id, placeholder);

        // Definitions may be referenced from anywhere, so they go first
        self.resolve_definitions(id)?;

        let resolved = if tags.is_empty() {
            if node.reference.is_empty() {
                TypeRef::Any
            } else {
                self.resolve_reference(id)?
            }
        } else {
            let mut first = None;
            for tag in tags {
                let branch_name = if union {
                    format!("{}_{}", name, tag)
                } else {
                    name.to_string()
                };
                let ty = match tag {
                    "object" => self.resolve_object(&branch_name, id)?,
                    "array" => self.resolve_array(&branch_name, id)?,
                    other => TypeRef::primitive(other).ok_or_else(|| MappingError::UnknownType {
                        tag: other.to_string(),
                        sub_type: branch_name.clone(),
                    })?,
                };
                if !union {
                    first = Some(ty);
                    break;
                }
            }
            // Every union branch is registered, but callers only see a dynamic value
            first.unwrap_or(TypeRef::Any)
        };

        self.in_progress.remove(&id);
        self.reentered.remove(&id);
        let _ = node.generated_type.set(resolved.clone());
        Ok(resolved)
    }

    /// Final type or in-progress placeholder of `id`, if it has been reached before
    fn known(&mut self, id: NodeId) -> Result<Option<TypeRef>> {
        let graph = self.graph;
        if let Some(memo) = graph.node(id).generated_type.get() {
            trace!(node = %id, ty = %memo, "memo hit");
            return Ok(Some(memo.clone()));
        }
        match self.in_progress.get(&id) {
            None => Ok(None),
            Some(Some(placeholder)) => {
                trace!(node = %id, ty = %placeholder, "in progress");
                self.reentered.insert(id);
                Ok(Some(placeholder.clone()))
            }
            Some(None) => Err(MappingError::ReferenceCycle {
                path: self.resolver.path_for(graph, id),
            }),
        }
    }

    fn resolve_definitions(&mut self, id: NodeId) -> Result<()> {
        let graph = self.graph;
        for (key, &definition) in &graph.node(id).definitions {
            let name = self.namer.identifier(key);
            trace!(definition = %key, name = %name, "resolving definition");
            self.resolve(&name, definition)?;
        }
        Ok(())
    }

    fn resolve_reference(&mut self, id: NodeId) -> Result<TypeRef> {
        let graph = self.graph;
        let path = self.resolver.path_for(graph, id);
        let node = graph.node(id);
        if node.reference.is_empty() {
            return Err(MappingError::EmptyReference { path });
        }

        let target = self.resolver.resolve(graph, id).map_err(|e| match e {
            MappingError::BrokenReference { .. } => MappingError::BrokenReference {
                path: path.clone(),
                reference: node.reference.clone(),
            },
            other => other,
        })?;
        trace!(reference = %node.reference, target = %target, "followed reference");

        match self.known(target)? {
            Some(known) => Ok(known),
            None => {
                // Named as if it had been reached directly
                let name = self.namer.schema_name("", graph, target);
                self.resolve(&name, target)
            }
        }
    }

    fn resolve_object(&mut self, name: &str, id: NodeId) -> Result<TypeRef> {
        let pointer = TypeRef::pointer_to(name)?;
        let graph = self.graph;
        let node = graph.node(id);
        let mut record = Struct::new(node.schema_id(), name, node.description.clone());

        for (key, &prop) in &node.properties {
            let field_name = self.namer.identifier(key);
            let sub_name = self.namer.schema_name(&field_name, graph, prop);
            let ty = self.resolve(&sub_name, prop)?;
            let prop_node = graph.node(prop);

            let field = Field {
                name: field_name,
                json_name: key.clone(),
                ty,
                required: node.is_required(key),
                description: prop_node.description.clone(),
                format: prop_node.format.clone(),
            };
            if field.ty == TypeRef::String && !field.format.is_empty() {
                if let Some(custom) = self.formats.get(&field.format) {
                    record.add_import(&custom.package);
                }
            }
            if field.required {
                record.generate_code = true;
            }
            record.add_field(field);
        }

        match node.additional_properties {
            AdditionalProperties::Schema(extra) => {
                let extra_name = self.namer.schema_name("", graph, extra);
                let value_type = self.resolve(&extra_name, extra)?;
                let map_type = TypeRef::map_of(value_type.clone());

                // A bare map needs no record, unless it is a named definition
                if node.properties.is_empty() && !node.is_definition() {
                    trace!(name = %name, ty = %map_type, "collapsed object to map");
                    return Ok(map_type);
                }
                record.add_field(hidden_field(map_type));
                record.generate_code = true;
                record.additional_type = Some(AdditionalType::Typed(value_type));
            }
            AdditionalProperties::Bool(true) => {
                record.add_field(hidden_field(TypeRef::map_of(TypeRef::Any)));
                record.generate_code = true;
                record.additional_type = Some(AdditionalType::Typed(TypeRef::Any));
            }
            AdditionalProperties::Bool(false) => {
                record.generate_code = true;
                record.additional_type = Some(AdditionalType::Forbidden);
            }
            AdditionalProperties::Absent => {}
        }

        trace!(name = %name, fields = record.fields.len(), "registered record");
        self.model.insert_struct(record);
        Ok(pointer)
    }

    fn resolve_array(&mut self, name: &str, id: NodeId) -> Result<TypeRef> {
        let graph = self.graph;
        let node = graph.node(id);
        let Some(items) = node.items else {
            return Ok(TypeRef::Array(Box::new(TypeRef::Any)));
        };

        let item_name = self.namer.schema_name(&format!("{}Items", name), graph, items);
        let item_type = self.resolve(&item_name, items)?;
        let array_type = TypeRef::array_of(item_type, name)?;

        // Root arrays get a name of their own, as do arrays that contain themselves
        let self_referencing = self.reentered.contains(&id)
            && matches!(self.in_progress.get(&id), Some(Some(TypeRef::Named(n))) if n == name);
        if node.is_root() || self_referencing {
            self.model.insert_alias(Alias {
                name: name.to_string(),
                json_name: String::new(),
                ty: array_type.clone(),
                required: node.is_required(name),
                description: node.description.clone(),
                format: node.format.clone(),
            });
        }
        Ok(array_type)
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    pub fn into_model(self) -> TypeModel {
        self.model
    }
}

fn hidden_field(ty: TypeRef) -> Field {
    Field {
        name: ADDITIONAL_PROPERTIES_FIELD.to_string(),
        json_name: NOT_SERIALIZED.to_string(),
        ty,
        required: false,
        description: String::new(),
        format: String::new(),
    }
}

/// Run a full pass over `graph` with the default resolver.
pub fn build_model(graph: &SchemaGraph, config: &CodegenConfig) -> Result<TypeModel> {
    let mut generator = Generator::new(graph, config);
    generator.create_types()?;
    Ok(generator.into_model())
}
