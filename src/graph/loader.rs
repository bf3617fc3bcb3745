//! Schema Loading
//!
//! Parses JSON documents into the `SchemaGraph` arena: sets parent links, JSON
//! keys, structural path elements and JSON pointers for every sub-schema.
//! Only the keywords the type model understands are read; the rest is ignored.

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::{AdditionalProperties, Document, NodeId, SchemaGraph, SchemaNode};
use crate::checksum::Checksum;
use crate::error::{MappingError, Result};

/// A graph loaded from disk together with the checksum of its sources
#[derive(Debug)]
pub struct LoadedBundle {
    pub graph: SchemaGraph,
    pub checksum: Checksum,
    /// Files in load order
    pub files: Vec<PathBuf>,
}

/// Load every schema file named by `paths`.
///
/// Directories are walked recursively for `*.json` files, sorted by path so
/// that document order (and therefore anonymous naming) is stable.
pub fn load_paths<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedBundle> {
    let mut files = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
                .map(|e| e.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.to_path_buf());
        }
    }

    let mut contents = Vec::with_capacity(files.len());
    for file in &files {
        contents.push(fs::read_to_string(file)?);
    }
    let checksum = Checksum::of_documents(contents.iter().map(String::as_str));

    let mut graph = SchemaGraph::new();
    for (file, content) in files.iter().zip(&contents) {
        let base = file.to_string_lossy().replace('\\', "/");
        graph.add_document_str(&base, content)?;
    }

    debug!(
        files = files.len(),
        nodes = graph.node_count(),
        checksum = %checksum.short(),
        "loaded schema bundle"
    );

    Ok(LoadedBundle { graph, checksum, files })
}

/// Where a sub-schema sits relative to its parent
struct Placement {
    parent: Option<NodeId>,
    json_key: String,
    path_element: String,
    pointer: String,
}

impl SchemaGraph {
    /// Parse `text` and add it as a new document registered under `base`.
    pub fn add_document_str(&mut self, base: &str, text: &str) -> Result<NodeId> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| MappingError::invalid(base, format!("failed to parse JSON: {}", e)))?;
        self.add_document(base, &value)
    }

    /// Add an already-parsed schema document registered under `base`.
    pub fn add_document(&mut self, base: &str, value: &Value) -> Result<NodeId> {
        let document = self.documents().len();
        let root = self.insert(
            value,
            document,
            Placement {
                parent: None,
                json_key: String::new(),
                path_element: "#".to_string(),
                pointer: "#".to_string(),
            },
        )
        .map_err(|e| match e {
            MappingError::InvalidSchema { path, message } => MappingError::InvalidSchema {
                path: format!("{}{}", base, path),
                message,
            },
            other => other,
        })?;
        self.push_document(Document {
            base: base.to_string(),
            root,
        });
        debug!(base, root = %root, "added schema document");
        Ok(root)
    }

    fn insert(&mut self, value: &Value, document: usize, place: Placement) -> Result<NodeId> {
        // Boolean schemas (`true` / `false`) carry no keywords the model reads
        let map = match value {
            Value::Object(map) => Some(map),
            Value::Bool(_) => None,
            other => {
                return Err(MappingError::invalid(
                    &place.pointer,
                    format!("expected a schema object, found {}", json_kind(other)),
                ))
            }
        };

        let pointer = place.pointer.clone();
        let mut node = SchemaNode {
            json_key: place.json_key,
            path_element: place.path_element,
            pointer: place.pointer,
            document,
            parent: place.parent,
            ..Default::default()
        };
        if let Some(map) = map {
            node.id = string_field(map, "$id").or_else(|| string_field(map, "id"));
            node.title = string_field(map, "title").unwrap_or_default();
            node.description = string_field(map, "description").unwrap_or_default();
            node.format = string_field(map, "format").unwrap_or_default();
            node.reference = string_field(map, "$ref").unwrap_or_default();
            node.schema_types = parse_types(map.get("type"), &pointer)?;
            node.required = parse_required(map.get("required"), &pointer)?;
        }
        let id = self.push_node(node);

        let Some(map) = map else {
            return Ok(id);
        };

        for keyword in ["definitions", "$defs"] {
            let Some(defs) = map.get(keyword) else { continue };
            for (key, sub) in object_field(defs, &pointer, keyword)? {
                let child = self.insert(
                    sub,
                    document,
                    Placement {
                        parent: Some(id),
                        json_key: key.clone(),
                        path_element: format!("{}/{}", keyword, key),
                        pointer: format!("{}/{}/{}", pointer, keyword, escape_pointer(key)),
                    },
                )?;
                self.node_mut(id).definitions.insert(key.clone(), child);
            }
        }

        if let Some(props) = map.get("properties") {
            for (key, sub) in object_field(props, &pointer, "properties")? {
                let child = self.insert(
                    sub,
                    document,
                    Placement {
                        parent: Some(id),
                        json_key: key.clone(),
                        path_element: format!("properties/{}", key),
                        pointer: format!("{}/properties/{}", pointer, escape_pointer(key)),
                    },
                )?;
                self.node_mut(id).properties.insert(key.clone(), child);
            }
        }

        match map.get("items") {
            None => {}
            Some(Value::Array(_)) => {
                return Err(MappingError::invalid(
                    format!("{}/items", pointer),
                    "tuple-form items are not supported",
                ))
            }
            Some(items) => {
                let child = self.insert(
                    items,
                    document,
                    Placement {
                        parent: Some(id),
                        json_key: String::new(),
                        path_element: "items".to_string(),
                        pointer: format!("{}/items", pointer),
                    },
                )?;
                self.node_mut(id).items = Some(child);
            }
        }

        let additional = match map.get("additionalProperties") {
            None => AdditionalProperties::Absent,
            Some(Value::Bool(allowed)) => AdditionalProperties::Bool(*allowed),
            Some(sub @ Value::Object(_)) => AdditionalProperties::Schema(self.insert(
                sub,
                document,
                Placement {
                    parent: Some(id),
                    json_key: String::new(),
                    path_element: "additionalProperties".to_string(),
                    pointer: format!("{}/additionalProperties", pointer),
                },
            )?),
            Some(other) => {
                return Err(MappingError::invalid(
                    format!("{}/additionalProperties", pointer),
                    format!("expected a boolean or a schema, found {}", json_kind(other)),
                ))
            }
        };
        self.node_mut(id).additional_properties = additional;

        Ok(id)
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn object_field<'a>(value: &'a Value, pointer: &str, keyword: &str) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        MappingError::invalid(
            format!("{}/{}", pointer, keyword),
            format!("expected an object, found {}", json_kind(value)),
        )
    })
}

fn parse_types(value: Option<&Value>, pointer: &str) -> Result<Vec<String>> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::String(tag)) => Ok(vec![tag.clone()]),
        Some(Value::Array(tags)) => tags
            .iter()
            .map(|t| {
                t.as_str().map(str::to_string).ok_or_else(|| {
                    MappingError::invalid(format!("{}/type", pointer), "type tags must be strings")
                })
            })
            .collect(),
        Some(other) => Err(MappingError::invalid(
            format!("{}/type", pointer),
            format!("expected a string or an array, found {}", json_kind(other)),
        )),
    }
}

fn parse_required(value: Option<&Value>, pointer: &str) -> Result<std::collections::BTreeSet<String>> {
    match value {
        None => Ok(Default::default()),
        Some(Value::Array(names)) => names
            .iter()
            .map(|n| {
                n.as_str().map(str::to_string).ok_or_else(|| {
                    MappingError::invalid(format!("{}/required", pointer), "required entries must be strings")
                })
            })
            .collect(),
        // draft-03 style `"required": true` on the property itself; not modeled
        Some(Value::Bool(_)) => Ok(Default::default()),
        Some(other) => Err(MappingError::invalid(
            format!("{}/required", pointer),
            format!("expected an array, found {}", json_kind(other)),
        )),
    }
}

/// Escape a key for use as a JSON pointer segment (RFC 6901)
pub(crate) fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parent_links_and_keys() {
        let mut graph = SchemaGraph::new();
        let root = graph
            .add_document(
                "person.json",
                &json!({
                    "title": "Person",
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "name": { "type": "string" },
                        "pets": { "type": "array", "items": { "type": "object" } }
                    }
                }),
            )
            .unwrap();

        let person = graph.node(root);
        assert!(person.is_root());
        assert_eq!(person.pointer, "#");
        assert!(person.is_required("name"));
        assert!(!person.is_required("pets"));

        let pets = person.properties["pets"];
        assert_eq!(graph.node(pets).json_key, "pets");
        assert_eq!(graph.node(pets).parent, Some(root));
        assert_eq!(graph.node(pets).path_element, "properties/pets");

        let item = graph.node(pets).items.unwrap();
        assert_eq!(graph.node(item).json_key, "");
        assert_eq!(graph.node(item).pointer, "#/properties/pets/items");
        assert_eq!(graph.parent(item).unwrap().json_key, "pets");
    }

    #[test]
    fn test_additional_properties_variants() {
        let mut graph = SchemaGraph::new();
        let root = graph
            .add_document(
                "doc.json",
                &json!({
                    "properties": {
                        "open": { "type": "object", "additionalProperties": true },
                        "closed": { "type": "object", "additionalProperties": false },
                        "typed": { "type": "object", "additionalProperties": { "type": "string" } },
                        "plain": { "type": "object" }
                    }
                }),
            )
            .unwrap();
        let props = &graph.node(root).properties;
        assert_eq!(
            graph.node(props["open"]).additional_properties,
            AdditionalProperties::Bool(true)
        );
        assert_eq!(
            graph.node(props["closed"]).additional_properties,
            AdditionalProperties::Bool(false)
        );
        assert_eq!(
            graph.node(props["plain"]).additional_properties,
            AdditionalProperties::Absent
        );
        match graph.node(props["typed"]).additional_properties {
            AdditionalProperties::Schema(ap) => {
                assert_eq!(graph.node(ap).path_element, "additionalProperties");
                assert_eq!(graph.node(ap).schema_types, vec!["string"]);
            }
            other => panic!("Expected typed additionalProperties, got {:?}", other),
        }
    }

    #[test]
    fn test_defs_spelling_and_pointer_escape() {
        let mut graph = SchemaGraph::new();
        let root = graph
            .add_document("doc.json", &json!({ "$defs": { "a/b": { "type": "string" } } }))
            .unwrap();
        let def = graph.node(root).definitions["a/b"];
        assert_eq!(graph.node(def).pointer, "#/$defs/a~1b");
        assert!(graph.node(def).is_definition());
    }

    #[test]
    fn test_invalid_schema_reports_path() {
        let mut graph = SchemaGraph::new();
        let err = graph
            .add_document("bad.json", &json!({ "properties": { "x": 42 } }))
            .unwrap_err();
        match err {
            MappingError::InvalidSchema { path, .. } => {
                assert_eq!(path, "bad.json#/properties/x");
            }
            other => panic!("Expected InvalidSchema, got {:?}", other),
        }
    }

    #[test]
    fn test_load_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), r#"{"title": "B"}"#).unwrap();
        fs::write(dir.path().join("a.json"), r#"{"title": "A"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let bundle = load_paths(&[dir.path()]).unwrap();
        assert_eq!(bundle.files.len(), 2);
        let titles: Vec<&str> = bundle
            .graph
            .roots()
            .into_iter()
            .map(|r| bundle.graph.node(r).title.as_str())
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }
}
