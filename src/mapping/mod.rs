//! Index Mapping Rendering
//!
//! Walks a `TypeModel` and produces one index-mapping document per record:
//!
//! ```json
//! { "properties": { "name": { "type": "keyword" }, "owner": { "properties": { ... } } } }
//! ```
//!
//! Nested records are inlined at the field that refers to them, except for
//! records with an additional-properties bucket (and fields formatted as raw
//! blobs), which become disabled `object` leaves. A record already being
//! inlined further up the same path is also emitted as a disabled leaf.

pub mod graph;

pub use graph::RecordGraph;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::io::Write;
use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::codegen::{Field, Struct, TypeModel, TypeRef, NOT_SERIALIZED};
use crate::error::Result;

/// First line of every generated module
pub const GENERATED_BANNER: &str = "// Code generated by schema-mapgen. DO NOT EDIT.";

/// Renderer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Leave out records that are inlined inside another record
    #[serde(default)]
    pub skip_nested: bool,

    /// Write the source checksum into the module banner
    #[serde(default = "default_true")]
    pub include_checksum: bool,

    /// Field format that marks an opaque blob
    #[serde(default = "default_raw_format")]
    pub raw_format: String,

    /// String format mapped to `date`
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Inner doc comment for the generated module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_doc: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_raw_format() -> String {
    "raw".to_string()
}

fn default_date_format() -> String {
    "date-time".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            skip_nested: false,
            include_checksum: true,
            raw_format: default_raw_format(),
            date_format: default_date_format(),
            module_doc: None,
        }
    }
}

// =============================================================================
// Mapping types
// =============================================================================

/// Index field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EsType {
    Date,
    Keyword,
    Integer,
    Boolean,
    Object,
}

impl EsType {
    /// Mapping type of a field from its resolved type and format
    pub fn of(field: &Field, date_format: &str) -> Self {
        match &field.ty {
            ty if ty.is_string_like() => {
                if field.format == date_format {
                    Self::Date
                } else {
                    Self::Keyword
                }
            }
            TypeRef::Int => Self::Integer,
            TypeRef::Bool => Self::Boolean,
            _ => Self::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Keyword => "keyword",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for EsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields that never show up in the indexed document
pub(crate) fn is_skipped(json_name: &str) -> bool {
    json_name.starts_with('_') || json_name == NOT_SERIALIZED
}

// =============================================================================
// Renderer
// =============================================================================

/// The mapping document of one record
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMapping {
    pub name: String,
    pub description: String,
    pub mapping: Value,
}

impl RecordMapping {
    /// Pretty-printed JSON text of the mapping
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.mapping)?)
    }

    /// Name of the constant holding this mapping, e.g. `MAPPING_MY_THING`
    pub fn const_name(&self) -> String {
        format!("MAPPING_{}", to_screaming_snake_case(&self.name))
    }
}

pub struct MappingRenderer<'m> {
    model: &'m TypeModel,
    config: &'m RenderConfig,
}

impl<'m> MappingRenderer<'m> {
    pub fn new(model: &'m TypeModel, config: &'m RenderConfig) -> Self {
        Self { model, config }
    }

    /// Mappings for every top-level record, ascending by name
    pub fn render(&self) -> Vec<RecordMapping> {
        let records = RecordGraph::build(self.model, &self.config.date_format);
        for name in records.cyclic_records() {
            warn!(record = %name, "record nests itself; the repeated level is rendered disabled");
        }
        let nested = if self.config.skip_nested {
            records.nested_records()
        } else {
            Default::default()
        };

        let mappings: Vec<RecordMapping> = self
            .model
            .structs
            .values()
            .filter(|record| !nested.contains(&record.name))
            .map(|record| RecordMapping {
                name: record.name.clone(),
                description: record.description.clone(),
                mapping: self.record_mapping(record),
            })
            .collect();

        debug!(
            records = mappings.len(),
            skipped = nested.len(),
            "rendered index mappings"
        );
        mappings
    }

    /// `{"properties": {...}}` for one record
    pub fn record_mapping(&self, record: &Struct) -> Value {
        let mut stack = vec![record.name.as_str()];
        self.properties(record, &mut stack)
    }

    fn properties<'a>(&'a self, record: &'a Struct, stack: &mut Vec<&'a str>) -> Value {
        let mut properties = Map::new();
        for field in record.fields.values() {
            if is_skipped(&field.json_name) {
                continue;
            }
            properties.insert(field.json_name.clone(), self.field_mapping(field, stack));
        }
        json!({ "properties": properties })
    }

    fn field_mapping<'a>(&'a self, field: &'a Field, stack: &mut Vec<&'a str>) -> Value {
        let es_type = EsType::of(field, &self.config.date_format);
        if es_type != EsType::Object {
            return json!({ "type": es_type.as_str() });
        }

        let target = field
            .ty
            .record_name()
            .and_then(|name| self.model.get_struct(name));
        let Some(target) = target else {
            // Maps, dynamic values and non-string arrays
            let fallback = if *field.ty.base() == TypeRef::Int64 {
                EsType::Integer
            } else {
                EsType::Keyword
            };
            return json!({ "type": fallback.as_str() });
        };

        if target.additional_type.is_some()
            || field.format == self.config.raw_format
            || stack.contains(&target.name.as_str())
        {
            return disabled();
        }

        stack.push(target.name.as_str());
        let inlined = self.properties(target, stack);
        stack.pop();
        inlined
    }

    /// Render the whole module: banner, then one constant per record.
    pub fn write_module<W: Write>(&self, w: &mut W, checksum: Option<&Checksum>) -> Result<()> {
        writeln!(w, "{}", GENERATED_BANNER)?;
        if let (true, Some(checksum)) = (self.config.include_checksum, checksum) {
            writeln!(w, "// Source checksum: {}", checksum)?;
        }
        if let Some(doc) = &self.config.module_doc {
            writeln!(w)?;
            for line in doc.lines() {
                writeln!(w, "//! {}", line)?;
            }
        }

        for mapping in self.render() {
            writeln!(w)?;
            write_doc_comment(w, &mapping.name, &mapping.description)?;
            let text = mapping.to_json_pretty()?;
            let hashes = raw_string_hashes(&text);
            writeln!(
                w,
                "pub const {}: &str = r{hashes}\"{}\"{hashes};",
                mapping.const_name(),
                text,
                hashes = hashes
            )?;
        }
        Ok(())
    }

    /// `write_module` into a string
    pub fn module_text(&self, checksum: Option<&Checksum>) -> Result<String> {
        let mut buf = Vec::new();
        self.write_module(&mut buf, checksum)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn disabled() -> Value {
    json!({ "enabled": false, "type": EsType::Object.as_str() })
}

fn write_doc_comment<W: Write>(w: &mut W, name: &str, description: &str) -> std::io::Result<()> {
    let mut lines = description.lines();
    match lines.next() {
        Some(first) if !first.trim().is_empty() => writeln!(w, "/// {} {}", name, first.trim_end())?,
        _ => writeln!(w, "/// {}", name)?,
    }
    for line in lines {
        writeln!(w, "/// {}", line.trim_end())?;
    }
    Ok(())
}

/// Enough `#`s that `text` cannot close the raw string early
fn raw_string_hashes(text: &str) -> String {
    let mut hashes = String::from("#");
    while text.contains(&format!("\"{}", hashes)) {
        hashes.push('#');
    }
    hashes
}

fn to_screaming_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.extend(c.to_uppercase());
            prev_lower = false;
        } else {
            result.extend(c.to_uppercase());
            prev_lower = c.is_lowercase() || c.is_numeric();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{AdditionalType, ADDITIONAL_PROPERTIES_FIELD};

    fn field(json_name: &str, ty: TypeRef, format: &str) -> Field {
        Field {
            name: json_name.to_uppercase(),
            json_name: json_name.to_string(),
            ty,
            required: false,
            description: String::new(),
            format: format.to_string(),
        }
    }

    fn render_one(model: &TypeModel, name: &str) -> Value {
        let config = RenderConfig::default();
        let renderer = MappingRenderer::new(model, &config);
        renderer.record_mapping(model.get_struct(name).unwrap())
    }

    #[test]
    fn test_primitive_fields() {
        let mut model = TypeModel::new();
        let mut event = Struct::new("#", "Event", "");
        event.add_field(field("at", TypeRef::String, "date-time"));
        event.add_field(field("tags", TypeRef::Array(Box::new(TypeRef::String)), ""));
        event.add_field(field("days", TypeRef::Array(Box::new(TypeRef::String)), "date-time"));
        event.add_field(field("count", TypeRef::Int, ""));
        event.add_field(field("ok", TypeRef::Bool, ""));
        event.add_field(field("ratio", TypeRef::Float64, ""));
        model.insert_struct(event);

        let mapping = render_one(&model, "Event");
        assert_eq!(
            mapping,
            json!({
                "properties": {
                    "at": { "type": "date" },
                    "tags": { "type": "keyword" },
                    "days": { "type": "date" },
                    "count": { "type": "integer" },
                    "ok": { "type": "boolean" },
                    "ratio": { "type": "keyword" }
                }
            })
        );
    }

    #[test]
    fn test_skipped_fields() {
        let mut model = TypeModel::new();
        let mut doc = Struct::new("#", "Doc", "");
        doc.add_field(field("_id", TypeRef::String, ""));
        doc.add_field(field("title", TypeRef::String, ""));
        let mut hidden = field(NOT_SERIALIZED, TypeRef::map_of(TypeRef::Any), "");
        hidden.name = ADDITIONAL_PROPERTIES_FIELD.to_string();
        doc.add_field(hidden);
        model.insert_struct(doc);

        let mapping = render_one(&model, "Doc");
        let props = mapping["properties"].as_object().unwrap();
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn test_fallback_for_non_records() {
        let mut model = TypeModel::new();
        let mut stats = Struct::new("#", "Stats", "");
        stats.add_field(field("samples", TypeRef::Array(Box::new(TypeRef::Int64)), ""));
        stats.add_field(field("labels", TypeRef::map_of(TypeRef::String), ""));
        stats.add_field(field("extra", TypeRef::Any, ""));
        stats.add_field(field("alias", TypeRef::Pointer("NotARecord".into()), ""));
        model.insert_struct(stats);

        let mapping = render_one(&model, "Stats");
        assert_eq!(mapping["properties"]["samples"], json!({ "type": "integer" }));
        assert_eq!(mapping["properties"]["labels"], json!({ "type": "keyword" }));
        assert_eq!(mapping["properties"]["extra"], json!({ "type": "keyword" }));
        assert_eq!(mapping["properties"]["alias"], json!({ "type": "keyword" }));
    }

    #[test]
    fn test_inline_and_disabled_records() {
        let mut model = TypeModel::new();

        let mut person = Struct::new("#", "Person", "");
        person.add_field(field("home", TypeRef::Pointer("Address".into()), ""));
        person.add_field(field("pets", TypeRef::Array(Box::new(TypeRef::Named("Pet".into()))), ""));
        person.add_field(field("blob", TypeRef::Pointer("Address".into()), "raw"));
        person.add_field(field("attrs", TypeRef::Pointer("Attrs".into()), ""));
        model.insert_struct(person);

        let mut address = Struct::new("#/definitions/address", "Address", "");
        address.add_field(field("city", TypeRef::String, ""));
        model.insert_struct(address);

        let mut pet = Struct::new("#/definitions/pet", "Pet", "");
        pet.add_field(field("name", TypeRef::String, ""));
        model.insert_struct(pet);

        let mut attrs = Struct::new("#/definitions/attrs", "Attrs", "");
        attrs.additional_type = Some(AdditionalType::Forbidden);
        model.insert_struct(attrs);

        let mapping = render_one(&model, "Person");
        assert_eq!(
            mapping,
            json!({
                "properties": {
                    "home": { "properties": { "city": { "type": "keyword" } } },
                    "pets": { "properties": { "name": { "type": "keyword" } } },
                    "blob": { "enabled": false, "type": "object" },
                    "attrs": { "enabled": false, "type": "object" }
                }
            })
        );
    }

    #[test]
    fn test_self_nesting_stops() {
        let mut model = TypeModel::new();
        let mut node = Struct::new("#", "Node", "");
        node.add_field(field("value", TypeRef::String, ""));
        node.add_field(field("next", TypeRef::Pointer("Node".into()), ""));
        model.insert_struct(node);

        let mapping = render_one(&model, "Node");
        assert_eq!(mapping["properties"]["next"], json!({ "enabled": false, "type": "object" }));
    }

    #[test]
    fn test_render_order_and_skip_nested() {
        let mut model = TypeModel::new();
        let mut b = Struct::new("#", "Beta", "");
        b.add_field(field("child", TypeRef::Pointer("Alpha".into()), ""));
        model.insert_struct(b);
        model.insert_struct(Struct::new("#/definitions/alpha", "Alpha", ""));

        let config = RenderConfig::default();
        let names: Vec<String> = MappingRenderer::new(&model, &config)
            .render()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);

        let config = RenderConfig {
            skip_nested: true,
            ..RenderConfig::default()
        };
        let names: Vec<String> = MappingRenderer::new(&model, &config)
            .render()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Beta"]);
    }

    #[test]
    fn test_module_text() {
        let mut model = TypeModel::new();
        let mut thing = Struct::new("#", "MyThing", "A thing.\nSecond line.");
        thing.add_field(field("name", TypeRef::String, ""));
        model.insert_struct(thing);
        model.insert_struct(Struct::new("#/definitions/empty", "Empty", ""));

        let config = RenderConfig {
            module_doc: Some("Index mappings.".to_string()),
            ..RenderConfig::default()
        };
        let checksum = Checksum::from_bytes(b"schema");
        let text = MappingRenderer::new(&model, &config)
            .module_text(Some(&checksum))
            .unwrap();

        let expected = format!(
            "{}\n// Source checksum: {}\n\n//! Index mappings.\n\n/// Empty\npub const MAPPING_EMPTY: &str = r#\"{{\n  \"properties\": {{}}\n}}\"#;\n\n/// MyThing A thing.\n/// Second line.\npub const MAPPING_MY_THING: &str = r#\"{{\n  \"properties\": {{\n    \"name\": {{\n      \"type\": \"keyword\"\n    }}\n  }}\n}}\"#;\n",
            GENERATED_BANNER, checksum
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn test_checksum_line_optional() {
        let model = TypeModel::new();
        let config = RenderConfig {
            include_checksum: false,
            ..RenderConfig::default()
        };
        let checksum = Checksum::from_bytes(b"schema");
        let text = MappingRenderer::new(&model, &config)
            .module_text(Some(&checksum))
            .unwrap();
        assert_eq!(text, format!("{}\n", GENERATED_BANNER));
    }

    #[test]
    fn test_raw_string_hashes() {
        assert_eq!(raw_string_hashes("{\"a\": 1}"), "#");
        assert_eq!(raw_string_hashes("{\"a\": \"#x\"}"), "##");
        assert_eq!(raw_string_hashes("\"## and \"#"), "###");
    }

    #[test]
    fn test_screaming_names() {
        assert_eq!(to_screaming_snake_case("MyThing"), "MY_THING");
        assert_eq!(to_screaming_snake_case("Foo_object"), "FOO_OBJECT");
        assert_eq!(to_screaming_snake_case("APIURL"), "APIURL");
        assert_eq!(to_screaming_snake_case("_3dModel"), "_3D_MODEL");
        assert_eq!(to_screaming_snake_case("Anonymous12"), "ANONYMOUS12");
    }
}
