//! Type Model
//!
//! Output of the resolution pass: named records and top-level aliases, keyed
//! by generated name. Both registries only grow during a pass and are never
//! touched once it completes.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

use super::TypeRef;

/// JSON name of the hidden catch-all field holding additional properties
pub const NOT_SERIALIZED: &str = "-";

/// Generated name of the catch-all field
pub const ADDITIONAL_PROPERTIES_FIELD: &str = "AdditionalProperties";

/// A field of a record (or a top-level alias, which has the same shape)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Generated identifier, e.g. `Address1`
    pub name: String,
    /// Key in the JSON document; empty or `-` when not serialized under a key
    pub json_name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    pub required: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
}

/// A top-level name bound to a non-record type
pub type Alias = Field;

/// What a record does with keys beyond its declared properties
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdditionalType {
    /// Extra keys are captured with this element type
    Typed(TypeRef),
    /// No extra keys permitted
    Forbidden,
}

/// A named record type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Struct {
    /// Originating schema: `$id` or JSON pointer, e.g. `#/definitions/address`
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Fields in resolution order
    pub fields: IndexMap<String, Field>,
    /// Custom encode/decode is needed downstream
    pub generate_code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_type: Option<AdditionalType>,
    /// Packages implied by custom string formats
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub imports: Vec<String>,
}

impl Struct {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            fields: IndexMap::new(),
            generate_code: false,
            additional_type: None,
            imports: Vec::new(),
        }
    }

    pub fn add_field(&mut self, field: Field) {
        self.fields.insert(field.name.clone(), field);
    }

    pub fn add_import(&mut self, package: &str) {
        if !self.imports.iter().any(|p| p == package) {
            self.imports.push(package.to_string());
        }
    }

    /// Number of fields declared through `properties`
    pub fn declared_field_count(&self) -> usize {
        self.fields.values().filter(|f| f.json_name != NOT_SERIALIZED).count()
    }
}

/// Records and aliases produced by one resolution pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypeModel {
    pub structs: BTreeMap<String, Struct>,
    pub aliases: BTreeMap<String, Alias>,
}

impl TypeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record, replacing any earlier one with the same name
    pub fn insert_struct(&mut self, record: Struct) {
        self.structs.insert(record.name.clone(), record);
    }

    /// Register an alias, replacing any earlier one with the same name
    pub fn insert_alias(&mut self, alias: Alias) {
        self.aliases.insert(alias.name.clone(), alias);
    }

    pub fn get_struct(&self, name: &str) -> Option<&Struct> {
        self.structs.get(name)
    }

    pub fn get_alias(&self, name: &str) -> Option<&Alias> {
        self.aliases.get(name)
    }

    /// Names registered both as a record and as an alias
    pub fn collisions(&self) -> Vec<&str> {
        self.aliases
            .keys()
            .filter(|name| self.structs.contains_key(*name))
            .map(String::as_str)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty() && self.aliases.is_empty()
    }
}
