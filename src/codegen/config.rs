//! Codegen Configuration
//!
//! Settings consumed by the type resolution engine:
//! - NamingConfig: the convention table applied to every identifier fragment
//! - StringFormat: custom string formats that imply an extra package downstream
//!
//! Both are lists rather than maps so that config files keep the exact casing of
//! fragments (config keys are case-folded by the loader, values are not).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Global codegen configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Naming conventions
    #[serde(default)]
    pub naming: NamingConfig,

    /// Custom string formats
    #[serde(default = "default_formats")]
    pub formats: Vec<StringFormat>,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            naming: NamingConfig::default(),
            formats: default_formats(),
        }
    }
}

/// Naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Fragment overrides, applied after capitalization (e.g. `Id` -> `ID`)
    #[serde(default = "default_conventions")]
    pub conventions: Vec<Convention>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            conventions: default_conventions(),
        }
    }
}

impl NamingConfig {
    /// No overrides at all: fragments pass through unchanged
    pub fn empty() -> Self {
        Self { conventions: Vec::new() }
    }

    /// Lookup table; a later entry for the same fragment wins
    pub fn table(&self) -> BTreeMap<String, String> {
        self.conventions
            .iter()
            .map(|c| (c.fragment.clone(), c.replacement.clone()))
            .collect()
    }

    pub fn with(mut self, fragment: &str, replacement: &str) -> Self {
        self.conventions.push(Convention {
            fragment: fragment.to_string(),
            replacement: replacement.to_string(),
        });
        self
    }
}

/// One naming override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Convention {
    pub fragment: String,
    pub replacement: String,
}

/// A string `format` with a dedicated type downstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringFormat {
    /// Value of the schema `format` keyword
    pub format: String,
    /// Package the downstream emitter must import
    pub package: String,
    /// Type the emitter uses instead of a plain string
    pub type_name: String,
}

impl CodegenConfig {
    /// `format` -> custom type entry
    pub fn format_table(&self) -> BTreeMap<String, StringFormat> {
        self.formats
            .iter()
            .map(|f| (f.format.clone(), f.clone()))
            .collect()
    }
}

fn default_conventions() -> Vec<Convention> {
    [
        ("Id", "ID"),
        ("Url", "URL"),
        ("Uri", "URI"),
        ("Uuid", "UUID"),
        ("Api", "API"),
        ("Http", "HTTP"),
        ("Json", "JSON"),
        ("Xml", "XML"),
        ("Sql", "SQL"),
    ]
    .iter()
    .map(|(fragment, replacement)| Convention {
        fragment: fragment.to_string(),
        replacement: replacement.to_string(),
    })
    .collect()
}

pub(crate) fn default_formats() -> Vec<StringFormat> {
    vec![
        StringFormat {
            format: "date-time".to_string(),
            package: "chrono".to_string(),
            type_name: "chrono::DateTime<chrono::Utc>".to_string(),
        },
        StringFormat {
            format: "uuid".to_string(),
            package: "uuid".to_string(),
            type_name: "uuid::Uuid".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_conventions() {
        let table = NamingConfig::default().table();
        assert_eq!(table.get("Id").map(String::as_str), Some("ID"));
        assert_eq!(table.get("Uuid").map(String::as_str), Some("UUID"));
        assert!(!table.contains_key("id"));
    }

    #[test]
    fn test_later_convention_wins() {
        let naming = NamingConfig::empty().with("Id", "ID").with("Id", "Ident");
        assert_eq!(naming.table()["Id"], "Ident");
    }

    #[test]
    fn test_format_table() {
        let config = CodegenConfig {
            naming: NamingConfig::empty(),
            formats: default_formats(),
        };
        let table = config.format_table();
        assert_eq!(table["date-time"].package, "chrono");
        assert_eq!(table["uuid"].type_name, "uuid::Uuid");
        assert!(!table.contains_key("email"));
    }
}
