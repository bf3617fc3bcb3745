//! Configuration management for mapping generation
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (mapgen.toml)
//! - Environment variables (MAPGEN__*)
//!
//! ## Example config file (mapgen.toml):
//! ```toml
//! [[naming.conventions]]
//! fragment = "Id"
//! replacement = "ID"
//!
//! [[formats]]
//! format = "date-time"
//! package = "chrono"
//! type_name = "chrono::DateTime<chrono::Utc>"
//!
//! [mapping]
//! skip_nested = false
//! include_checksum = true
//! raw_format = "raw"
//! date_format = "date-time"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::codegen::config::default_formats;
use crate::codegen::{CodegenConfig, NamingConfig, StringFormat};
use crate::mapping::RenderConfig;

/// Main configuration for `schema-mapgen`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Identifier conventions
    #[serde(default)]
    pub naming: NamingConfig,

    /// Custom string formats
    #[serde(default = "default_formats")]
    pub formats: Vec<StringFormat>,

    /// Mapping renderer settings
    #[serde(default)]
    pub mapping: RenderConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            naming: NamingConfig::default(),
            formats: default_formats(),
            mapping: RenderConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from the default locations, plus `config_path` when given
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["mapgen.toml", ".mapgen.toml", "config/mapgen.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "familiar", "mapgen") {
            let xdg_config = config_dir.config_dir().join("mapgen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (MAPGEN__MAPPING__SKIP_NESTED=true)
        builder = builder.add_source(
            Environment::with_prefix("MAPGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Settings consumed by the type resolution engine
    pub fn codegen(&self) -> CodegenConfig {
        CodegenConfig {
            naming: self.naming.clone(),
            formats: self.formats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert!(!config.mapping.skip_nested);
        assert!(config.mapping.include_checksum);
        assert_eq!(config.mapping.raw_format, "raw");
        assert_eq!(config.formats.len(), 2);
        assert_eq!(config.codegen().naming.table()["Id"], "ID");
    }

    #[test]
    fn test_serialize_config() {
        let config = GeneratorConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[mapping]"));
        assert!(toml_str.contains("[[formats]]"));
        assert!(toml_str.contains("[[naming.conventions]]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[naming]
conventions = [{ fragment = "Ip", replacement = "IP" }]

[mapping]
skip_nested = true
raw_format = "blob"
"#,
        )
        .unwrap();

        let config = GeneratorConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert!(config.mapping.skip_nested);
        assert_eq!(config.mapping.raw_format, "blob");
        // Unset keys keep their defaults
        assert!(config.mapping.include_checksum);
        assert_eq!(config.formats.len(), 2);
        // Replacing the list drops the default acronyms
        let table = config.naming.table();
        assert_eq!(table.get("Ip").map(String::as_str), Some("IP"));
        assert!(!table.contains_key("Id"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("saved.toml");

        let mut config = GeneratorConfig::default();
        config.mapping.date_format = "date".to_string();
        config.naming = NamingConfig::empty().with("Db", "DB");
        config.save(&path).unwrap();

        let loaded = GeneratorConfig::load_from(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.mapping.date_format, "date");
        assert_eq!(loaded.naming.table()["Db"], "DB");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(GeneratorConfig::load_from(Some(path.to_str().unwrap())).is_err());
    }
}
