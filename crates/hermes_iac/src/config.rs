//! Compiler configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CompileResult;

/// Settings that shape the generated script.
///
/// Every field has a default, so a YAML file only needs the values it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Name of the generated stack class.
    pub stack_class: String,
    /// Instance class for web servers.
    pub compute_instance_type: String,
    /// Instance class for databases.
    pub database_instance_type: String,
    /// Prefix of generated database names.
    pub database_name_prefix: String,
    /// Transport protocol of security group port rules.
    pub protocol: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            stack_class: "CdkWorkshopStack".to_string(),
            compute_instance_type: "t3.nano".to_string(),
            database_instance_type: "t3.micro".to_string(),
            database_name_prefix: "hermes".to_string(),
            protocol: "tcp".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_class(mut self, name: impl Into<String>) -> Self {
        self.stack_class = name.into();
        self
    }

    pub fn with_compute_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.compute_instance_type = instance_type.into();
        self
    }

    pub fn with_database_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.database_instance_type = instance_type.into();
        self
    }

    pub fn with_database_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.database_name_prefix = prefix.into();
        self
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> CompileResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: CompilerConfig = serde_yaml::from_str(&content)?;
        debug!("Loaded compiler configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_file(&self, path: &Path) -> CompileResult<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hermes.yaml");
        fs::write(&path, "stack_class: ProdStack\ncompute_instance_type: t3.large\n").unwrap();

        let config = CompilerConfig::from_file(&path).unwrap();
        assert_eq!(config.stack_class, "ProdStack");
        assert_eq!(config.compute_instance_type, "t3.large");
        assert_eq!(config.database_instance_type, "t3.micro");
        assert_eq!(config.protocol, "tcp");
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hermes.yaml");
        let config = CompilerConfig::new()
            .with_database_name_prefix("acme")
            .with_database_instance_type("t3.small");

        config.to_file(&path).unwrap();
        assert_eq!(CompilerConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempdir().unwrap();
        assert!(CompilerConfig::from_file(&dir.path().join("absent.yaml")).is_err());
    }
}
