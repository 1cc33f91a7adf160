//! Analysis configuration
//!
//! Stored in `~/.config/gwlens/config.yaml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

pub const DEFAULT_MAX_DEPTH: usize = 3;
pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_POLICY_LABEL_KEY: &str = "gateway.networking.k8s.io/policy";

/// Analysis settings shared by every command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Hops from the source objects that are fully expanded
    pub max_depth: usize,

    /// Namespace assumed for references and manifests that omit one
    pub default_namespace: String,

    /// CRD label classifying a resource type as a policy
    pub policy_label_key: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            policy_label_key: DEFAULT_POLICY_LABEL_KEY.to_string(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| CoreError::Config {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("gwlens").join("config.yaml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_namespace.is_empty() {
            return Err(CoreError::Config {
                message: "defaultNamespace must not be empty".to_string(),
            });
        }
        if self.policy_label_key.is_empty() {
            return Err(CoreError::Config {
                message: "policyLabelKey must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.default_namespace, "default");
        assert_eq!(config.policy_label_key, "gateway.networking.k8s.io/policy");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "maxDepth: 5\n").unwrap();

        let config = AnalysisConfig::load_from(&path).unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.default_namespace, "default");
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "defaultNamespace: \"\"\n").unwrap();

        assert!(matches!(
            AnalysisConfig::load_from(&path),
            Err(CoreError::Config { .. })
        ));
    }
}
