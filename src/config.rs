//! Pipeline configuration
//!
//! ```yaml
//! reexecution: forbid
//! log_bound_values: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// What executing an already executed statement does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reexecution {
    /// Send the same bound query again
    #[default]
    Allow,
    /// Fail with `AlreadyExecuted`
    Forbid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub reexecution: Reexecution,
    /// Log every bound value at trace level
    pub log_bound_values: bool,
}

impl PipelineConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.reexecution, Reexecution::Allow);
        assert!(!config.log_bound_values);
    }

    #[test]
    fn test_from_yaml() {
        let config = PipelineConfig::from_yaml_str("reexecution: forbid\nlog_bound_values: true\n").unwrap();
        assert_eq!(config.reexecution, Reexecution::Forbid);
        assert!(config.log_bound_values);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = PipelineConfig::from_yaml_str("reexecution: sometimes").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PipelineConfig::load("/nonexistent/nosqlmap.yaml").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
