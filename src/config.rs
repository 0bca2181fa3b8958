//! Engine configuration
//!
//! Feature flags are chosen once per process. They can be built in code,
//! read from a TOML file, or (for the output gate) taken from the environment.
//!
//! ```toml
//! all_ops = true
//! per_function = true
//! call_stack = true
//! bb_merge = 1000
//! output_if = "OMPI_COMM_WORLD_RANK=0"
//! ```

use crate::error::ConfigError;
use crate::output::{OutputFilter, OUTPUT_IF_VAR};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Report integer operations and memory-op counts
    pub all_ops: bool,
    /// Report loads and stores per operand type (implies `all_ops`)
    pub types: bool,
    /// Report counters per function
    pub per_function: bool,
    /// Attribute function counters to the full live call chain
    pub call_stack: bool,
    /// Report unique bytes touched
    pub unique_bytes: bool,
    /// Report vector-operation statistics
    pub vectors: bool,
    /// Terminated basic blocks merged into one `BYFL_BB` sample
    pub bb_merge: u64,
    /// `VAR=VALUE` output gate
    pub output_if: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            all_ops: false,
            types: false,
            per_function: false,
            call_stack: false,
            unique_bytes: false,
            vectors: false,
            bb_merge: 1,
            output_if: None,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Default flags with the output gate taken from `BYFL_OUTPUT_IF`
    pub fn from_env() -> Self {
        EngineConfig::default().with_env()
    }

    /// Override the output gate with `BYFL_OUTPUT_IF`, when set
    pub fn with_env(mut self) -> Self {
        if let Ok(expr) = std::env::var(OUTPUT_IF_VAR) {
            self.output_if = Some(expr);
        }
        self
    }

    /// Check flag combinations and parse the output gate
    pub fn validate(&self) -> Result<Option<OutputFilter>, ConfigError> {
        if self.call_stack && !self.per_function {
            return Err(ConfigError::CallStackWithoutPerFunction);
        }
        self.output_if.as_deref().map(OutputFilter::parse).transpose()
    }

    /// Whether integer ops are reported
    pub fn reports_all_ops(&self) -> bool {
        self.all_ops || self.types
    }

    /// Decimation window; zero behaves as one
    pub fn window(&self) -> u64 {
        self.bb_merge.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(!config.per_function);
        assert_eq!(config.bb_merge, 1);
        assert!(config.validate().unwrap().is_none());
    }

    #[test]
    fn test_parse_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            types = true
            per_function = true
            call_stack = true
            bb_merge = 1000
            output_if = "RANK=0"
        "#,
        )
        .unwrap();

        assert!(config.types);
        assert!(config.reports_all_ops());
        assert_eq!(config.window(), 1000);
        let filter = config.validate().unwrap().unwrap();
        assert_eq!(filter.variable, "RANK");
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(
            EngineConfig::from_toml_str("").unwrap(),
            EngineConfig::default()
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_toml_str("per_func = true").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_call_stack_requires_per_function() {
        let config = EngineConfig {
            call_stack: true,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CallStackWithoutPerFunction)
        ));
    }

    #[test]
    fn test_malformed_output_if() {
        let config = EngineConfig {
            output_if: Some("RANK".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MalformedOutputFilter(_))
        ));
    }

    #[test]
    fn test_zero_window_acts_as_one() {
        let config = EngineConfig {
            bb_merge: 0,
            ..Default::default()
        };
        assert_eq!(config.window(), 1);
    }

    #[test]
    #[serial_test::serial]
    fn test_output_gate_from_environment() {
        std::env::set_var(OUTPUT_IF_VAR, "RANK=3");
        let config = EngineConfig::from_env();
        std::env::remove_var(OUTPUT_IF_VAR);

        assert_eq!(config.output_if.as_deref(), Some("RANK=3"));
        assert_eq!(config.bb_merge, 1);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("byfl.toml");
        std::fs::write(&path, "unique_bytes = true\n").unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert!(config.unique_bytes);
    }

    #[test]
    fn test_from_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/byfl.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
