//! Configuration types for the execution runtime
//!
//! Everything the product tunes lives here rather than as literals at use
//! sites: the execution timeout, the package allow-list, and the interpreter
//! the sandbox launches. All fields are optional in the YAML surface and fall
//! back to sensible defaults, so a minimal deployment needs no config file at
//! all.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::RunnerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Wall-clock budget for a single execution, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Package identifiers the sandbox is permitted to load on demand.
    #[serde(default = "default_allowed_packages")]
    pub allowed_packages: Vec<String>,
    #[serde(default)]
    pub interpreter: InterpreterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Interpreter binary, resolved against PATH at worker spawn.
    #[serde(default = "default_interpreter_binary")]
    pub binary: String,
    /// Extra arguments inserted before the driver script path.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            allowed_packages: default_allowed_packages(),
            interpreter: InterpreterConfig::default(),
        }
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            binary: default_interpreter_binary(),
            args: Vec::new(),
        }
    }
}

impl RunnerConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, RunnerError> {
        serde_yaml::from_str(contents).map_err(|e| RunnerError::Config(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_interpreter_binary() -> String {
    "python3".to_string()
}

fn default_allowed_packages() -> Vec<String> {
    ["numpy", "pandas", "matplotlib", "scipy", "sympy"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.interpreter.binary, "python3");
        assert!(config.allowed_packages.contains(&"numpy".to_string()));
        assert_eq!(config.timeout(), Duration::from_millis(5_000));
    }

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = RunnerConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.timeout_ms, 5_000);
        assert!(config.interpreter.args.is_empty());
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
timeout_ms: 250
allowed_packages:
  - numpy
interpreter:
  binary: python3.12
  args: ["-B"]
"#;
        let config = RunnerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.timeout_ms, 250);
        assert_eq!(config.allowed_packages, vec!["numpy".to_string()]);
        assert_eq!(config.interpreter.binary, "python3.12");
        assert_eq!(config.interpreter.args, vec!["-B".to_string()]);
    }

    #[test]
    fn test_invalid_yaml_is_a_config_error() {
        let result = RunnerConfig::from_yaml_str("timeout_ms: [not, a, number]");
        assert!(matches!(result, Err(RunnerError::Config(_))));
    }
}
