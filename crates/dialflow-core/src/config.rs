use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DialflowError, Result};

/// Top-level dialflow configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub flow: FlowConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Values merged over the flow's `environment_variables`.
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Flow definition to load when none is given on the command line.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Settings for the pooled HTTP transport used by side-effect actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_pool_idle_timeout")]
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            pool_idle_timeout_secs: default_pool_idle_timeout(),
        }
    }
}

fn default_user_agent() -> String { format!("dialflow/{}", env!("CARGO_PKG_VERSION")) }
fn default_connect_timeout() -> u64 { 10 }
fn default_pool_idle_timeout() -> u64 { 90 }

/// Runtime logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String { "dialflow=info,warn".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| DialflowError::ConfigNotFound(path.display().to_string()))?;

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        toml::from_str(&expanded).map_err(|e| DialflowError::AppConfig(e.to_string()))
    }

    /// Resolve the flow path relative to the config file's directory.
    pub fn flow_path(&self, config_path: &Path) -> Option<PathBuf> {
        let path = self.flow.path.as_ref()?;
        if path.is_absolute() {
            return Some(path.clone());
        }
        Some(
            config_path
                .parent()
                .map(|dir| dir.join(path))
                .unwrap_or_else(|| path.clone()),
        )
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Keep original if env var not set
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("TEST_DIALFLOW_VAR", "hello");
        let result = expand_env_vars("key = \"${TEST_DIALFLOW_VAR}\"");
        assert_eq!(result, "key = \"hello\"");
        std::env::remove_var("TEST_DIALFLOW_VAR");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("key = \"${NONEXISTENT_DIALFLOW_VAR}\"");
        assert_eq!(result, "key = \"${NONEXISTENT_DIALFLOW_VAR}\"");
    }

    #[test]
    fn test_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.flow.path.is_none());
        assert!(config.environment.is_empty());
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert_eq!(config.http.pool_idle_timeout_secs, 90);
        assert!(config.http.user_agent.starts_with("dialflow/"));
        assert_eq!(config.log.filter, "dialflow=info,warn");
    }

    #[test]
    fn test_flow_path_relative_to_config() {
        let config: AppConfig = toml::from_str(
            r#"
[flow]
path = "flows/reservation.yaml"
"#,
        )
        .unwrap();

        let resolved = config.flow_path(Path::new("/etc/dialflow/dialflow.toml")).unwrap();
        assert_eq!(resolved, PathBuf::from("/etc/dialflow/flows/reservation.yaml"));
    }

    #[test]
    fn test_flow_path_absent() {
        let config = AppConfig::default();
        assert!(config.flow_path(Path::new("dialflow.toml")).is_none());
    }
}
