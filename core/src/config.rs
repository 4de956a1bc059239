//! Configuration management for Strata
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Builder overrides (CLI flags)
//! 2. Environment variables (STRATA_TRACE_DEPTH, etc.; `.env` is loaded first)
//! 3. Config file (strata.toml in the working directory or
//!    ~/.config/strata/config.toml, or the path in STRATA_CONFIG_PATH)
//! 4. Built-in defaults
//!
//! # Example Config File (strata.toml)
//!
//! ```toml
//! trace_depth = 20
//! max_tasks_per_run = 100000
//! log_filter = "info,strata_core::executor=debug"
//! realtime = false
//! ```

use crate::error::{Result, StrataError};
use ::config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum number of entries kept in an error's trace
    #[serde(default = "default_trace_depth")]
    pub trace_depth: usize,

    /// Deferred tasks the driver runs before giving up on a program
    #[serde(default = "default_max_tasks_per_run")]
    pub max_tasks_per_run: usize,

    /// `tracing` filter used by the binary when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Wait for timers in real time instead of skipping ahead
    #[serde(default)]
    pub realtime: bool,
}

// Default value functions for serde
fn default_trace_depth() -> usize {
    20
}
fn default_max_tasks_per_run() -> usize {
    100_000
}
fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trace_depth: default_trace_depth(),
            max_tasks_per_run: default_max_tasks_per_run(),
            log_filter: default_log_filter(),
            realtime: false,
        }
    }
}

impl Config {
    /// Load configuration with the full priority chain
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for constructing config with overrides
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.trace_depth < 2 {
            return Err(StrataError::InvalidConfig(format!(
                "trace_depth must be at least 2, got {}",
                self.trace_depth
            )));
        }
        if self.max_tasks_per_run == 0 {
            return Err(StrataError::InvalidConfig(
                "max_tasks_per_run must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}

/// Builder for constructing Config with optional overrides
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    trace_depth: Option<usize>,
    max_tasks_per_run: Option<usize>,
    log_filter: Option<String>,
    realtime: Option<bool>,
}

impl ConfigBuilder {
    /// Override the config file path
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn trace_depth(mut self, depth: Option<usize>) -> Self {
        self.trace_depth = depth;
        self
    }

    pub fn max_tasks_per_run(mut self, max: Option<usize>) -> Self {
        self.max_tasks_per_run = max;
        self
    }

    pub fn log_filter(mut self, filter: Option<String>) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn realtime(mut self, realtime: Option<bool>) -> Self {
        self.realtime = realtime;
        self
    }

    /// Build the final config by applying the priority chain
    pub fn build(self) -> Result<Config> {
        // Load .env if present, so real env vars override it
        let _ = dotenvy::dotenv();

        let defaults = Config::default();
        let mut builder = ::config::Config::builder()
            .set_default("trace_depth", defaults.trace_depth as i64)?
            .set_default("max_tasks_per_run", defaults.max_tasks_per_run as i64)?
            .set_default("log_filter", defaults.log_filter)?
            .set_default("realtime", defaults.realtime)?;

        if let Some(path) = self.resolve_config_path()? {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }

        let config: Config = builder
            .add_source(Environment::with_prefix("STRATA").try_parsing(true))
            .set_override_option("trace_depth", self.trace_depth.map(|d| d as i64))?
            .set_override_option(
                "max_tasks_per_run",
                self.max_tasks_per_run.map(|m| m as i64),
            )?
            .set_override_option("log_filter", self.log_filter)?
            .set_override_option("realtime", self.realtime)?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Explicit path, then STRATA_CONFIG_PATH, then the default locations
    fn resolve_config_path(&self) -> Result<Option<PathBuf>> {
        let explicit = match &self.config_path {
            Some(path) => Some(path.clone()),
            None => env::var("STRATA_CONFIG_PATH").ok().map(PathBuf::from),
        };
        match explicit {
            Some(path) if !path.exists() => Err(StrataError::ConfigNotFound(path)),
            Some(path) => Ok(Some(path)),
            None => Ok(find_config_file()),
        }
    }
}

/// Search for a config file in the default locations
fn find_config_file() -> Option<PathBuf> {
    let project_config = PathBuf::from("strata.toml");
    if project_config.exists() {
        return Some(project_config);
    }

    if let Some(home) = env::var_os("HOME") {
        let user_config = PathBuf::from(home)
            .join(".config")
            .join("strata")
            .join("config.toml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.trace_depth, 20);
        assert_eq!(config.max_tasks_per_run, 100_000);
        assert_eq!(config.log_filter, "info");
        assert!(!config.realtime);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            trace_depth = 8
            realtime = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.trace_depth, 8);
        assert!(config.realtime);
        assert_eq!(config.max_tasks_per_run, 100_000); // Default
    }

    #[test]
    fn test_builder_with_overrides() {
        let config = Config::builder()
            .trace_depth(Some(6))
            .max_tasks_per_run(Some(50))
            .log_filter(Some("debug".to_string()))
            .build()
            .unwrap();

        assert_eq!(config.trace_depth, 6);
        assert_eq!(config.max_tasks_per_run, 50);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::builder()
            .config_path(Some(PathBuf::from("/nonexistent/strata.toml")))
            .build();
        assert!(matches!(result, Err(StrataError::ConfigNotFound(_))));
    }

    #[test]
    fn test_trace_depth_too_small() {
        let result = Config::builder().trace_depth(Some(1)).build();
        let Err(StrataError::InvalidConfig(msg)) = result else {
            unreachable!("Expected InvalidConfig, got {:?}", result);
        };
        assert!(msg.contains("trace_depth"));
    }

    #[test]
    fn test_toml_output_parses_back() {
        let config = Config::default();
        let parsed: Config = toml::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }
}
