//! Configuration management for xbigen.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collect::CollectOptions;
use crate::emit::GENERATED_FILE_NAME;

/// Generator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XbiConfig {
    /// Path of the generated artifact.
    pub output: PathBuf,

    /// Bound applied to each git invocation, in seconds.
    pub timeout_secs: u64,

    /// Commits recorded in the log and local-commit fields.
    pub log_depth: usize,

    /// Remote whose tracking branch defines unpushed commits.
    pub remote: String,

    /// Git executable.
    pub git: String,
}

impl Default for XbiConfig {
    fn default() -> Self {
        let collect = CollectOptions::default();
        Self {
            output: PathBuf::from(GENERATED_FILE_NAME),
            timeout_secs: crate::command::DEFAULT_TIMEOUT.as_secs(),
            log_depth: collect.log_depth,
            remote: collect.remote,
            git: collect.git,
        }
    }
}

impl XbiConfig {
    /// Load configuration from the default paths.
    ///
    /// Loads global config first, then merges project-local config if present.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        let global_path = Self::config_path()?;
        let mut config = if global_path.exists() {
            let contents = std::fs::read_to_string(&global_path)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(project_path) = Self::project_config_path() {
            if project_path.exists() {
                let contents = std::fs::read_to_string(&project_path)?;
                let project_config: Self = toml::from_str(&contents)?;
                config.merge(project_config);
            }
        }

        tracing::debug!(config = ?config, "loaded configuration");
        Ok(config)
    }

    /// Get the project-local configuration file path.
    ///
    /// Looks for `.xbi/config.toml` in the current directory.
    pub fn project_config_path() -> anyhow::Result<PathBuf> {
        let cwd = std::env::current_dir()?;
        Ok(cwd.join(".xbi").join("config.toml"))
    }

    /// Merge another config into this one (project overrides global).
    fn merge(&mut self, other: Self) {
        let defaults = Self::default();

        if other.output != defaults.output {
            self.output = other.output;
        }
        if other.timeout_secs != defaults.timeout_secs {
            self.timeout_secs = other.timeout_secs;
        }
        if other.log_depth != defaults.log_depth {
            self.log_depth = other.log_depth;
        }
        if other.remote != defaults.remote {
            self.remote = other.remote;
        }
        if other.git != defaults.git {
            self.git = other.git;
        }
    }

    /// Get the configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the config directory path (`~/.config/xbi/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config_home).join("xbi"));
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

        Ok(base.config_dir().join("xbi"))
    }

    /// Per-command bound for the runner.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Collector options derived from this config.
    #[must_use]
    pub fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            git: self.git.clone(),
            remote: self.remote.clone(),
            log_depth: self.log_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_collector() {
        let config = XbiConfig::default();

        assert_eq!(config.output, PathBuf::from("xbi_generated.rs"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.collect_options(), CollectOptions::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: XbiConfig = toml::from_str("remote = \"upstream\"\nlog_depth = 10\n").unwrap();

        assert_eq!(config.remote, "upstream");
        assert_eq!(config.log_depth, 10);
        assert_eq!(config.git, "git");
    }

    #[test]
    fn project_overrides_global() {
        let mut global: XbiConfig = toml::from_str("timeout_secs = 10\nremote = \"fork\"").unwrap();
        let project: XbiConfig = toml::from_str("output = \"src/build_info.rs\"").unwrap();

        global.merge(project);

        assert_eq!(global.output, PathBuf::from("src/build_info.rs"));
        assert_eq!(global.timeout_secs, 10);
        assert_eq!(global.remote, "fork");
    }

    #[test]
    fn round_trips_through_toml() {
        let config = XbiConfig {
            log_depth: 3,
            ..XbiConfig::default()
        };

        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<XbiConfig>(&text).unwrap(), config);
    }
}
