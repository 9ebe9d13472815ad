//! Operator configuration for the management binary.

use std::path::Path;

use nexus_meta::ClusterConfig;
use serde::{Deserialize, Serialize};

/// Everything `nexus-mgmt serve` needs to start a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MgmtConfig {
    /// Print event-log entries written since the previous console command.
    pub echo_events: bool,
    /// Prompt shown before each console command; empty disables it.
    pub prompt: String,
    /// Cluster tunables handed to the controller.
    pub cluster: ClusterConfig,
}

impl Default for MgmtConfig {
    fn default() -> Self {
        Self {
            echo_events: true,
            prompt: String::from("nexus> "),
            cluster: ClusterConfig::default(),
        }
    }
}

impl MgmtConfig {
    /// Loads a config from a `.toml` or `.json` file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let config: MgmtConfig = match ext.to_lowercase().as_str() {
            "toml" => toml::from_str(&contents)?,
            "json" => serde_json::from_str(&contents)?,
            _ => anyhow::bail!("Unsupported config file extension: {}", ext),
        };
        config.cluster.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::warn!("Config file not found, using defaults: {}", path.display());
            Ok(Self::default())
        }
    }

    /// Renders the config as TOML.
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_values() {
        let config = MgmtConfig::default();
        assert_eq!(config.cluster, ClusterConfig::default());
        assert!(config.echo_events);
        assert_eq!(config.prompt, "nexus> ");
    }

    #[test]
    fn test_from_file_toml() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
echo_events = false

[cluster]
replication_factor = 2
initial_nodes = 4
placement_seed = 7
            "#
        )
        .unwrap();

        let config = MgmtConfig::from_file(file.path()).unwrap();
        assert!(!config.echo_events);
        assert_eq!(config.prompt, "nexus> ");
        assert_eq!(config.cluster.replication_factor, 2);
        assert_eq!(config.cluster.initial_nodes, 4);
        assert_eq!(config.cluster.placement_seed, Some(7));
        assert_eq!(config.cluster.blocks_per_file, 4);
        assert_eq!(config.cluster.monitor_interval_ms, 4000);
    }

    #[test]
    fn test_from_file_json() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        writeln!(
            file,
            r#"{{
                "prompt": "",
                "cluster": {{ "monitor_interval_ms": 1000, "upload_tick_ms": 50 }}
            }}"#
        )
        .unwrap();

        let config = MgmtConfig::from_file(file.path()).unwrap();
        assert_eq!(config.prompt, "");
        assert_eq!(config.cluster.monitor_interval_ms, 1000);
        assert_eq!(config.cluster.upload_tick_ms, 50);
        assert_eq!(config.cluster.replication_factor, 3);
    }

    #[test]
    fn test_from_file_rejects_invalid_cluster() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[cluster]\nupload_step_percent = 150").unwrap();

        let err = MgmtConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("upload_step_percent"));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        let err = MgmtConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported config file extension"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MgmtConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, MgmtConfig::default());
    }

    #[test]
    fn test_toml_output_reloads() {
        let rendered = MgmtConfig::default().to_toml_string().unwrap();
        assert!(rendered.contains("replication_factor = 3"));

        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(rendered.as_bytes()).unwrap();
        assert_eq!(
            MgmtConfig::from_file(file.path()).unwrap(),
            MgmtConfig::default()
        );
    }
}
