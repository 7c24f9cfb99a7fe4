//! # Scaffold Configuration
//!
//! Settings for one fixture, loaded from environment variables (CI) or a YAML
//! file (local runs). Every field has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_IMAGE, DEFAULT_NAMESPACE, DEFAULT_READY_TIMEOUT_SECS};
use crate::manifest::FixtureNames;
use crate::render::RenderValues;

pub const DEFAULT_CONFIG_DEFAULT_PATH: &str = "testdata/apisix-gw-config-default.yaml";
pub const DEFAULT_CONFIG_OVERRIDE_PATH: &str = "testdata/apisix-gw-config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScaffoldOptions {
    /// Template rendered into `config-default.yaml`
    pub default_config_path: PathBuf,
    /// Template rendered into `config.yaml`
    pub config_path: PathBuf,
    /// Namespace all fixture resources are applied into
    pub namespace: String,
    /// Optional `-<suffix>` for resource names when fixtures share a namespace
    pub name_suffix: Option<String>,
    /// Gateway image
    pub image: String,
    /// Create the namespace if missing, and delete it on teardown if we created it
    pub create_namespace: bool,
    /// How long `wait_until_ready` waits for the Deployment
    pub ready_timeout_secs: u64,
    /// Node addresses to use instead of asking the cluster
    pub node_addresses: Vec<String>,
    /// Values substituted into both templates
    pub render_values: RenderValues,
}

impl Default for ScaffoldOptions {
    fn default() -> Self {
        Self {
            default_config_path: PathBuf::from(DEFAULT_CONFIG_DEFAULT_PATH),
            config_path: PathBuf::from(DEFAULT_CONFIG_OVERRIDE_PATH),
            namespace: DEFAULT_NAMESPACE.to_string(),
            name_suffix: None,
            image: DEFAULT_IMAGE.to_string(),
            create_namespace: true,
            ready_timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
            node_addresses: Vec::new(),
            render_values: RenderValues::new(),
        }
    }
}

impl ScaffoldOptions {
    /// Load options from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_config_path: env_var_or_default_str(
                "GATEWAY_DEFAULT_CONFIG_PATH",
                DEFAULT_CONFIG_DEFAULT_PATH,
            )
            .into(),
            config_path: env_var_or_default_str("GATEWAY_CONFIG_PATH", DEFAULT_CONFIG_OVERRIDE_PATH)
                .into(),
            namespace: env_var_or_default_str("GATEWAY_NAMESPACE", DEFAULT_NAMESPACE),
            name_suffix: std::env::var("GATEWAY_NAME_SUFFIX")
                .ok()
                .filter(|s| !s.is_empty()),
            image: env_var_or_default_str("GATEWAY_IMAGE", DEFAULT_IMAGE),
            create_namespace: env_var_or_default_bool(
                "GATEWAY_CREATE_NAMESPACE",
                defaults.create_namespace,
            ),
            ready_timeout_secs: env_var_or_default(
                "GATEWAY_READY_TIMEOUT_SECS",
                DEFAULT_READY_TIMEOUT_SECS,
            ),
            node_addresses: std::env::var("GATEWAY_NODE_ADDRESSES")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            render_values: defaults.render_values,
        }
    }

    /// Load options from a YAML file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaffold options {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse scaffold options {}", path.display()))
    }

    /// Add a substitution value for both templates
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.render_values.insert(key.into(), value.into());
        self
    }

    pub fn names(&self) -> FixtureNames {
        let names = FixtureNames::new(self.namespace.clone());
        match &self.name_suffix {
            Some(suffix) => names.with_suffix(suffix.clone()),
            None => names,
        }
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let opts = ScaffoldOptions::default();
        assert_eq!(opts.namespace, "default");
        assert_eq!(opts.image, "apache/apisix:latest");
        assert_eq!(opts.ready_timeout(), Duration::from_secs(120));
        assert_eq!(opts.names(), FixtureNames::default());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" 10.0.0.5, ,10.0.0.6 "), vec!["10.0.0.5", "10.0.0.6"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "namespace: gw-e2e\nnameSuffix: a\nrenderValues:\n  EtcdServiceFQDN: etcd.gw-e2e.svc"
        )
        .unwrap();

        let opts = ScaffoldOptions::from_file(file.path()).unwrap();
        assert_eq!(opts.namespace, "gw-e2e");
        assert_eq!(opts.names().service(), "apisix-service-e2e-test-a");
        assert_eq!(opts.render_values["EtcdServiceFQDN"], "etcd.gw-e2e.svc");
        assert_eq!(opts.image, DEFAULT_IMAGE);
        assert!(opts.create_namespace);
    }

    #[test]
    fn test_with_value() {
        let opts = ScaffoldOptions::default().with_value("Port", "2379");
        assert_eq!(opts.render_values["Port"], "2379");
    }
}
