//! # Manifests
//!
//! Typed manifests for the gateway fixture and the ordered set they are
//! applied as.
//!
//! Manifests are `k8s-openapi` objects assembled by [`GatewayManifests`], not
//! interpolated strings. They are turned into YAML only at the orchestrator
//! boundary. ConfigMap data is written as block scalars through
//! [`crate::render::indent`] so multi-line configuration survives unchanged.

mod builder;
mod names;
mod set;

pub use builder::{GatewayManifests, GatewayManifestsBuilder};
pub use names::FixtureNames;
pub use set::ResourceSet;

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::api::ObjectMeta;

use crate::error::{Result, ScaffoldError};
use crate::render::indent;

/// Kinds of resource a fixture is made of, in apply order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    ConfigMap,
    Deployment,
    Service,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
        }
    }

    #[must_use]
    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::ConfigMap | ResourceKind::Service => "v1",
            ResourceKind::Deployment => "apps/v1",
        }
    }

    /// Position in the apply order; lower applies first
    ///
    /// Deployments mount ConfigMaps, and Services are listed after the
    /// workload they select so failures read top to bottom.
    #[must_use]
    pub fn apply_rank(&self) -> u8 {
        match self {
            ResourceKind::ConfigMap => 0,
            ResourceKind::Deployment => 1,
            ResourceKind::Service => 2,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cluster resource belonging to a fixture
#[derive(Debug, Clone)]
pub enum ResourceManifest {
    ConfigMap(ConfigMap),
    Deployment(Deployment),
    Service(Service),
}

impl ResourceManifest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceManifest::ConfigMap(_) => ResourceKind::ConfigMap,
            ResourceManifest::Deployment(_) => ResourceKind::Deployment,
            ResourceManifest::Service(_) => ResourceKind::Service,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ResourceManifest::ConfigMap(cm) => &cm.metadata,
            ResourceManifest::Deployment(d) => &d.metadata,
            ResourceManifest::Service(s) => &s.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    /// `Kind/name`, used in errors and logs
    pub fn resource_id(&self) -> String {
        format!("{}/{}", self.kind(), self.name())
    }

    /// Pod template labels for a Deployment, empty otherwise
    pub fn pod_labels(&self) -> BTreeMap<String, String> {
        match self {
            ResourceManifest::Deployment(d) => d
                .spec
                .as_ref()
                .and_then(|spec| spec.template.metadata.as_ref())
                .and_then(|meta| meta.labels.clone())
                .unwrap_or_default(),
            _ => BTreeMap::new(),
        }
    }

    /// Names of ConfigMaps a Deployment mounts as volumes
    pub fn config_map_refs(&self) -> Vec<&str> {
        match self {
            ResourceManifest::Deployment(d) => d
                .spec
                .as_ref()
                .and_then(|spec| spec.template.spec.as_ref())
                .and_then(|pod| pod.volumes.as_ref())
                .into_iter()
                .flatten()
                .filter_map(|volume| volume.config_map.as_ref())
                .map(|source| source.name.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Label selector of a Service, empty otherwise
    pub fn selector(&self) -> BTreeMap<String, String> {
        match self {
            ResourceManifest::Service(s) => s
                .spec
                .as_ref()
                .and_then(|spec| spec.selector.clone())
                .unwrap_or_default(),
            _ => BTreeMap::new(),
        }
    }

    /// Manifest text handed to the orchestrator
    pub fn to_yaml(&self) -> Result<String> {
        let serialized = match self {
            ResourceManifest::ConfigMap(cm) => config_map_yaml(cm),
            ResourceManifest::Deployment(d) => serde_yaml::to_string(d),
            ResourceManifest::Service(s) => serde_yaml::to_string(s),
        };
        serialized.map_err(|source| ScaffoldError::Serialize {
            resource: self.resource_id(),
            source,
        })
    }
}

impl From<ConfigMap> for ResourceManifest {
    fn from(cm: ConfigMap) -> Self {
        ResourceManifest::ConfigMap(cm)
    }
}

impl From<Deployment> for ResourceManifest {
    fn from(d: Deployment) -> Self {
        ResourceManifest::Deployment(d)
    }
}

impl From<Service> for ResourceManifest {
    fn from(s: Service) -> Self {
        ResourceManifest::Service(s)
    }
}

/// ConfigMap layout with every data entry as a literal block scalar
///
/// The `2` indentation indicator pins the content indent, so values whose
/// first line starts with spaces or is blank still parse back unchanged. The
/// chomping indicator is chosen per value so trailing newlines are exact.
fn config_map_yaml(cm: &ConfigMap) -> std::result::Result<String, serde_yaml::Error> {
    let metadata = serde_yaml::to_string(&cm.metadata)?;

    let mut out = String::new();
    out.push_str("apiVersion: v1\nkind: ConfigMap\nmetadata:\n");
    out.push_str(&indent(metadata.trim_end(), "  "));
    out.push('\n');

    if let Some(data) = cm.data.as_ref().filter(|data| !data.is_empty()) {
        out.push_str("data:\n");
        for (key, value) in data {
            let key = serde_yaml::to_string(key)?;
            let (chomping, body) = block_chomping(value);
            out.push_str(&format!("  {}: |2{}\n", key.trim_end(), chomping));
            out.push_str(&indent(body, crate::constants::DEFAULT_INDENT));
            out.push('\n');
        }
    }

    Ok(out)
}

/// Chomping indicator for `value` and the text to emit before the final break
///
/// - no trailing newline: strip (`-`)
/// - exactly one trailing newline after content: clip (no indicator)
/// - a lone newline or two or more: keep (`+`)
fn block_chomping(value: &str) -> (&'static str, &str) {
    match value.strip_suffix('\n') {
        None => ("-", value),
        Some(body) if body.is_empty() || body.ends_with('\n') => ("+", body),
        Some(body) => ("", body),
    }
}
