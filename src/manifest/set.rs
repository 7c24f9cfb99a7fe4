//! Ordered set of manifests applied as one unit.

use tracing::{debug, info, warn};

use super::{ResourceKind, ResourceManifest};
use crate::error::{Result, ScaffoldError};
use crate::orchestrator::Orchestrator;

/// Manifests in the order they are applied
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    manifests: Vec<ResourceManifest>,
}

impl ResourceSet {
    pub fn new(manifests: Vec<ResourceManifest>) -> Self {
        Self { manifests }
    }

    pub fn push(&mut self, manifest: impl Into<ResourceManifest>) {
        self.manifests.push(manifest.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceManifest> {
        self.manifests.iter()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// First manifest of `kind`
    pub fn find(&self, kind: ResourceKind) -> Option<&ResourceManifest> {
        self.manifests.iter().find(|m| m.kind() == kind)
    }

    /// Stable sort into ConfigMap, Deployment, Service order
    #[must_use]
    pub fn ordered(mut self) -> Self {
        self.manifests.sort_by_key(|m| m.kind().apply_rank());
        self
    }

    /// Check that every dependency appears before its dependant
    ///
    /// A Deployment's ConfigMap volumes must name an earlier ConfigMap, and a
    /// Service's selector must match the pod labels of an earlier Deployment.
    pub fn validate(&self) -> Result<()> {
        for (position, manifest) in self.manifests.iter().enumerate() {
            let earlier = &self.manifests[..position];

            for config_map in manifest.config_map_refs() {
                let applied_before = earlier
                    .iter()
                    .any(|m| m.kind() == ResourceKind::ConfigMap && m.name() == config_map);
                if !applied_before {
                    return Err(ScaffoldError::UnresolvedDependency {
                        resource: manifest.resource_id(),
                        dependency: format!("{}/{config_map}", ResourceKind::ConfigMap),
                    });
                }
            }

            let selector = manifest.selector();
            if manifest.kind() == ResourceKind::Service && !selector.is_empty() {
                let selected = earlier.iter().any(|m| {
                    let labels = m.pod_labels();
                    m.kind() == ResourceKind::Deployment
                        && selector.iter().all(|(k, v)| labels.get(k) == Some(v))
                });
                if !selected {
                    let rendered: Vec<String> =
                        selector.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    return Err(ScaffoldError::UnresolvedDependency {
                        resource: manifest.resource_id(),
                        dependency: format!("{} with labels {}", ResourceKind::Deployment, rendered.join(",")),
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply every manifest in order, stopping at the first failure
    ///
    /// Resources applied before the failure stay in the cluster.
    pub async fn apply_all(&self, orchestrator: &dyn Orchestrator, namespace: &str) -> Result<()> {
        for manifest in &self.manifests {
            let resource = manifest.resource_id();
            let text = manifest.to_yaml()?;

            debug!(namespace = %namespace, resource = %resource, "Applying manifest");
            if let Err(source) = orchestrator.apply_manifest_text(namespace, &text).await {
                warn!(namespace = %namespace, resource = %resource, "Apply failed: {:#}", source);
                return Err(ScaffoldError::ApplyError { resource, source });
            }
            info!(namespace = %namespace, resource = %resource, "Applied manifest");
        }
        Ok(())
    }

    /// Delete every manifest in reverse order, stopping at the first failure
    pub async fn delete_all(&self, orchestrator: &dyn Orchestrator, namespace: &str) -> Result<()> {
        for manifest in self.manifests.iter().rev() {
            let resource = manifest.resource_id();
            if let Err(source) = orchestrator
                .delete(namespace, manifest.kind(), manifest.name())
                .await
            {
                warn!(namespace = %namespace, resource = %resource, "Delete failed: {:#}", source);
                return Err(ScaffoldError::DeleteError { resource, source });
            }
            info!(namespace = %namespace, resource = %resource, "Deleted resource");
        }
        Ok(())
    }
}

impl IntoIterator for ResourceSet {
    type Item = ResourceManifest;
    type IntoIter = std::vec::IntoIter<ResourceManifest>;

    fn into_iter(self) -> Self::IntoIter {
        self.manifests.into_iter()
    }
}
