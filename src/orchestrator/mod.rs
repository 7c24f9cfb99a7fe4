//! # Orchestrator
//!
//! The cluster-facing collaborators of the scaffold.
//!
//! [`Orchestrator`] applies manifest text, reads back Services, reports
//! readiness and deletes resources. [`ClusterTopology`] lists the node
//! addresses NodePort Services are reachable on. Both are traits so fixture
//! logic can be exercised without a cluster; [`KubeOrchestrator`] is the
//! `kube`-backed implementation used against kind/minikube.

mod kubernetes;

pub use kubernetes::{install_crypto_provider, ready_node_addresses, KubeOrchestrator};

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;

use crate::manifest::ResourceKind;

/// Cluster operations the fixture lifecycle needs
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Apply one YAML manifest into `namespace`
    ///
    /// Re-applying an identical manifest must be a no-op.
    async fn apply_manifest_text(&self, namespace: &str, text: &str) -> Result<()>;

    /// Read the live Service, including its assigned node ports
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service>;

    /// Block until the Deployment has every replica updated and ready, or fail after `timeout`
    async fn wait_for_deployment_ready(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<()>;

    /// Delete a resource; a resource that is already gone is not an error
    async fn delete(&self, namespace: &str, kind: ResourceKind, name: &str) -> Result<()>;

    /// Create `namespace` if missing; returns true if it was created
    async fn ensure_namespace(&self, namespace: &str) -> Result<bool>;

    /// Delete `namespace` and everything in it
    async fn delete_namespace(&self, namespace: &str) -> Result<()>;
}

/// Source of node addresses NodePorts can be dialed on
#[async_trait]
pub trait ClusterTopology: Send + Sync {
    /// Reachable node addresses, in a stable order
    async fn node_addresses(&self) -> Result<Vec<String>>;
}

/// Fixed node list, e.g. the output of `minikube ip`
#[derive(Debug, Clone, Default)]
pub struct StaticTopology {
    addresses: Vec<String>,
}

impl StaticTopology {
    pub fn new(addresses: Vec<String>) -> Self {
        Self { addresses }
    }
}

#[async_trait]
impl ClusterTopology for StaticTopology {
    async fn node_addresses(&self) -> Result<Vec<String>> {
        Ok(self.addresses.clone())
    }
}
