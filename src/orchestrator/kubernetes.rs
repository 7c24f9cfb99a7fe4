//! `kube`-backed orchestrator.
//!
//! Manifests are applied with server-side apply on `DynamicObject`, so applying
//! the same text twice leaves the cluster unchanged.

use std::fmt::Debug;
use std::sync::Once;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Node, Service};
use kube::api::{
    Api, DeleteParams, DynamicObject, GroupVersionKind, ListParams, ObjectMeta, Patch, PatchParams,
    PostParams,
};
use kube::discovery::ApiResource;
use kube::Client;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, info};

use super::{ClusterTopology, Orchestrator};
use crate::constants::{DEFAULT_READY_POLL_INTERVAL_MS, FIELD_MANAGER};
use crate::manifest::ResourceKind;

/// Label put on namespaces the scaffold creates
const FIXTURE_NAMESPACE_LABEL: &str = "gateway-scaffold.io/fixture";

static CRYPTO_INIT: Once = Once::new();

/// Install the ring rustls crypto provider
///
/// Must run before the first `kube::Client` is built. Safe to call repeatedly.
pub fn install_crypto_provider() {
    CRYPTO_INIT.call_once(|| {
        // Err only means another provider was installed first, which is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
    poll_interval: Duration,
}

impl Debug for KubeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeOrchestrator")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl KubeOrchestrator {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            poll_interval: Duration::from_millis(DEFAULT_READY_POLL_INTERVAL_MS),
        }
    }

    /// Connect using the ambient kubeconfig or in-cluster config
    pub async fn try_default() -> Result<Self> {
        install_crypto_provider();
        let client = Client::try_default()
            .await
            .context("Failed to create Kubernetes client. Ensure cluster is accessible.")?;
        info!("Kubernetes client created");
        Ok(Self::new(client))
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn apply_manifest_text(&self, namespace: &str, text: &str) -> Result<()> {
        let mut obj: DynamicObject = serde_yaml::from_str(text).context("Invalid manifest YAML")?;

        let types = obj
            .types
            .clone()
            .ok_or_else(|| anyhow!("Manifest is missing apiVersion/kind"))?;
        let name = obj
            .metadata
            .name
            .clone()
            .ok_or_else(|| anyhow!("Manifest is missing metadata.name"))?;

        let (group, version) = match types.api_version.split_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), types.api_version.clone()),
        };
        let gvk = GroupVersionKind {
            group,
            version,
            kind: types.kind.clone(),
        };
        let api_resource = ApiResource::from_gvk(&gvk);
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &api_resource);

        obj.metadata.namespace = Some(namespace.to_string());

        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(&name, &params, &Patch::Apply(&obj))
            .await
            .with_context(|| format!("Failed to apply {}/{} in {}", types.kind, name, namespace))?;

        debug!(kind = %types.kind, name = %name, namespace = %namespace, "Server-side applied manifest");
        Ok(())
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        services
            .get(name)
            .await
            .with_context(|| format!("Failed to get Service {namespace}/{name}"))
    }

    async fn wait_for_deployment_ready(
        &self,
        namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<()> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);

        let start = Instant::now();
        let mut last_error = None;
        while start.elapsed() < timeout {
            match deployments.get(name).await {
                Ok(deployment) if deployment_ready(&deployment) => {
                    info!(namespace = %namespace, deployment = %name, "Deployment is ready");
                    return Ok(());
                }
                Ok(_) => last_error = None,
                Err(e) => {
                    debug!(
                        namespace = %namespace,
                        deployment = %name,
                        error = %e,
                        "Failed to get deployment"
                    );
                    last_error = Some(e);
                }
            }
            sleep(self.poll_interval).await;
        }

        Err(readiness_timeout(namespace, name, timeout, last_error))
    }

    async fn delete(&self, namespace: &str, kind: ResourceKind, name: &str) -> Result<()> {
        let client = self.client.clone();
        let deleted = match kind {
            ResourceKind::ConfigMap => {
                delete_named(Api::<ConfigMap>::namespaced(client, namespace), name).await
            }
            ResourceKind::Deployment => {
                delete_named(Api::<Deployment>::namespaced(client, namespace), name).await
            }
            ResourceKind::Service => {
                delete_named(Api::<Service>::namespaced(client, namespace), name).await
            }
        };
        deleted.with_context(|| format!("Failed to delete {kind}/{name} in {namespace}"))
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<bool> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());

        match namespaces.get(namespace).await {
            Ok(_) => {
                debug!(namespace = %namespace, "Namespace already exists");
                return Ok(false);
            }
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {}
            Err(e) => return Err(e).with_context(|| format!("Failed to get namespace {namespace}")),
        }

        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(namespace.to_string()),
                labels: Some(
                    [(FIXTURE_NAMESPACE_LABEL.to_string(), "true".to_string())]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
            ..Default::default()
        };
        namespaces
            .create(&PostParams::default(), &ns)
            .await
            .with_context(|| format!("Failed to create namespace {namespace}"))?;

        info!(namespace = %namespace, "Created fixture namespace");
        Ok(true)
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        delete_named(namespaces, namespace)
            .await
            .with_context(|| format!("Failed to delete namespace {namespace}"))?;
        info!(namespace = %namespace, "Deleted fixture namespace");
        Ok(())
    }
}

#[async_trait]
impl ClusterTopology for KubeOrchestrator {
    async fn node_addresses(&self) -> Result<Vec<String>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes
            .list(&ListParams::default())
            .await
            .context("Failed to list nodes")?;
        Ok(ready_node_addresses(&list.items))
    }
}

/// Addresses of Ready nodes, preferring InternalIP over ExternalIP
///
/// Nodes keep the order the API returned them in; nodes with neither address
/// type are skipped.
pub fn ready_node_addresses(nodes: &[Node]) -> Vec<String> {
    nodes
        .iter()
        .filter(|node| node_ready(node))
        .filter_map(|node| {
            let addresses = node.status.as_ref()?.addresses.as_ref()?;
            ["InternalIP", "ExternalIP"].iter().find_map(|wanted| {
                addresses
                    .iter()
                    .find(|addr| addr.type_ == *wanted)
                    .map(|addr| addr.address.clone())
            })
        })
        .collect()
}

fn node_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

/// Timeout error, with the last failed `get` (if any) as its source
fn readiness_timeout<E>(
    namespace: &str,
    name: &str,
    timeout: Duration,
    last_error: Option<E>,
) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let timed_out = format!("Deployment {namespace}/{name} did not become ready within {timeout:?}");
    match last_error {
        Some(e) => anyhow::Error::new(e).context(timed_out),
        None => anyhow!(timed_out),
    }
}

/// All desired replicas are updated and passing their readiness probes
///
/// The `Available` condition is not enough: with one replica and
/// `maxUnavailable: 1` it turns true before any pod is ready.
fn deployment_ready(deployment: &Deployment) -> bool {
    let Some(status) = deployment.status.as_ref() else {
        return false;
    };
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);

    let observed = match (deployment.metadata.generation, status.observed_generation) {
        (Some(generation), Some(observed)) => observed >= generation,
        (Some(_), None) => false,
        (None, _) => true,
    };

    observed
        && status.updated_replicas.unwrap_or(0) == desired
        && status.ready_replicas.unwrap_or(0) >= desired
        && status.available_replicas.unwrap_or(0) >= desired
}

async fn delete_named<K>(api: Api<K>, name: &str) -> Result<()>
where
    K: Clone + DeserializeOwned + Debug,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
            debug!(name = %name, "Resource already gone");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
