//! # Fixture Lifecycle
//!
//! Creates, readies, resolves and tears down one gateway fixture.
//!
//! ## Lifecycle
//!
//! `Unapplied → Applying → Applied → Ready → TornDown`
//!
//! States only move forward. `Ready` is optional: a caller that has its own
//! readiness check may resolve URLs and tear down straight from `Applied`.
//! Applying stops at the first failure and leaves already-applied resources
//! in place. Cleanup is always an explicit [`FixtureController::teardown`],
//! which accepts a fixture in any state. Use [`FixtureController::prepare`]
//! and [`FixtureController::apply`] to keep the handle when applying fails.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::Service;
use tracing::{debug, info};

use crate::config::ScaffoldOptions;
use crate::constants::{HTTP_ADMIN_PORT_NAME, HTTP_PORT_NAME};
use crate::endpoint;
use crate::error::{Result, ScaffoldError};
use crate::manifest::{FixtureNames, GatewayManifests, ResourceSet};
use crate::orchestrator::{ClusterTopology, KubeOrchestrator, Orchestrator, StaticTopology};
use crate::render;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FixtureState {
    #[default]
    Unapplied,
    Applying,
    Applied,
    Ready,
    TornDown,
}

/// Forward-only state tracker
#[derive(Debug, Clone, Copy, Default)]
struct Lifecycle {
    state: FixtureState,
}

impl Lifecycle {
    fn advance(&mut self, to: FixtureState) -> Result<()> {
        if to <= self.state {
            return Err(ScaffoldError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!(from = ?self.state, to = ?to, "Fixture state change");
        self.state = to;
        Ok(())
    }
}

/// Handle to a gateway fixture
///
/// Owned by the test that created it; pass it back to the controller to apply,
/// wait, resolve URLs and tear down.
#[derive(Debug, Clone)]
pub struct Fixture {
    names: FixtureNames,
    resources: ResourceSet,
    service: Option<Service>,
    create_namespace: bool,
    owns_namespace: bool,
    lifecycle: Lifecycle,
}

impl Fixture {
    pub fn names(&self) -> &FixtureNames {
        &self.names
    }

    pub fn namespace(&self) -> &str {
        self.names.namespace()
    }

    /// Live Service as read back after apply
    pub fn service(&self) -> Option<&Service> {
        self.service.as_ref()
    }

    pub fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    pub fn state(&self) -> FixtureState {
        self.lifecycle.state
    }

    /// Whether teardown deletes the namespace
    pub fn owns_namespace(&self) -> bool {
        self.owns_namespace
    }
}

pub struct FixtureController {
    orchestrator: Arc<dyn Orchestrator>,
    topology: Arc<dyn ClusterTopology>,
}

impl fmt::Debug for FixtureController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureController").finish_non_exhaustive()
    }
}

impl FixtureController {
    pub fn new(orchestrator: Arc<dyn Orchestrator>, topology: Arc<dyn ClusterTopology>) -> Self {
        Self {
            orchestrator,
            topology,
        }
    }

    /// Controller backed by the ambient kubeconfig
    ///
    /// Node addresses come from `options.node_addresses` when set, otherwise
    /// from the cluster's Ready nodes.
    pub async fn connect(options: &ScaffoldOptions) -> anyhow::Result<Self> {
        let cluster = Arc::new(KubeOrchestrator::try_default().await?);
        let topology: Arc<dyn ClusterTopology> = if options.node_addresses.is_empty() {
            Arc::clone(&cluster) as Arc<dyn ClusterTopology>
        } else {
            Arc::new(StaticTopology::new(options.node_addresses.clone()))
        };
        Ok(Self::new(cluster, topology))
    }

    /// Render both configuration templates and build the fixture manifests
    pub fn manifests(&self, options: &ScaffoldOptions) -> Result<GatewayManifests> {
        let default_config = render::render(&options.default_config_path, &options.render_values)?;
        let override_config = render::render(&options.config_path, &options.render_values)?;

        Ok(GatewayManifests::builder(options.names())
            .image(options.image.clone())
            .default_config(default_config)
            .override_config(override_config)
            .build())
    }

    /// Render the manifests into an unapplied fixture handle
    ///
    /// Nothing touches the cluster yet, so template errors leave no trace.
    pub fn prepare(&self, options: &ScaffoldOptions) -> Result<Fixture> {
        let resources = self.manifests(options)?.into_resource_set();
        resources.validate()?;

        Ok(Fixture {
            names: options.names(),
            resources,
            service: None,
            create_namespace: options.create_namespace,
            owns_namespace: false,
            lifecycle: Lifecycle::default(),
        })
    }

    /// Apply ConfigMap, Deployment and Service, then read back the Service
    ///
    /// On failure the fixture keeps what it learned (namespace ownership and
    /// the resource set), so [`Self::teardown`] can still clean up.
    pub async fn apply(&self, fixture: &mut Fixture) -> Result<()> {
        if fixture.state() != FixtureState::Unapplied {
            return Err(ScaffoldError::InvalidTransition {
                from: fixture.state(),
                to: FixtureState::Applying,
            });
        }
        let namespace = fixture.namespace().to_string();

        if fixture.create_namespace {
            fixture.owns_namespace = self
                .orchestrator
                .ensure_namespace(&namespace)
                .await
                .map_err(|source| ScaffoldError::ApplyError {
                    resource: format!("Namespace/{namespace}"),
                    source,
                })?;
        }

        fixture.lifecycle.advance(FixtureState::Applying)?;
        info!(namespace = %namespace, "Applying gateway fixture");
        fixture
            .resources
            .apply_all(self.orchestrator.as_ref(), &namespace)
            .await?;

        let service_name = fixture.names.service();
        let service = self
            .orchestrator
            .get_service(&namespace, &service_name)
            .await
            .map_err(|source| ScaffoldError::ServiceLookup {
                name: service_name,
                source,
            })?;
        fixture.service = Some(service);
        fixture.lifecycle.advance(FixtureState::Applied)?;

        info!(namespace = %namespace, "Gateway fixture applied");
        Ok(())
    }

    /// [`Self::prepare`] then [`Self::apply`]
    ///
    /// The handle is dropped on failure; callers that want to clean up after a
    /// failed apply should call the two steps themselves.
    pub async fn create(&self, options: &ScaffoldOptions) -> Result<Fixture> {
        let mut fixture = self.prepare(options)?;
        self.apply(&mut fixture).await?;
        Ok(fixture)
    }

    /// Block until the gateway Deployment has every replica ready
    ///
    /// URL resolution never waits on its own; call this first when the test
    /// needs the gateway to be serving.
    pub async fn wait_until_ready(&self, fixture: &mut Fixture, timeout: Duration) -> Result<()> {
        if fixture.state() != FixtureState::Applied {
            return Err(ScaffoldError::InvalidTransition {
                from: fixture.state(),
                to: FixtureState::Ready,
            });
        }
        let name = fixture.names.deployment();
        self.orchestrator
            .wait_for_deployment_ready(fixture.namespace(), &name, timeout)
            .await
            .map_err(|source| ScaffoldError::Readiness {
                name: name.clone(),
                source,
            })?;
        fixture.lifecycle.advance(FixtureState::Ready)?;
        info!(namespace = %fixture.namespace(), deployment = %name, "Gateway fixture ready");
        Ok(())
    }

    /// URL for the named Service port on the first cluster node
    ///
    /// Only `Applied` and `Ready` fixtures have a URL.
    pub async fn resolve_url(&self, fixture: &Fixture, port_name: &str) -> Result<String> {
        let service = match (fixture.state(), fixture.service.as_ref()) {
            (FixtureState::Applied | FixtureState::Ready, Some(service)) => service,
            (state, _) => return Err(ScaffoldError::FixtureUnavailable { state }),
        };
        let nodes = self
            .topology
            .node_addresses()
            .await
            .map_err(ScaffoldError::Topology)?;
        let url = endpoint::resolve_url(service, &nodes, port_name)?;
        debug!(port = %port_name, url = %url, "Resolved gateway URL");
        Ok(url)
    }

    /// URL of the proxy port
    pub async fn http_url(&self, fixture: &Fixture) -> Result<String> {
        self.resolve_url(fixture, HTTP_PORT_NAME).await
    }

    /// URL of the admin API port
    pub async fn admin_url(&self, fixture: &Fixture) -> Result<String> {
        self.resolve_url(fixture, HTTP_ADMIN_PORT_NAME).await
    }

    /// Delete Service, Deployment and ConfigMap, then the namespace if we created it
    ///
    /// Works from any state except `TornDown`; resources that were never
    /// applied are already gone.
    pub async fn teardown(&self, fixture: &mut Fixture) -> Result<()> {
        if fixture.state() == FixtureState::TornDown {
            return Err(ScaffoldError::InvalidTransition {
                from: FixtureState::TornDown,
                to: FixtureState::TornDown,
            });
        }

        let namespace = fixture.namespace().to_string();
        info!(namespace = %namespace, "Tearing down gateway fixture");
        fixture
            .resources
            .delete_all(self.orchestrator.as_ref(), &namespace)
            .await?;

        if fixture.owns_namespace {
            self.orchestrator
                .delete_namespace(&namespace)
                .await
                .map_err(|source| ScaffoldError::DeleteError {
                    resource: format!("Namespace/{namespace}"),
                    source,
                })?;
        } else {
            debug!(namespace = %namespace, "Namespace was not created by the scaffold; leaving it");
        }

        fixture.lifecycle.advance(FixtureState::TornDown)
    }
}
