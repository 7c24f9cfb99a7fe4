//! Common utilities for fixture lifecycle tests
//!
//! Provides:
//! - `RecordingOrchestrator`, an in-memory orchestrator that records every call
//! - Template helpers writing gateway configs into a temp directory

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use gateway_scaffold::manifest::ResourceKind;
use gateway_scaffold::orchestrator::Orchestrator;
use gateway_scaffold::config::ScaffoldOptions;
use k8s_openapi::api::core::v1::Service;

/// Node ports are assigned as `port + NODE_PORT_OFFSET` (9080 -> 31080)
pub const NODE_PORT_OFFSET: i32 = 22000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EnsureNamespace(String),
    Apply { kind: String, name: String },
    GetService(String),
    WaitReady(String),
    Delete(ResourceKind, String),
    DeleteNamespace(String),
}

#[derive(Debug, Default)]
pub struct RecordingOrchestrator {
    calls: Mutex<Vec<Call>>,
    applied_text: Mutex<Vec<String>>,
    services: Mutex<Vec<Service>>,
    existing_namespaces: Mutex<HashSet<String>>,
    fail_apply_kind: Option<String>,
    fail_ready: bool,
}

impl RecordingOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `apply_manifest_text` for manifests of `kind`
    pub fn failing_apply(kind: &str) -> Self {
        Self {
            fail_apply_kind: Some(kind.to_string()),
            ..Self::default()
        }
    }

    pub fn failing_ready() -> Self {
        Self {
            fail_ready: true,
            ..Self::default()
        }
    }

    pub fn with_namespace(self, namespace: &str) -> Self {
        self.existing_namespaces
            .lock()
            .unwrap()
            .insert(namespace.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Kinds applied, in order
    pub fn applied_kinds(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Apply { kind, .. } => Some(kind),
                _ => None,
            })
            .collect()
    }

    pub fn applied_text(&self) -> Vec<String> {
        self.applied_text.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Orchestrator for RecordingOrchestrator {
    async fn apply_manifest_text(&self, _namespace: &str, text: &str) -> Result<()> {
        let doc: serde_yaml::Value = serde_yaml::from_str(text)?;
        let kind = doc["kind"].as_str().unwrap_or_default().to_string();
        let name = doc["metadata"]["name"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        self.record(Call::Apply {
            kind: kind.clone(),
            name,
        });

        if self.fail_apply_kind.as_deref() == Some(kind.as_str()) {
            return Err(anyhow!("admission webhook denied {kind}"));
        }

        self.applied_text.lock().unwrap().push(text.to_string());

        if kind == "Service" {
            let mut service: Service = serde_yaml::from_str(text)?;
            if let Some(ports) = service.spec.as_mut().and_then(|s| s.ports.as_mut()) {
                for port in ports {
                    port.node_port = Some(port.port + NODE_PORT_OFFSET);
                }
            }
            self.services.lock().unwrap().push(service);
        }
        Ok(())
    }

    async fn get_service(&self, _namespace: &str, name: &str) -> Result<Service> {
        self.record(Call::GetService(name.to_string()));
        self.services
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.metadata.name.as_deref() == Some(name))
            .cloned()
            .ok_or_else(|| anyhow!("services \"{name}\" not found"))
    }

    async fn wait_for_deployment_ready(
        &self,
        _namespace: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<()> {
        self.record(Call::WaitReady(name.to_string()));
        if self.fail_ready {
            return Err(anyhow!("deployment {name} not available after {timeout:?}"));
        }
        Ok(())
    }

    async fn delete(&self, _namespace: &str, kind: ResourceKind, name: &str) -> Result<()> {
        self.record(Call::Delete(kind, name.to_string()));
        Ok(())
    }

    async fn ensure_namespace(&self, namespace: &str) -> Result<bool> {
        self.record(Call::EnsureNamespace(namespace.to_string()));
        Ok(self
            .existing_namespaces
            .lock()
            .unwrap()
            .insert(namespace.to_string()))
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<()> {
        self.record(Call::DeleteNamespace(namespace.to_string()));
        self.existing_namespaces.lock().unwrap().remove(namespace);
        Ok(())
    }
}

pub const DEFAULT_TEMPLATE: &str = "\
apisix:
  node_listen: 9080
  enable_admin: true
etcd:
  host:
    - \"http://{{ .EtcdServiceFQDN }}:2379\"
";

pub const OVERRIDE_TEMPLATE: &str = "\
deployment:
  admin:
    allow_admin:
      - 0.0.0.0/0
";

/// Options pointing at freshly written default/override templates in `dir`
pub fn options_with_templates(dir: &Path, namespace: &str) -> ScaffoldOptions {
    let default_path = dir.join("config-default.yaml");
    let override_path = dir.join("config.yaml");
    std::fs::write(&default_path, DEFAULT_TEMPLATE).unwrap();
    std::fs::write(&override_path, OVERRIDE_TEMPLATE).unwrap();

    ScaffoldOptions {
        default_config_path: default_path,
        config_path: override_path,
        namespace: namespace.to_string(),
        ..ScaffoldOptions::default()
    }
    .with_value("EtcdServiceFQDN", "etcd.e2e.svc.cluster.local")
}
