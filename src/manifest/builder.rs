//! Builder for the three gateway manifests.
//!
//! Field values mirror what the gateway e2e suites were written against:
//! container ports 9080/9180, TCP probes on 9080, ConfigMap files mounted with
//! `subPath` under the gateway's conf directory, and a NodePort Service.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment,
};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, PodSpec, PodTemplateSpec, Probe,
    Service, ServicePort, ServiceSpec, TCPSocketAction, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;

use super::{FixtureNames, ResourceManifest, ResourceSet};
use crate::constants::*;

/// The ConfigMap, Deployment and Service making up one gateway fixture
#[derive(Debug, Clone)]
pub struct GatewayManifests {
    pub config_map: ConfigMap,
    pub deployment: Deployment,
    pub service: Service,
}

impl GatewayManifests {
    pub fn builder(names: FixtureNames) -> GatewayManifestsBuilder {
        GatewayManifestsBuilder::new(names)
    }

    /// Manifests in apply order: ConfigMap, Deployment, Service
    pub fn into_resource_set(self) -> ResourceSet {
        ResourceSet::new(vec![
            ResourceManifest::from(self.config_map),
            ResourceManifest::from(self.deployment),
            ResourceManifest::from(self.service),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct GatewayManifestsBuilder {
    names: FixtureNames,
    image: String,
    default_config: String,
    override_config: String,
}

impl GatewayManifestsBuilder {
    pub fn new(names: FixtureNames) -> Self {
        Self {
            names,
            image: DEFAULT_IMAGE.to_string(),
            default_config: String::new(),
            override_config: String::new(),
        }
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// Rendered text stored under `config-default.yaml`
    pub fn default_config(mut self, text: impl Into<String>) -> Self {
        self.default_config = text.into();
        self
    }

    /// Rendered text stored under `config.yaml`
    pub fn override_config(mut self, text: impl Into<String>) -> Self {
        self.override_config = text.into();
        self
    }

    pub fn build(self) -> GatewayManifests {
        GatewayManifests {
            config_map: self.config_map(),
            deployment: self.deployment(),
            service: self.service(),
        }
    }

    fn metadata(&self, name: String) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.names.namespace().to_string()),
            ..Default::default()
        }
    }

    fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(APP_LABEL.to_string(), self.names.app_label())])
    }

    fn config_map(&self) -> ConfigMap {
        ConfigMap {
            metadata: self.metadata(self.names.config_map()),
            data: Some(BTreeMap::from([
                (CONFIG_DEFAULT_KEY.to_string(), self.default_config.clone()),
                (CONFIG_OVERRIDE_KEY.to_string(), self.override_config.clone()),
            ])),
            ..Default::default()
        }
    }

    fn deployment(&self) -> Deployment {
        let labels = self.labels();

        Deployment {
            metadata: self.metadata(self.names.deployment()),
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                strategy: Some(DeploymentStrategy {
                    rolling_update: Some(RollingUpdateDeployment {
                        max_surge: Some(IntOrString::String(ROLLING_MAX_SURGE.to_string())),
                        max_unavailable: Some(IntOrString::Int(ROLLING_MAX_UNAVAILABLE)),
                    }),
                    type_: Some("RollingUpdate".to_string()),
                }),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        termination_grace_period_seconds: Some(0),
                        containers: vec![self.container()],
                        volumes: Some(vec![Volume {
                            name: CONFIG_VOLUME_NAME.to_string(),
                            config_map: Some(ConfigMapVolumeSource {
                                name: self.names.config_map(),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn container(&self) -> Container {
        Container {
            name: self.names.deployment(),
            image: Some(self.image.clone()),
            image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
            liveness_probe: Some(tcp_probe(HTTP_PORT)),
            readiness_probe: Some(tcp_probe(HTTP_PORT)),
            ports: Some(vec![
                container_port(HTTP_PORT_NAME, HTTP_PORT),
                container_port(HTTP_ADMIN_PORT_NAME, HTTP_ADMIN_PORT),
            ]),
            volume_mounts: Some(vec![
                config_mount(CONFIG_OVERRIDE_KEY),
                config_mount(CONFIG_DEFAULT_KEY),
            ]),
            ..Default::default()
        }
    }

    fn service(&self) -> Service {
        Service {
            metadata: self.metadata(self.names.service()),
            spec: Some(ServiceSpec {
                selector: Some(self.labels()),
                ports: Some(vec![
                    service_port(HTTP_PORT_NAME, HTTP_PORT),
                    service_port(HTTP_ADMIN_PORT_NAME, HTTP_ADMIN_PORT),
                ]),
                type_: Some(SERVICE_TYPE.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn tcp_probe(port: i32) -> Probe {
    Probe {
        failure_threshold: Some(PROBE_FAILURE_THRESHOLD),
        initial_delay_seconds: Some(PROBE_INITIAL_DELAY_SECS),
        period_seconds: Some(PROBE_PERIOD_SECS),
        success_threshold: Some(PROBE_SUCCESS_THRESHOLD),
        tcp_socket: Some(TCPSocketAction {
            port: IntOrString::Int(port),
            ..Default::default()
        }),
        timeout_seconds: Some(PROBE_TIMEOUT_SECS),
        ..Default::default()
    }
}

fn container_port(name: &str, port: i32) -> ContainerPort {
    ContainerPort {
        container_port: port,
        name: Some(name.to_string()),
        protocol: Some(PORT_PROTOCOL.to_string()),
        ..Default::default()
    }
}

fn service_port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        protocol: Some(PORT_PROTOCOL.to_string()),
        target_port: Some(IntOrString::Int(port)),
        ..Default::default()
    }
}

fn config_mount(key: &str) -> VolumeMount {
    VolumeMount {
        mount_path: format!("{CONFIG_MOUNT_DIR}/{key}"),
        name: CONFIG_VOLUME_NAME.to_string(),
        sub_path: Some(key.to_string()),
        ..Default::default()
    }
}
