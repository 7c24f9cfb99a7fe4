//! # Endpoint Resolution
//!
//! Turns a NodePort Service plus the cluster's node addresses into a URL a
//! test can dial from outside the cluster.
//!
//! Only the first node is used. The scaffold targets single-node kind and
//! minikube clusters, where every node port is served on that node.

use k8s_openapi::api::core::v1::Service;

use crate::error::{Result, ScaffoldError};

/// Build `http://<first node>:<node port of port_name>`
///
/// Fails with `NoAvailableNode` when `nodes` is empty, whatever the Service
/// holds, and with `PortNotFound` when no Service port is named `port_name`.
pub fn resolve_url(service: &Service, nodes: &[String], port_name: &str) -> Result<String> {
    let host = nodes.first().ok_or(ScaffoldError::NoAvailableNode)?;
    let service_name = service.metadata.name.clone().unwrap_or_default();

    let port = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .into_iter()
        .flatten()
        .find(|port| port.name.as_deref() == Some(port_name))
        .ok_or_else(|| ScaffoldError::PortNotFound {
            service: service_name.clone(),
            port: port_name.to_string(),
        })?;

    let node_port = port.node_port.ok_or_else(|| ScaffoldError::NodePortUnassigned {
        service: service_name,
        port: port_name.to_string(),
    })?;

    Ok(format!("http://{host}:{node_port}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{ServicePort, ServiceSpec};
    use kube::api::ObjectMeta;

    fn service(ports: &[(&str, Option<i32>)]) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some("apisix-service-e2e-test".to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                ports: Some(
                    ports
                        .iter()
                        .map(|(name, node_port)| ServicePort {
                            name: Some((*name).to_string()),
                            node_port: *node_port,
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn nodes(addrs: &[&str]) -> Vec<String> {
        addrs.iter().map(|a| (*a).to_string()).collect()
    }

    #[test]
    fn test_resolves_http_port() {
        let svc = service(&[("http", Some(31080))]);
        assert_eq!(
            resolve_url(&svc, &nodes(&["10.0.0.5"]), "http").unwrap(),
            "http://10.0.0.5:31080"
        );
    }

    #[test]
    fn test_uses_first_node_only() {
        let svc = service(&[("http", Some(31080)), ("http-admin", Some(31180))]);
        let list = nodes(&["10.0.0.5", "10.0.0.6"]);
        assert_eq!(
            resolve_url(&svc, &list, "http-admin").unwrap(),
            "http://10.0.0.5:31180"
        );
    }

    #[test]
    fn test_is_deterministic() {
        let svc = service(&[("http", Some(31080)), ("http-admin", Some(31180))]);
        let list = nodes(&["10.0.0.5"]);
        let first = resolve_url(&svc, &list, "http").unwrap();
        for _ in 0..10 {
            assert_eq!(resolve_url(&svc, &list, "http").unwrap(), first);
        }
    }

    #[test]
    fn test_missing_port_name() {
        let svc = service(&[("http-admin", Some(31180))]);
        match resolve_url(&svc, &nodes(&["10.0.0.5"]), "http") {
            Err(ScaffoldError::PortNotFound { service, port }) => {
                assert_eq!(service, "apisix-service-e2e-test");
                assert_eq!(port, "http");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_no_nodes_wins_over_missing_port() {
        for svc in [service(&[]), service(&[("http", Some(31080))]), Service::default()] {
            assert!(matches!(
                resolve_url(&svc, &[], "http"),
                Err(ScaffoldError::NoAvailableNode)
            ));
        }
    }

    #[test]
    fn test_service_without_spec_has_no_ports() {
        assert!(matches!(
            resolve_url(&Service::default(), &nodes(&["10.0.0.5"]), "http"),
            Err(ScaffoldError::PortNotFound { .. })
        ));
    }

    #[test]
    fn test_port_without_node_port() {
        let svc = service(&[("http", None)]);
        assert!(matches!(
            resolve_url(&svc, &nodes(&["10.0.0.5"]), "http"),
            Err(ScaffoldError::NodePortUnassigned { .. })
        ));
    }
}
