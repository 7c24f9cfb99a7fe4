//! # Errors
//!
//! Every failure carries enough context (path, resource, port) to diagnose it
//! from a test log. Collaborator failures arrive as `anyhow::Error` and are kept
//! as the error source.

use std::path::PathBuf;

use thiserror::Error;

use crate::fixture::FixtureState;

pub type Result<T> = std::result::Result<T, ScaffoldError>;

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("template not found: {}", path.display())]
    TemplateNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render {}: missing values for {}", path.display(), missing.join(", "))]
    RenderError { path: PathBuf, missing: Vec<String> },

    #[error("failed to serialize {resource}")]
    Serialize {
        resource: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{resource} depends on {dependency}, which is not applied before it")]
    UnresolvedDependency { resource: String, dependency: String },

    #[error("failed to apply {resource}")]
    ApplyError {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to delete {resource}")]
    DeleteError {
        resource: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to get service {name}")]
    ServiceLookup {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to list cluster nodes")]
    Topology(#[source] anyhow::Error),

    #[error("deployment {name} did not become ready")]
    Readiness {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no available node")]
    NoAvailableNode,

    #[error("no {port} port in service {service}")]
    PortNotFound { service: String, port: String },

    #[error("port {port} of service {service} has no node port assigned")]
    NodePortUnassigned { service: String, port: String },

    #[error("fixture is {state:?}; URLs need an applied fixture")]
    FixtureUnavailable { state: FixtureState },

    #[error("fixture cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: FixtureState, to: FixtureState },
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_serialize_error_reports_source_once() {
        let source = serde_yaml::from_str::<i32>("not a number").unwrap_err();
        let source_text = source.to_string();
        let err = ScaffoldError::Serialize {
            resource: "ConfigMap/apisix-gw-config.yaml".to_string(),
            source,
        };

        assert_eq!(err.to_string(), "failed to serialize ConfigMap/apisix-gw-config.yaml");
        assert_eq!(err.source().map(ToString::to_string), Some(source_text));
    }

    #[test]
    fn test_fixture_unavailable_names_state() {
        let err = ScaffoldError::FixtureUnavailable {
            state: FixtureState::TornDown,
        };
        assert!(err.to_string().contains("TornDown"));
    }
}
