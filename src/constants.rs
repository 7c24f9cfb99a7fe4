//! # Constants
//!
//! Fixed names, ports and probe settings for the gateway fixture.
//!
//! The resource names, ConfigMap keys and port names are consumed by the
//! gateway image and the test suites, so they must stay bit-exact.

/// ConfigMap holding both rendered gateway configuration files
pub const CONFIG_MAP_NAME: &str = "apisix-gw-config.yaml";

/// Deployment name, also used as the `app` label value and container name
pub const DEPLOYMENT_NAME: &str = "apisix-deployment-e2e-test";

/// NodePort Service fronting the Deployment
pub const SERVICE_NAME: &str = "apisix-service-e2e-test";

/// Label key the Service selects on
pub const APP_LABEL: &str = "app";

/// ConfigMap key for the rendered default configuration
pub const CONFIG_DEFAULT_KEY: &str = "config-default.yaml";

/// ConfigMap key for the rendered override configuration
pub const CONFIG_OVERRIDE_KEY: &str = "config.yaml";

/// Volume name the ConfigMap is mounted through
pub const CONFIG_VOLUME_NAME: &str = "apisix-config-yaml-configmap";

/// Directory the gateway reads its configuration from
pub const CONFIG_MOUNT_DIR: &str = "/usr/local/apisix/conf";

pub const DEFAULT_IMAGE: &str = "apache/apisix:latest";
pub const IMAGE_PULL_POLICY: &str = "IfNotPresent";

/// Name of the proxy port
pub const HTTP_PORT_NAME: &str = "http";
pub const HTTP_PORT: i32 = 9080;

/// Name of the admin API port
pub const HTTP_ADMIN_PORT_NAME: &str = "http-admin";
pub const HTTP_ADMIN_PORT: i32 = 9180;

pub const PORT_PROTOCOL: &str = "TCP";
pub const SERVICE_TYPE: &str = "NodePort";

/// Liveness/readiness probe timings (seconds unless noted)
pub const PROBE_INITIAL_DELAY_SECS: i32 = 2;
pub const PROBE_PERIOD_SECS: i32 = 5;
pub const PROBE_TIMEOUT_SECS: i32 = 2;
pub const PROBE_SUCCESS_THRESHOLD: i32 = 1;
pub const PROBE_FAILURE_THRESHOLD: i32 = 3;

/// Rolling update budget
pub const ROLLING_MAX_SURGE: &str = "50%";
pub const ROLLING_MAX_UNAVAILABLE: i32 = 1;

/// Indentation unit used when embedding rendered config inside the ConfigMap
pub const DEFAULT_INDENT: &str = "    ";

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "default";

/// Field manager recorded on server-side applied objects
pub const FIELD_MANAGER: &str = "gateway-scaffold";

/// Default time to wait for the Deployment to report `Available`
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 120;

/// Poll interval while waiting for the Deployment to become ready
pub const DEFAULT_READY_POLL_INTERVAL_MS: u64 = 1000;
