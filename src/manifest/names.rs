//! Resource names for one fixture.
//!
//! The fixed names are what the gateway test suites expect. A suffix is only
//! needed when several fixtures share a namespace; a separate namespace per
//! fixture is the simpler isolation.

use crate::constants::{CONFIG_MAP_NAME, DEFAULT_NAMESPACE, DEPLOYMENT_NAME, SERVICE_NAME};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureNames {
    namespace: String,
    suffix: Option<String>,
}

impl Default for FixtureNames {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl FixtureNames {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            suffix: None,
        }
    }

    /// Append `-<suffix>` to every resource name and the app label value
    ///
    /// An empty suffix is ignored.
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    /// Namespace named `<prefix>-<8 hex chars>`
    pub fn random(prefix: &str) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self::new(format!("{prefix}-{}", &id[..8]))
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    pub fn config_map(&self) -> String {
        self.decorate(CONFIG_MAP_NAME)
    }

    pub fn deployment(&self) -> String {
        self.decorate(DEPLOYMENT_NAME)
    }

    pub fn service(&self) -> String {
        self.decorate(SERVICE_NAME)
    }

    /// Value of the `app` label shared by the pod template and the Service selector
    pub fn app_label(&self) -> String {
        self.deployment()
    }

    fn decorate(&self, base: &str) -> String {
        match &self.suffix {
            Some(suffix) => format!("{base}-{suffix}"),
            None => base.to_string(),
        }
    }
}
