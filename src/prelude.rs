//! # Prelude
//!
//! Re-exports the types a test suite needs to stand up a gateway fixture:
//!
//! ```rust,no_run
//! use gateway_scaffold::prelude::*;
//! ```

pub use crate::config::ScaffoldOptions;
pub use crate::endpoint::resolve_url;
pub use crate::error::{Result, ScaffoldError};
pub use crate::fixture::{Fixture, FixtureController, FixtureState};
pub use crate::manifest::{
    FixtureNames, GatewayManifests, ResourceKind, ResourceManifest, ResourceSet,
};
pub use crate::orchestrator::{ClusterTopology, KubeOrchestrator, Orchestrator, StaticTopology};
pub use crate::render::{indent, render, ConfigTemplate, RenderValues};
