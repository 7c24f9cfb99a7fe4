//! # Gateway Scaffold
//!
//! Provisions a disposable API gateway inside a Kubernetes cluster for
//! end-to-end tests, and tells the test where to reach it.
//!
//! ## Overview
//!
//! A fixture is one ConfigMap, one Deployment and one NodePort Service. The
//! lifecycle is:
//!
//! 1. **Render** - the default and override gateway configs are rendered from
//!    templates ([`render`])
//! 2. **Apply** - ConfigMap, Deployment and Service are applied in that order,
//!    stopping at the first failure ([`manifest::ResourceSet`])
//! 3. **Wait** - optionally block until the Deployment is ready
//! 4. **Resolve** - `http://<node>:<nodePort>` for a named port ([`endpoint`])
//! 5. **Teardown** - delete the resources, and the namespace if the scaffold
//!    created it
//!
//! [`fixture::FixtureController::create`] runs render and apply in one call.
//! Use `prepare` and `apply` separately to keep a handle for teardown when
//! applying fails.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gateway_scaffold::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let options = ScaffoldOptions::from_env().with_value("EtcdServiceFQDN", "etcd.e2e.svc");
//! let controller = FixtureController::connect(&options).await?;
//!
//! let mut fixture = controller.create(&options).await?;
//! controller.wait_until_ready(&mut fixture, options.ready_timeout()).await?;
//! let url = controller.http_url(&fixture).await?;
//! println!("gateway at {url}");
//!
//! controller.teardown(&mut fixture).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod fixture;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod prelude;
pub mod render;

pub use error::{Result, ScaffoldError};
