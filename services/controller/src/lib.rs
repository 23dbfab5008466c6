//! Autoscaling controller.
//!
//! Keeps scalable targets and scaling policies declared in a manifest
//! registered with an autoscaling service. Reconciliation itself lives in
//! `appscale-reconcile`; this crate supplies the two entity kinds, the
//! service interface and the loop that drives them.
//!
//! ## Modules
//!
//! - `api`: request and response shapes of the autoscaling service
//! - `resources`: resource managers for each entity kind
//! - `worker`: periodic reconciliation of every declared entity
//! - `mock`: in-memory service used in tests and local runs

pub mod api;
pub mod config;
pub mod manifest;
pub mod mock;
pub mod resources;
pub mod worker;

pub use api::AutoscalingApi;
pub use config::Config;
pub use manifest::Manifest;
pub use mock::InMemoryAutoscaling;
pub use resources::ManagerContext;
pub use worker::{ControllerWorker, PassStats, WorkerConfig};
