//! Reconciliation primitives for remote autoscaling entities.
//!
//! This library holds everything that does not depend on a particular
//! entity kind:
//!
//! - **Error policy**: the `NotFound` / terminal / recoverable taxonomy and
//!   the per-kind code allow-lists that drive it.
//! - **Delta**: ordered field differences between a desired and an
//!   observed snapshot.
//! - **Conditions**: the `Terminal` / `Recoverable` / `ResourceSynced`
//!   status model and the tracker that folds each pass into it.
//! - **Orchestrator**: [`Reconciler`], which composes a
//!   [`ResourceManager`]'s read, create, update and delete operations.
//!
//! # Invariants
//!
//! - Snapshots are never mutated in place; every step returns a copy
//! - At most one condition exists per kind
//! - A pass performs at most one mutating remote call

mod condition;
mod delta;
mod error;
mod manager;
mod metrics;
mod reconciler;
mod status;

pub use condition::{track_conditions, Condition, ConditionKind, Conditions};
pub use delta::{Delta, Difference};
pub use error::{ApiError, ErrorPolicy, ReconcileError, ReconcileResult, DEFAULT_NOT_FOUND_CODES};
pub use manager::{Resource, ResourceManager};
pub use metrics::{ApiCallRecorder, MemoryRecorder, OpType, RecordedCall, TracingRecorder};
pub use reconciler::{Action, ReconcileOutcome, Reconciler};
pub use status::{AccountContext, ResourceMetadata, ResourceStatus};
