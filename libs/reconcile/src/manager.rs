//! The seam between the generic orchestrator and one entity kind.

use async_trait::async_trait;

use crate::delta::Delta;
use crate::error::{ErrorPolicy, ReconcileResult};
use crate::status::ResourceStatus;

/// A declarative record of one managed entity.
pub trait Resource: Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Entity kind name used in logs.
    const KIND: &'static str;

    /// Composite identity rendered for logs, e.g. `ecs/service/a/DesiredCount`.
    fn identity(&self) -> String;

    fn status(&self) -> &ResourceStatus;

    fn status_mut(&mut self) -> &mut ResourceStatus;
}

/// Remote operations and comparison rules for one entity kind.
///
/// Every method takes snapshots by reference and returns a fresh copy;
/// inputs are never mutated.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    type Resource: Resource;

    /// Error classification for this kind.
    fn error_policy(&self) -> &ErrorPolicy;

    /// Locate the remote entity named by `resource`'s identity.
    ///
    /// Returns `NotFound` when the identity is incomplete (without a remote
    /// call), when the listing is empty, or when the read failed with a
    /// not-found-class code.
    async fn read_one(&self, resource: &Self::Resource) -> ReconcileResult<Self::Resource>;

    /// Create the remote entity. The returned snapshot is not re-read.
    async fn create(&self, desired: &Self::Resource) -> ReconcileResult<Self::Resource>;

    /// Push `delta` to the remote entity.
    async fn update(
        &self,
        desired: &Self::Resource,
        latest: &Self::Resource,
        delta: &Delta,
    ) -> ReconcileResult<Self::Resource>;

    /// Delete the remote entity.
    async fn delete(&self, resource: &Self::Resource) -> ReconcileResult<()>;

    /// Normalize `a` against `b` so unset optional fields do not show up
    /// as differences. Must be idempotent.
    fn apply_defaults(
        &self,
        a: &Self::Resource,
        b: &Self::Resource,
    ) -> (Self::Resource, Self::Resource);

    /// Differences on post-creation mutable fields, desired `a` against
    /// observed `b`.
    fn delta(&self, a: &Self::Resource, b: &Self::Resource) -> Delta;
}
