//! Reconciliation orchestrator.
//!
//! One pass: read → create if absent, otherwise default both snapshots,
//! compute the delta and update when non-empty → fold the outcome into
//! status conditions.

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::condition::track_conditions;
use crate::error::{ReconcileError, ReconcileResult};
use crate::manager::{Resource, ResourceManager};

/// What a pass did to the remote entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Remote entity was absent and has been created.
    Created,

    /// Remote entity differed and an update was issued.
    Updated,

    /// Remote entity already matched.
    InSync,

    /// Remote entity has been deleted (or was already gone).
    Deleted,

    /// The pass failed; see the outcome's error.
    Failed,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::InSync => "in_sync",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Result of one pass.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome<R> {
    /// The record to persist, with status folded in.
    pub resource: R,

    pub action: Action,

    /// Error of this pass, already reflected in the conditions.
    pub error: Option<ReconcileError>,

    /// True if the condition tracker changed any condition.
    pub conditions_changed: bool,

    /// True if any part of status differs from the input record.
    pub status_changed: bool,
}

impl<R> ReconcileOutcome<R> {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives one entity kind through reconciliation.
pub struct Reconciler<M> {
    manager: M,
}

impl<M> Reconciler<M>
where
    M: ResourceManager,
{
    /// Create a new reconciler.
    pub fn new(manager: M) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Run one reconciliation pass for `desired`.
    #[instrument(
        skip(self, desired),
        fields(kind = <M::Resource as Resource>::KIND, identity = %desired.identity())
    )]
    pub async fn reconcile(&self, desired: &M::Resource) -> ReconcileOutcome<M::Resource> {
        let result = self.sync(desired).await;
        self.finish(desired, result)
    }

    /// Delete the remote entity for `resource`.
    ///
    /// A not-found-class failure counts as already deleted.
    #[instrument(
        skip(self, resource),
        fields(kind = <M::Resource as Resource>::KIND, identity = %resource.identity())
    )]
    pub async fn delete(&self, resource: &M::Resource) -> ReconcileOutcome<M::Resource> {
        let result = match self.manager.delete(resource).await {
            Ok(()) => Ok((resource.clone(), Action::Deleted)),
            Err(ReconcileError::NotFound) => {
                debug!("Remote entity already absent");
                Ok((resource.clone(), Action::Deleted))
            }
            Err(ReconcileError::Api(e)) if self.manager.error_policy().is_not_found_code(&e) => {
                debug!(error = %e, "Remote entity already absent");
                Ok((resource.clone(), Action::Deleted))
            }
            Err(e) => Err(e),
        };
        self.finish(resource, result)
    }

    async fn sync(&self, desired: &M::Resource) -> ReconcileResult<(M::Resource, Action)> {
        let latest = match self.manager.read_one(desired).await {
            Ok(latest) => latest,
            Err(ReconcileError::NotFound) => {
                debug!("Remote entity not found, creating");
                let created = self.manager.create(desired).await?;
                info!("Created remote entity");
                return Ok((created, Action::Created));
            }
            Err(e) => return Err(e),
        };

        let (desired, latest) = self.manager.apply_defaults(desired, &latest);
        let delta = self.manager.delta(&desired, &latest);
        if delta.is_empty() {
            debug!("Remote entity in sync");
            return Ok((latest, Action::InSync));
        }

        info!(
            changed_fields = ?delta.paths().collect::<Vec<_>>(),
            "Remote entity differs, updating"
        );
        let updated = self.manager.update(&desired, &latest, &delta).await?;
        Ok((updated, Action::Updated))
    }

    fn finish(
        &self,
        input: &M::Resource,
        result: ReconcileResult<(M::Resource, Action)>,
    ) -> ReconcileOutcome<M::Resource> {
        let (mut resource, action, error) = match result {
            Ok((resource, action)) => (resource, action, None),
            Err(e) => {
                warn!(error = %e, "Reconciliation failed");
                (input.clone(), Action::Failed, Some(e))
            }
        };

        let (conditions, conditions_changed) = track_conditions(
            &input.status().conditions,
            error.as_ref(),
            self.manager.error_policy(),
            Utc::now(),
        );
        resource.status_mut().conditions = conditions;
        let status_changed = resource.status() != input.status();

        ReconcileOutcome {
            resource,
            action,
            error,
            conditions_changed,
            status_changed,
        }
    }
}
