//! Periodic reconciliation of the declared entities.
//!
//! Each pass reconciles every scalable target, then every scaling policy,
//! so a policy created in the same pass finds its target registered.
//! Only status is written back into the held records; the declared spec
//! is never replaced by what the service reports.

use std::time::Duration;

use appscale_reconcile::{Action, ErrorPolicy, ReconcileOutcome, Reconciler, Resource};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::manifest::Manifest;
use crate::resources::scalable_target::{ScalableTarget, ScalableTargetManager};
use crate::resources::scaling_policy::{ScalingPolicy, ScalingPolicyManager};
use crate::resources::ManagerContext;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Interval between reconciliation passes.
    pub reconcile_interval: Duration,

    pub scalable_target_policy: ErrorPolicy,

    pub scaling_policy_policy: ErrorPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(30),
            scalable_target_policy: ErrorPolicy::default(),
            scaling_policy_policy: ErrorPolicy::default(),
        }
    }
}

impl From<&Config> for WorkerConfig {
    fn from(config: &Config) -> Self {
        Self {
            reconcile_interval: config.reconcile_interval(),
            scalable_target_policy: config.scalable_target_error_policy(),
            scaling_policy_policy: config.scaling_policy_error_policy(),
        }
    }
}

/// Tally of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub created: usize,
    pub updated: usize,
    pub in_sync: usize,
    pub failed: usize,
}

impl PassStats {
    fn record<R>(&mut self, outcome: &ReconcileOutcome<R>) {
        match outcome.action {
            Action::Created => self.created += 1,
            Action::Updated => self.updated += 1,
            Action::InSync => self.in_sync += 1,
            Action::Failed => self.failed += 1,
            Action::Deleted => {}
        }
    }
}

/// Keeps the declared entities converged.
pub struct ControllerWorker {
    targets: Reconciler<ScalableTargetManager>,
    policies: Reconciler<ScalingPolicyManager>,
    scalable_targets: RwLock<Vec<ScalableTarget>>,
    scaling_policies: RwLock<Vec<ScalingPolicy>>,
    config: WorkerConfig,
}

impl ControllerWorker {
    /// Create a worker for every entity in `manifest`.
    pub fn new(ctx: ManagerContext, manifest: Manifest, config: WorkerConfig) -> Self {
        let targets = Reconciler::new(ScalableTargetManager::new(
            ctx.clone(),
            config.scalable_target_policy.clone(),
        ));
        let policies = Reconciler::new(ScalingPolicyManager::new(
            ctx,
            config.scaling_policy_policy.clone(),
        ));

        Self {
            targets,
            policies,
            scalable_targets: RwLock::new(
                manifest
                    .scalable_targets
                    .into_iter()
                    .map(ScalableTarget::new)
                    .collect(),
            ),
            scaling_policies: RwLock::new(
                manifest
                    .scaling_policies
                    .into_iter()
                    .map(ScalingPolicy::new)
                    .collect(),
            ),
            config,
        }
    }

    /// Snapshot of the held scalable target records.
    pub async fn scalable_targets(&self) -> Vec<ScalableTarget> {
        self.scalable_targets.read().await.clone()
    }

    /// Snapshot of the held scaling policy records.
    pub async fn scaling_policies(&self) -> Vec<ScalingPolicy> {
        self.scaling_policies.read().await.clone()
    }

    /// Run the reconciliation loop until shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            reconcile_interval_secs = self.config.reconcile_interval.as_secs(),
            "Starting reconciliation loop"
        );

        let mut interval = tokio::time::interval(self.config.reconcile_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let stats = self.reconcile_once().await;
                    info!(
                        created = stats.created,
                        updated = stats.updated,
                        in_sync = stats.in_sync,
                        failed = stats.failed,
                        "Reconciliation pass complete"
                    );
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Worker shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Perform a single pass over every held record.
    ///
    /// Records are reconciled from a snapshot; the locks are taken only to
    /// copy records out and to store changed status, never across a remote
    /// call.
    pub async fn reconcile_once(&self) -> PassStats {
        let mut stats = PassStats::default();

        let targets = self.scalable_targets().await;
        debug!(count = targets.len(), "Reconciling scalable targets");
        for (index, record) in targets.iter().enumerate() {
            let outcome = self.targets.reconcile(record).await;
            stats.record(&outcome);
            if let Some(e) = &outcome.error {
                warn!(identity = %record.identity(), error = %e, "Scalable target not converged");
            }
            if outcome.status_changed {
                debug!(
                    identity = %record.identity(),
                    action = %outcome.action,
                    "Scalable target status changed"
                );
                if let Some(held) = self.scalable_targets.write().await.get_mut(index) {
                    held.status = outcome.resource.status;
                }
            }
        }

        let policies = self.scaling_policies().await;
        debug!(count = policies.len(), "Reconciling scaling policies");
        for (index, record) in policies.iter().enumerate() {
            let outcome = self.policies.reconcile(record).await;
            stats.record(&outcome);
            if let Some(e) = &outcome.error {
                warn!(identity = %record.identity(), error = %e, "Scaling policy not converged");
            }
            // policyARN and alarms sit outside the shared status block.
            if outcome.status_changed || outcome.resource.status != record.status {
                debug!(
                    identity = %record.identity(),
                    action = %outcome.action,
                    "Scaling policy status changed"
                );
                if let Some(held) = self.scaling_policies.write().await.get_mut(index) {
                    held.status = outcome.resource.status;
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use appscale_reconcile::{AccountContext, ApiError, TracingRecorder};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::api::{
        AutoscalingApi, PutScalingPolicyInput, RegisterScalableTargetInput, ScalableTargetFilter,
        ScalableTargetKey, ScalableTargetRecord, ScalingPolicyFilter, ScalingPolicyKey,
        ScalingPolicyRecord,
    };
    use crate::mock::InMemoryAutoscaling;
    use crate::resources::scalable_target::ScalableTargetSpec;

    /// Holds every target listing until released.
    struct GatedListing {
        inner: InMemoryAutoscaling,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl AutoscalingApi for GatedListing {
        async fn describe_scalable_targets(
            &self,
            filter: &ScalableTargetFilter,
        ) -> Result<Vec<ScalableTargetRecord>, ApiError> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.describe_scalable_targets(filter).await
        }

        async fn register_scalable_target(
            &self,
            input: &RegisterScalableTargetInput,
        ) -> Result<(), ApiError> {
            self.inner.register_scalable_target(input).await
        }

        async fn deregister_scalable_target(
            &self,
            key: &ScalableTargetKey,
        ) -> Result<(), ApiError> {
            self.inner.deregister_scalable_target(key).await
        }

        async fn describe_scaling_policies(
            &self,
            filter: &ScalingPolicyFilter,
        ) -> Result<Vec<ScalingPolicyRecord>, ApiError> {
            self.inner.describe_scaling_policies(filter).await
        }

        async fn put_scaling_policy(&self, input: &PutScalingPolicyInput) -> Result<(), ApiError> {
            self.inner.put_scaling_policy(input).await
        }

        async fn delete_scaling_policy(&self, key: &ScalingPolicyKey) -> Result<(), ApiError> {
            self.inner.delete_scaling_policy(key).await
        }
    }

    fn worker(interval: Duration) -> ControllerWorker {
        let ctx = ManagerContext::new(
            Arc::new(InMemoryAutoscaling::new("111122223333", "us-east-1")),
            Arc::new(TracingRecorder),
            AccountContext::new("111122223333", "us-east-1"),
        );
        let config = WorkerConfig {
            reconcile_interval: interval,
            ..WorkerConfig::default()
        };
        ControllerWorker::new(ctx, Manifest::default(), config)
    }

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.reconcile_interval, Duration::from_secs(30));
        assert_eq!(config.scalable_target_policy, ErrorPolicy::default());
    }

    #[tokio::test]
    async fn test_empty_manifest_pass() {
        let stats = worker(Duration::from_secs(30)).reconcile_once().await;
        assert_eq!(stats, PassStats::default());
    }

    #[tokio::test]
    async fn test_records_readable_during_remote_call() {
        let api = Arc::new(GatedListing {
            inner: InMemoryAutoscaling::new("111122223333", "us-east-1"),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let ctx = ManagerContext::new(
            api.clone(),
            Arc::new(TracingRecorder),
            AccountContext::new("111122223333", "us-east-1"),
        );
        let manifest = Manifest {
            scalable_targets: vec![ScalableTargetSpec {
                resource_id: Some("service/default/web".to_string()),
                scalable_dimension: Some("ecs:service:DesiredCount".to_string()),
                service_namespace: Some("ecs".to_string()),
                min_capacity: Some(1),
                max_capacity: Some(4),
                ..Default::default()
            }],
            scaling_policies: Vec::new(),
        };
        let worker = Arc::new(ControllerWorker::new(ctx, manifest, WorkerConfig::default()));

        let pass = tokio::spawn({
            let worker = Arc::clone(&worker);
            async move { worker.reconcile_once().await }
        });
        api.entered.notified().await;

        let held = tokio::time::timeout(Duration::from_secs(1), worker.scalable_targets())
            .await
            .expect("records locked during a remote call");
        assert_eq!(held.len(), 1);
        assert!(held[0].status.creation_time.is_none());

        api.release.notify_one();
        let stats = pass.await.unwrap();
        assert_eq!(stats.created, 1);
        assert!(worker.scalable_targets().await[0].status.creation_time.is_some());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let worker = Arc::new(worker(Duration::from_millis(10)));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let worker = Arc::clone(&worker);
            async move { worker.run(rx).await }
        });
        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
