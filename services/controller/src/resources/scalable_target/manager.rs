//! Remote operations for scalable targets.

use appscale_reconcile::{
    Delta, ErrorPolicy, OpType, ReconcileError, ReconcileResult, Resource, ResourceManager,
};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::delta::{apply_defaults, compute_delta};
use super::{ScalableTarget, ScalableTargetSpec};
use crate::api::{
    RegisterScalableTargetInput, ScalableTargetFilter, ScalableTargetKey, ScalableTargetRecord,
};
use crate::resources::{required, select_match, ManagerContext};

/// Resource manager for scalable targets.
pub struct ScalableTargetManager {
    ctx: ManagerContext,
    policy: ErrorPolicy,
}

impl ScalableTargetManager {
    pub fn new(ctx: ManagerContext, policy: ErrorPolicy) -> Self {
        Self { ctx, policy }
    }

    fn key(spec: &ScalableTargetSpec) -> ReconcileResult<ScalableTargetKey> {
        Ok(ScalableTargetKey {
            service_namespace: required(&spec.service_namespace, "serviceNamespace")?,
            resource_id: required(&spec.resource_id, "resourceID")?,
            scalable_dimension: required(&spec.scalable_dimension, "scalableDimension")?,
        })
    }

    fn list_filter(spec: &ScalableTargetSpec) -> ScalableTargetFilter {
        ScalableTargetFilter {
            service_namespace: spec.service_namespace.clone(),
            scalable_dimension: spec.scalable_dimension.clone(),
            resource_ids: spec.resource_id.iter().cloned().collect(),
        }
    }
}

/// Overwrite every spec field with the remote record's value.
fn merge_record(spec: &mut ScalableTargetSpec, record: ScalableTargetRecord) {
    spec.service_namespace = record.service_namespace;
    spec.resource_id = record.resource_id;
    spec.scalable_dimension = record.scalable_dimension;
    spec.min_capacity = record.min_capacity;
    spec.max_capacity = record.max_capacity;
    spec.role_arn = record.role_arn;
    spec.suspended_state = record.suspended_state;
}

#[async_trait]
impl ResourceManager for ScalableTargetManager {
    type Resource = ScalableTarget;

    fn error_policy(&self) -> &ErrorPolicy {
        &self.policy
    }

    async fn read_one(&self, resource: &ScalableTarget) -> ReconcileResult<ScalableTarget> {
        // Without a resource ID the target cannot have been registered yet.
        if resource.spec.resource_id.is_none() {
            return Err(ReconcileError::NotFound);
        }

        let filter = Self::list_filter(&resource.spec);
        let result = self.ctx.api.describe_scalable_targets(&filter).await;
        self.ctx.recorder.record_api_call(
            OpType::ReadMany,
            "DescribeScalableTargets",
            result.as_ref().err(),
        );
        let records = result.map_err(|e| self.policy.classify_read_error(e))?;

        let record = select_match(
            records,
            self.ctx.strict_lookup,
            ScalableTarget::KIND,
            &resource.identity(),
        )?;
        let creation_time = record.creation_time;

        let mut latest = resource.clone();
        merge_record(&mut latest.spec, record);
        if let Some(at) = creation_time {
            latest.status.observe_creation(at);
        }
        latest.status.default_last_modified();
        latest.status.set_defaults(&self.ctx.account);
        Ok(latest)
    }

    async fn create(&self, desired: &ScalableTarget) -> ReconcileResult<ScalableTarget> {
        let spec = &desired.spec;
        let input = RegisterScalableTargetInput {
            key: Self::key(spec)?,
            min_capacity: spec.min_capacity,
            max_capacity: spec.max_capacity,
            role_arn: spec.role_arn.clone(),
            suspended_state: spec.suspended_state.clone(),
        };

        let result = self.ctx.api.register_scalable_target(&input).await;
        self.ctx.recorder.record_api_call(
            OpType::Create,
            "RegisterScalableTarget",
            result.as_ref().err(),
        );
        result?;

        let mut created = desired.clone();
        created.status.set_defaults(&self.ctx.account);
        created.status.observe_creation(Utc::now());
        created.status.default_last_modified();
        Ok(created)
    }

    async fn update(
        &self,
        _desired: &ScalableTarget,
        _latest: &ScalableTarget,
        delta: &Delta,
    ) -> ReconcileResult<ScalableTarget> {
        debug!(changed = delta.len(), "Scalable target update requested");
        Err(ReconcileError::NotImplemented("update of a registered scalable target"))
    }

    async fn delete(&self, resource: &ScalableTarget) -> ReconcileResult<()> {
        let key = Self::key(&resource.spec)?;
        let result = self.ctx.api.deregister_scalable_target(&key).await;
        self.ctx.recorder.record_api_call(
            OpType::Delete,
            "DeregisterScalableTarget",
            result.as_ref().err(),
        );
        Ok(result?)
    }

    fn apply_defaults(
        &self,
        a: &ScalableTarget,
        b: &ScalableTarget,
    ) -> (ScalableTarget, ScalableTarget) {
        apply_defaults(a, b)
    }

    fn delta(&self, a: &ScalableTarget, b: &ScalableTarget) -> Delta {
        compute_delta(a, b)
    }
}
