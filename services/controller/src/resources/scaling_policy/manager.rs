//! Remote operations for scaling policies.

use appscale_reconcile::{
    Delta, ErrorPolicy, OpType, ReconcileError, ReconcileResult, Resource, ResourceManager,
};
use async_trait::async_trait;
use chrono::Utc;

use super::delta::{apply_defaults, compute_delta};
use super::{ScalingPolicy, ScalingPolicySpec};
use crate::api::{PutScalingPolicyInput, ScalingPolicyFilter, ScalingPolicyKey, ScalingPolicyRecord};
use crate::resources::{required, select_match, ManagerContext};

/// Resource manager for scaling policies.
pub struct ScalingPolicyManager {
    ctx: ManagerContext,
    policy: ErrorPolicy,
}

impl ScalingPolicyManager {
    pub fn new(ctx: ManagerContext, policy: ErrorPolicy) -> Self {
        Self { ctx, policy }
    }

    fn key(spec: &ScalingPolicySpec) -> ReconcileResult<ScalingPolicyKey> {
        Ok(ScalingPolicyKey {
            service_namespace: required(&spec.service_namespace, "serviceNamespace")?,
            resource_id: required(&spec.resource_id, "resourceID")?,
            scalable_dimension: required(&spec.scalable_dimension, "scalableDimension")?,
            policy_name: required(&spec.policy_name, "policyName")?,
        })
    }

    fn put_input(spec: &ScalingPolicySpec) -> ReconcileResult<PutScalingPolicyInput> {
        Ok(PutScalingPolicyInput {
            key: Self::key(spec)?,
            policy_type: spec.policy_type.clone(),
            step_scaling_policy_configuration: spec.step_scaling_policy_configuration.clone(),
            target_tracking_scaling_policy_configuration: spec
                .target_tracking_scaling_policy_configuration
                .clone(),
        })
    }

    async fn put(&self, input: &PutScalingPolicyInput, op_type: OpType) -> ReconcileResult<()> {
        let result = self.ctx.api.put_scaling_policy(input).await;
        self.ctx
            .recorder
            .record_api_call(op_type, "PutScalingPolicy", result.as_ref().err());
        Ok(result?)
    }
}

fn merge_record(policy: &mut ScalingPolicy, record: ScalingPolicyRecord) {
    let spec = &mut policy.spec;
    spec.policy_name = record.policy_name;
    spec.service_namespace = record.service_namespace;
    spec.resource_id = record.resource_id;
    spec.scalable_dimension = record.scalable_dimension;
    spec.policy_type = record.policy_type;
    spec.step_scaling_policy_configuration = record.step_scaling_policy_configuration;
    spec.target_tracking_scaling_policy_configuration =
        record.target_tracking_scaling_policy_configuration;

    policy.status.policy_arn = record.policy_arn;
    policy.status.alarms = record.alarms;
}

#[async_trait]
impl ResourceManager for ScalingPolicyManager {
    type Resource = ScalingPolicy;

    fn error_policy(&self) -> &ErrorPolicy {
        &self.policy
    }

    async fn read_one(&self, resource: &ScalingPolicy) -> ReconcileResult<ScalingPolicy> {
        // Every identity field is needed to name a policy.
        let spec = &resource.spec;
        if spec.resource_id.is_none()
            || spec.scalable_dimension.is_none()
            || spec.service_namespace.is_none()
            || spec.policy_name.is_none()
        {
            return Err(ReconcileError::NotFound);
        }

        let filter = ScalingPolicyFilter {
            service_namespace: spec.service_namespace.clone(),
            resource_id: spec.resource_id.clone(),
            scalable_dimension: spec.scalable_dimension.clone(),
            policy_names: spec.policy_name.iter().cloned().collect(),
        };
        let result = self.ctx.api.describe_scaling_policies(&filter).await;
        self.ctx.recorder.record_api_call(
            OpType::ReadMany,
            "DescribeScalingPolicies",
            result.as_ref().err(),
        );
        let records = result.map_err(|e| self.policy.classify_read_error(e))?;

        let record = select_match(
            records,
            self.ctx.strict_lookup,
            ScalingPolicy::KIND,
            &resource.identity(),
        )?;
        let creation_time = record.creation_time;

        let mut latest = resource.clone();
        merge_record(&mut latest, record);
        if let Some(at) = creation_time {
            latest.status.common.observe_creation(at);
        }
        latest.status.common.default_last_modified();
        latest.status.common.set_defaults(&self.ctx.account);
        Ok(latest)
    }

    async fn create(&self, desired: &ScalingPolicy) -> ReconcileResult<ScalingPolicy> {
        let input = Self::put_input(&desired.spec)?;
        self.put(&input, OpType::Create).await?;

        let mut created = desired.clone();
        let status = &mut created.status.common;
        status.set_defaults(&self.ctx.account);
        status.observe_creation(Utc::now());
        status.default_last_modified();
        Ok(created)
    }

    async fn update(
        &self,
        desired: &ScalingPolicy,
        latest: &ScalingPolicy,
        _delta: &Delta,
    ) -> ReconcileResult<ScalingPolicy> {
        let input = Self::put_input(&desired.spec)?;
        self.put(&input, OpType::Update).await?;

        let mut updated = desired.clone();
        updated.status.policy_arn = latest.status.policy_arn.clone();
        updated.status.alarms = latest.status.alarms.clone();
        let status = &mut updated.status.common;
        status.set_defaults(&self.ctx.account);
        if let Some(at) = latest.status.common.creation_time {
            status.observe_creation(at);
        }
        status.touch(Utc::now());
        Ok(updated)
    }

    async fn delete(&self, resource: &ScalingPolicy) -> ReconcileResult<()> {
        let key = Self::key(&resource.spec)?;
        let result = self.ctx.api.delete_scaling_policy(&key).await;
        self.ctx.recorder.record_api_call(
            OpType::Delete,
            "DeleteScalingPolicy",
            result.as_ref().err(),
        );
        Ok(result?)
    }

    fn apply_defaults(
        &self,
        a: &ScalingPolicy,
        b: &ScalingPolicy,
    ) -> (ScalingPolicy, ScalingPolicy) {
        apply_defaults(a, b)
    }

    fn delta(&self, a: &ScalingPolicy, b: &ScalingPolicy) -> Delta {
        compute_delta(a, b)
    }
}
