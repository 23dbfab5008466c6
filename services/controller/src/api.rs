//! Remote autoscaling service interface.
//!
//! Request and response shapes carry only the fields the reconciler
//! reads or writes. Identity fields on requests are required strings;
//! callers validate presence before building a request.

use appscale_reconcile::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::resources::scalable_target::SuspendedState;
use crate::resources::scaling_policy::{
    Alarm, StepScalingPolicyConfiguration, TargetTrackingScalingPolicyConfiguration,
};

/// Identity of a scalable target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalableTargetKey {
    pub service_namespace: String,
    pub resource_id: String,
    pub scalable_dimension: String,
}

/// Identity of a scaling policy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalingPolicyKey {
    pub service_namespace: String,
    pub resource_id: String,
    pub scalable_dimension: String,
    pub policy_name: String,
}

impl ScalingPolicyKey {
    /// The scalable target this policy attaches to.
    pub fn target(&self) -> ScalableTargetKey {
        ScalableTargetKey {
            service_namespace: self.service_namespace.clone(),
            resource_id: self.resource_id.clone(),
            scalable_dimension: self.scalable_dimension.clone(),
        }
    }
}

/// Server-side filters for `DescribeScalableTargets`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalableTargetFilter {
    pub service_namespace: Option<String>,
    pub scalable_dimension: Option<String>,
    pub resource_ids: Vec<String>,
}

/// One element of a `DescribeScalableTargets` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalableTargetRecord {
    pub service_namespace: Option<String>,
    pub resource_id: Option<String>,
    pub scalable_dimension: Option<String>,
    pub min_capacity: Option<i64>,
    pub max_capacity: Option<i64>,
    pub role_arn: Option<String>,
    pub suspended_state: Option<SuspendedState>,
    pub creation_time: Option<DateTime<Utc>>,
}

/// `RegisterScalableTarget` request.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterScalableTargetInput {
    pub key: ScalableTargetKey,
    pub min_capacity: Option<i64>,
    pub max_capacity: Option<i64>,
    pub role_arn: Option<String>,
    pub suspended_state: Option<SuspendedState>,
}

/// Server-side filters for `DescribeScalingPolicies`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalingPolicyFilter {
    pub service_namespace: Option<String>,
    pub resource_id: Option<String>,
    pub scalable_dimension: Option<String>,
    pub policy_names: Vec<String>,
}

/// One element of a `DescribeScalingPolicies` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalingPolicyRecord {
    pub policy_arn: Option<String>,
    pub policy_name: Option<String>,
    pub service_namespace: Option<String>,
    pub resource_id: Option<String>,
    pub scalable_dimension: Option<String>,
    pub policy_type: Option<String>,
    pub step_scaling_policy_configuration: Option<StepScalingPolicyConfiguration>,
    pub target_tracking_scaling_policy_configuration:
        Option<TargetTrackingScalingPolicyConfiguration>,
    pub alarms: Vec<Alarm>,
    pub creation_time: Option<DateTime<Utc>>,
}

/// `PutScalingPolicy` request. Creates or replaces the policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PutScalingPolicyInput {
    pub key: ScalingPolicyKey,
    pub policy_type: Option<String>,
    pub step_scaling_policy_configuration: Option<StepScalingPolicyConfiguration>,
    pub target_tracking_scaling_policy_configuration:
        Option<TargetTrackingScalingPolicyConfiguration>,
}

/// Remote autoscaling operations.
///
/// Each call is a single request; success carries no payload beyond what
/// the describe calls return. Cancellation is by dropping the future.
#[async_trait]
pub trait AutoscalingApi: Send + Sync {
    async fn describe_scalable_targets(
        &self,
        filter: &ScalableTargetFilter,
    ) -> Result<Vec<ScalableTargetRecord>, ApiError>;

    async fn register_scalable_target(
        &self,
        input: &RegisterScalableTargetInput,
    ) -> Result<(), ApiError>;

    async fn deregister_scalable_target(&self, key: &ScalableTargetKey) -> Result<(), ApiError>;

    async fn describe_scaling_policies(
        &self,
        filter: &ScalingPolicyFilter,
    ) -> Result<Vec<ScalingPolicyRecord>, ApiError>;

    async fn put_scaling_policy(&self, input: &PutScalingPolicyInput) -> Result<(), ApiError>;

    async fn delete_scaling_policy(&self, key: &ScalingPolicyKey) -> Result<(), ApiError>;
}
