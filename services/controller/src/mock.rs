//! In-memory autoscaling service.
//!
//! Behaves like the remote service for the operations the controller
//! uses: registering a target is an upsert, putting a policy requires a
//! registered target, and removing something absent fails with
//! `ObjectNotFoundException`. Calls are counted per operation and a
//! failure can be armed for the next call of any operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use appscale_reconcile::ApiError;
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::api::{
    AutoscalingApi, PutScalingPolicyInput, RegisterScalableTargetInput, ScalableTargetFilter,
    ScalableTargetKey, ScalableTargetRecord, ScalingPolicyFilter, ScalingPolicyKey,
    ScalingPolicyRecord,
};
use crate::resources::scalable_target::SuspendedState;
use crate::resources::scaling_policy::Alarm;

pub const DESCRIBE_SCALABLE_TARGETS: &str = "DescribeScalableTargets";
pub const REGISTER_SCALABLE_TARGET: &str = "RegisterScalableTarget";
pub const DEREGISTER_SCALABLE_TARGET: &str = "DeregisterScalableTarget";
pub const DESCRIBE_SCALING_POLICIES: &str = "DescribeScalingPolicies";
pub const PUT_SCALING_POLICY: &str = "PutScalingPolicy";
pub const DELETE_SCALING_POLICY: &str = "DeleteScalingPolicy";

/// In-memory autoscaling service for tests and local runs.
pub struct InMemoryAutoscaling {
    account_id: String,
    region: String,
    targets: Mutex<BTreeMap<ScalableTargetKey, ScalableTargetRecord>>,
    policies: Mutex<BTreeMap<ScalingPolicyKey, ScalingPolicyRecord>>,
    armed_failures: Mutex<HashMap<&'static str, ApiError>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl InMemoryAutoscaling {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            targets: Mutex::new(BTreeMap::new()),
            policies: Mutex::new(BTreeMap::new()),
            armed_failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Fail the next call of `operation` with `error`.
    pub fn fail_next(&self, operation: &'static str, error: ApiError) {
        if let Ok(mut armed) = self.armed_failures.lock() {
            armed.insert(operation, error);
        }
    }

    /// Number of calls made to `operation` so far.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .map(|c| c.get(operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().map(|c| c.values().sum()).unwrap_or(0)
    }

    /// Seed or overwrite a target directly, bypassing call accounting.
    pub fn put_target_record(&self, record: ScalableTargetRecord) {
        let key = ScalableTargetKey {
            service_namespace: record.service_namespace.clone().unwrap_or_default(),
            resource_id: record.resource_id.clone().unwrap_or_default(),
            scalable_dimension: record.scalable_dimension.clone().unwrap_or_default(),
        };
        if let Ok(mut targets) = self.targets.lock() {
            targets.insert(key, record);
        }
    }

    pub fn target(&self, key: &ScalableTargetKey) -> Option<ScalableTargetRecord> {
        self.targets.lock().ok()?.get(key).cloned()
    }

    pub fn policy(&self, key: &ScalingPolicyKey) -> Option<ScalingPolicyRecord> {
        self.policies.lock().ok()?.get(key).cloned()
    }

    /// Count the call and return an armed failure, if any.
    fn enter(&self, operation: &'static str) -> Result<(), ApiError> {
        debug!(operation, "[MOCK] Autoscaling call");
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(operation).or_insert(0) += 1;
        }
        match self.armed_failures.lock() {
            Ok(mut armed) => armed.remove(operation).map_or(Ok(()), Err),
            Err(_) => Err(poisoned()),
        }
    }

    fn policy_arn(&self, key: &ScalingPolicyKey) -> String {
        format!(
            "arn:aws:autoscaling:{}:{}:scalingPolicy:{}/{}:policyName/{}",
            self.region,
            self.account_id,
            key.service_namespace,
            key.resource_id,
            key.policy_name
        )
    }
}

fn poisoned() -> ApiError {
    ApiError::new("InternalServiceException", "state lock poisoned")
}

fn not_found(what: &str) -> ApiError {
    ApiError::new("ObjectNotFoundException", format!("{what} not found"))
}

fn require_namespace(namespace: &Option<String>) -> Result<&str, ApiError> {
    namespace.as_deref().ok_or_else(|| {
        ApiError::new(
            "ValidationException",
            "1 validation error detected: Value null at 'serviceNamespace' failed to satisfy constraint: Member must not be null",
        )
    })
}

#[async_trait]
impl AutoscalingApi for InMemoryAutoscaling {
    async fn describe_scalable_targets(
        &self,
        filter: &ScalableTargetFilter,
    ) -> Result<Vec<ScalableTargetRecord>, ApiError> {
        self.enter(DESCRIBE_SCALABLE_TARGETS)?;
        let namespace = require_namespace(&filter.service_namespace)?;

        let targets = self.targets.lock().map_err(|_| poisoned())?;
        Ok(targets
            .iter()
            .filter(|(k, _)| k.service_namespace == namespace)
            .filter(|(k, _)| {
                filter
                    .scalable_dimension
                    .as_ref()
                    .map_or(true, |d| &k.scalable_dimension == d)
            })
            .filter(|(k, _)| {
                filter.resource_ids.is_empty() || filter.resource_ids.contains(&k.resource_id)
            })
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn register_scalable_target(
        &self,
        input: &RegisterScalableTargetInput,
    ) -> Result<(), ApiError> {
        self.enter(REGISTER_SCALABLE_TARGET)?;

        let mut targets = self.targets.lock().map_err(|_| poisoned())?;
        let existing = targets.get(&input.key).cloned();
        let record = match existing {
            // Re-registering updates only the supplied fields.
            Some(mut record) => {
                if input.min_capacity.is_some() {
                    record.min_capacity = input.min_capacity;
                }
                if input.max_capacity.is_some() {
                    record.max_capacity = input.max_capacity;
                }
                if input.role_arn.is_some() {
                    record.role_arn = input.role_arn.clone();
                }
                if let Some(s) = &input.suspended_state {
                    let current = record.suspended_state.get_or_insert_with(Default::default);
                    if s.dynamic_scaling_in_suspended.is_some() {
                        current.dynamic_scaling_in_suspended = s.dynamic_scaling_in_suspended;
                    }
                    if s.dynamic_scaling_out_suspended.is_some() {
                        current.dynamic_scaling_out_suspended = s.dynamic_scaling_out_suspended;
                    }
                    if s.scheduled_scaling_suspended.is_some() {
                        current.scheduled_scaling_suspended = s.scheduled_scaling_suspended;
                    }
                }
                record
            }
            None => {
                let (Some(min), Some(max)) = (input.min_capacity, input.max_capacity) else {
                    return Err(ApiError::new(
                        "ValidationException",
                        "MinCapacity and MaxCapacity are required for a new scalable target",
                    ));
                };
                let supplied = input.suspended_state.clone().unwrap_or_default();
                ScalableTargetRecord {
                    service_namespace: Some(input.key.service_namespace.clone()),
                    resource_id: Some(input.key.resource_id.clone()),
                    scalable_dimension: Some(input.key.scalable_dimension.clone()),
                    min_capacity: Some(min),
                    max_capacity: Some(max),
                    role_arn: Some(input.role_arn.clone().unwrap_or_else(|| {
                        format!(
                            "arn:aws:iam::{}:role/aws-service-role/AWSServiceRoleForApplicationAutoScaling",
                            self.account_id
                        )
                    })),
                    suspended_state: Some(SuspendedState::new(
                        supplied.dynamic_scaling_in_suspended.unwrap_or(false),
                        supplied.dynamic_scaling_out_suspended.unwrap_or(false),
                        supplied.scheduled_scaling_suspended.unwrap_or(false),
                    )),
                    creation_time: Some(Utc::now()),
                }
            }
        };

        if let (Some(min), Some(max)) = (record.min_capacity, record.max_capacity) {
            if min > max {
                return Err(ApiError::new(
                    "ValidationException",
                    format!("MinCapacity {min} exceeds MaxCapacity {max}"),
                ));
            }
        }
        targets.insert(input.key.clone(), record);
        Ok(())
    }

    async fn deregister_scalable_target(&self, key: &ScalableTargetKey) -> Result<(), ApiError> {
        self.enter(DEREGISTER_SCALABLE_TARGET)?;

        let mut targets = self.targets.lock().map_err(|_| poisoned())?;
        targets
            .remove(key)
            .ok_or_else(|| not_found("scalable target"))?;

        // Deregistering a target drops its policies.
        let mut policies = self.policies.lock().map_err(|_| poisoned())?;
        policies.retain(|k, _| &k.target() != key);
        Ok(())
    }

    async fn describe_scaling_policies(
        &self,
        filter: &ScalingPolicyFilter,
    ) -> Result<Vec<ScalingPolicyRecord>, ApiError> {
        self.enter(DESCRIBE_SCALING_POLICIES)?;
        let namespace = require_namespace(&filter.service_namespace)?;

        let policies = self.policies.lock().map_err(|_| poisoned())?;
        Ok(policies
            .iter()
            .filter(|(k, _)| k.service_namespace == namespace)
            .filter(|(k, _)| filter.resource_id.as_ref().map_or(true, |r| &k.resource_id == r))
            .filter(|(k, _)| {
                filter
                    .scalable_dimension
                    .as_ref()
                    .map_or(true, |d| &k.scalable_dimension == d)
            })
            .filter(|(k, _)| {
                filter.policy_names.is_empty() || filter.policy_names.contains(&k.policy_name)
            })
            .map(|(_, r)| r.clone())
            .collect())
    }

    async fn put_scaling_policy(&self, input: &PutScalingPolicyInput) -> Result<(), ApiError> {
        self.enter(PUT_SCALING_POLICY)?;

        let registered = self
            .targets
            .lock()
            .map_err(|_| poisoned())?
            .contains_key(&input.key.target());
        if !registered {
            return Err(ApiError::new(
                "ObjectNotFoundException",
                format!(
                    "No scalable target registered for service namespace: {}, resource ID: {}, scalable dimension: {}",
                    input.key.service_namespace, input.key.resource_id, input.key.scalable_dimension
                ),
            ));
        }

        let policy_arn = self.policy_arn(&input.key);
        let mut policies = self.policies.lock().map_err(|_| poisoned())?;
        let creation_time = policies
            .get(&input.key)
            .and_then(|p| p.creation_time)
            .unwrap_or_else(Utc::now);
        let alarms = match &input.target_tracking_scaling_policy_configuration {
            Some(_) => vec![
                Alarm {
                    alarm_name: Some(format!("TargetTracking-{}-AlarmHigh", input.key.resource_id)),
                    alarm_arn: Some(format!("{policy_arn}:alarm:high")),
                },
                Alarm {
                    alarm_name: Some(format!("TargetTracking-{}-AlarmLow", input.key.resource_id)),
                    alarm_arn: Some(format!("{policy_arn}:alarm:low")),
                },
            ],
            None => Vec::new(),
        };

        policies.insert(
            input.key.clone(),
            ScalingPolicyRecord {
                policy_arn: Some(policy_arn),
                policy_name: Some(input.key.policy_name.clone()),
                service_namespace: Some(input.key.service_namespace.clone()),
                resource_id: Some(input.key.resource_id.clone()),
                scalable_dimension: Some(input.key.scalable_dimension.clone()),
                policy_type: input.policy_type.clone(),
                step_scaling_policy_configuration: input.step_scaling_policy_configuration.clone(),
                target_tracking_scaling_policy_configuration: input
                    .target_tracking_scaling_policy_configuration
                    .clone(),
                alarms,
                creation_time: Some(creation_time),
            },
        );
        Ok(())
    }

    async fn delete_scaling_policy(&self, key: &ScalingPolicyKey) -> Result<(), ApiError> {
        self.enter(DELETE_SCALING_POLICY)?;

        let mut policies = self.policies.lock().map_err(|_| poisoned())?;
        policies
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| not_found("scaling policy"))
    }
}
