//! Scalable target: the capacity range of one autoscaled dimension.
//!
//! Identity is `(serviceNamespace, resourceID, scalableDimension)`; the
//! service assigns no opaque identifier. Capacity bounds, role and the
//! suspended state are mutable after registration.

use appscale_reconcile::{Resource, ResourceStatus};
use serde::{Deserialize, Serialize};

mod delta;
mod manager;

pub use delta::{apply_defaults, compute_delta};
pub use manager::ScalableTargetManager;

/// Which scaling activities are suspended on the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspendedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_scaling_in_suspended: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamic_scaling_out_suspended: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_scaling_suspended: Option<bool>,
}

impl SuspendedState {
    /// All three flags set.
    pub fn new(scaling_in: bool, scaling_out: bool, scheduled: bool) -> Self {
        Self {
            dynamic_scaling_in_suspended: Some(scaling_in),
            dynamic_scaling_out_suspended: Some(scaling_out),
            scheduled_scaling_suspended: Some(scheduled),
        }
    }

    /// Returns true if every flag is set.
    pub fn is_complete(&self) -> bool {
        self.dynamic_scaling_in_suspended.is_some()
            && self.dynamic_scaling_out_suspended.is_some()
            && self.scheduled_scaling_suspended.is_some()
    }
}

/// User-declared state of a scalable target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalableTargetSpec {
    #[serde(rename = "resourceID", default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalable_dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_capacity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_capacity: Option<i64>,
    #[serde(rename = "roleARN", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspended_state: Option<SuspendedState>,
}

/// Declarative record of a scalable target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalableTarget {
    pub spec: ScalableTargetSpec,
    #[serde(default)]
    pub status: ResourceStatus,
}

impl ScalableTarget {
    pub fn new(spec: ScalableTargetSpec) -> Self {
        Self {
            spec,
            status: ResourceStatus::default(),
        }
    }
}

impl Resource for ScalableTarget {
    const KIND: &'static str = "ScalableTarget";

    fn identity(&self) -> String {
        let s = &self.spec;
        format!(
            "{}/{}/{}",
            s.service_namespace.as_deref().unwrap_or("-"),
            s.resource_id.as_deref().unwrap_or("-"),
            s.scalable_dimension.as_deref().unwrap_or("-"),
        )
    }

    fn status(&self) -> &ResourceStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut ResourceStatus {
        &mut self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_field_names() {
        let json = serde_json::json!({
            "spec": {
                "resourceID": "service/default/web",
                "scalableDimension": "ecs:service:DesiredCount",
                "serviceNamespace": "ecs",
                "minCapacity": 1,
                "maxCapacity": 4,
                "roleARN": "arn:aws:iam::111122223333:role/scaler",
                "suspendedState": { "scheduledScalingSuspended": true }
            }
        });

        let target: ScalableTarget = serde_json::from_value(json).unwrap();
        assert_eq!(target.spec.resource_id.as_deref(), Some("service/default/web"));
        assert_eq!(
            target.spec.role_arn.as_deref(),
            Some("arn:aws:iam::111122223333:role/scaler")
        );
        let suspended = target.spec.suspended_state.unwrap();
        assert_eq!(suspended.scheduled_scaling_suspended, Some(true));
        assert!(suspended.dynamic_scaling_in_suspended.is_none());
        assert!(target.status.conditions.is_empty());
    }

    #[test]
    fn test_identity_marks_missing_fields() {
        let target = ScalableTarget::new(ScalableTargetSpec {
            resource_id: Some("table/orders".to_string()),
            ..Default::default()
        });
        assert_eq!(target.identity(), "-/table/orders/-");
    }
}
