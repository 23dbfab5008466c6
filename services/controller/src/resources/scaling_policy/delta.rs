//! Defaulting and delta computation for scaling policies.

use appscale_reconcile::Delta;

use super::ScalingPolicy;

/// Scaling policies have no defaultable fields; both sides are copied as-is.
pub fn apply_defaults(a: &ScalingPolicy, b: &ScalingPolicy) -> (ScalingPolicy, ScalingPolicy) {
    (a.clone(), b.clone())
}

/// Differences on mutable fields, desired `a` against observed `b`.
pub fn compute_delta(a: &ScalingPolicy, b: &ScalingPolicy) -> Delta {
    let (a, b) = (&a.spec, &b.spec);
    let mut delta = Delta::new();

    delta.compare("Spec.PolicyType", &a.policy_type, &b.policy_type);

    match (
        &a.step_scaling_policy_configuration,
        &b.step_scaling_policy_configuration,
    ) {
        (Some(x), Some(y)) => {
            delta.compare(
                "Spec.StepScalingPolicyConfiguration.AdjustmentType",
                &x.adjustment_type,
                &y.adjustment_type,
            );
            delta.compare(
                "Spec.StepScalingPolicyConfiguration.Cooldown",
                &x.cooldown,
                &y.cooldown,
            );
            delta.compare(
                "Spec.StepScalingPolicyConfiguration.MetricAggregationType",
                &x.metric_aggregation_type,
                &y.metric_aggregation_type,
            );
            delta.compare(
                "Spec.StepScalingPolicyConfiguration.MinAdjustmentMagnitude",
                &x.min_adjustment_magnitude,
                &y.min_adjustment_magnitude,
            );
            delta.compare(
                "Spec.StepScalingPolicyConfiguration.StepAdjustments",
                &x.step_adjustments,
                &y.step_adjustments,
            );
        }
        (x, y) => delta.compare("Spec.StepScalingPolicyConfiguration", x, y),
    }

    match (
        &a.target_tracking_scaling_policy_configuration,
        &b.target_tracking_scaling_policy_configuration,
    ) {
        (Some(x), Some(y)) => {
            delta.compare(
                "Spec.TargetTrackingScalingPolicyConfiguration.CustomizedMetricSpecification",
                &x.customized_metric_specification,
                &y.customized_metric_specification,
            );
            delta.compare(
                "Spec.TargetTrackingScalingPolicyConfiguration.DisableScaleIn",
                &x.disable_scale_in,
                &y.disable_scale_in,
            );
            delta.compare(
                "Spec.TargetTrackingScalingPolicyConfiguration.PredefinedMetricSpecification",
                &x.predefined_metric_specification,
                &y.predefined_metric_specification,
            );
            delta.compare(
                "Spec.TargetTrackingScalingPolicyConfiguration.ScaleInCooldown",
                &x.scale_in_cooldown,
                &y.scale_in_cooldown,
            );
            delta.compare(
                "Spec.TargetTrackingScalingPolicyConfiguration.ScaleOutCooldown",
                &x.scale_out_cooldown,
                &y.scale_out_cooldown,
            );
            delta.compare(
                "Spec.TargetTrackingScalingPolicyConfiguration.TargetValue",
                &x.target_value,
                &y.target_value,
            );
        }
        (x, y) => delta.compare("Spec.TargetTrackingScalingPolicyConfiguration", x, y),
    }

    delta
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::resources::scaling_policy::{
        PredefinedMetricSpecification, ScalingPolicySpec, StepAdjustment,
        StepScalingPolicyConfiguration, TargetTrackingScalingPolicyConfiguration,
    };

    const IDENTITY_PATHS: &[&str] = &[
        "Spec.PolicyName",
        "Spec.ResourceID",
        "Spec.ScalableDimension",
        "Spec.ServiceNamespace",
    ];

    fn policy(target_value: f64) -> ScalingPolicy {
        ScalingPolicy::new(ScalingPolicySpec {
            policy_name: Some("cpu".to_string()),
            resource_id: Some("table/orders".to_string()),
            scalable_dimension: Some("dynamodb:table:WriteCapacityUnits".to_string()),
            service_namespace: Some("dynamodb".to_string()),
            policy_type: Some("TargetTrackingScaling".to_string()),
            step_scaling_policy_configuration: None,
            target_tracking_scaling_policy_configuration: Some(
                TargetTrackingScalingPolicyConfiguration {
                    target_value: Some(target_value),
                    predefined_metric_specification: Some(PredefinedMetricSpecification {
                        predefined_metric_type: Some(
                            "DynamoDBWriteCapacityUtilization".to_string(),
                        ),
                        resource_label: None,
                    }),
                    ..Default::default()
                },
            ),
        })
    }

    #[test]
    fn test_equal_policies_have_no_delta() {
        let (a, b) = apply_defaults(&policy(50.0), &policy(50.0));
        assert!(compute_delta(&a, &b).is_empty());
    }

    #[test]
    fn test_target_value_change_is_nested_path() {
        let delta = compute_delta(&policy(70.0), &policy(50.0));
        let paths: Vec<_> = delta.paths().collect();
        assert_eq!(
            paths,
            vec!["Spec.TargetTrackingScalingPolicyConfiguration.TargetValue"]
        );
    }

    #[test]
    fn test_switching_policy_type_reports_both_configurations() {
        let observed = policy(50.0);
        let mut desired = observed.clone();
        desired.spec.policy_type = Some("StepScaling".to_string());
        desired.spec.target_tracking_scaling_policy_configuration = None;
        desired.spec.step_scaling_policy_configuration = Some(StepScalingPolicyConfiguration {
            adjustment_type: Some("ChangeInCapacity".to_string()),
            cooldown: Some(60),
            step_adjustments: Some(vec![StepAdjustment {
                metric_interval_lower_bound: Some(0.0),
                metric_interval_upper_bound: None,
                scaling_adjustment: Some(1),
            }]),
            ..Default::default()
        });

        let paths: Vec<_> = compute_delta(&desired, &observed).paths().collect();
        assert_eq!(
            paths,
            vec![
                "Spec.PolicyType",
                "Spec.StepScalingPolicyConfiguration",
                "Spec.TargetTrackingScalingPolicyConfiguration",
            ]
        );
    }

    #[test]
    fn test_identity_fields_are_ignored() {
        let a = policy(50.0);
        let mut b = a.clone();
        b.spec.policy_name = Some("other".to_string());
        b.spec.resource_id = None;
        assert!(compute_delta(&a, &b).is_empty());
    }

    fn step_strategy() -> impl Strategy<Value = Option<StepScalingPolicyConfiguration>> {
        proptest::option::of(
            (
                proptest::option::of("(ChangeInCapacity|PercentChangeInCapacity)"),
                proptest::option::of(0i64..300),
                proptest::option::of(-3i64..3),
            )
                .prop_map(|(adjustment_type, cooldown, step)| {
                    StepScalingPolicyConfiguration {
                        adjustment_type,
                        cooldown,
                        step_adjustments: step.map(|s| {
                            vec![StepAdjustment {
                                metric_interval_lower_bound: Some(0.0),
                                metric_interval_upper_bound: None,
                                scaling_adjustment: Some(s),
                            }]
                        }),
                        ..Default::default()
                    }
                }),
        )
    }

    fn tracking_strategy(
    ) -> impl Strategy<Value = Option<TargetTrackingScalingPolicyConfiguration>> {
        proptest::option::of(
            (
                proptest::option::of(1.0f64..100.0),
                proptest::option::of(0i64..300),
                proptest::option::of(0i64..300),
                proptest::option::of(any::<bool>()),
            )
                .prop_map(|(target_value, scale_in, scale_out, disable_scale_in)| {
                    TargetTrackingScalingPolicyConfiguration {
                        target_value,
                        scale_in_cooldown: scale_in,
                        scale_out_cooldown: scale_out,
                        disable_scale_in,
                        ..Default::default()
                    }
                }),
        )
    }

    fn policy_strategy() -> impl Strategy<Value = ScalingPolicy> {
        (
            proptest::option::of("[a-z]{1,6}"),
            proptest::option::of("[a-z]{1,6}"),
            proptest::option::of("(StepScaling|TargetTrackingScaling)"),
            step_strategy(),
            tracking_strategy(),
        )
            .prop_map(|(name, resource_id, policy_type, step, tracking)| {
                ScalingPolicy::new(ScalingPolicySpec {
                    policy_name: name,
                    resource_id,
                    scalable_dimension: Some("ecs:service:DesiredCount".to_string()),
                    service_namespace: Some("ecs".to_string()),
                    policy_type,
                    step_scaling_policy_configuration: step,
                    target_tracking_scaling_policy_configuration: tracking,
                })
            })
    }

    proptest! {
        #[test]
        fn prop_defaults_are_idempotent(a in policy_strategy(), b in policy_strategy()) {
            let once = apply_defaults(&a, &b);
            let twice = apply_defaults(&once.0, &once.1);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_delta_never_names_identity(a in policy_strategy(), b in policy_strategy()) {
            let (a, b) = apply_defaults(&a, &b);
            let delta = compute_delta(&a, &b);
            for path in delta.paths() {
                prop_assert!(!IDENTITY_PATHS.contains(&path));
            }
        }

        #[test]
        fn prop_delta_of_self_is_empty(a in policy_strategy()) {
            let (x, y) = apply_defaults(&a, &a);
            prop_assert!(compute_delta(&x, &y).is_empty());
        }
    }
}
