//! Defaulting and delta computation for scalable targets.

use appscale_reconcile::Delta;

use super::{ScalableTarget, SuspendedState};

/// Normalize `a` against `b` before comparison.
///
/// - `suspendedState`: if either side carries it, both do. Each unset flag
///   on `a` takes `b`'s value; flags still unset on either side become
///   `false`.
/// - `roleARN`: unset on `a` takes `b`'s value. There is no zero default.
///
/// Idempotent.
pub fn apply_defaults(a: &ScalableTarget, b: &ScalableTarget) -> (ScalableTarget, ScalableTarget) {
    let mut a = a.clone();
    let mut b = b.clone();

    default_suspended_state(&mut a.spec.suspended_state, &mut b.spec.suspended_state);

    if a.spec.role_arn.is_none() && b.spec.role_arn.is_some() {
        a.spec.role_arn = b.spec.role_arn.clone();
    }

    (a, b)
}

fn default_suspended_state(a: &mut Option<SuspendedState>, b: &mut Option<SuspendedState>) {
    if a.is_none() && b.is_none() {
        return;
    }
    let a = a.get_or_insert_with(SuspendedState::default);
    let b = b.get_or_insert_with(SuspendedState::default);

    default_flag(
        &mut a.dynamic_scaling_in_suspended,
        &mut b.dynamic_scaling_in_suspended,
    );
    default_flag(
        &mut a.dynamic_scaling_out_suspended,
        &mut b.dynamic_scaling_out_suspended,
    );
    default_flag(
        &mut a.scheduled_scaling_suspended,
        &mut b.scheduled_scaling_suspended,
    );
}

fn default_flag(a: &mut Option<bool>, b: &mut Option<bool>) {
    if a.is_none() {
        *a = *b;
    }
    *a = Some(a.unwrap_or(false));
    *b = Some(b.unwrap_or(false));
}

/// Differences on mutable fields, desired `a` against observed `b`.
///
/// Identity fields are never compared.
pub fn compute_delta(a: &ScalableTarget, b: &ScalableTarget) -> Delta {
    let (a, b) = (&a.spec, &b.spec);
    let mut delta = Delta::new();

    delta.compare("Spec.MaxCapacity", &a.max_capacity, &b.max_capacity);
    delta.compare("Spec.MinCapacity", &a.min_capacity, &b.min_capacity);
    delta.compare("Spec.RoleARN", &a.role_arn, &b.role_arn);

    match (&a.suspended_state, &b.suspended_state) {
        (Some(x), Some(y)) => {
            delta.compare(
                "Spec.SuspendedState.DynamicScalingInSuspended",
                &x.dynamic_scaling_in_suspended,
                &y.dynamic_scaling_in_suspended,
            );
            delta.compare(
                "Spec.SuspendedState.DynamicScalingOutSuspended",
                &x.dynamic_scaling_out_suspended,
                &y.dynamic_scaling_out_suspended,
            );
            delta.compare(
                "Spec.SuspendedState.ScheduledScalingSuspended",
                &x.scheduled_scaling_suspended,
                &y.scheduled_scaling_suspended,
            );
        }
        _ => delta.compare("Spec.SuspendedState", &a.suspended_state, &b.suspended_state),
    }

    delta
}
