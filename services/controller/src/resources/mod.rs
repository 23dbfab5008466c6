//! Managed entity kinds.
//!
//! - `scalable_target`: capacity bounds of an autoscaled resource
//! - `scaling_policy`: the rule that adjusts capacity within those bounds

use std::sync::Arc;

use appscale_reconcile::{AccountContext, ApiCallRecorder, ReconcileError, ReconcileResult};
use tracing::warn;

use crate::api::AutoscalingApi;

pub mod scalable_target;
pub mod scaling_policy;

/// Process-wide dependencies shared by every resource manager.
#[derive(Clone)]
pub struct ManagerContext {
    /// Remote autoscaling client.
    pub api: Arc<dyn AutoscalingApi>,

    /// Per-call observability hook.
    pub recorder: Arc<dyn ApiCallRecorder>,

    /// Owner account written into status.
    pub account: AccountContext,

    /// Fail instead of picking the first element of an ambiguous listing.
    pub strict_lookup: bool,
}

impl ManagerContext {
    pub fn new(
        api: Arc<dyn AutoscalingApi>,
        recorder: Arc<dyn ApiCallRecorder>,
        account: AccountContext,
    ) -> Self {
        Self {
            api,
            recorder,
            account,
            strict_lookup: false,
        }
    }

    #[must_use]
    pub fn with_strict_lookup(mut self, strict: bool) -> Self {
        self.strict_lookup = strict;
        self
    }
}

/// Pick the match from a filtered listing.
///
/// The first element wins. When the listing holds more than one element the
/// server-side filter was coarser than the identity; under strict lookup
/// that is an error, otherwise it is logged.
pub(crate) fn select_match<T>(
    records: Vec<T>,
    strict: bool,
    kind: &'static str,
    identity: &str,
) -> ReconcileResult<T> {
    let count = records.len();
    if count > 1 {
        if strict {
            return Err(ReconcileError::AmbiguousMatch { count });
        }
        warn!(kind, identity, count, "Listing matched more than one entity, using the first");
    }
    records.into_iter().next().ok_or(ReconcileError::NotFound)
}

/// Unwrap a required identity field.
pub(crate) fn required(value: &Option<String>, field: &'static str) -> ReconcileResult<String> {
    value
        .clone()
        .ok_or(ReconcileError::MissingIdentity { field })
}
