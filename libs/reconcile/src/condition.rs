//! Status conditions and the condition tracker.
//!
//! A resource carries at most one condition per [`ConditionKind`]. The
//! tracker folds the outcome of one reconciliation pass into the stored
//! set and reports whether anything changed, so callers can skip a
//! redundant status write.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorPolicy, ReconcileError};

/// Condition kinds, in serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    /// The last error will not go away by retrying.
    Terminal,

    /// The last error is expected to clear on a later pass.
    Recoverable,

    /// The remote entity matches the desired spec.
    ResourceSynced,
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Terminal => "Terminal",
            Self::Recoverable => "Recoverable",
            Self::ResourceSynced => "ResourceSynced",
        };
        write!(f, "{s}")
    }
}

/// A single status condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            status: false,
            message: None,
            last_transition_time: None,
        }
    }

    /// Set status and message; returns true if either changed.
    fn apply(&mut self, status: bool, message: Option<String>, now: DateTime<Utc>) -> bool {
        if self.status == status && self.message == message {
            return false;
        }
        if self.status != status || self.last_transition_time.is_none() {
            self.last_transition_time = Some(now);
        }
        self.status = status;
        self.message = message;
        true
    }
}

/// The condition set of one resource, keyed by kind.
///
/// Serializes as a list ordered by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Condition>", into = "Vec<Condition>")]
pub struct Conditions(BTreeMap<ConditionKind, Condition>);

impl Conditions {
    /// Create an empty condition set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ConditionKind) -> Option<&Condition> {
        self.0.get(&kind)
    }

    /// Returns true if a condition of this kind exists and is true.
    pub fn is_true(&self, kind: ConditionKind) -> bool {
        self.get(kind).is_some_and(|c| c.status)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate conditions in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.values()
    }

    /// Insert or replace the condition of its kind.
    pub fn insert(&mut self, condition: Condition) {
        self.0.insert(condition.kind, condition);
    }

    /// Set a condition, creating it if absent. Returns true on change.
    fn raise(&mut self, kind: ConditionKind, message: String, now: DateTime<Utc>) -> bool {
        let created = !self.0.contains_key(&kind);
        let condition = self.0.entry(kind).or_insert_with(|| Condition::new(kind));
        condition.apply(true, Some(message), now) || created
    }

    /// Clear an existing condition to false. Absent conditions stay absent.
    fn clear(&mut self, kind: ConditionKind, now: DateTime<Utc>) -> bool {
        match self.0.get_mut(&kind) {
            Some(condition) => condition.apply(false, None, now),
            None => false,
        }
    }
}

impl From<Vec<Condition>> for Conditions {
    fn from(list: Vec<Condition>) -> Self {
        Self(list.into_iter().map(|c| (c.kind, c)).collect())
    }
}

impl From<Conditions> for Vec<Condition> {
    fn from(conditions: Conditions) -> Self {
        conditions.0.into_values().collect()
    }
}

/// Fold the outcome of a pass into a copy of `current`.
///
/// - A terminal error raises `Terminal` and leaves `Recoverable` as it was.
/// - A non-terminal error clears `Terminal` and raises `Recoverable`.
/// - Success clears both.
///
/// `ResourceSynced` is never written here. Returns the new set and whether
/// any stored condition changed.
pub fn track_conditions(
    current: &Conditions,
    outcome: Option<&ReconcileError>,
    policy: &ErrorPolicy,
    now: DateTime<Utc>,
) -> (Conditions, bool) {
    let mut next = current.clone();

    let changed = match outcome {
        Some(err) if policy.is_terminal(err) => {
            next.raise(ConditionKind::Terminal, err.to_string(), now)
        }
        Some(err) => {
            let cleared = next.clear(ConditionKind::Terminal, now);
            let raised = next.raise(ConditionKind::Recoverable, err.to_string(), now);
            cleared | raised
        }
        None => {
            let terminal = next.clear(ConditionKind::Terminal, now);
            let recoverable = next.clear(ConditionKind::Recoverable, now);
            terminal | recoverable
        }
    };

    (next, changed)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::error::ApiError;

    fn terminal_policy() -> ErrorPolicy {
        ErrorPolicy::default().with_terminal_codes(["InvalidParameterValue", "NotImplemented"])
    }

    fn throttled() -> ReconcileError {
        ApiError::new("Throttling", "rate exceeded").into()
    }

    fn invalid() -> ReconcileError {
        ApiError::new("InvalidParameterValue", "bad min capacity").into()
    }

    #[test]
    fn test_success_on_empty_set_is_no_change() {
        let (next, changed) =
            track_conditions(&Conditions::new(), None, &terminal_policy(), Utc::now());
        assert!(!changed);
        assert!(next.is_empty());
    }

    #[test]
    fn test_recoverable_error_raises_recoverable() {
        let policy = terminal_policy();
        let (next, changed) =
            track_conditions(&Conditions::new(), Some(&throttled()), &policy, Utc::now());
        assert!(changed);
        let c = next.get(ConditionKind::Recoverable).unwrap();
        assert!(c.status);
        assert_eq!(c.message.as_deref(), Some("Throttling: rate exceeded"));
        assert!(next.get(ConditionKind::Terminal).is_none());
    }

    #[test]
    fn test_success_clears_recoverable() {
        let policy = terminal_policy();
        let (after_err, _) =
            track_conditions(&Conditions::new(), Some(&throttled()), &policy, Utc::now());
        let (after_ok, changed) = track_conditions(&after_err, None, &policy, Utc::now());
        assert!(changed);
        let c = after_ok.get(ConditionKind::Recoverable).unwrap();
        assert!(!c.status);
        assert!(c.message.is_none());
    }

    #[test]
    fn test_terminal_leaves_recoverable_untouched() {
        let policy = terminal_policy();
        let (after_err, _) =
            track_conditions(&Conditions::new(), Some(&throttled()), &policy, Utc::now());
        let (after_terminal, changed) =
            track_conditions(&after_err, Some(&invalid()), &policy, Utc::now());
        assert!(changed);
        assert!(after_terminal.is_true(ConditionKind::Terminal));
        assert_eq!(
            after_terminal.get(ConditionKind::Recoverable),
            after_err.get(ConditionKind::Recoverable)
        );
    }

    #[test]
    fn test_terminal_clears_when_error_reclassified() {
        let policy = terminal_policy();
        let (after_terminal, _) =
            track_conditions(&Conditions::new(), Some(&invalid()), &policy, Utc::now());
        let (next, changed) = track_conditions(
            &after_terminal,
            Some(&throttled()),
            &ErrorPolicy::default(),
            Utc::now(),
        );
        assert!(changed);
        let terminal = next.get(ConditionKind::Terminal).unwrap();
        assert!(!terminal.status);
        assert!(terminal.message.is_none());
        assert!(next.is_true(ConditionKind::Recoverable));
    }

    #[test]
    fn test_empty_allow_list_never_raises_terminal() {
        let policy = ErrorPolicy::default();
        let unsupported = ReconcileError::NotImplemented("update");
        let (next, changed) =
            track_conditions(&Conditions::new(), Some(&unsupported), &policy, Utc::now());
        assert!(changed);
        assert!(next.get(ConditionKind::Terminal).is_none());
        let c = next.get(ConditionKind::Recoverable).unwrap();
        assert!(c.status);
        assert_eq!(c.message.as_deref(), Some("not implemented: update"));
    }

    #[test]
    fn test_listed_local_failure_raises_terminal() {
        let unsupported = ReconcileError::NotImplemented("update");
        let policy = terminal_policy();
        let (next, _) =
            track_conditions(&Conditions::new(), Some(&unsupported), &policy, Utc::now());
        assert!(next.is_true(ConditionKind::Terminal));
        assert!(next.get(ConditionKind::Recoverable).is_none());
    }

    #[test]
    fn test_synced_is_not_written() {
        let mut current = Conditions::new();
        current.insert(Condition {
            kind: ConditionKind::ResourceSynced,
            status: true,
            message: None,
            last_transition_time: None,
        });
        let policy = terminal_policy();
        let (next, _) = track_conditions(&current, Some(&throttled()), &policy, Utc::now());
        assert_eq!(
            next.get(ConditionKind::ResourceSynced),
            current.get(ConditionKind::ResourceSynced)
        );
    }

    #[test]
    fn test_transition_time_only_moves_on_flip() {
        let policy = terminal_policy();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(5);
        let (first, _) = track_conditions(&Conditions::new(), Some(&throttled()), &policy, t0);
        let other = ReconcileError::from(ApiError::new("Throttling", "still throttled"));
        let (second, changed) = track_conditions(&first, Some(&other), &policy, t1);
        assert!(changed);
        let c = second.get(ConditionKind::Recoverable).unwrap();
        assert_eq!(c.last_transition_time, Some(t0));
    }

    #[test]
    fn test_serializes_in_kind_order() {
        let mut conditions = Conditions::new();
        conditions.insert(Condition {
            kind: ConditionKind::ResourceSynced,
            status: true,
            message: None,
            last_transition_time: None,
        });
        conditions.insert(Condition {
            kind: ConditionKind::Terminal,
            status: false,
            message: None,
            last_transition_time: None,
        });
        let json = serde_json::to_value(&conditions).unwrap();
        assert_eq!(json[0]["type"], "Terminal");
        assert_eq!(json[1]["type"], "ResourceSynced");

        let back: Conditions = serde_json::from_value(json).unwrap();
        assert_eq!(back, conditions);
    }

    fn outcome_strategy() -> impl Strategy<Value = Option<ReconcileError>> {
        prop_oneof![
            Just(None),
            Just(Some(throttled())),
            Just(Some(invalid())),
            Just(Some(ReconcileError::NotImplemented("update"))),
            Just(Some(ReconcileError::MissingIdentity { field: "resourceID" })),
        ]
    }

    fn policy_strategy() -> impl Strategy<Value = ErrorPolicy> {
        prop_oneof![Just(ErrorPolicy::default()), Just(terminal_policy())]
    }

    fn replay(history: &[Option<ReconcileError>], policy: &ErrorPolicy) -> Conditions {
        history.iter().fold(Conditions::new(), |conditions, outcome| {
            track_conditions(&conditions, outcome.as_ref(), policy, Utc::now()).0
        })
    }

    proptest! {
        #[test]
        fn prop_terminal_pass_never_raises_recoverable(
            history in proptest::collection::vec(outcome_strategy(), 0..6),
            last in outcome_strategy(),
            policy in policy_strategy(),
        ) {
            let conditions = replay(&history, &policy);
            let before = conditions.get(ConditionKind::Recoverable).cloned();
            let (after, _) = track_conditions(&conditions, last.as_ref(), &policy, Utc::now());

            if let Some(err) = &last {
                if policy == ErrorPolicy::default() {
                    prop_assert!(!after.is_true(ConditionKind::Terminal));
                }
                if policy.is_terminal(err) {
                    prop_assert!(after.is_true(ConditionKind::Terminal));
                    prop_assert_eq!(after.get(ConditionKind::Recoverable).cloned(), before);
                } else {
                    prop_assert!(!after.is_true(ConditionKind::Terminal));
                    prop_assert!(after.is_true(ConditionKind::Recoverable));
                }
            }
        }

        #[test]
        fn prop_repeated_outcome_reports_no_change(
            history in proptest::collection::vec(outcome_strategy(), 0..6),
            last in outcome_strategy(),
            policy in policy_strategy(),
        ) {
            let conditions = replay(&history, &policy);
            let (once, _) = track_conditions(&conditions, last.as_ref(), &policy, Utc::now());
            let (twice, changed) = track_conditions(&once, last.as_ref(), &policy, Utc::now());
            prop_assert!(!changed);
            prop_assert_eq!(once, twice);
        }
    }
}
