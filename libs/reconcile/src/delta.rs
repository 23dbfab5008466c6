//! Field-level differences between two snapshots.

use serde::Serialize;
use serde_json::Value;

/// One differing field.
///
/// `old` is the observed value, `new` the desired one. `None` means the
/// field is unset on that side; a set value that fails to serialize is
/// recorded as `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub path: &'static str,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Ordered list of differences.
///
/// Order is the order of `compare` calls, which delta computers keep
/// fixed to field declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    differences: Vec<Difference>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare one optional field.
    ///
    /// Presence on exactly one side is a difference regardless of value;
    /// both present compares by equality; both absent is equal.
    pub fn compare<T>(&mut self, path: &'static str, desired: &Option<T>, observed: &Option<T>)
    where
        T: PartialEq + Serialize,
    {
        let differs = match (desired, observed) {
            (Some(d), Some(o)) => d != o,
            (None, None) => false,
            _ => true,
        };
        if differs {
            self.differences.push(Difference {
                path,
                old: observed.as_ref().map(to_value),
                new: desired.as_ref().map(to_value),
            });
        }
    }

    pub fn differences(&self) -> &[Difference] {
        &self.differences
    }

    pub fn paths(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.differences.iter().map(|d| d.path)
    }

    /// Returns true if any difference is at `path` or beneath it.
    pub fn different_at(&self, path: &str) -> bool {
        self.differences.iter().any(|d| {
            d.path == path
                || d.path
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.differences.len()
    }
}

/// A value that cannot be rendered is kept as `Null` so presence survives.
fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}
