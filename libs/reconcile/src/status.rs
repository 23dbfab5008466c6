//! Controller-written status shared by every entity kind.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::condition::Conditions;

/// Ownership metadata stamped on every reconciled resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Status block of a declarative record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResourceMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub conditions: Conditions,
}

/// Process-wide identity injected into every resource manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    pub account_id: String,
    pub region: String,
}

impl AccountContext {
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
        }
    }
}

impl ResourceStatus {
    /// Fill owner metadata where it is not yet set.
    pub fn set_defaults(&mut self, account: &AccountContext) {
        let metadata = self.metadata.get_or_insert_with(ResourceMetadata::default);
        if metadata.owner_account_id.is_none() {
            metadata.owner_account_id = Some(account.account_id.clone());
        }
        if metadata.region.is_none() {
            metadata.region = Some(account.region.clone());
        }
    }

    /// Record the first observation time. Later calls are no-ops.
    pub fn observe_creation(&mut self, at: DateTime<Utc>) {
        if self.creation_time.is_none() {
            self.creation_time = Some(at);
        }
    }

    /// Default `last_modified_time` to `creation_time` when unset.
    pub fn default_last_modified(&mut self) {
        if self.creation_time.is_some() && self.last_modified_time.is_none() {
            self.last_modified_time = self.creation_time;
        }
    }

    /// Stamp a successful mutation at `now`.
    ///
    /// The stored time is strictly greater than the previous one and never
    /// earlier than `creation_time`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let floor = self.last_modified_time.max(self.creation_time);
        let next = match floor {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        self.last_modified_time = Some(next);
    }
}
