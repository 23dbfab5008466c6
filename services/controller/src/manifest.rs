//! Desired-state manifest.
//!
//! A JSON document listing the scalable targets and scaling policies the
//! controller keeps registered:
//!
//! ```json
//! {
//!   "scalableTargets": [{ "serviceNamespace": "ecs", "resourceID": "...", ... }],
//!   "scalingPolicies": [{ "policyName": "cpu", ... }]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::resources::scalable_target::ScalableTargetSpec;
use crate::resources::scaling_policy::ScalingPolicySpec;

/// Entities declared by the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub scalable_targets: Vec<ScalableTargetSpec>,
    #[serde(default)]
    pub scaling_policies: Vec<ScalingPolicySpec>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid manifest {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn is_empty(&self) -> bool {
        self.scalable_targets.is_empty() && self.scaling_policies.is_empty()
    }
}
