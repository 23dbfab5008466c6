//! Configuration for the autoscaling controller.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use appscale_reconcile::{AccountContext, ErrorPolicy, DEFAULT_NOT_FOUND_CODES};

/// Controller configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Account that owns every reconciled entity.
    pub account_id: String,

    /// Region the entities live in.
    pub region: String,

    /// Path to the JSON manifest of desired entities.
    pub manifest_path: PathBuf,

    /// Interval between reconciliation passes in seconds.
    pub reconcile_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Treat an ambiguous listing as an error instead of taking the first match.
    pub strict_lookup: bool,

    /// Error codes that halt retries for scalable targets.
    pub scalable_target_terminal_codes: Vec<String>,

    /// Error codes that halt retries for scaling policies.
    pub scaling_policy_terminal_codes: Vec<String>,

    /// Read-time error codes that mean the entity does not exist.
    pub not_found_codes: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let account_id =
            lookup("APPSCALE_ACCOUNT_ID").unwrap_or_else(|| "000000000000".to_string());

        let region = lookup("APPSCALE_REGION").unwrap_or_else(|| "us-east-1".to_string());

        let manifest_path = lookup("APPSCALE_MANIFEST")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("appscale.json"));

        let reconcile_interval_secs: u64 = match lookup("APPSCALE_RECONCILE_INTERVAL") {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid APPSCALE_RECONCILE_INTERVAL: {s:?}"))?,
            None => 30,
        };
        if reconcile_interval_secs == 0 {
            anyhow::bail!("APPSCALE_RECONCILE_INTERVAL must be at least 1 second");
        }

        let log_level = lookup("APPSCALE_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let strict_lookup = match lookup("APPSCALE_STRICT_LOOKUP") {
            Some(s) => parse_bool(&s)
                .with_context(|| format!("invalid APPSCALE_STRICT_LOOKUP: {s:?}"))?,
            None => false,
        };

        let scalable_target_terminal_codes = lookup("APPSCALE_SCALABLE_TARGET_TERMINAL_CODES")
            .map(|s| parse_list(&s))
            .unwrap_or_default();

        let scaling_policy_terminal_codes = lookup("APPSCALE_SCALING_POLICY_TERMINAL_CODES")
            .map(|s| parse_list(&s))
            .unwrap_or_default();

        let not_found_codes = lookup("APPSCALE_NOT_FOUND_CODES")
            .map(|s| parse_list(&s))
            .unwrap_or_else(|| DEFAULT_NOT_FOUND_CODES.iter().map(|c| c.to_string()).collect());

        Ok(Self {
            account_id,
            region,
            manifest_path,
            reconcile_interval_secs,
            log_level,
            strict_lookup,
            scalable_target_terminal_codes,
            scaling_policy_terminal_codes,
            not_found_codes,
        })
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn account(&self) -> AccountContext {
        AccountContext::new(&self.account_id, &self.region)
    }

    pub fn scalable_target_error_policy(&self) -> ErrorPolicy {
        ErrorPolicy::new(
            self.scalable_target_terminal_codes.iter().cloned(),
            self.not_found_codes.iter().cloned(),
        )
    }

    pub fn scaling_policy_error_policy(&self) -> ErrorPolicy {
        ErrorPolicy::new(
            self.scaling_policy_terminal_codes.iter().cloned(),
            self.not_found_codes.iter().cloned(),
        )
    }
}

/// Comma-separated list; blanks are skipped.
fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use appscale_reconcile::{ApiError, ReconcileError};

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.account_id, "000000000000");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.manifest_path, PathBuf::from("appscale.json"));
        assert_eq!(config.reconcile_interval(), Duration::from_secs(30));
        assert!(!config.strict_lookup);
        assert!(config.scalable_target_terminal_codes.is_empty());
        assert_eq!(config.not_found_codes, vec!["UNKNOWN", "ObjectNotFoundException"]);
    }

    #[test]
    fn test_terminal_codes_are_per_kind() {
        let config = load(&[
            (
                "APPSCALE_SCALABLE_TARGET_TERMINAL_CODES",
                "ValidationException, AccessDeniedException,",
            ),
            ("APPSCALE_STRICT_LOOKUP", "true"),
        ])
        .unwrap();

        let validation = ReconcileError::Api(ApiError::new("ValidationException", "bad"));
        assert!(config.scalable_target_error_policy().is_terminal(&validation));
        assert!(!config.scaling_policy_error_policy().is_terminal(&validation));
        assert!(config.strict_lookup);
    }

    #[test]
    fn test_not_found_codes_override() {
        let config = load(&[("APPSCALE_NOT_FOUND_CODES", "ObjectNotFoundException")]).unwrap();
        let policy = config.scalable_target_error_policy();
        assert!(!policy.is_not_found_code(&ApiError::new("UNKNOWN", "")));
        assert!(policy.is_not_found_code(&ApiError::new("ObjectNotFoundException", "")));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(load(&[("APPSCALE_RECONCILE_INTERVAL", "soon")]).is_err());
        assert!(load(&[("APPSCALE_RECONCILE_INTERVAL", "0")]).is_err());
        assert!(load(&[("APPSCALE_STRICT_LOOKUP", "maybe")]).is_err());
    }
}
