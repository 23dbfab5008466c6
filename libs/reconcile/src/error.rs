//! Error taxonomy and per-kind error classification.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// A failure reported by the remote autoscaling service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// Service error code (e.g. `ValidationException`).
    pub code: String,

    /// Human-readable message returned with the code.
    pub message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Reconciliation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    /// The remote entity does not exist (or cannot exist yet).
    #[error("resource not found")]
    NotFound,

    /// The operation has no implementation for this entity kind.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// A required identity field is unset on the snapshot.
    #[error("required identity field {field} is missing")]
    MissingIdentity { field: &'static str },

    /// A listing returned more than one candidate under strict lookup.
    #[error("lookup matched {count} remote entities, expected at most one")]
    AmbiguousMatch { count: usize },

    /// The remote call failed.
    #[error("{0}")]
    Api(#[from] ApiError),
}

impl ReconcileError {
    /// Returns true if this error means the entity is absent upstream.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Code used to match this error against a terminal allow-list.
    ///
    /// Remote failures carry the service code; local failures use the
    /// variant name.
    pub fn code(&self) -> &str {
        match self {
            Self::NotFound => "NotFound",
            Self::NotImplemented(_) => "NotImplemented",
            Self::MissingIdentity { .. } => "MissingIdentity",
            Self::AmbiguousMatch { .. } => "AmbiguousMatch",
            Self::Api(e) => e.code.as_str(),
        }
    }

    /// Returns the remote error code, if this error came from the service.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Api(e) => Some(e.code.as_str()),
            _ => None,
        }
    }
}

/// Error classification policy for one entity kind.
///
/// Both code sets are explicit allow-lists. An error is terminal only if
/// its [`ReconcileError::code`] is in `terminal_codes`, so an empty list
/// makes every error recoverable. A read failure outside `not_found_codes`
/// is propagated instead of collapsing to `NotFound`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPolicy {
    terminal_codes: BTreeSet<String>,
    not_found_codes: BTreeSet<String>,
}

/// Codes that mean "no such entity" when returned by a read.
pub const DEFAULT_NOT_FOUND_CODES: &[&str] = &["UNKNOWN", "ObjectNotFoundException"];

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            terminal_codes: BTreeSet::new(),
            not_found_codes: DEFAULT_NOT_FOUND_CODES
                .iter()
                .map(|c| (*c).to_string())
                .collect(),
        }
    }
}

impl ErrorPolicy {
    /// Create a policy from explicit code lists.
    pub fn new<T, N>(terminal_codes: T, not_found_codes: N) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            terminal_codes: terminal_codes.into_iter().map(Into::into).collect(),
            not_found_codes: not_found_codes.into_iter().map(Into::into).collect(),
        }
    }

    /// Replace the terminal code set, keeping the not-found codes.
    #[must_use]
    pub fn with_terminal_codes<T>(mut self, codes: T) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
    {
        self.terminal_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns true if the error should stop automatic retries.
    pub fn is_terminal(&self, err: &ReconcileError) -> bool {
        self.terminal_codes.contains(err.code())
    }

    /// Returns true if a remote failure means the entity does not exist.
    pub fn is_not_found_code(&self, err: &ApiError) -> bool {
        self.not_found_codes.contains(&err.code)
    }

    /// Map a failed read into the reconcile taxonomy.
    pub fn classify_read_error(&self, err: ApiError) -> ReconcileError {
        if self.is_not_found_code(&err) {
            ReconcileError::NotFound
        } else {
            ReconcileError::Api(err)
        }
    }
}
