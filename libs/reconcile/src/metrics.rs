//! Remote call recording hook.

use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::ApiError;

/// Category of a remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    ReadOne,
    ReadMany,
    Create,
    Update,
    Delete,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOne => "READ_ONE",
            Self::ReadMany => "READ_MANY",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for OpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called once per remote call. Fire-and-forget.
pub trait ApiCallRecorder: Send + Sync {
    fn record_api_call(&self, op_type: OpType, op_name: &'static str, error: Option<&ApiError>);
}

/// Emits one tracing event per remote call.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRecorder;

impl ApiCallRecorder for TracingRecorder {
    fn record_api_call(&self, op_type: OpType, op_name: &'static str, error: Option<&ApiError>) {
        match error {
            None => debug!(op_type = %op_type, op_name, "API call succeeded"),
            Some(e) => warn!(
                op_type = %op_type,
                op_name,
                error_code = %e.code,
                error = %e.message,
                "API call failed"
            ),
        }
    }
}

/// A recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub op_type: OpType,
    pub op_name: &'static str,
    pub error_code: Option<String>,
}

/// Keeps every recorded call in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    calls: Mutex<Vec<RecordedCall>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all calls recorded so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, op_name: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.op_name == op_name)
            .count()
    }
}

impl ApiCallRecorder for MemoryRecorder {
    fn record_api_call(&self, op_type: OpType, op_name: &'static str, error: Option<&ApiError>) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                op_type,
                op_name,
                error_code: error.map(|e| e.code.clone()),
            });
        }
    }
}
