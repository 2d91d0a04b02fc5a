use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{BoardId, ExecutionId};

/// A structured observability event emitted by the execution core.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    Execution(ExecutionEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    /// Execution lifecycle event tied to a registered invocation.
    pub fn execution(
        phase: ExecutionPhase,
        execution_id: ExecutionId,
        board: BoardId,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Execution(ExecutionEvent {
            phase,
            execution_id,
            board,
            action: action.into(),
            message: message.into(),
            timestamp: Utc::now(),
        })
    }

    /// Free-form event for everything without an execution id.
    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn scope_label(&self) -> &str {
        match self {
            Event::Execution(exec) => exec.phase.as_str(),
            Event::Diagnostic(diag) => &diag.scope,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Event::Execution(exec) => &exec.message,
            Event::Diagnostic(diag) => &diag.message,
        }
    }

    /// Convert to a JSON value with a normalized schema.
    ///
    /// ```json
    /// {
    ///   "type": "execution" | "diagnostic",
    ///   "scope": "started",
    ///   "message": "…",
    ///   "timestamp": "2026-08-04T12:34:56.789Z",
    ///   "metadata": { "execution_id": "exec_…", "board": "…", "action": "…" }
    /// }
    /// ```
    pub fn to_json_value(&self) -> Value {
        use serde_json::json;

        let (event_type, metadata, timestamp) = match self {
            Event::Execution(exec) => {
                let meta = json!({
                    "execution_id": exec.execution_id,
                    "board": exec.board,
                    "action": exec.action,
                });
                ("execution", meta, exec.timestamp)
            }
            Event::Diagnostic(_) => ("diagnostic", json!({}), Utc::now()),
        };

        json!({
            "type": event_type,
            "scope": self.scope_label(),
            "message": self.message(),
            "timestamp": timestamp.to_rfc3339(),
            "metadata": metadata,
        })
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Execution(exec) => write!(
                f,
                "[{}:{} {}] {} {}",
                exec.board, exec.action, exec.execution_id, exec.phase, exec.message
            ),
            Event::Diagnostic(diag) => write!(f, "[{}] {}", diag.scope, diag.message),
        }
    }
}

/// Lifecycle phase of an execution event.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Started,
    Completed,
    Failed,
    CancelRequested,
    Cancelled,
}

impl ExecutionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionPhase::Started => "started",
            ExecutionPhase::Completed => "completed",
            ExecutionPhase::Failed => "failed",
            ExecutionPhase::CancelRequested => "cancel_requested",
            ExecutionPhase::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionEvent {
    pub phase: ExecutionPhase,
    pub execution_id: ExecutionId,
    pub board: BoardId,
    pub action: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    pub scope: String,
    pub message: String,
}
