//! Core types for evaluation requests and results

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single request to evaluate a snippet of untrusted code.
///
/// Created per inbound command, immutable, discarded after the result is
/// delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRequest {
    /// Identity the request is attributed to (chat nickname).
    pub identity: String,

    /// The raw code text as submitted.
    pub code: String,

    /// Per-request execution options.
    #[serde(default)]
    pub options: EvalOptions,
}

impl EvalRequest {
    pub fn new(identity: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            code: code.into(),
            options: EvalOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EvalOptions) -> Self {
        self.options = options;
        self
    }
}

/// Execution options carried by a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalOptions {
    /// Per-request timeout override (None = runner default).
    pub timeout: Option<Duration>,

    /// Return raw output instead of the chat-safe reduction.
    #[serde(default)]
    pub raw_output: bool,

    /// Override for the forbidden-substring pre-filter (None = runner default).
    pub use_blacklist: Option<bool>,
}

impl EvalOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn raw(mut self) -> Self {
        self.raw_output = true;
        self
    }
}

/// How an evaluation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvalStatus {
    /// Worker ran to completion; payload is its output.
    Ok,
    /// Worker exceeded the deadline and was terminated.
    TimedOut,
    /// Worker crashed, or the invoker failed to run it at all.
    RuntimeError,
    /// Input was rejected before any worker was started.
    RejectedInput,
}

/// Result of one evaluation, produced once and consumed once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalOutcome {
    pub status: EvalStatus,
    /// Raw output or error message; chat-safe reduction is derived later.
    pub payload: String,
}

impl EvalOutcome {
    pub fn ok(payload: impl Into<String>) -> Self {
        Self {
            status: EvalStatus::Ok,
            payload: payload.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            status: EvalStatus::TimedOut,
            payload: "operation timed out.".to_string(),
        }
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self {
            status: EvalStatus::RuntimeError,
            payload: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: EvalStatus::RejectedInput,
            payload: message.into(),
        }
    }

    /// True when the payload is ordinary program output.
    pub fn is_ok(&self) -> bool {
        self.status == EvalStatus::Ok
    }

    /// True when the payload should be presented as an error.
    pub fn is_error(&self) -> bool {
        self.status != EvalStatus::Ok
    }
}
