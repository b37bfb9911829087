//! Verdict taxonomy and the exit-code-to-verdict mapping.
//!
//! The mapping in [`verdict_for_exit_code`] is the canonical contract any
//! `RunRuntime` must honor: implementations must preserve these exit codes
//! verbatim, since they are produced by the sandbox + `timeout` wrapper
//! rather than by the user program directly.

use thiserror::Error;

/// A human-readable, tagged error category attached to a failed [`crate::TaskResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "code", content = "message")]
pub enum Verdict {
    #[error("compile error: {0}")]
    CompileError(String),
    #[error("runtime error: {0}")]
    RuntimeError(String),
    #[error("time limit exceeded: {0}")]
    TimeLimitExceeded(String),
    #[error("memory limit exceeded: {0}")]
    MemoryLimitExceeded(String),
    #[error("environment error: {0}")]
    EnvironmentError(String),
    #[error("output missing: {0}")]
    OutputMissing(String),
    #[error("answer missing: {0}")]
    AnswerMissing(String),
    /// A line-content mismatch between output and answer — distinct from
    /// [`Verdict::RuntimeError`], which is reserved for the Runner's exit
    /// code 2 only. Emitted solely by the Verifier stage.
    #[error("wrong answer: {0}")]
    WrongAnswer(String),
    #[error("unknown failure: {0}")]
    Unknown(String),
}

impl Verdict {
    pub fn message(&self) -> &str {
        match self {
            Verdict::CompileError(m)
            | Verdict::RuntimeError(m)
            | Verdict::TimeLimitExceeded(m)
            | Verdict::MemoryLimitExceeded(m)
            | Verdict::EnvironmentError(m)
            | Verdict::OutputMissing(m)
            | Verdict::AnswerMissing(m)
            | Verdict::WrongAnswer(m)
            | Verdict::Unknown(m) => m,
        }
    }
}

/// Maps a run sandbox's observed exit code to a [`Verdict`].
///
/// Returns `None` for exit code 0 (success — no verdict is attached to a
/// successful run).
pub fn verdict_for_exit_code(exit_code: i64, captured: &str) -> Option<Verdict> {
    match exit_code {
        0 => None,
        2 => Some(Verdict::RuntimeError(captured.to_owned())),
        126 => Some(Verdict::EnvironmentError(captured.to_owned())),
        137 => Some(Verdict::MemoryLimitExceeded(captured.to_owned())),
        143 => Some(Verdict::TimeLimitExceeded(captured.to_owned())),
        _ => Some(Verdict::Unknown(captured.to_owned())),
    }
}

/// An infrastructure-level failure surfaced by a sandbox runtime: cannot
/// create/attach/exec, sandbox vanished, wait returned an error, etc.
///
/// Distinct from [`Verdict`]: an `Infra` error is what the Compiler's
/// sandbox-recovery protocol reacts to, not what gets reported to the result
/// sink directly (it is translated into `Verdict::EnvironmentError` only once
/// recovery has been attempted and failed).
#[derive(Debug, Error)]
pub enum Infra {
    #[error("sandbox not found")]
    NotFound,
    #[error("sandbox runtime error: {0}")]
    Runtime(String),
}

/// Errors from [`crate::ExecutorBuilder`] validating the programmatic
/// configuration surface before an [`crate::Executor`] is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be a positive integer, got {value}")]
    NonPositiveConcurrency { field: &'static str, value: i64 },
    #[error("{which} must be set before building the executor")]
    MissingChannel { which: &'static str },
    #[error("failed to start the compile sandbox: {0}")]
    SandboxStartup(String),
}
