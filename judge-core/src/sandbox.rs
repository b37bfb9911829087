//! The seam between the pipeline orchestrator and a container runtime.
//!
//! The core depends only on these two traits; `judge-docker` provides the
//! `bollard`-backed implementation, but any runtime exposing
//! create/start/exec/attach/wait/inspect/remove semantics fits.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Infra;

/// Diagnostic output captured from a compile or run sandbox, truncated to a
/// cap to avoid unbounded memory growth from attacker-controlled output.
pub const CAPTURED_OUTPUT_CAP_BYTES: usize = 64 * 1024;

/// Truncates `output` to [`CAPTURED_OUTPUT_CAP_BYTES`], appending an elision
/// marker when truncation occurs.
pub fn cap_captured_output(mut output: String) -> String {
    if output.len() <= CAPTURED_OUTPUT_CAP_BYTES {
        return output;
    }
    let elided = output.len() - CAPTURED_OUTPUT_CAP_BYTES;
    let mut boundary = CAPTURED_OUTPUT_CAP_BYTES;
    while boundary > 0 && !output.is_char_boundary(boundary) {
        boundary -= 1;
    }
    output.truncate(boundary);
    output.push_str(&format!("\n... [truncated, {elided} bytes elided]"));
    output
}


/// Outcome of a single compile attempt inside the shared compile sandbox.
#[derive(Debug, Clone)]
pub enum CompileOutcome {
    /// Exit 0: the executable was written to the executable root.
    Success,
    /// Non-zero exit: carries the captured combined stdout+stderr.
    CompileError(String),
}

/// The long-lived, shared compile sandbox. All methods may be called
/// concurrently by any number of Compiler workers except [`restart`], whose
/// mutual exclusion is the caller's (the Compiler pool's) responsibility.
///
/// [`restart`]: CompileRuntime::restart
#[async_trait]
pub trait CompileRuntime: Send + Sync {
    /// Starts the shared compile sandbox if one is not already running.
    async fn ensure_started(&self) -> Result<(), Infra>;

    /// Compiles `code_path` (relative to the source root) into `exe_path`
    /// (relative to the executable root), both resolved by the
    /// implementation against its configured resource-tree root.
    async fn compile(&self, code_path: &Path, exe_path: &Path) -> Result<CompileOutcome, Infra>;

    /// Inspects the current compile sandbox; if the runtime reports it
    /// absent, starts a fresh one with the same image and mounts. If
    /// present, assumes a transient failure and returns without restarting.
    async fn restart(&self) -> Result<(), Infra>;

    /// Force-removes the compile sandbox. Called once during shutdown.
    async fn remove(&self) -> Result<(), Infra>;
}

/// Resource limits applied to a single run sandbox, carried verbatim from
/// the originating [`crate::Task`].
#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    pub cpu_period: i64,
    pub cpu_quota: i64,
    pub timeout_seconds: f64,
    pub memory_bytes: i64,
}

/// Everything a [`RunRuntime`] needs to create and run one short-lived
/// sandbox for a single task.
#[derive(Debug, Clone)]
pub struct RunSpec {
    /// Path to the compiled executable, resolved against the executable root.
    pub exe_path: PathBuf,
    /// Directory containing the input file, resolved against the input root.
    pub input_dir: PathBuf,
    pub input_file: PathBuf,
    /// Directory to write the output file into, resolved against the output root.
    pub output_dir: PathBuf,
    pub output_file: PathBuf,
    pub limits: ResourceLimits,
}

/// Outcome of running the compiled executable inside a per-task sandbox.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The sandbox's exit code, verbatim — 0 for success, otherwise mapped
    /// by [`crate::error::verdict_for_exit_code`].
    pub exit_code: i64,
    /// Captured combined stdout+stderr, present for non-zero exits.
    pub captured: String,
}

/// A fresh, short-lived, resource-constrained sandbox per task.
#[async_trait]
pub trait RunRuntime: Send + Sync {
    /// Creates, starts, and awaits termination of a sandbox running the
    /// given spec, returning its outcome. Implementations auto-remove the
    /// sandbox on exit.
    async fn run(&self, spec: &RunSpec) -> Result<RunOutcome, Infra>;
}
