//! The unit of work flowing through the pipeline, and its terminal result.

use std::path::PathBuf;

use crate::error::Verdict;

/// Where a [`Task`] currently sits in the compile/run/verify pipeline.
///
/// Monotonically non-decreasing as a task is handed off between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Stage {
    New,
    Compiled,
    Executed,
    Finished,
}

/// A single submission to be compiled, run against one input, and verified.
///
/// The core never mutates `code_path`, `input_path`, `answer_path`, or the
/// resource limits. `exe_path` starts empty and is derived exactly once by
/// the Compiler.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Task {
    pub id: u64,
    /// Relative to the source root (`<root>/code`).
    pub code_path: PathBuf,
    /// Relative to the executable root (`<root>/exe`). Empty until compiled.
    pub exe_path: PathBuf,
    /// Relative to the input root (`<root>/input`).
    pub input_path: PathBuf,
    /// Relative to the output root (`<root>/output`).
    pub output_path: PathBuf,
    /// Relative to the answer root (`<root>/answer`).
    pub answer_path: PathBuf,
    pub cpu_period: i64,
    pub cpu_quota: i64,
    pub timeout_seconds: f64,
    pub memory_bytes: i64,
    pub stage: Stage,
}

impl Task {
    /// A freshly submitted task, not yet compiled.
    pub fn new(
        id: u64,
        code_path: impl Into<PathBuf>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        answer_path: impl Into<PathBuf>,
        cpu_period: i64,
        cpu_quota: i64,
        timeout_seconds: f64,
        memory_bytes: i64,
    ) -> Self {
        Task {
            id,
            code_path: code_path.into(),
            exe_path: PathBuf::new(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            answer_path: answer_path.into(),
            cpu_period,
            cpu_quota,
            timeout_seconds,
            memory_bytes,
            stage: Stage::New,
        }
    }
}

/// A terminal record emitted to the result sink: exactly one per [`Task`]
/// that crossed the Dispatcher before a graceful `Destroy`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskResult {
    pub id: u64,
    pub success: bool,
    pub error: Option<Verdict>,
}

impl TaskResult {
    pub fn ok(id: u64) -> Self {
        TaskResult {
            id,
            success: true,
            error: None,
        }
    }

    pub fn fail(id: u64, verdict: Verdict) -> Self {
        TaskResult {
            id,
            success: false,
            error: Some(verdict),
        }
    }
}

/// A [`Task`] queued for compilation. Pre-split input/output names are added
/// once it reaches the Run stage; `CompileTask` only wraps the original task.
#[derive(Debug, Clone)]
pub struct CompileTask {
    pub task: Task,
}

/// A [`Task`] queued for sandboxed execution, carrying pre-split directory
/// and file names so the Runner need not re-derive them.
#[derive(Debug, Clone)]
pub struct RunTask {
    pub task: Task,
    pub input_dir: PathBuf,
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub output_file: PathBuf,
}

impl RunTask {
    pub fn from_task(task: Task) -> Self {
        let input_dir = task
            .input_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        let input_file = task
            .input_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();
        let output_dir = task
            .output_path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();
        let output_file = task
            .output_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();
        RunTask {
            task,
            input_dir,
            input_file,
            output_dir,
            output_file,
        }
    }
}

/// A [`Task`] queued for output verification.
#[derive(Debug, Clone)]
pub struct VerifyTask {
    pub task: Task,
}
