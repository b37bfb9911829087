//! Hand-written fake runtimes used to exercise the pipeline without a real
//! container daemon, the idiomatic analogue of the original's
//! `judger/mock/code/{oom,rm}.go` fixtures and its client-level test stubs
//! in `dockerExecutor_test.go`.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use judge_core::sandbox::{CompileOutcome, CompileRuntime, RunOutcome, RunRuntime, RunSpec};
use judge_core::verifier::{LinePairedVerifier, Verifier, VerifyOutcome};
use judge_core::Infra;

/// A scripted compile outcome for one invocation.
#[derive(Debug, Clone)]
pub enum ScriptedCompile {
    Success,
    CompileError(String),
    Infra,
}

/// A `CompileRuntime` whose `compile` calls return canned, ordered outcomes.
/// Infra failures are recovered (or not) by the single `restart` call that
/// follows, so the requeue path can be exercised deterministically.
pub struct FakeCompileRuntime {
    script: Mutex<VecDeque<ScriptedCompile>>,
    restart_calls: Mutex<u32>,
    recoverable: bool,
}

impl FakeCompileRuntime {
    pub fn new(script: Vec<ScriptedCompile>, recoverable: bool) -> Arc<Self> {
        Arc::new(FakeCompileRuntime {
            script: Mutex::new(script.into()),
            restart_calls: Mutex::new(0),
            recoverable,
        })
    }

    pub async fn restart_call_count(&self) -> u32 {
        *self.restart_calls.lock().await
    }
}

#[async_trait]
impl CompileRuntime for FakeCompileRuntime {
    async fn ensure_started(&self) -> Result<(), Infra> {
        Ok(())
    }

    async fn compile(&self, _code_path: &Path, _exe_path: &Path) -> Result<CompileOutcome, Infra> {
        let next = self.script.lock().await.pop_front();
        match next {
            Some(ScriptedCompile::Success) => Ok(CompileOutcome::Success),
            Some(ScriptedCompile::CompileError(msg)) => Ok(CompileOutcome::CompileError(msg)),
            Some(ScriptedCompile::Infra) => Err(Infra::Runtime("sandbox vanished".into())),
            None => Ok(CompileOutcome::Success),
        }
    }

    async fn restart(&self) -> Result<(), Infra> {
        *self.restart_calls.lock().await += 1;
        if self.recoverable {
            Ok(())
        } else {
            Err(Infra::Runtime("could not restart sandbox".into()))
        }
    }

    async fn remove(&self) -> Result<(), Infra> {
        Ok(())
    }
}

/// One scripted run: the sandbox's reported exit code, captured diagnostic
/// output, and (for exit 0) the bytes the sandbox would have redirected into
/// the output file.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    pub exit_code: i64,
    pub captured: String,
    pub output_contents: Option<String>,
}

impl ScriptedRun {
    pub fn accepted(output: impl Into<String>) -> Self {
        ScriptedRun {
            exit_code: 0,
            captured: String::new(),
            output_contents: Some(output.into()),
        }
    }

    pub fn exit(code: i64, captured: impl Into<String>) -> Self {
        ScriptedRun {
            exit_code: code,
            captured: captured.into(),
            output_contents: None,
        }
    }
}

/// A `RunRuntime` keyed by the task's input file name, so table-driven
/// scenarios can assign distinct behavior per task without real sandboxes.
/// When a scripted run carries `output_contents`, it is written to the
/// task's output path, mimicking the shell redirect a real sandbox performs.
///
/// `output_root`, when set, is joined with `spec.output_dir`/`output_file`
/// before writing — the fake's analogue of a real `RunRuntime` resolving a
/// root-relative `RunSpec` against its configured resource tree. Left unset,
/// the scripted output is written straight to `spec.output_dir.join(file)`,
/// which only resolves sensibly when the task's output path is absolute.
pub struct FakeRunRuntime {
    responses: HashMap<PathBuf, ScriptedRun>,
    output_root: Option<PathBuf>,
    step_delay: Option<Duration>,
}

impl FakeRunRuntime {
    pub fn new(responses: Vec<(PathBuf, ScriptedRun)>) -> Arc<Self> {
        Arc::new(FakeRunRuntime {
            responses: responses.into_iter().collect(),
            output_root: None,
            step_delay: None,
        })
    }

    /// Like [`Self::new`], but resolves the scripted output against
    /// `output_root` — for scenarios where the task's output path is
    /// genuinely relative to a resource root.
    pub fn rooted(responses: Vec<(PathBuf, ScriptedRun)>, output_root: PathBuf) -> Arc<Self> {
        Arc::new(FakeRunRuntime {
            responses: responses.into_iter().collect(),
            output_root: Some(output_root),
            step_delay: None,
        })
    }

    /// Like [`Self::new`], but each `run` call sleeps for `delay` first —
    /// stands in for a sandbox run that takes bounded, nonzero time, so
    /// tests can observe behavior while a task is genuinely in flight.
    pub fn delayed(responses: Vec<(PathBuf, ScriptedRun)>, delay: Duration) -> Arc<Self> {
        Arc::new(FakeRunRuntime {
            responses: responses.into_iter().collect(),
            output_root: None,
            step_delay: Some(delay),
        })
    }
}

#[async_trait]
impl RunRuntime for FakeRunRuntime {
    async fn run(&self, spec: &RunSpec) -> Result<RunOutcome, Infra> {
        if let Some(delay) = self.step_delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.responses.get(&spec.input_file);
        let scripted = match scripted {
            Some(s) => s.clone(),
            None => ScriptedRun::exit(0, String::new()),
        };

        if let Some(contents) = &scripted.output_contents {
            let path = match &self.output_root {
                Some(root) => root.join(&spec.output_dir).join(&spec.output_file),
                None => spec.output_dir.join(&spec.output_file),
            };
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Infra::Runtime(e.to_string()))?;
            }
            tokio::fs::write(&path, contents)
                .await
                .map_err(|e| Infra::Runtime(e.to_string()))?;
        }

        Ok(RunOutcome {
            exit_code: scripted.exit_code,
            captured: scripted.captured,
        })
    }
}

/// Test-only analogue of `judge-docker`'s `ResourceRootVerifier`: resolves
/// root-relative output/answer paths against fixed roots before delegating
/// to a [`LinePairedVerifier`]. Used to exercise the same root-resolution
/// gap a real deployment closes via its own resource tree.
pub struct RootResolvingVerifier {
    output_root: PathBuf,
    answer_root: PathBuf,
}

impl RootResolvingVerifier {
    pub fn new(output_root: PathBuf, answer_root: PathBuf) -> Arc<Self> {
        Arc::new(RootResolvingVerifier {
            output_root,
            answer_root,
        })
    }
}

#[async_trait]
impl Verifier for RootResolvingVerifier {
    async fn verify(&self, output_path: &Path, answer_path: &Path) -> VerifyOutcome {
        let output = self.output_root.join(output_path);
        let answer = self.answer_root.join(answer_path);
        LinePairedVerifier.verify(&output, &answer).await
    }
}
