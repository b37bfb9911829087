//! A pool of workers sharing one long-lived compile sandbox.

use std::path::Path;
use std::sync::Arc;

use log::{debug, error, warn};
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::sync::Mutex;

use crate::error::Verdict;
use crate::queue::{self, SharedReceiver};
use crate::sandbox::{cap_captured_output, CompileOutcome, CompileRuntime};
use crate::task::{CompileTask, RunTask, TaskResult};

/// Serializes the sandbox-recovery protocol across all Compiler workers: at
/// most one restart may be in progress at a time.
pub(crate) struct RestartGate(Mutex<()>);

impl RestartGate {
    pub fn new() -> Self {
        RestartGate(Mutex::new(()))
    }
}

/// Runs one Compiler worker until cancelled, then — unless shutting down
/// forcefully — drains and processes any tasks already buffered in
/// `compile_rx`.
#[allow(clippy::too_many_arguments)]
pub async fn run<R: CompileRuntime + ?Sized>(
    runtime: Arc<R>,
    restart_gate: Arc<RestartGate>,
    compile_rx: SharedReceiver<CompileTask>,
    run_tx: mpsc::Sender<RunTask>,
    compile_tx_for_requeue: mpsc::Sender<CompileTask>,
    result_tx: mpsc::Sender<TaskResult>,
    mut cancel: watch::Receiver<bool>,
    force_on_cancel: Arc<std::sync::atomic::AtomicBool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.changed() => break,
            maybe_task = queue::recv(&compile_rx) => {
                match maybe_task {
                    Some(task) => {
                        process(
                            runtime.as_ref(),
                            &restart_gate,
                            task,
                            &run_tx,
                            &compile_tx_for_requeue,
                            &result_tx,
                        )
                        .await;
                    }
                    None => break,
                }
            }
        }
    }

    if !force_on_cancel.load(std::sync::atomic::Ordering::SeqCst) {
        debug!("compiler worker draining buffered compile tasks");
        while let Some(task) = queue::recv(&compile_rx).await {
            process(
                runtime.as_ref(),
                &restart_gate,
                task,
                &run_tx,
                &compile_tx_for_requeue,
                &result_tx,
            )
            .await;
        }
    }
}

async fn process<R: CompileRuntime + ?Sized>(
    runtime: &R,
    restart_gate: &Arc<RestartGate>,
    task: CompileTask,
    run_tx: &mpsc::Sender<RunTask>,
    compile_tx_for_requeue: &mpsc::Sender<CompileTask>,
    result_tx: &mpsc::Sender<TaskResult>,
) {
    let id = task.task.id;
    let exe_path = derive_exe_path(&task.task.code_path);

    match runtime.compile(&task.task.code_path, &exe_path).await {
        Ok(CompileOutcome::Success) => {
            debug!("task {id} compiled successfully");
            let mut compiled = task.task;
            compiled.exe_path = exe_path;
            compiled.stage = crate::task::Stage::Compiled;
            let _ = run_tx.send(RunTask::from_task(compiled)).await;
        }
        Ok(CompileOutcome::CompileError(diagnostic)) => {
            debug!("task {id} failed to compile");
            let verdict = Verdict::CompileError(cap_captured_output(diagnostic));
            let _ = result_tx.send(TaskResult::fail(id, verdict)).await;
        }
        Err(infra) => {
            warn!("task {id} hit an infrastructure error compiling: {infra}");
            let _guard = restart_gate.0.lock().await;
            match runtime.restart().await {
                Ok(()) => {
                    debug!("compile sandbox recovered, requeueing task {id}");
                    let mut requeued = task.task;
                    requeued.exe_path = exe_path;
                    let _ = compile_tx_for_requeue
                        .send(CompileTask { task: requeued })
                        .await;
                }
                Err(restart_err) => {
                    error!("compile sandbox could not be recovered for task {id}: {restart_err}");
                    let verdict = Verdict::EnvironmentError(restart_err.to_string());
                    let _ = result_tx.send(TaskResult::fail(id, verdict)).await;
                }
            }
        }
    }
}

/// Derives `exe_path` from `code_path` by stripping the compiled-language
/// source suffix. The suffix itself is a deployment detail (the compile
/// sandbox image fixes the source language, not this crate); this core only
/// does the path surgery.
pub fn derive_exe_path(code_path: &Path) -> std::path::PathBuf {
    match code_path.extension() {
        Some(_) => code_path.with_extension(""),
        None => code_path.to_path_buf(),
    }
}
