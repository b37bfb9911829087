//! A pool of workers, each creating a fresh short-lived sandbox per task.

use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;
use tokio::sync::watch;

use crate::error::verdict_for_exit_code;
use crate::queue::{self, SharedReceiver};
use crate::sandbox::{ResourceLimits, RunRuntime, RunSpec};
use crate::task::{RunTask, TaskResult, VerifyTask};

/// Runs one Runner worker until cancelled, then — unless shutting down
/// forcefully — drains and processes any tasks already buffered in
/// `run_rx`.
pub async fn run<R: RunRuntime + ?Sized>(
    runtime: Arc<R>,
    run_rx: SharedReceiver<RunTask>,
    verify_tx: mpsc::Sender<VerifyTask>,
    result_tx: mpsc::Sender<TaskResult>,
    mut cancel: watch::Receiver<bool>,
    force_on_cancel: Arc<std::sync::atomic::AtomicBool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.changed() => break,
            maybe_task = queue::recv(&run_rx) => {
                match maybe_task {
                    Some(task) => process(runtime.as_ref(), task, &verify_tx, &result_tx).await,
                    None => break,
                }
            }
        }
    }

    if !force_on_cancel.load(std::sync::atomic::Ordering::SeqCst) {
        debug!("runner worker draining buffered run tasks");
        while let Some(task) = queue::recv(&run_rx).await {
            process(runtime.as_ref(), task, &verify_tx, &result_tx).await;
        }
    }
}

async fn process<R: RunRuntime + ?Sized>(
    runtime: &R,
    task: RunTask,
    verify_tx: &mpsc::Sender<VerifyTask>,
    result_tx: &mpsc::Sender<TaskResult>,
) {
    let id = task.task.id;
    let spec = RunSpec {
        exe_path: task.task.exe_path.clone(),
        input_dir: task.input_dir.clone(),
        input_file: task.input_file.clone(),
        output_dir: task.output_dir.clone(),
        output_file: task.output_file.clone(),
        limits: ResourceLimits {
            cpu_period: task.task.cpu_period,
            cpu_quota: task.task.cpu_quota,
            timeout_seconds: task.task.timeout_seconds,
            memory_bytes: task.task.memory_bytes,
        },
    };

    match runtime.run(&spec).await {
        Ok(outcome) => match verdict_for_exit_code(outcome.exit_code, &outcome.captured) {
            None => {
                debug!("task {id} ran successfully, proceeding to verify");
                let mut executed = task.task;
                executed.stage = crate::task::Stage::Executed;
                let _ = verify_tx.send(VerifyTask { task: executed }).await;
            }
            Some(verdict) => {
                debug!("task {id} run produced verdict {verdict}");
                let _ = result_tx.send(TaskResult::fail(id, verdict)).await;
            }
        },
        Err(infra) => {
            debug!("task {id} hit an infrastructure error running: {infra}");
            let verdict = crate::error::Verdict::EnvironmentError(infra.to_string());
            let _ = result_tx.send(TaskResult::fail(id, verdict)).await;
        }
    }
}
