//! Single consumer of the external task ingress; single producer into the
//! compile queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio::sync::watch;

use crate::task::{CompileTask, RunTask, Stage, Task, VerifyTask};

/// Reads `ingress` until it closes or cancellation fires, routing each
/// [`Task`] to the queue matching its current stage. Tasks whose stage is
/// outside {New, Compiled, Executed} are dropped silently — the only
/// silent drop in the system.
///
/// On a graceful cancellation (`force_on_cancel` false), any tasks already
/// sitting in `ingress` are still routed before the queue producers are
/// dropped — otherwise a submission that raced the shutdown signal would
/// never reach a worker and would never get a terminal result, breaking the
/// "every dispatched task gets exactly one result" guarantee. A forced
/// shutdown skips this and returns immediately.
///
/// Once this function returns, `compile_tx`, `run_tx`, and `verify_tx` are
/// dropped, which is this function's sole contribution to closing those
/// queues for every worker pool already draining them.
pub async fn run(
    mut ingress: mpsc::Receiver<Task>,
    compile_tx: mpsc::Sender<CompileTask>,
    run_tx: mpsc::Sender<RunTask>,
    verify_tx: mpsc::Sender<VerifyTask>,
    mut cancel: watch::Receiver<bool>,
    force_on_cancel: Arc<AtomicBool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.changed() => {
                debug!("dispatcher received cancellation");
                break;
            }
            maybe_task = ingress.recv() => {
                let Some(task) = maybe_task else {
                    debug!("dispatcher ingress closed");
                    return;
                };
                route(task, &compile_tx, &run_tx, &verify_tx).await;
            }
        }
    }

    if !force_on_cancel.load(Ordering::SeqCst) {
        debug!("dispatcher draining buffered ingress tasks");
        while let Some(task) = ingress.recv().await {
            route(task, &compile_tx, &run_tx, &verify_tx).await;
        }
    }
}

async fn route(
    task: Task,
    compile_tx: &mpsc::Sender<CompileTask>,
    run_tx: &mpsc::Sender<RunTask>,
    verify_tx: &mpsc::Sender<VerifyTask>,
) {
    match task.stage {
        Stage::New => {
            let _ = compile_tx.send(CompileTask { task }).await;
        }
        Stage::Compiled => {
            let _ = run_tx.send(RunTask::from_task(task)).await;
        }
        Stage::Executed => {
            let _ = verify_tx.send(VerifyTask { task }).await;
        }
        Stage::Finished => {
            warn!(
                "dispatcher dropping task {} already in stage Finished",
                task.id
            );
        }
    }
}
