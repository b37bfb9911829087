//! A pool of workers comparing run output against the expected answer.

use std::sync::Arc;

use log::debug;
use tokio::sync::mpsc;
use tokio::sync::watch;

use crate::queue::{self, SharedReceiver};
use crate::task::{TaskResult, VerifyTask};
use crate::verifier::Verifier;

/// Runs one Verifier worker until cancelled, then — unless shutting down
/// forcefully — drains and processes any tasks already buffered in
/// `verify_rx`.
pub async fn run(
    verifier: Arc<dyn Verifier>,
    verify_rx: SharedReceiver<VerifyTask>,
    result_tx: mpsc::Sender<TaskResult>,
    mut cancel: watch::Receiver<bool>,
    force_on_cancel: Arc<std::sync::atomic::AtomicBool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.changed() => break,
            maybe_task = queue::recv(&verify_rx) => {
                match maybe_task {
                    Some(task) => process(verifier.as_ref(), task, &result_tx).await,
                    None => break,
                }
            }
        }
    }

    if !force_on_cancel.load(std::sync::atomic::Ordering::SeqCst) {
        debug!("verifier worker draining buffered verify tasks");
        while let Some(task) = queue::recv(&verify_rx).await {
            process(verifier.as_ref(), task, &result_tx).await;
        }
    }
}

async fn process(verifier: &dyn Verifier, task: VerifyTask, result_tx: &mpsc::Sender<TaskResult>) {
    let id = task.task.id;
    let output_path = std::path::Path::new(&task.task.output_path);
    let answer_path = std::path::Path::new(&task.task.answer_path);
    let outcome = verifier.verify(output_path, answer_path).await;

    debug!(
        "task {id} verified: {} cases passed, verdict present: {}",
        outcome.cases_passed,
        outcome.verdict.is_some()
    );

    let result = match outcome.verdict {
        None => TaskResult::ok(id),
        Some(verdict) => TaskResult::fail(id, verdict),
    };
    let _ = result_tx.send(result).await;
}
