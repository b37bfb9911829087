//! The process-wide orchestrator: owns the three stage queues, the worker
//! pools, and the compile sandbox handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::info;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::compiler::{self, RestartGate};
use crate::dispatcher;
use crate::error::ConfigError;
use crate::queue::{self, SharedReceiver};
use crate::runner;
use crate::sandbox::{CompileRuntime, RunRuntime};
use crate::task::{CompileTask, RunTask, Task, TaskResult, VerifyTask};
use crate::verifier::{LinePairedVerifier, Verifier};
use crate::verify_worker;

/// Default bound on every stage queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Lifecycle states, one-way: `Created -> Running -> Draining -> Destroyed`
/// (force-destroy skips `Draining`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Running,
    Draining,
    Destroyed,
}

/// The process-wide pipeline orchestrator. Construct with [`ExecutorBuilder`].
pub struct Executor {
    state: LifecycleState,

    compile_runtime: Arc<dyn CompileRuntime>,

    cancel_tx: watch::Sender<bool>,
    force_on_cancel: Arc<AtomicBool>,

    dispatcher_handle: Option<JoinHandle<()>>,
    compiler_handles: Vec<JoinHandle<()>>,
    runner_handles: Vec<JoinHandle<()>>,
    verifier_handles: Vec<JoinHandle<()>>,
}

impl Executor {
    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Coordinates forced vs. drained termination across the three pools
    /// and the compile sandbox.
    ///
    /// `force = false`: workers finish consuming whatever is already
    /// buffered in their queue before exiting — every task that crossed the
    /// Dispatcher gets a terminal [`TaskResult`].
    ///
    /// `force = true`: workers exit on cancellation without draining;
    /// buffered tasks are dropped silently.
    pub async fn destroy(mut self, force: bool) -> Result<(), crate::error::Infra> {
        if !force {
            self.state = LifecycleState::Draining;
        }
        self.force_on_cancel.store(force, Ordering::SeqCst);
        // Broadcast cancellation; the Dispatcher observes this and drops its
        // compile queue producer, which the worker pools observe in turn.
        let _ = self.cancel_tx.send(true);

        if let Some(handle) = self.dispatcher_handle.take() {
            let _ = handle.await;
        }
        for handle in self.compiler_handles.drain(..) {
            let _ = handle.await;
        }
        for handle in self.runner_handles.drain(..) {
            let _ = handle.await;
        }
        for handle in self.verifier_handles.drain(..) {
            let _ = handle.await;
        }

        info!("removing compile sandbox");
        let result = self.compile_runtime.remove().await;
        self.state = LifecycleState::Destroyed;
        result
    }
}

/// Builds an [`Executor`] from the programmatic configuration surface:
/// compiler/runner runtimes are supplied up front (the
/// runtime-agnostic core has no notion of container images — that lives in
/// the runtime implementation, e.g. `judge-docker`'s own builder), and the
/// remaining settings are applied in the order they were added, mirroring
/// the original's `executor.Option` functional-options list. Setting any
/// positive concurrency starts the associated worker pool; enabling the
/// compiler (or any positive compile concurrency) starts the compile
/// sandbox.
pub struct ExecutorBuilder {
    compile_runtime: Arc<dyn CompileRuntime>,
    run_runtime: Arc<dyn RunRuntime>,
    verifier: Arc<dyn Verifier>,
    queue_capacity: usize,
    task_rx: Option<mpsc::Receiver<Task>>,
    result_tx: Option<mpsc::Sender<TaskResult>>,
    compile_concurrency: usize,
    run_concurrency: usize,
    verify_concurrency: usize,
    enable_compiler: bool,
}

impl ExecutorBuilder {
    pub fn new(compile_runtime: Arc<dyn CompileRuntime>, run_runtime: Arc<dyn RunRuntime>) -> Self {
        ExecutorBuilder {
            compile_runtime,
            run_runtime,
            verifier: Arc::new(LinePairedVerifier),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            task_rx: None,
            result_tx: None,
            compile_concurrency: 0,
            run_concurrency: 0,
            verify_concurrency: 0,
            enable_compiler: false,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_task_chan(mut self, task_rx: mpsc::Receiver<Task>) -> Self {
        self.task_rx = Some(task_rx);
        self
    }

    pub fn with_result_chan(mut self, result_tx: mpsc::Sender<TaskResult>) -> Self {
        self.result_tx = Some(result_tx);
        self
    }

    pub fn with_compile_concurrency(mut self, n: usize) -> Result<Self, ConfigError> {
        require_positive("compileConcurrency", n)?;
        self.compile_concurrency = n;
        Ok(self)
    }

    pub fn with_run_concurrency(mut self, n: usize) -> Result<Self, ConfigError> {
        require_positive("runConcurrency", n)?;
        self.run_concurrency = n;
        Ok(self)
    }

    pub fn with_verify_concurrency(mut self, n: usize) -> Result<Self, ConfigError> {
        require_positive("verifyConcurrency", n)?;
        self.verify_concurrency = n;
        Ok(self)
    }

    pub fn enable_compiler(mut self) -> Self {
        self.enable_compiler = true;
        self
    }

    /// Validates the configuration, starts the compile sandbox if enabled
    /// (lazily, only if needed), spawns the Dispatcher and every configured
    /// worker pool, and transitions the result to `Running`.
    pub async fn build(self) -> Result<Executor, ConfigError> {
        let task_rx = self
            .task_rx
            .ok_or(ConfigError::MissingChannel { which: "taskChan" })?;
        let result_tx = self
            .result_tx
            .ok_or(ConfigError::MissingChannel { which: "resultChan" })?;

        if self.enable_compiler || self.compile_concurrency > 0 {
            self.compile_runtime
                .ensure_started()
                .await
                .map_err(|e| ConfigError::SandboxStartup(e.to_string()))?;
        }

        let (compile_tx, compile_rx) = mpsc::channel::<CompileTask>(self.queue_capacity);
        let (run_tx, run_rx) = mpsc::channel::<RunTask>(self.queue_capacity);
        let (verify_tx, verify_rx) = mpsc::channel::<VerifyTask>(self.queue_capacity);
        let compile_rx: SharedReceiver<CompileTask> = queue::shared(compile_rx);
        let run_rx: SharedReceiver<RunTask> = queue::shared(run_rx);
        let verify_rx: SharedReceiver<VerifyTask> = queue::shared(verify_rx);

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let force_on_cancel = Arc::new(AtomicBool::new(false));
        let restart_gate = Arc::new(RestartGate::new());

        let dispatcher_handle = tokio::spawn(dispatcher::run(
            task_rx,
            compile_tx.clone(),
            run_tx.clone(),
            verify_tx.clone(),
            cancel_rx.clone(),
            force_on_cancel.clone(),
        ));

        let mut compiler_handles = Vec::with_capacity(self.compile_concurrency);
        for _ in 0..self.compile_concurrency {
            compiler_handles.push(tokio::spawn(compiler::run(
                self.compile_runtime.clone(),
                restart_gate.clone(),
                compile_rx.clone(),
                run_tx.clone(),
                compile_tx.clone(),
                result_tx.clone(),
                cancel_rx.clone(),
                force_on_cancel.clone(),
            )));
        }

        let mut runner_handles = Vec::with_capacity(self.run_concurrency);
        for _ in 0..self.run_concurrency {
            runner_handles.push(tokio::spawn(runner::run(
                self.run_runtime.clone(),
                run_rx.clone(),
                verify_tx.clone(),
                result_tx.clone(),
                cancel_rx.clone(),
                force_on_cancel.clone(),
            )));
        }

        let mut verifier_handles = Vec::with_capacity(self.verify_concurrency);
        for _ in 0..self.verify_concurrency {
            verifier_handles.push(tokio::spawn(verify_worker::run(
                self.verifier.clone(),
                verify_rx.clone(),
                result_tx.clone(),
                cancel_rx.clone(),
                force_on_cancel.clone(),
            )));
        }

        // `compile_tx`/`run_tx`/`verify_tx` are not retained here: the
        // Dispatcher and Compiler (for requeueing) already hold the clones
        // they need, and those are the only producers. The queues close
        // themselves once those tasks exit (see `crate::queue`).
        Ok(Executor {
            state: LifecycleState::Running,
            compile_runtime: self.compile_runtime,
            cancel_tx,
            force_on_cancel,
            dispatcher_handle: Some(dispatcher_handle),
            compiler_handles,
            runner_handles,
            verifier_handles,
        })
    }
}

fn require_positive(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::NonPositiveConcurrency {
            field,
            value: value as i64,
        });
    }
    Ok(())
}
