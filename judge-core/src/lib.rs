//! Core of an online-judge execution engine: a three-stage concurrent
//! pipeline (compile → sandboxed run → verify) driven by container
//! sandboxes.
//!
//! This crate is runtime-agnostic: it depends only on the [`sandbox`]
//! traits. `judge-docker` supplies a `bollard`-backed implementation.

pub mod compiler;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod queue;
pub mod runner;
pub mod sandbox;
pub mod task;
pub mod verifier;
pub mod verify_worker;

pub use error::{ConfigError, Infra, Verdict};
pub use executor::{Executor, ExecutorBuilder, LifecycleState};
pub use sandbox::{CompileOutcome, CompileRuntime, ResourceLimits, RunOutcome, RunRuntime, RunSpec};
pub use task::{CompileTask, RunTask, Stage, Task, TaskResult, VerifyTask};
pub use verifier::{LinePairedVerifier, VerifyOutcome, Verifier};
