//! Resolves a task's root-relative output/answer paths against the
//! resource tree before delegating to another [`Verifier`].
//!
//! `judge_core::Task::output_path`/`answer_path` are documented as relative
//! to the output/answer roots; the core itself never joins them against
//! anything since it has no notion of where the resource tree lives on
//! disk. Every real deployment needs this wrapper (or an
//! equivalent) between the Dispatcher and the Verifier stage — without it
//! every task fails verification with a spurious `OutputMissing`/
//! `AnswerMissing` against the process's CWD.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use judge_core::{Verifier, VerifyOutcome};

use crate::config::{resolve_within, DockerSandboxConfig};

pub struct ResourceRootVerifier {
    config: DockerSandboxConfig,
    inner: Arc<dyn Verifier>,
}

impl ResourceRootVerifier {
    pub fn new(config: DockerSandboxConfig, inner: Arc<dyn Verifier>) -> Self {
        ResourceRootVerifier { config, inner }
    }
}

#[async_trait]
impl Verifier for ResourceRootVerifier {
    async fn verify(&self, output_path: &Path, answer_path: &Path) -> VerifyOutcome {
        let output = resolve_within(&self.config.output_dir(), output_path);
        let answer = resolve_within(&self.config.answer_dir(), answer_path);
        self.inner.verify(&output, &answer).await
    }
}
