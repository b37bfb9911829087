//! The runtime-specific half of the configuration surface: which images to
//! run and where the resource tree lives on the host. Kept out of
//! `judge_core::ExecutorBuilder` since the core has no notion of container
//! images.

use std::path::{Path, PathBuf};

/// Default compile sandbox image (spec's Non-goal "single supported
/// compiled language" per submission — the original pins `golang:1.15`;
/// callers targeting a different toolchain simply supply a different image).
pub const DEFAULT_COMPILER_IMAGE: &str = "golang:1.15";
pub const DEFAULT_RUNNER_IMAGE: &str = "alpine:latest";

/// Where the resource tree (`code/`, `exe/`, `input/`, `output/`, `answer/`)
/// lives on the host, plus which images back the compile and run sandboxes.
#[derive(Debug, Clone)]
pub struct DockerSandboxConfig {
    pub resource_root: PathBuf,
    pub compiler_image: String,
    pub runner_image: String,
}

impl DockerSandboxConfig {
    pub fn new(resource_root: impl Into<PathBuf>) -> Self {
        DockerSandboxConfig {
            resource_root: resource_root.into(),
            compiler_image: DEFAULT_COMPILER_IMAGE.to_owned(),
            runner_image: DEFAULT_RUNNER_IMAGE.to_owned(),
        }
    }

    pub fn with_compiler_image(mut self, image: impl Into<String>) -> Self {
        self.compiler_image = image.into();
        self
    }

    pub fn with_runner_image(mut self, image: impl Into<String>) -> Self {
        self.runner_image = image.into();
        self
    }

    pub fn code_dir(&self) -> PathBuf {
        self.resource_root.join("code")
    }

    pub fn exe_dir(&self) -> PathBuf {
        self.resource_root.join("exe")
    }

    pub fn input_dir(&self) -> PathBuf {
        self.resource_root.join("input")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resource_root.join("output")
    }

    pub fn answer_dir(&self) -> PathBuf {
        self.resource_root.join("answer")
    }
}

/// Resolves `relative` against `root`, refusing to leave it via `..`
/// components — the resource tree's paths are meant to be simple relative
/// names, not attacker-influenced traversal.
pub fn resolve_within(root: &Path, relative: &Path) -> PathBuf {
    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            std::path::Component::Normal(part) => resolved.push(part),
            std::path::Component::RootDir | std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {} // silently ignored, not an error path
            std::path::Component::Prefix(_) => {}
        }
    }
    resolved
}
