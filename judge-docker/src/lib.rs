//! `bollard`-backed implementation of [`judge_core::CompileRuntime`] and
//! [`judge_core::RunRuntime`] against a local Docker daemon.
//!
//! Mirrors the original's `docker_executor` package: one long-lived compile
//! container shared by every Compiler worker, and a fresh, resource-limited,
//! auto-removing container per run task.

mod config;
mod exec;
mod verifier;

use std::path::Path;

use async_trait::async_trait;
use bollard::container::{
    Config as ContainerConfig, CreateContainerOptions, InspectContainerOptions,
    RemoveContainerOptions, StartContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::models::HostConfig;
use bollard::Docker;
use log::{debug, info, warn};
use tokio::sync::Mutex;

use judge_core::sandbox::{CompileOutcome, CompileRuntime, RunOutcome, RunRuntime, RunSpec};
use judge_core::Infra;

use config::resolve_within;
pub use config::DockerSandboxConfig;
pub use verifier::ResourceRootVerifier;

fn infra(err: BollardError) -> Infra {
    Infra::Runtime(err.to_string())
}

/// The compile sandbox plus the configuration needed to mount and
/// resource-limit a fresh run sandbox per task. One instance is shared
/// across the whole [`judge_core::Executor`] — the compile container ID is
/// behind a mutex since [`CompileRuntime::restart`] may replace it.
pub struct DockerSandbox {
    docker: Docker,
    config: DockerSandboxConfig,
    compiler_container_id: Mutex<Option<String>>,
}

impl DockerSandbox {
    /// Connects to the Docker daemon using the environment (`DOCKER_HOST`
    /// and friends), matching the original's `client.NewClientWithOpts(client.FromEnv)`.
    pub fn connect(config: DockerSandboxConfig) -> Result<Self, Infra> {
        let docker = Docker::connect_with_local_defaults().map_err(infra)?;
        Ok(DockerSandbox {
            docker,
            config,
            compiler_container_id: Mutex::new(None),
        })
    }

    async fn start_compiler(&self) -> Result<String, Infra> {
        let resp = self
            .docker
            .create_container(
                None::<CreateContainerOptions<String>>,
                ContainerConfig {
                    image: Some(self.config.compiler_image.clone()),
                    tty: Some(true),
                    open_stdin: Some(true),
                    host_config: Some(HostConfig {
                        binds: Some(vec![
                            format!("{}:/code", self.config.code_dir().display()),
                            format!("{}:/exe", self.config.exe_dir().display()),
                        ]),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .map_err(infra)?;

        self.docker
            .start_container(&resp.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(infra)?;

        info!("started compile sandbox {}", resp.id);
        Ok(resp.id)
    }
}

#[async_trait]
impl CompileRuntime for DockerSandbox {
    async fn ensure_started(&self) -> Result<(), Infra> {
        let mut guard = self.compiler_container_id.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        *guard = Some(self.start_compiler().await?);
        Ok(())
    }

    async fn compile(&self, code_path: &Path, exe_path: &Path) -> Result<CompileOutcome, Infra> {
        let container_id = self
            .compiler_container_id
            .lock()
            .await
            .clone()
            .ok_or(Infra::NotFound)?;

        if let Some(parent) = exe_path.parent() {
            if parent != Path::new("") {
                let dir = resolve_within(&self.config.exe_dir(), parent);
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| Infra::Runtime(e.to_string()))?;
            }
        }

        let command = format!(
            "go build -o /exe/{} /code/{}",
            exe_path.display(),
            code_path.display()
        );
        let (exit_code, output) = exec::run_exec(&self.docker, &container_id, &command).await?;

        if exit_code == 0 {
            Ok(CompileOutcome::Success)
        } else {
            Ok(CompileOutcome::CompileError(output))
        }
    }

    async fn restart(&self) -> Result<(), Infra> {
        let mut guard = self.compiler_container_id.lock().await;
        let Some(id) = guard.clone() else {
            *guard = Some(self.start_compiler().await?);
            return Ok(());
        };

        match self
            .docker
            .inspect_container(&id, None::<InspectContainerOptions>)
            .await
        {
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => {
                debug!("compile sandbox {id} not found, starting a fresh one");
                *guard = Some(self.start_compiler().await?);
                Ok(())
            }
            Err(err) => Err(infra(err)),
            // Still present: assume the failure was transient inside the
            // sandbox and do not restart it (matches `restartCompiler`'s
            // original semantics — only a vanished container is replaced).
            Ok(_) => Ok(()),
        }
    }

    async fn remove(&self) -> Result<(), Infra> {
        let guard = self.compiler_container_id.lock().await;
        let Some(id) = guard.as_ref() else {
            return Ok(());
        };
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(infra)
    }
}

#[async_trait]
impl RunRuntime for DockerSandbox {
    async fn run(&self, spec: &RunSpec) -> Result<RunOutcome, Infra> {
        let output_dir_host = resolve_within(&self.config.output_dir(), &spec.output_dir);
        tokio::fs::create_dir_all(&output_dir_host)
            .await
            .map_err(|e| Infra::Runtime(e.to_string()))?;

        let command = format!(
            r#"echo $(tr "\n" " " < /input/{}) | timeout {} /exe > /output/{}"#,
            spec.input_file.display(),
            format_timeout(spec.limits.timeout_seconds),
            spec.output_file.display(),
        );

        let exe_path_host = resolve_within(&self.config.exe_dir(), &spec.exe_path);
        let input_dir_host = resolve_within(&self.config.input_dir(), &spec.input_dir);
        let host_config = HostConfig {
            binds: Some(vec![
                format!("{}:/exe:ro", exe_path_host.display()),
                format!("{}:/output", output_dir_host.display()),
                format!("{}:/input:ro", input_dir_host.display()),
            ]),
            auto_remove: Some(true),
            memory: Some(spec.limits.memory_bytes),
            memory_swap: Some(spec.limits.memory_bytes),
            cpu_period: Some(spec.limits.cpu_period),
            cpu_quota: Some(spec.limits.cpu_quota),
            ..Default::default()
        };

        let resp = self
            .docker
            .create_container(
                None::<CreateContainerOptions<String>>,
                ContainerConfig {
                    cmd: Some(vec!["sh".to_owned(), "-c".to_owned(), command]),
                    image: Some(self.config.runner_image.clone()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    host_config: Some(host_config),
                    ..Default::default()
                },
            )
            .await
            .map_err(infra)?;

        self.docker
            .start_container(&resp.id, None::<StartContainerOptions<String>>)
            .await
            .map_err(infra)?;

        let (exit_code, captured) = exec::await_container(&self.docker, &resp.id).await?;
        if exit_code != 0 {
            warn!("run sandbox {} exited {}", resp.id, exit_code);
        }

        Ok(RunOutcome {
            exit_code,
            captured,
        })
    }
}

fn format_timeout(seconds: f64) -> String {
    format!("{seconds:.4}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_formatted_with_fixed_precision() {
        assert_eq!(format_timeout(2.5), "2.5000");
        assert_eq!(format_timeout(0.1), "0.1000");
    }
}
