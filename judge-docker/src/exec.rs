//! Low-level `bollard` plumbing shared by the compile and run paths:
//! `exec create/start/inspect` for the long-lived compile sandbox, and
//! `container wait` + attached-stream draining for per-task run sandboxes.

use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::Docker;
use tokio_stream::StreamExt;

use judge_core::sandbox::cap_captured_output;
use judge_core::Infra;

fn infra(err: BollardError) -> Infra {
    Infra::Runtime(err.to_string())
}

/// Runs `command` inside the already-running container `container_id` via
/// `docker exec`, returning its exit code and combined, capped
/// stdout+stderr. Mirrors the original's
/// `ContainerExecCreate`/`ContainerExecAttach`/`ContainerExecStart`/
/// `ContainerExecInspect` sequence.
pub async fn run_exec(
    docker: &Docker,
    container_id: &str,
    command: &str,
) -> Result<(i64, String), Infra> {
    let created = docker
        .create_exec(
            container_id,
            CreateExecOptions {
                cmd: Some(vec!["sh".to_owned(), "-c".to_owned(), command.to_owned()]),
                attach_stdout: Some(true),
                attach_stderr: Some(true),
                ..Default::default()
            },
        )
        .await
        .map_err(infra)?;

    let output = drain_exec(docker, &created.id).await?;

    let inspect = docker.inspect_exec(&created.id).await.map_err(infra)?;
    let exit_code = inspect.exit_code.unwrap_or(-1);
    Ok((exit_code, cap_captured_output(output)))
}

async fn drain_exec(docker: &Docker, exec_id: &str) -> Result<String, Infra> {
    let started = docker
        .start_exec(
            exec_id,
            Some(StartExecOptions {
                detach: false,
                tty: false,
                output_capacity: None,
            }),
        )
        .await
        .map_err(infra)?;

    let mut combined = String::new();
    if let StartExecResults::Attached { mut output, .. } = started {
        while let Some(chunk) = output.next().await {
            let log = chunk.map_err(infra)?;
            match log {
                LogOutput::StdOut { message } | LogOutput::Console { message } => {
                    combined.push_str(&String::from_utf8_lossy(&message));
                }
                LogOutput::StdErr { message } => {
                    combined.push_str(&String::from_utf8_lossy(&message));
                }
                LogOutput::StdIn { .. } => {}
            }
        }
    }
    Ok(combined)
}

/// Awaits termination of a (non-exec) container started with
/// `attach_stdout`/`attach_stderr`, returning its exit code and combined
/// captured output. Mirrors the original's `ContainerWait` select over
/// `statusCh`/`errCh`.
pub async fn await_container(docker: &Docker, container_id: &str) -> Result<(i64, String), Infra> {
    use bollard::container::WaitContainerOptions;

    let mut wait_stream = docker.wait_container(
        container_id,
        Some(WaitContainerOptions {
            condition: "not-running",
        }),
    );

    let exit_code = match wait_stream.next().await {
        Some(Ok(response)) => response.status_code,
        Some(Err(err)) => return Err(infra(err)),
        None => return Err(Infra::Runtime("container wait stream ended early".into())),
    };

    let logs = collect_logs(docker, container_id).await?;
    Ok((exit_code, cap_captured_output(logs)))
}

async fn collect_logs(docker: &Docker, container_id: &str) -> Result<String, Infra> {
    use bollard::container::LogsOptions;

    let mut stream = docker.logs(
        container_id,
        Some(LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        }),
    );

    let mut combined = String::new();
    while let Some(chunk) = stream.next().await {
        let log = chunk.map_err(infra)?;
        match log {
            LogOutput::StdOut { message } | LogOutput::Console { message } => {
                combined.push_str(&String::from_utf8_lossy(&message));
            }
            LogOutput::StdErr { message } => {
                combined.push_str(&String::from_utf8_lossy(&message));
            }
            LogOutput::StdIn { .. } => {}
        }
    }
    Ok(combined)
}
