//! Local child-process tool runner.

use async_trait::async_trait;
use frontforge_core::tool::*;
use frontforge_core::{Error, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

/// Runs tools as local child processes, streaming stdout and stderr line by
/// line.
#[derive(Debug, Default, Clone)]
pub struct ProcessToolRunner;

impl ProcessToolRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessToolRunner {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn run(&self, spec: ToolSpec, logs: LogSender) -> Result<ToolExit> {
        info!(tool = %spec.label, command = %spec.command_line(), "Running tool");

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .envs(&spec.env)
            .current_dir(&spec.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::ToolNotFound(spec.program.clone())
                } else {
                    Error::Io(e)
                }
            })?;

        let stdout = child.stdout.take().map(|out| {
            tokio::spawn(forward_lines(
                out,
                spec.label.clone(),
                LogStream::Stdout,
                logs.clone(),
            ))
        });
        let stderr = child.stderr.take().map(|err| {
            tokio::spawn(forward_lines(
                err,
                spec.label.clone(),
                LogStream::Stderr,
                logs.clone(),
            ))
        });

        let status = child.wait().await?;

        // Drain the pipes so no output is lost.
        for task in [stdout, stderr].into_iter().flatten() {
            let _ = task.await;
        }

        debug!(tool = %spec.label, code = ?status.code(), "Tool exited");

        if status.success() {
            Ok(ToolExit::success())
        } else {
            let _ = logs.unbounded_send(LogLine::new(
                spec.label.clone(),
                LogStream::System,
                format!("{} exited with {}", spec.program, status),
            ));
            Ok(ToolExit::failure(status.code()))
        }
    }
}

async fn forward_lines<R>(reader: R, label: String, stream: LogStream, logs: LogSender)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(tool = %label, "{}", line);
        let _ = logs.unbounded_send(LogLine::new(label.clone(), stream, line));
    }
}

/// Spec that runs `command` through the platform shell, for user hooks.
pub fn shell_spec(label: &str, command: &str, working_dir: PathBuf) -> ToolSpec {
    if cfg!(windows) {
        ToolSpec::new(label, "cmd", working_dir).args(["/C", command])
    } else {
        ToolSpec::new(label, "sh", working_dir).args(["-c", command])
    }
}
