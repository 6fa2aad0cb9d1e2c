//! Tool runner trait and invocation types.
//!
//! Tool runners invoke the external programs that do the heavy lifting of a
//! build (CSS compiler, prefixer, bundler, minifier, test runner, analysis).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::channel::mpsc::UnboundedSender;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::{Error, Result};

/// Specification for one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Short label used in logs and errors (e.g. "styles").
    pub label: String,
    /// Program to execute.
    pub program: String,
    /// Arguments, already interpolated.
    pub args: Vec<String>,
    /// Extra environment variables for the child process.
    pub env: BTreeMap<String, String>,
    /// Working directory of the child process.
    pub working_dir: PathBuf,
}

impl ToolSpec {
    pub fn new(label: impl Into<String>, program: impl Into<String>, working_dir: PathBuf) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// The command line as it would be typed into a shell, for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// How a tool process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolExit {
    pub success: bool,
    pub code: Option<i32>,
}

impl ToolExit {
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    pub fn failure(code: Option<i32>) -> Self {
        Self {
            success: false,
            code,
        }
    }

    /// Turn a failed exit into [`Error::ToolFailed`].
    pub fn into_result(self, tool: &str) -> Result<()> {
        if self.success {
            Ok(())
        } else {
            Err(Error::ToolFailed {
                tool: tool.to_string(),
                code: self.code,
            })
        }
    }
}

/// A line of tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub stream: LogStream,
    pub content: String,
}

impl LogLine {
    pub fn new(label: impl Into<String>, stream: LogStream, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            label: label.into(),
            stream,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogStream {
    Stdout,
    Stderr,
    System,
}

/// Where tool runners push output lines as they arrive.
pub type LogSender = UnboundedSender<LogLine>;

/// Trait for tool runners.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Name of this runner.
    fn name(&self) -> &'static str;

    /// Run a tool to completion, forwarding its output to `logs`.
    ///
    /// A tool that runs but exits unsuccessfully yields `Ok` with a failed
    /// [`ToolExit`]; `Err` is reserved for failures to launch it.
    async fn run(&self, spec: ToolSpec, logs: LogSender) -> Result<ToolExit>;
}
