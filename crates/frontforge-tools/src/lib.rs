//! External tool runners for frontforge.
//!
//! Provides tool runner implementations for invoking build tools:
//! - Local child processes (the default)

pub mod process;

pub use frontforge_core::tool::{
    LogLine, LogSender, LogStream, ToolExit, ToolRunner, ToolSpec,
};
pub use process::{ProcessToolRunner, shell_spec};
