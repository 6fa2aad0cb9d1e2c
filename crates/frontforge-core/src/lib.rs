//! Core domain types and traits for the frontforge build pipeline.
//!
//! This crate contains:
//! - Build variants and build modes
//! - Step kinds and the build plan shape
//! - The tool runner trait used to invoke external build tools
//! - The live-reload notification trait

pub mod error;
pub mod reload;
pub mod step;
pub mod tool;
pub mod variant;

pub use error::{Error, Result};
pub use reload::LiveReload;
pub use step::{BuildPlan, PlanStage, StepKind, StepOutcome};
pub use tool::{LogLine, LogSender, LogStream, ToolExit, ToolRunner, ToolSpec};
pub use variant::{BuildMode, Variant, VariantSelector};
