//! KDL configuration parsing for frontforge.
//!
//! This crate handles:
//! - Build options (frontforge.kdl)
//! - Project metadata from package.json
//! - Variant resolution and bootstrapper discovery
//! - Variable interpolation in tool arguments

pub mod error;
pub mod options;
pub mod package;
pub mod resolve;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use options::{
    AnalysisOptions, BuildOptions, Capabilities, Hooks, ManifestOptions, PathsConfig,
    PostBuildAction, ProjectInfo, ProjectType, TestOptions, ToolCommand, ToolCommands,
    load_options, parse_options,
};
pub use resolve::{discover_bootstrappers, resolve_variants, variant_option};
pub use variables::{ToolVariables, ToolVariablesBuilder};
