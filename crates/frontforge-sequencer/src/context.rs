//! Per-variant build context handed to every step.

use frontforge_config::{BuildOptions, ToolCommand, ToolVariables, ToolVariablesBuilder};
use frontforge_core::{LiveReload, LogSender, Result, ToolRunner, ToolSpec, Variant};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Everything a step needs: the variant being built, whether we are in
/// watch mode, the options, and the collaborators.
#[derive(Clone)]
pub struct BuildContext {
    pub variant: Variant,
    pub watching: bool,
    pub options: Arc<BuildOptions>,
    /// Project root; every configured path is relative to it.
    pub root: PathBuf,
    pub tools: Arc<dyn ToolRunner>,
    pub reload: Option<Arc<dyn LiveReload>>,
    pub logs: LogSender,
}

impl BuildContext {
    /// Resolve a project-relative path.
    pub fn project_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// `<root>/<distribution>/<name>`.
    pub fn dist_dir(&self) -> PathBuf {
        self.variant
            .target_dir(&self.project_path(&self.options.paths.distribution))
    }

    /// Where compile/copy steps write. Release builds with revisioning
    /// enabled stage into the temporary folder and `rev` moves the result
    /// into the distribution folder. Everything else writes to the
    /// distribution folder directly.
    pub fn temp_dir(&self) -> PathBuf {
        let folder = if self.stages_for_rev() {
            &self.options.paths.temporary
        } else {
            &self.options.paths.distribution
        };
        self.variant.target_dir(&self.project_path(folder))
    }

    /// Whether this build stages output for the rev step to move.
    pub fn stages_for_rev(&self) -> bool {
        self.variant.is_release() && self.options.capabilities.rev
    }

    /// `<root>/<bootstrappers>/<name>/<file>`.
    pub fn bootstrapper(&self, file: &str) -> PathBuf {
        self.project_path(&self.options.paths.bootstrappers)
            .join(self.variant.name())
            .join(file)
    }

    /// Variables common to every tool invocation of this variant.
    pub fn variables(&self) -> ToolVariablesBuilder {
        ToolVariablesBuilder::new()
            .with_process_env()
            .with_variant(&self.variant)
            .with_bundle(&self.options.bundle_filename)
    }

    /// `DEBUG` and `TARGET` as seen by downstream tools.
    pub fn variant_env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("DEBUG".to_string(), self.variant.is_debug().to_string()),
            ("TARGET".to_string(), self.variant.name().to_string()),
        ])
    }

    /// Render `command`, append `extra_args`, and run it to a successful
    /// exit.
    pub async fn run_tool(
        &self,
        label: &str,
        command: &ToolCommand,
        vars: &ToolVariables,
        extra_args: &[&str],
        env: BTreeMap<String, String>,
    ) -> Result<()> {
        let (program, args) = vars.render(command);
        let mut spec = ToolSpec::new(label, program, self.root.clone())
            .args(args)
            .args(extra_args.iter().copied());
        spec.env = env;

        let exit = self.tools.run(spec, self.logs.clone()).await?;
        exit.into_result(label)
    }

    /// Tell live-reload clients about rewritten files. Only active while
    /// watching.
    pub fn notify_reload(&self, paths: Vec<String>) {
        if !self.watching || paths.is_empty() {
            return;
        }
        if let Some(reload) = &self.reload {
            debug!(variant = %self.variant, ?paths, "Notifying live reload");
            reload.notify(&paths);
        }
    }
}
