//! CLI command implementations.

pub mod build;
pub mod tasks;
pub mod watch;

use anyhow::{Context, Result, bail};
use frontforge_config::package::read_package_info;
use frontforge_config::{BuildOptions, load_options, variant_option};
use frontforge_core::{BuildPlan, LogStream, Variant, VariantSelector};
use frontforge_sequencer::{BuildEvent, BuildResult, Sequencer, StepState};
use frontforge_tools::ProcessToolRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Default variant for the watch, serve and test flows.
pub const DEBUG_DEFAULT: &str = "debug-main";

/// Resolve `--variant` (or `default`) to exactly one variant. Aggregate
/// tokens are rejected.
pub fn single_variant(cli: Option<&str>, default: Option<&str>, command: &str) -> Result<Variant> {
    let value = variant_option(cli, default);
    let selector: VariantSelector = value
        .parse()
        .with_context(|| format!("Invalid variant '{}'", value))?;
    match selector {
        VariantSelector::Single(variant) => Ok(variant),
        _ => bail!("'{}' needs a single variant, not '{}'", command, value),
    }
}

/// Loaded configuration and the directory it applies to.
pub struct Project {
    pub options: BuildOptions,
    pub root: PathBuf,
}

impl Project {
    /// Load `config`. A missing file means defaults, with project metadata
    /// from `package.json` when present.
    pub fn load(config: &Path) -> Result<Self> {
        let root = config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .canonicalize()
            .context("Failed to resolve project directory")?;

        let options = if config.exists() {
            load_options(config)
                .with_context(|| format!("Failed to load config file: {}", config.display()))?
        } else {
            warn!(config = %config.display(), "No config file, using defaults");
            let mut options = BuildOptions::default();
            if let Some(package) = read_package_info(&root.join("package.json"))
                .context("Failed to read package.json")?
            {
                options.project = package;
            }
            options
        };

        Ok(Self { options, root })
    }

    pub fn bootstrappers_root(&self) -> PathBuf {
        self.root.join(&self.options.paths.bootstrappers)
    }

    pub fn sequencer(&self) -> Sequencer {
        Sequencer::new(
            self.options.clone(),
            self.root.clone(),
            Arc::new(ProcessToolRunner::new()),
        )
    }
}

/// Execute `plan`, printing progress, and fail when the build fails.
pub async fn run_plan(
    sequencer: &Sequencer,
    plan: BuildPlan,
    variants: Vec<Variant>,
) -> Result<BuildResult> {
    let (mut rx, result_handle) = sequencer.execute(plan, variants, |result| {
        if result.success {
            println!("✓ Variant '{}' finished\n", result.variant);
        } else {
            println!("✗ Variant '{}' failed\n", result.variant);
        }
    });

    while let Some(event) = rx.recv().await {
        print_event(event);
    }

    let result = result_handle.await.context("Build task failed")?;
    print_summary(&result);
    Ok(result)
}

fn print_event(event: BuildEvent) {
    match event {
        BuildEvent::VariantStarted { variant } => {
            println!("--- Building variant '{}' ---\n", variant);
        }
        BuildEvent::StepStarted { step, .. } => {
            println!("▶ Step '{}' started", step);
        }
        BuildEvent::StepLog { line, .. } => {
            let stream_marker = match line.stream {
                LogStream::Stdout => " ",
                LogStream::Stderr => "!",
                LogStream::System => "*",
            };
            println!("  [{}]{} {}", line.label, stream_marker, line.content);
        }
        BuildEvent::StepCompleted { step, .. } => {
            println!("✓ Step '{}' completed", step);
        }
        BuildEvent::StepSkipped { step, reason, .. } => {
            println!("⊘ Step '{}' skipped: {}", step, reason);
        }
        BuildEvent::StepFailed { step, message, .. } => {
            println!("✗ Step '{}' failed: {}", step, message);
        }
        BuildEvent::VariantCompleted { .. } => {}
        BuildEvent::BuildCompleted { success } => {
            if success {
                println!("--- Build completed successfully ---");
            } else {
                println!("--- Build failed ---");
            }
        }
    }
}

fn print_summary(result: &BuildResult) {
    println!("\n--- Step Summary ---");
    for variant in &result.variants {
        println!("  {}", variant.variant);
        for (step, state) in &variant.step_states {
            let status = match state {
                StepState::Succeeded => "✓ succeeded".to_string(),
                StepState::Failed { message } => format!("✗ failed: {}", message),
                StepState::Skipped { reason } => format!("⊘ skipped: {}", reason),
                StepState::Pending => "○ pending".to_string(),
            };
            println!("    {} - {}", step, status);
        }
    }
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub fn validate(config: &Path) -> Result<()> {
    let options = load_options(config)
        .with_context(|| format!("Configuration error in {}", config.display()))?;

    println!("Configuration is valid");
    println!("  project: {} {}", options.project.name, options.project.version);
    println!("  type: {:?}", options.project_type);
    println!("  bundle: {}", options.bundle_filename);
    if !options.capabilities.can_build() {
        println!("  build steps: none (tests and analysis only)");
    }
    Ok(())
}

/// Fail with a clear message when the project cannot run `command`.
pub fn require(enabled: bool, command: &str) -> Result<()> {
    if !enabled {
        bail!("'{}' is not available for this project type", command);
    }
    Ok(())
}
