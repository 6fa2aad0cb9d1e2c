//! Build sequencer - runs a build plan for each variant in turn.

use crate::context::BuildContext;
use crate::steps::run_step;
use frontforge_config::BuildOptions;
use frontforge_core::{
    BuildPlan, LiveReload, LogLine, LogSender, Result, StepKind, StepOutcome, ToolRunner, Variant,
};
use futures::StreamExt;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// State of a step during a variant build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Succeeded,
    Skipped { reason: String },
    Failed { message: String },
}

impl StepState {
    /// Succeeded or skipped.
    pub fn is_success(&self) -> bool {
        matches!(self, StepState::Succeeded | StepState::Skipped { .. })
    }
}

/// Event emitted while a build runs.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    VariantStarted { variant: Variant },
    StepStarted { variant: Variant, step: StepKind },
    StepLog { variant: Variant, line: LogLine },
    StepCompleted { variant: Variant, step: StepKind },
    StepSkipped { variant: Variant, step: StepKind, reason: String },
    StepFailed { variant: Variant, step: StepKind, message: String },
    VariantCompleted { variant: Variant, success: bool },
    BuildCompleted { success: bool },
}

/// Outcome of one variant.
#[derive(Debug, Clone)]
pub struct VariantResult {
    pub variant: Variant,
    pub success: bool,
    pub step_states: BTreeMap<StepKind, StepState>,
}

/// Outcome of a whole build. Variants after a failed one are absent.
#[derive(Debug)]
pub struct BuildResult {
    pub success: bool,
    pub variants: Vec<VariantResult>,
}

/// Runs build plans against a project.
#[derive(Clone)]
pub struct Sequencer {
    options: Arc<BuildOptions>,
    root: PathBuf,
    tools: Arc<dyn ToolRunner>,
    reload: Option<Arc<dyn LiveReload>>,
    watching: bool,
}

impl Sequencer {
    pub fn new(options: BuildOptions, root: PathBuf, tools: Arc<dyn ToolRunner>) -> Self {
        Self {
            options: Arc::new(options),
            root,
            tools,
            reload: None,
            watching: false,
        }
    }

    pub fn with_live_reload(mut self, reload: Arc<dyn LiveReload>) -> Self {
        self.reload = Some(reload);
        self
    }

    /// Switch to watch mode: live-reload snippets, continuous tests, and
    /// survivable bundling errors.
    pub fn watching(mut self, watching: bool) -> Self {
        self.watching = watching;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_watching(&self) -> bool {
        self.watching
    }

    /// Build the step context for `variant`.
    pub fn context(&self, variant: &Variant, logs: LogSender) -> BuildContext {
        BuildContext {
            variant: variant.clone(),
            watching: self.watching,
            options: self.options.clone(),
            root: self.root.clone(),
            tools: self.tools.clone(),
            reload: self.reload.clone(),
            logs,
        }
    }

    /// The standard plan restricted to the project's capabilities.
    pub fn plan(&self) -> BuildPlan {
        let capabilities = self.options.capabilities;
        BuildPlan::standard().retain(|kind| capabilities.allows(kind))
    }

    /// Execute `plan` for each variant in series, returning a channel of
    /// events and a handle to the final result. `on_variant` runs after
    /// each variant finishes and before the next one starts.
    pub fn execute<F>(
        &self,
        plan: BuildPlan,
        variants: Vec<Variant>,
        on_variant: F,
    ) -> (mpsc::Receiver<BuildEvent>, tokio::task::JoinHandle<BuildResult>)
    where
        F: FnMut(&VariantResult) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(100);
        let sequencer = self.clone();

        let handle = tokio::spawn(async move {
            sequencer.execute_inner(plan, variants, on_variant, tx).await
        });

        (rx, handle)
    }

    async fn execute_inner<F>(
        self,
        plan: BuildPlan,
        variants: Vec<Variant>,
        mut on_variant: F,
        tx: mpsc::Sender<BuildEvent>,
    ) -> BuildResult
    where
        F: FnMut(&VariantResult) + Send + 'static,
    {
        let mut results = Vec::new();
        let mut success = true;

        for variant in variants {
            let _ = tx
                .send(BuildEvent::VariantStarted {
                    variant: variant.clone(),
                })
                .await;
            info!(variant = %variant, "Building variant");

            let result = self.run_variant(&plan, &variant, &tx).await;

            let _ = tx
                .send(BuildEvent::VariantCompleted {
                    variant: variant.clone(),
                    success: result.success,
                })
                .await;
            on_variant(&result);

            let failed = !result.success;
            results.push(result);
            if failed {
                error!(variant = %variant, "Variant failed, aborting remaining variants");
                success = false;
                break;
            }
        }

        let _ = tx.send(BuildEvent::BuildCompleted { success }).await;

        BuildResult {
            success,
            variants: results,
        }
    }

    async fn run_variant(
        &self,
        plan: &BuildPlan,
        variant: &Variant,
        tx: &mpsc::Sender<BuildEvent>,
    ) -> VariantResult {
        let (log_tx, mut log_rx) = futures::channel::mpsc::unbounded::<LogLine>();
        let forward_tx = tx.clone();
        let forward_variant = variant.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(line) = log_rx.next().await {
                let _ = forward_tx
                    .send(BuildEvent::StepLog {
                        variant: forward_variant.clone(),
                        line,
                    })
                    .await;
            }
        });

        let ctx = self.context(variant, log_tx);
        let mut step_states: BTreeMap<StepKind, StepState> =
            plan.steps().map(|kind| (kind, StepState::Pending)).collect();
        let mut failed = false;

        for stage in &plan.stages {
            if failed {
                for kind in stage.steps() {
                    let reason = "an earlier step failed".to_string();
                    step_states.insert(*kind, StepState::Skipped { reason: reason.clone() });
                    let _ = tx
                        .send(BuildEvent::StepSkipped {
                            variant: variant.clone(),
                            step: *kind,
                            reason,
                        })
                        .await;
                }
                continue;
            }

            for kind in stage.steps() {
                let _ = tx
                    .send(BuildEvent::StepStarted {
                        variant: variant.clone(),
                        step: *kind,
                    })
                    .await;
            }

            let outcomes = join_all(stage.steps().iter().map(|kind| {
                let ctx = &ctx;
                async move { (*kind, run_step(*kind, ctx).await) }
            }))
            .await;

            for (kind, outcome) in outcomes {
                let (state, event) = match outcome {
                    Ok(StepOutcome::Completed) => {
                        info!(variant = %variant, step = %kind, "Step completed");
                        (
                            StepState::Succeeded,
                            BuildEvent::StepCompleted {
                                variant: variant.clone(),
                                step: kind,
                            },
                        )
                    }
                    Ok(StepOutcome::Skipped { reason }) => {
                        info!(variant = %variant, step = %kind, %reason, "Step skipped");
                        (
                            StepState::Skipped {
                                reason: reason.clone(),
                            },
                            BuildEvent::StepSkipped {
                                variant: variant.clone(),
                                step: kind,
                                reason,
                            },
                        )
                    }
                    Err(e) => {
                        error!(variant = %variant, step = %kind, error = %e, "Step failed");
                        failed = true;
                        (
                            StepState::Failed {
                                message: e.to_string(),
                            },
                            BuildEvent::StepFailed {
                                variant: variant.clone(),
                                step: kind,
                                message: e.to_string(),
                            },
                        )
                    }
                };
                step_states.insert(kind, state);
                let _ = tx.send(event).await;
            }
        }

        // Close the log channel so the forwarder drains and exits.
        drop(ctx);
        let _ = forwarder.await;

        VariantResult {
            variant: variant.clone(),
            success: step_states.values().all(StepState::is_success),
            step_states,
        }
    }

    /// Run a single step outside a plan, as the watcher does. Tool output
    /// goes to the tracing log.
    pub async fn run_step_once(&self, kind: StepKind, variant: &Variant) -> Result<StepOutcome> {
        let (log_tx, mut log_rx) = futures::channel::mpsc::unbounded::<LogLine>();
        let forwarder = tokio::spawn(async move {
            while let Some(line) = log_rx.next().await {
                info!(tool = %line.label, stream = ?line.stream, "{}", line.content);
            }
        });

        let ctx = self.context(variant, log_tx);
        let outcome = run_step(kind, &ctx).await;
        drop(ctx);
        let _ = forwarder.await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingRunner, project};
    use frontforge_config::{Capabilities, ProjectType};
    use frontforge_core::{LogStream, PlanStage, ToolExit, ToolSpec};
    use std::sync::Mutex;

    const PROJECT: &[(&str, &str)] = &[
        ("index.html", "<html><body></body></html>"),
        ("views/home.html", "<h1>home</h1>"),
        ("images/logo.png", "png"),
        ("bootstrappers/main/bootstrapper.scss", "body{}"),
        ("bootstrappers/main/bootstrapper.js", "require('x');"),
        ("bootstrappers/admin/bootstrapper.scss", "body{}"),
        ("bootstrappers/admin/bootstrapper.js", "require('y');"),
    ];

    async fn collect(mut rx: mpsc::Receiver<BuildEvent>) -> Vec<BuildEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn variants(names: &[&str]) -> Vec<Variant> {
        names.iter().map(|n| Variant::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_plan_follows_capabilities() {
        let full = Sequencer::new(
            BuildOptions::default(),
            PathBuf::from("."),
            Arc::new(RecordingRunner::emulating()),
        );
        assert_eq!(full.plan(), BuildPlan::standard());

        let mut options = BuildOptions::default();
        options.capabilities.images = false;
        options.capabilities.assets = false;
        let partial = Sequencer::new(options, PathBuf::from("."), Arc::new(RecordingRunner::emulating()));
        assert_eq!(
            partial.plan().stages[2],
            PlanStage::Parallel(vec![StepKind::Views, StepKind::Styles, StepKind::Scripts])
        );

        let options = BuildOptions {
            capabilities: Capabilities::for_project(ProjectType::Module),
            ..BuildOptions::default()
        };
        let module = Sequencer::new(options, PathBuf::from("."), Arc::new(RecordingRunner::emulating()));
        let steps: Vec<StepKind> = module.plan().steps().collect();
        assert_eq!(steps, vec![StepKind::Clean, StepKind::PreBuild]);
    }

    #[tokio::test]
    async fn test_release_build_produces_revisioned_dist() {
        let dir = project(PROJECT);
        let runner = Arc::new(RecordingRunner::emulating());
        let sequencer = Sequencer::new(BuildOptions::default(), dir.path().to_path_buf(), runner);

        let (rx, handle) = sequencer.execute(sequencer.plan(), variants(&["release-main"]), |_| {});
        let events = collect(rx).await;
        let result = handle.await.unwrap();

        assert!(result.success);
        let states = &result.variants[0].step_states;
        assert_eq!(states[&StepKind::Styles], StepState::Succeeded);
        assert_eq!(states[&StepKind::Rev], StepState::Succeeded);
        assert!(matches!(states[&StepKind::Manifest], StepState::Skipped { .. }));

        let dist = dir.path().join("dist/main");
        assert!(dist.join("index.html").is_file());
        assert!(dist.join("rev-manifest.json").is_file());
        assert!(!dist.join("css/main.css").exists());

        assert!(matches!(events.first(), Some(BuildEvent::VariantStarted { .. })));
        assert!(matches!(
            events.last(),
            Some(BuildEvent::BuildCompleted { success: true })
        ));
    }

    #[tokio::test]
    async fn test_release_without_rev_writes_dist_directly() {
        let dir = project(PROJECT);
        let runner = Arc::new(RecordingRunner::emulating());
        let mut options = BuildOptions::default();
        options.capabilities.rev = false;
        let sequencer = Sequencer::new(options, dir.path().to_path_buf(), runner);
        assert!(!sequencer.plan().steps().any(|kind| kind == StepKind::Rev));

        let (rx, handle) = sequencer.execute(sequencer.plan(), variants(&["release-main"]), |_| {});
        collect(rx).await;
        let result = handle.await.unwrap();

        assert!(result.success);
        let dist = dir.path().join("dist/main");
        assert!(dist.join("index.html").is_file());
        assert!(dist.join("views/home.html").is_file());
        assert!(dist.join("css/main.css").is_file());
        assert!(dist.join("js/main.js").is_file());
        assert!(!dist.join("rev-manifest.json").exists());
        assert!(!dir.path().join("tmp/main").exists());
    }

    #[tokio::test]
    async fn test_failure_stops_sequence_and_remaining_variants() {
        let dir = project(PROJECT);
        let runner = Arc::new(RecordingRunner::failing("scripts"));
        let sequencer = Sequencer::new(BuildOptions::default(), dir.path().to_path_buf(), runner);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();

        let (rx, handle) = sequencer.execute(
            sequencer.plan(),
            variants(&["release-admin", "release-main"]),
            move |result| seen_cb.lock().unwrap().push(result.variant.to_string()),
        );
        let events = collect(rx).await;
        let result = handle.await.unwrap();

        assert!(!result.success);
        assert_eq!(result.variants.len(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["release-admin".to_string()]);

        let states = &result.variants[0].step_states;
        assert!(matches!(states[&StepKind::Scripts], StepState::Failed { .. }));
        // Parallel siblings still finish.
        assert_eq!(states[&StepKind::Styles], StepState::Succeeded);
        for later in [StepKind::Rev, StepKind::Manifest, StepKind::PostBuild] {
            assert!(matches!(states[&later], StepState::Skipped { .. }));
        }

        assert!(!events.iter().any(|e| matches!(
            e,
            BuildEvent::VariantStarted { variant } if variant.as_str() == "release-main"
        )));
        assert!(!dir.path().join("tmp/main").exists());
    }

    #[tokio::test]
    async fn test_variants_run_in_series_with_callback() {
        let dir = project(PROJECT);
        let runner = Arc::new(RecordingRunner::emulating());
        let sequencer = Sequencer::new(BuildOptions::default(), dir.path().to_path_buf(), runner);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();

        let (rx, handle) = sequencer.execute(
            sequencer.plan(),
            variants(&["debug-admin", "debug-main"]),
            move |result| seen_cb.lock().unwrap().push(result.variant.to_string()),
        );
        let events = collect(rx).await;
        assert!(handle.await.unwrap().success);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["debug-admin".to_string(), "debug-main".to_string()]
        );

        let completed_admin = events
            .iter()
            .position(|e| matches!(e, BuildEvent::VariantCompleted { variant, .. } if variant.as_str() == "debug-admin"))
            .unwrap();
        let started_main = events
            .iter()
            .position(|e| matches!(e, BuildEvent::VariantStarted { variant } if variant.as_str() == "debug-main"))
            .unwrap();
        assert!(completed_admin < started_main);
        assert!(dir.path().join("dist/admin/js/main.map.js").is_file());
        assert!(dir.path().join("dist/main/js/main.map.js").is_file());
    }

    struct ChattyRunner;

    #[async_trait::async_trait]
    impl ToolRunner for ChattyRunner {
        fn name(&self) -> &'static str {
            "chatty"
        }

        async fn run(&self, spec: ToolSpec, logs: LogSender) -> Result<ToolExit> {
            let _ = logs.unbounded_send(LogLine::new(spec.label, LogStream::Stdout, "42 passed"));
            Ok(ToolExit::success())
        }
    }

    #[tokio::test]
    async fn test_tool_output_becomes_step_log() {
        let dir = project(&[]);
        let sequencer = Sequencer::new(
            BuildOptions::default(),
            dir.path().to_path_buf(),
            Arc::new(ChattyRunner),
        );

        let (rx, handle) = sequencer.execute(
            BuildPlan::single(StepKind::Test),
            variants(&["release-main"]),
            |_| {},
        );
        let events = collect(rx).await;
        assert!(handle.await.unwrap().success);

        let log = events
            .iter()
            .position(|e| matches!(e, BuildEvent::StepLog { line, .. } if line.label == "test" && line.content == "42 passed"))
            .unwrap();
        let done = events
            .iter()
            .position(|e| matches!(e, BuildEvent::VariantCompleted { .. }))
            .unwrap();
        assert!(log < done);
    }
}
