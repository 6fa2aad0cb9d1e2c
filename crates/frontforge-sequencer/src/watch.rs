//! Source watcher for `frontforge watch`.
//!
//! Maps changed files to the steps that consume them and re-runs those
//! steps for the watched variant. Changes are debounced (100ms) and step
//! failures are logged without ending the session.

use crate::fsutil::url_path;
use crate::sequencer::Sequencer;
use frontforge_config::BuildOptions;
use frontforge_core::{Error, Result, StepKind, StepOutcome, Variant};
use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Debounce duration in milliseconds
const DEBOUNCE_MS: u64 = 100;

/// A step and the project-relative globs that trigger it.
#[derive(Debug, Clone)]
pub struct WatchRule {
    pub step: StepKind,
    pub patterns: Vec<String>,
    globs: GlobSet,
}

impl WatchRule {
    pub fn new(step: StepKind, patterns: Vec<String>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| Error::Watch(format!("invalid watch glob '{}': {}", pattern, e)))?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|e| Error::Watch(format!("invalid watch globs: {}", e)))?;
        Ok(Self {
            step,
            patterns,
            globs,
        })
    }

    /// Whether a project-relative, forward-slash path triggers this rule.
    pub fn matches(&self, relative: &str) -> bool {
        self.globs.is_match(relative)
    }
}

fn join(base: &str, rest: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), rest)
}

/// Rules for `variant`, limited to the steps the project can run.
pub fn watch_rules(options: &BuildOptions, variant: &Variant) -> Result<Vec<WatchRule>> {
    let paths = &options.paths;
    let bootstrapper = join(&paths.bootstrappers, variant.name());
    let mut rules = Vec::new();

    if options.capabilities.styles {
        rules.push(WatchRule::new(
            StepKind::Styles,
            vec![
                join(&bootstrapper, "bootstrapper.scss"),
                join(&paths.bootstrappers, "base.scss"),
                join(&paths.styles, "**/*.scss"),
            ],
        )?);
    }
    if options.capabilities.views {
        rules.push(WatchRule::new(
            StepKind::Views,
            vec![join(&paths.views, "**/*.html"), paths.index.clone()],
        )?);
    }
    if options.capabilities.scripts {
        rules.push(WatchRule::new(
            StepKind::Scripts,
            vec![
                join(&paths.scripts, "**/*"),
                join(&bootstrapper, "bootstrapper.js"),
            ],
        )?);
    }
    Ok(rules)
}

/// The steps triggered by `changed`, in step order. Paths outside `root`
/// are ignored.
pub fn steps_for_changes(rules: &[WatchRule], root: &Path, changed: &[PathBuf]) -> Vec<StepKind> {
    let mut steps = BTreeSet::new();
    for path in changed {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let relative = url_path(relative);
        for rule in rules.iter().filter(|r| r.matches(&relative)) {
            steps.insert(rule.step);
        }
    }
    steps.into_iter().collect()
}

/// Watch the project and re-run affected steps until `shutdown` resolves.
pub async fn watch(
    sequencer: Sequencer,
    variant: Variant,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let root = sequencer
        .root()
        .canonicalize()
        .unwrap_or_else(|_| sequencer.root().to_path_buf());
    let rules = watch_rules(sequencer.options(), &variant)?;
    if rules.is_empty() {
        warn!("Nothing to watch for this project");
        shutdown.await;
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<PathBuf>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
            Err(e) => error!(error = %e, "File watcher error"),
        },
        Config::default(),
    )
    .map_err(|e| Error::Watch(e.to_string()))?;
    watcher
        .watch(&root, RecursiveMode::Recursive)
        .map_err(|e| Error::Watch(e.to_string()))?;

    info!(variant = %variant, root = %root.display(), "Watching for changes");

    tokio::pin!(shutdown);
    loop {
        let first = tokio::select! {
            _ = &mut shutdown => break,
            path = rx.recv() => match path {
                Some(path) => path,
                None => break,
            },
        };

        let mut changed = vec![first];
        let debounce = tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS));
        tokio::pin!(debounce);
        loop {
            tokio::select! {
                _ = &mut debounce => break,
                path = rx.recv() => match path {
                    Some(path) => changed.push(path),
                    None => break,
                },
            }
        }

        let steps = steps_for_changes(&rules, &root, &changed);
        if steps.is_empty() {
            continue;
        }
        debug!(?changed, ?steps, "Sources changed");

        for step in steps {
            match sequencer.run_step_once(step, &variant).await {
                Ok(StepOutcome::Completed) => info!(variant = %variant, step = %step, "Rebuilt"),
                Ok(StepOutcome::Skipped { reason }) => {
                    warn!(variant = %variant, step = %step, %reason, "Rebuild skipped")
                }
                Err(e) => error!(variant = %variant, step = %step, error = %e, "Rebuild failed"),
            }
        }
    }

    drop(watcher);
    info!("Stopped watching");
    Ok(())
}
