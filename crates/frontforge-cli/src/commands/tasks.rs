//! `frontforge test`, `watch-test` and `analysis`.

use super::{DEBUG_DEFAULT, Project, run_plan, single_variant};
use anyhow::{Result, bail};
use frontforge_core::{BuildPlan, StepKind, Variant};

async fn run_single(
    project: &Project,
    kind: StepKind,
    variant: Variant,
    continuous: bool,
) -> Result<()> {
    let sequencer = project.sequencer().watching(continuous);
    let result = run_plan(&sequencer, BuildPlan::single(kind), vec![variant]).await?;
    if !result.success {
        bail!("{} failed", kind);
    }
    Ok(())
}

/// The variant the test runner sees, `debug-main` unless given.
fn test_variant(variant: Option<&str>, continuous: bool) -> Result<Variant> {
    let command = if continuous { "watch-test" } else { "test" };
    single_variant(variant, Some(DEBUG_DEFAULT), command)
}

/// Run the test runner once, or continuously until it exits.
pub async fn test(project: &Project, variant: Option<&str>, continuous: bool) -> Result<()> {
    let variant = test_variant(variant, continuous)?;
    run_single(project, StepKind::Test, variant, continuous).await
}

pub async fn analysis(project: &Project, variant: Option<&str>) -> Result<()> {
    let variant = single_variant(variant, None, "analysis")?;
    run_single(project, StepKind::Analysis, variant, false).await
}
