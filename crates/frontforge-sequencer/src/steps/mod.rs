//! Build step implementations.

pub mod analysis;
pub mod clean;
pub mod copy;
pub mod hooks;
pub mod manifest;
pub mod post_build;
pub mod rev;
pub mod scripts;
pub mod styles;
pub mod test_runner;
pub mod views;

use crate::context::BuildContext;
use frontforge_core::{Result, StepKind, StepOutcome};

/// Run one step for the context's variant.
pub async fn run_step(kind: StepKind, ctx: &BuildContext) -> Result<StepOutcome> {
    match kind {
        StepKind::Clean => clean::run(ctx).await,
        StepKind::PreBuild => hooks::pre_build(ctx).await,
        StepKind::Views => views::run(ctx).await,
        StepKind::Styles => styles::run(ctx).await,
        StepKind::Images => {
            let images = ctx.options.paths.images.clone();
            copy::run(ctx, &images).await
        }
        StepKind::Assets => {
            let assets = ctx.options.paths.assets.clone();
            copy::run(ctx, &assets).await
        }
        StepKind::Scripts => scripts::run(ctx).await,
        StepKind::Rev => rev::run(ctx).await,
        StepKind::Manifest => manifest::run(ctx).await,
        StepKind::PostBuild => post_build::run(ctx).await,
        StepKind::Test => test_runner::run(ctx).await,
        StepKind::Analysis => analysis::run(ctx).await,
    }
}
