//! Remove the variant's previous output.

use crate::context::BuildContext;
use crate::fsutil::remove_dir;
use frontforge_core::{Result, StepOutcome};
use tracing::debug;

pub async fn run(ctx: &BuildContext) -> Result<StepOutcome> {
    let temp = ctx
        .variant
        .target_dir(&ctx.project_path(&ctx.options.paths.temporary));
    for dir in [ctx.dist_dir(), temp] {
        if remove_dir(&dir)? {
            debug!(dir = %dir.display(), "Removed");
        }
    }
    Ok(StepOutcome::Completed)
}
