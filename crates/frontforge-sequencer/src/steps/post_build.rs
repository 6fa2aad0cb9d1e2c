//! Post-build copy actions and the post-build hook.

use crate::context::BuildContext;
use crate::fsutil::{copy_file, match_glob};
use crate::steps::hooks::run_hook;
use frontforge_core::{Result, StepOutcome};
use tracing::debug;

pub async fn run(ctx: &BuildContext) -> Result<StepOutcome> {
    let dist = ctx.dist_dir();
    for action in &ctx.options.post_build {
        let dest_dir = dist.join(&action.dest);
        let matched = match_glob(&ctx.root, &action.source)?;
        for file in &matched {
            let mut dest = dest_dir.join(&file.relative);
            if let Some(ext) = &action.ext {
                dest.set_extension(ext);
            }
            copy_file(&file.path, &dest)?;
        }
        debug!(
            variant = %ctx.variant,
            source = %action.source,
            dest = %action.dest,
            files = matched.len(),
            "Post-build copy"
        );
    }

    if let Some(command) = &ctx.options.hooks.post_build {
        run_hook(ctx, "post-build", command).await?;
    }
    Ok(StepOutcome::Completed)
}
