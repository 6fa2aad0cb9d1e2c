//! Verbatim copy of image and asset folders.

use crate::context::BuildContext;
use crate::fsutil::copy_glob;
use frontforge_core::{Result, StepOutcome};
use tracing::debug;

/// Copy `<folder>/**/*` into `<stage>/<folder>/`.
pub async fn run(ctx: &BuildContext, folder: &str) -> Result<StepOutcome> {
    let pattern = format!("{}/**/*", folder.trim_end_matches('/'));
    let dest = ctx.temp_dir().join(folder);
    let written = copy_glob(&ctx.root, &pattern, &dest)?;
    debug!(variant = %ctx.variant, folder, files = written.len(), "Copied");
    Ok(StepOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingRunner, context, project};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_release_copies_into_temporary_tree() {
        let dir = project(&[("images/logo.png", "png"), ("images/icons/a.svg", "svg")]);
        let runner = Arc::new(RecordingRunner::emulating());
        let (ctx, _logs) = context(dir.path(), "release-main", runner, false);

        run(&ctx, "images").await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("tmp/main/images/logo.png")).unwrap(),
            "png"
        );
        assert!(dir.path().join("tmp/main/images/icons/a.svg").is_file());
        assert!(!dir.path().join("dist/main/images").exists());
    }

    #[tokio::test]
    async fn test_debug_copies_into_distribution_tree() {
        let dir = project(&[("assets/fonts/a.woff", "woff")]);
        let runner = Arc::new(RecordingRunner::emulating());
        let (ctx, _logs) = context(dir.path(), "debug-admin", runner, false);

        run(&ctx, "assets").await.unwrap();
        assert!(dir.path().join("dist/admin/assets/fonts/a.woff").is_file());
    }

    #[tokio::test]
    async fn test_missing_folder_copies_nothing() {
        let dir = project(&[]);
        let runner = Arc::new(RecordingRunner::emulating());
        let (ctx, _logs) = context(dir.path(), "debug-main", runner, false);

        assert_eq!(run(&ctx, "images").await.unwrap(), StepOutcome::Completed);
        assert!(!dir.path().join("dist/main/images").exists());
    }
}
