//! User-supplied pre- and post-build shell hooks.

use crate::context::BuildContext;
use frontforge_core::{Result, StepOutcome};
use frontforge_tools::shell_spec;

pub async fn pre_build(ctx: &BuildContext) -> Result<StepOutcome> {
    match &ctx.options.hooks.pre_build {
        Some(command) => {
            run_hook(ctx, "pre-build", command).await?;
            Ok(StepOutcome::Completed)
        }
        None => Ok(StepOutcome::skipped("no pre-build hook configured")),
    }
}

/// Run a hook command through the shell with the variant environment.
pub(crate) async fn run_hook(ctx: &BuildContext, label: &str, command: &str) -> Result<()> {
    let mut spec = shell_spec(label, command, ctx.root.clone());
    spec.env = ctx.variant_env();
    let exit = ctx.tools.run(spec, ctx.logs.clone()).await?;
    exit.into_result(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingRunner, context, context_with, project};
    use frontforge_config::BuildOptions;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_pre_build_without_hook_is_skipped() {
        let dir = project(&[]);
        let runner = Arc::new(RecordingRunner::emulating());
        let (ctx, _logs) = context(dir.path(), "release-main", runner.clone(), false);

        let outcome = pre_build(&ctx).await.unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped { .. }));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_pre_build_runs_shell_with_variant_env() {
        let dir = project(&[]);
        let runner = Arc::new(RecordingRunner::emulating());
        let mut options = BuildOptions::default();
        options.hooks.pre_build = Some("npm run lint".to_string());
        let (ctx, _logs) = context_with(dir.path(), "debug-admin", runner.clone(), false, options);

        assert_eq!(pre_build(&ctx).await.unwrap(), StepOutcome::Completed);
        let call = runner.call("pre-build").unwrap();
        assert!(call.args.iter().any(|a| a == "npm run lint"));
        assert_eq!(call.env.get("TARGET").map(String::as_str), Some("admin"));
        assert_eq!(call.env.get("DEBUG").map(String::as_str), Some("true"));
    }

    #[tokio::test]
    async fn test_failing_hook_fails_step() {
        let dir = project(&[]);
        let runner = Arc::new(RecordingRunner::failing("pre-build"));
        let mut options = BuildOptions::default();
        options.hooks.pre_build = Some("false".to_string());
        let (ctx, _logs) = context_with(dir.path(), "release-main", runner, false, options);

        assert!(pre_build(&ctx).await.is_err());
    }
}
