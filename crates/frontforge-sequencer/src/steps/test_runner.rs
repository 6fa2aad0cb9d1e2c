//! Unit test runner, single-run or continuous.

use crate::context::BuildContext;
use frontforge_core::{Result, StepOutcome};
use tracing::info;

pub async fn run(ctx: &BuildContext) -> Result<StepOutcome> {
    let config = ctx.project_path(&ctx.options.test.config);
    let vars = ctx
        .variables()
        .with_config(config.to_string_lossy())
        .build();
    let mode: &[&str] = if ctx.watching {
        &["--no-single-run"]
    } else {
        &["--single-run"]
    };

    ctx.run_tool("test", &ctx.options.tools.test, &vars, mode, ctx.variant_env())
        .await?;
    info!(continuous = ctx.watching, "Test run finished");
    Ok(StepOutcome::Completed)
}
