//! Source complexity report.

use crate::context::BuildContext;
use frontforge_core::{Result, StepOutcome};
use tracing::info;

pub async fn run(ctx: &BuildContext) -> Result<StepOutcome> {
    let input = ctx.project_path(&ctx.options.analysis.input);
    let output = ctx.project_path(&ctx.options.analysis.output);
    std::fs::create_dir_all(&output)?;

    let vars = ctx
        .variables()
        .with_input(input.to_string_lossy())
        .with_output(output.to_string_lossy())
        .build();
    ctx.run_tool(
        "analysis",
        &ctx.options.tools.analysis,
        &vars,
        &[],
        ctx.variant_env(),
    )
    .await?;

    info!(report = %output.display(), "Analysis report written");
    Ok(StepOutcome::Completed)
}
