//! `frontforge build`.

use super::{Project, require, run_plan};
use anyhow::{Context, Result, bail};
use frontforge_config::{resolve_variants, variant_option};

pub async fn build(project: &Project, variant: Option<&str>) -> Result<()> {
    require(project.options.capabilities.can_build(), "build")?;

    let value = variant_option(variant, None);
    let variants = resolve_variants(&value, &project.bootstrappers_root())
        .with_context(|| format!("Failed to resolve variant '{}'", value))?;

    let sequencer = project.sequencer();
    let plan = sequencer.plan();
    println!(
        "Building {} variant(s): {}",
        variants.len(),
        variants
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let result = run_plan(&sequencer, plan, variants).await?;
    if result.success {
        println!("\n✓ Build succeeded!");
        Ok(())
    } else {
        bail!("Build failed");
    }
}
