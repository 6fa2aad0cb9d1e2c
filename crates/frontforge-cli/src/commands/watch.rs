//! `frontforge watch` and `frontforge serve`.

use super::{DEBUG_DEFAULT, Project, require, run_plan, shutdown_signal, single_variant};
use anyhow::Result;
use frontforge_server::{LiveReloadHub, serve_live_reload, serve_variant};
use std::sync::Arc;
use tracing::{info, warn};

pub async fn watch(project: &Project, variant: Option<&str>) -> Result<()> {
    let capabilities = project.options.capabilities;
    require(capabilities.watch && capabilities.can_build(), "watch")?;

    let variant = single_variant(variant, Some(DEBUG_DEFAULT), "watch")?;
    let hub = LiveReloadHub::new();
    let sequencer = project
        .sequencer()
        .watching(true)
        .with_live_reload(Arc::new(hub.clone()));

    let result = run_plan(&sequencer, sequencer.plan(), vec![variant.clone()]).await?;
    if !result.success {
        warn!(variant = %variant, "Initial build failed, watching anyway");
    }

    let dist = variant.target_dir(&project.root.join(&project.options.paths.distribution));
    let mut servers = Vec::new();
    if capabilities.serve {
        servers.push(serve_variant(&variant, &dist, project.options.server_port).await?);
    }
    servers.push(serve_live_reload(hub, project.options.live_reload_port).await?);

    frontforge_sequencer::watch(sequencer, variant, shutdown_signal()).await?;

    for server in &servers {
        server.abort();
    }
    info!("Shut down");
    Ok(())
}

pub async fn serve(project: &Project, variant: Option<&str>) -> Result<()> {
    require(project.options.capabilities.serve, "serve")?;

    let variant = single_variant(variant, Some(DEBUG_DEFAULT), "serve")?;
    let dist = variant.target_dir(&project.root.join(&project.options.paths.distribution));
    if !dist.is_dir() {
        warn!(dist = %dist.display(), "Nothing built yet for this variant");
    }

    let static_server = serve_variant(&variant, &dist, project.options.server_port).await?;
    let reload_server =
        serve_live_reload(LiveReloadHub::new(), project.options.live_reload_port).await?;

    shutdown_signal().await;
    static_server.abort();
    reload_server.abort();
    Ok(())
}
