//! View templates and the root index page.

use crate::context::BuildContext;
use crate::fsutil::{copy_file, is_newer, match_glob, url_path};
use frontforge_core::{Result, StepOutcome};
use std::path::Path;
use tracing::debug;

/// Copy changed views and the index into the stage directory.
pub async fn run(ctx: &BuildContext) -> Result<StepOutcome> {
    let stage = ctx.temp_dir();
    let views = &ctx.options.paths.views;
    let views_dir = stage.join(views);
    let mut changed = Vec::new();

    let pattern = format!("{}/**/*.html", views.trim_end_matches('/'));
    for file in match_glob(&ctx.root, &pattern)? {
        let dest = views_dir.join(&file.relative);
        if !is_newer(&file.path, &dest) {
            continue;
        }
        copy_file(&file.path, &dest)?;
        if let Ok(relative) = dest.strip_prefix(&stage) {
            changed.push(url_path(relative));
        }
    }
    debug!(variant = %ctx.variant, count = changed.len(), "Views copied");

    let index = ctx.project_path(&ctx.options.paths.index);
    if index.is_file() {
        let dest = stage.join("index.html");
        write_index(&index, &dest, ctx.watching.then_some(ctx.options.live_reload_port))?;
        changed.push("index.html".to_string());
    } else {
        debug!(path = %index.display(), "No index page");
    }

    ctx.notify_reload(changed);
    Ok(StepOutcome::Completed)
}

fn write_index(src: &Path, dest: &Path, live_reload_port: Option<u16>) -> Result<()> {
    let Some(port) = live_reload_port else {
        return copy_file(src, dest);
    };
    let html = std::fs::read_to_string(src)?;
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(dest, inject_live_reload(&html, port))?;
    Ok(())
}

/// Script tag that loads the live-reload client from the page's host.
pub fn live_reload_snippet(port: u16) -> String {
    format!(
        "<script>document.write('<script src=\"http://' + (location.host || 'localhost').split(':')[0] + ':{}/livereload.js?snipver=1\"></' + 'script>')</script>",
        port
    )
}

/// Insert the live-reload snippet before the last `</body>`, or append it
/// when the page has no body tag.
pub fn inject_live_reload(html: &str, port: u16) -> String {
    let snippet = live_reload_snippet(port);
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => format!("{}{}\n{}", &html[..idx], snippet, &html[idx..]),
        None => format!("{}{}\n", html, snippet),
    }
}
