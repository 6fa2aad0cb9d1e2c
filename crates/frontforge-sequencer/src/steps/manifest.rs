//! HTML5 application cache manifest for release builds.

use crate::context::BuildContext;
use crate::fsutil::{glob_set, matches_set, url_path, walk_files};
use crate::steps::rev::REV_MANIFEST;
use chrono::{DateTime, Utc};
use frontforge_config::ManifestOptions;
use frontforge_core::{Result, StepOutcome};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub async fn run(ctx: &BuildContext) -> Result<StepOutcome> {
    if !ctx.variant.is_release() {
        return Ok(StepOutcome::skipped("manifest is only written for release builds"));
    }
    let Some(options) = &ctx.options.manifest else {
        return Ok(StepOutcome::skipped("no manifest configured"));
    };

    let dist = ctx.dist_dir();
    let excluded = glob_set(&options.exclude)?;
    let mut entries = Vec::new();
    let mut hasher = Sha256::new();
    for path in walk_files(&dist)? {
        let Ok(relative) = path.strip_prefix(&dist) else {
            continue;
        };
        let entry = url_path(relative);
        if entry == options.filename
            || entry == REV_MANIFEST
            || matches_set(&excluded, Path::new(&entry))
        {
            continue;
        }
        if options.hash {
            hasher.update(std::fs::read(&path)?);
        }
        entries.push(entry);
    }

    let hash = options.hash.then(|| hex::encode(hasher.finalize()));
    let content = render(options, &entries, Utc::now(), hash.as_deref());
    std::fs::create_dir_all(&dist)?;
    let output = dist.join(&options.filename);
    std::fs::write(&output, content)?;

    info!(variant = %ctx.variant, entries = entries.len(), output = %output.display(), "Manifest written");
    Ok(StepOutcome::Completed)
}

/// Render the manifest text.
pub fn render(
    options: &ManifestOptions,
    entries: &[String],
    now: DateTime<Utc>,
    hash: Option<&str>,
) -> String {
    let mut lines = vec!["CACHE MANIFEST".to_string()];
    if options.timestamp {
        lines.push(format!("# Time: {}", now.to_rfc2822()));
    }

    lines.push(String::new());
    lines.push("CACHE:".to_string());
    lines.extend(entries.iter().cloned());

    lines.push(String::new());
    lines.push("NETWORK:".to_string());
    lines.extend(options.network.iter().cloned());

    if !options.fallback.is_empty() {
        lines.push(String::new());
        lines.push("FALLBACK:".to_string());
        lines.extend(options.fallback.iter().cloned());
    }

    if let Some(hash) = hash {
        lines.push(String::new());
        lines.push(format!("# hash: {}", hash));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
