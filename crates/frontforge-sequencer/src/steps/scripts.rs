//! Script bundling.
//!
//! Bundles `<bootstrappers>/<name>/bootstrapper.js` into
//! `<stage>/js/<bundle>.js`. Release bundles are minified and get a
//! project header; debug bundles have their inline source map moved to
//! `<bundle>.map.js`.

use crate::context::BuildContext;
use crate::fsutil::url_path;
use base64::Engine as _;
use base64::engine::general_purpose;
use frontforge_core::{Error, Result, StepOutcome};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{error, info};

static INLINE_SOURCE_MAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^//[#@] sourceMappingURL=data:application/json(?:;charset=[^;,]+)?;base64,([A-Za-z0-9+/=]+)\s*$",
    )
    .unwrap()
});

pub async fn run(ctx: &BuildContext) -> Result<StepOutcome> {
    match bundle(ctx).await {
        Ok(outcome) => Ok(outcome),
        // A broken edit must not end a watch session.
        Err(e) if ctx.watching => {
            error!(variant = %ctx.variant, error = %e, "Bundling failed");
            Ok(StepOutcome::skipped(format!("bundling failed: {}", e)))
        }
        Err(e) => Err(e),
    }
}

async fn bundle(ctx: &BuildContext) -> Result<StepOutcome> {
    let entry = ctx.bootstrapper("bootstrapper.js");
    if !entry.is_file() {
        return Err(Error::StepFailed {
            step: "scripts".to_string(),
            message: format!("script bootstrapper not found at {}", entry.display()),
        });
    }

    let bundle = &ctx.options.bundle_filename;
    let js_dir = ctx.temp_dir().join("js");
    std::fs::create_dir_all(&js_dir)?;
    let output = js_dir.join(format!("{}.js", bundle));
    let release = ctx.variant.is_release();

    let vars = ctx
        .variables()
        .with_input(entry.to_string_lossy())
        .with_output(output.to_string_lossy())
        .build();
    let debug_args: &[&str] = if release { &[] } else { &["--debug"] };
    ctx.run_tool(
        "scripts",
        &ctx.options.tools.bundler,
        &vars,
        debug_args,
        ctx.variant_env(),
    )
    .await?;

    if release {
        let minify_vars = ctx
            .variables()
            .with_input(output.to_string_lossy())
            .with_output(output.to_string_lossy())
            .build();
        ctx.run_tool(
            "minifier",
            &ctx.options.tools.minifier,
            &minify_vars,
            &[],
            ctx.variant_env(),
        )
        .await?;

        let code = std::fs::read_to_string(&output)?;
        let project = &ctx.options.project;
        std::fs::write(&output, with_header(&project.name, &project.version, &code))?;
    } else {
        let map_file = js_dir.join(format!("{}.map.js", bundle));
        extract_source_map(&output, &map_file)?;
    }

    info!(variant = %ctx.variant, output = %output.display(), "Scripts bundled");

    if let Ok(relative) = output.strip_prefix(ctx.temp_dir()) {
        ctx.notify_reload(vec![url_path(relative)]);
    }

    Ok(StepOutcome::Completed)
}

/// Prepend the `/* name : version */` banner.
pub fn with_header(name: &str, version: &str, code: &str) -> String {
    format!("/*\n\n{} : {}\n\n*/\n\n{}", name, version, code)
}

/// Move an inline base64 source map out of `bundle` into `map_file`, and
/// point the bundle's `sourceMappingURL` at it. Returns false when the
/// bundle carries no inline map.
pub fn extract_source_map(bundle: &Path, map_file: &Path) -> Result<bool> {
    let code = std::fs::read_to_string(bundle)?;
    let Some(caps) = INLINE_SOURCE_MAP.captures(&code) else {
        return Ok(false);
    };
    let Some(whole) = caps.get(0) else {
        return Ok(false);
    };

    let map = general_purpose::STANDARD
        .decode(&caps[1])
        .map_err(|e| Error::StepFailed {
            step: "scripts".to_string(),
            message: format!("invalid inline source map: {}", e),
        })?;
    std::fs::write(map_file, map)?;

    let map_name = map_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let rewritten = format!(
        "{}//# sourceMappingURL={}\n{}",
        &code[..whole.start()],
        map_name,
        &code[whole.end()..].trim_start_matches(['\r', '\n'])
    );
    std::fs::write(bundle, rewritten)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingRunner, context, context_with, project};
    use frontforge_config::BuildOptions;
    use std::sync::Arc;

    const BOOTSTRAPPER: (&str, &str) = (
        "bootstrappers/main/bootstrapper.js",
        "require('./app');",
    );

    #[tokio::test]
    async fn test_release_bundle_is_minified_with_header() {
        let dir = project(&[BOOTSTRAPPER]);
        let runner = Arc::new(RecordingRunner::emulating());
        let mut options = BuildOptions::default();
        options.project.name = "shop".to_string();
        options.project.version = "1.2.0".to_string();
        let (ctx, _logs) = context_with(dir.path(), "release-main", runner.clone(), false, options);

        assert_eq!(run(&ctx).await.unwrap(), StepOutcome::Completed);

        let bundler = runner.call("scripts").unwrap();
        assert!(!bundler.args.iter().any(|a| a == "--debug"));
        assert_eq!(bundler.env.get("DEBUG").map(String::as_str), Some("false"));
        assert_eq!(bundler.env.get("TARGET").map(String::as_str), Some("main"));
        assert!(runner.call("minifier").is_some());

        let js = std::fs::read_to_string(dir.path().join("tmp/main/js/main.js")).unwrap();
        assert_eq!(js, "/*\n\nshop : 1.2.0\n\n*/\n\nconsole.log(\"app\");");
        assert!(!dir.path().join("tmp/main/js/main.map.js").exists());
    }

    #[tokio::test]
    async fn test_debug_bundle_extracts_source_map() {
        let dir = project(&[BOOTSTRAPPER]);
        let runner = Arc::new(RecordingRunner::emulating());
        let (ctx, _logs) = context(dir.path(), "debug-main", runner.clone(), false);

        run(&ctx).await.unwrap();

        let bundler = runner.call("scripts").unwrap();
        assert!(bundler.args.iter().any(|a| a == "--debug"));
        assert_eq!(bundler.env.get("DEBUG").map(String::as_str), Some("true"));
        assert!(runner.call("minifier").is_none());

        let js = std::fs::read_to_string(dir.path().join("dist/main/js/main.js")).unwrap();
        assert!(js.starts_with("console.log( 'app' );"));
        assert!(js.contains("//# sourceMappingURL=main.map.js"));
        assert!(!js.contains("base64"));

        let map = std::fs::read_to_string(dir.path().join("dist/main/js/main.map.js")).unwrap();
        assert!(map.contains("\"version\":3"));
    }

    #[tokio::test]
    async fn test_missing_entry_fails_outside_watch() {
        let dir = project(&[]);
        let runner = Arc::new(RecordingRunner::emulating());
        let (ctx, _logs) = context(dir.path(), "release-main", runner, false);

        assert!(matches!(run(&ctx).await, Err(Error::StepFailed { .. })));
    }

    #[tokio::test]
    async fn test_bundler_error_is_survivable_while_watching() {
        let dir = project(&[BOOTSTRAPPER]);
        let runner = Arc::new(RecordingRunner::failing("scripts"));
        let (ctx, _logs) = context(dir.path(), "debug-main", runner.clone(), true);

        let outcome = run(&ctx).await.unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped { .. }));

        let (ctx, _logs) = context(dir.path(), "debug-main", runner, false);
        assert!(matches!(run(&ctx).await, Err(Error::ToolFailed { .. })));
    }

    #[test]
    fn test_extract_without_inline_map_is_noop() {
        let dir = project(&[("main.js", "var a = 1;\n")]);
        let bundle = dir.path().join("main.js");
        let map = dir.path().join("main.map.js");

        assert!(!extract_source_map(&bundle, &map).unwrap());
        assert!(!map.exists());
        assert_eq!(std::fs::read_to_string(&bundle).unwrap(), "var a = 1;\n");
    }
}
