//! Stylesheet compilation.
//!
//! Compiles `<bootstrappers>/<name>/bootstrapper.scss` into
//! `<stage>/css/<bundle>.css`, then runs the prefixer over the result.
//! Release output is compressed without source maps; debug output is
//! expanded with an embedded source map.

use crate::context::BuildContext;
use crate::fsutil::url_path;
use frontforge_core::{Result, StepOutcome};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

static SOURCE_MAP_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*/\*# sourceMappingURL=[^*]*\*/\s*").unwrap());

pub async fn run(ctx: &BuildContext) -> Result<StepOutcome> {
    let entry = ctx.bootstrapper("bootstrapper.scss");
    if !entry.is_file() {
        warn!(
            path = %entry.display(),
            "Styles bootstrapper not found, skipping styles build"
        );
        return Ok(StepOutcome::skipped(format!(
            "styles bootstrapper not found at {}",
            entry.display()
        )));
    }

    let css_dir = ctx.temp_dir().join("css");
    std::fs::create_dir_all(&css_dir)?;
    let output = css_dir.join(format!("{}.css", ctx.options.bundle_filename));

    let vars = ctx
        .variables()
        .with_input(entry.to_string_lossy())
        .with_output(output.to_string_lossy())
        .with_var("browsers", ctx.options.autoprefixer.join(", "))
        .build();
    let release = ctx.variant.is_release();

    let compile_args: &[&str] = if release {
        &["--style=compressed", "--no-source-map"]
    } else {
        &["--style=expanded", "--embed-source-map"]
    };
    ctx.run_tool(
        "styles",
        &ctx.options.tools.styles,
        &vars,
        compile_args,
        ctx.variant_env(),
    )
    .await?;

    if let Some(prefixer) = &ctx.options.tools.prefixer {
        let mut env = ctx.variant_env();
        env.insert(
            "BROWSERSLIST".to_string(),
            ctx.options.autoprefixer.join(", "),
        );
        let map_args: &[&str] = if release { &["--no-map"] } else { &["--map"] };
        ctx.run_tool("prefixer", prefixer, &vars, map_args, env)
            .await?;
    }

    if release {
        let css = std::fs::read_to_string(&output)?;
        let stripped = strip_source_map_comments(&css);
        if stripped.len() != css.len() {
            std::fs::write(&output, stripped)?;
        }
    }

    info!(variant = %ctx.variant, output = %output.display(), "Styles compiled");

    if let Ok(relative) = output.strip_prefix(ctx.temp_dir()) {
        ctx.notify_reload(vec![url_path(relative)]);
    }

    Ok(StepOutcome::Completed)
}

/// Drop `/*# sourceMappingURL=... */` comments.
pub fn strip_source_map_comments(css: &str) -> String {
    SOURCE_MAP_COMMENT.replace_all(css, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingReload, RecordingRunner, context, context_with, project};
    use frontforge_config::{BuildOptions, ToolCommand};
    use std::sync::Arc;

    const BOOTSTRAPPER: (&str, &str) = (
        "bootstrappers/main/bootstrapper.scss",
        "@import 'base'; body { color: red; }",
    );

    #[tokio::test]
    async fn test_release_styles_are_minified_without_source_map() {
        let dir = project(&[BOOTSTRAPPER]);
        let runner = Arc::new(RecordingRunner::emulating());
        let (ctx, _logs) = context(dir.path(), "release-main", runner.clone(), false);

        assert_eq!(run(&ctx).await.unwrap(), StepOutcome::Completed);

        let styles = runner.call("styles").unwrap();
        assert!(styles.args.iter().any(|a| a == "--style=compressed"));
        assert!(styles.args.iter().any(|a| a == "--no-source-map"));
        assert!(!styles.args.iter().any(|a| a == "--embed-source-map"));

        let prefixer = runner.call("prefixer").unwrap();
        assert!(prefixer.args.iter().any(|a| a == "--no-map"));
        assert_eq!(
            prefixer.env.get("BROWSERSLIST").map(String::as_str),
            Some("last 2 versions, > 1%")
        );

        let css = std::fs::read_to_string(dir.path().join("tmp/main/css/main.css")).unwrap();
        assert_eq!(css, "body{color:red}");
        assert!(!css.contains("sourceMappingURL"));
    }

    #[tokio::test]
    async fn test_debug_styles_keep_source_map_and_are_expanded() {
        let dir = project(&[BOOTSTRAPPER]);
        let runner = Arc::new(RecordingRunner::emulating());
        let (ctx, _logs) = context(dir.path(), "debug-main", runner.clone(), false);

        run(&ctx).await.unwrap();

        let styles = runner.call("styles").unwrap();
        assert!(styles.args.iter().any(|a| a == "--style=expanded"));
        assert!(styles.args.iter().any(|a| a == "--embed-source-map"));

        let css = std::fs::read_to_string(dir.path().join("dist/main/css/main.css")).unwrap();
        assert!(css.contains("sourceMappingURL"));
        assert!(css.contains("\n  color: red;"));
    }

    #[tokio::test]
    async fn test_missing_bootstrapper_is_skipped() {
        let dir = project(&[]);
        let runner = Arc::new(RecordingRunner::emulating());
        let (ctx, _logs) = context(dir.path(), "release-admin", runner.clone(), false);

        let outcome = run(&ctx).await.unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped { .. }));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_compiler_failure_fails_step() {
        let dir = project(&[BOOTSTRAPPER]);
        let runner = Arc::new(RecordingRunner::failing("styles"));
        let (ctx, _logs) = context(dir.path(), "release-main", runner, false);

        assert!(run(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn test_watching_notifies_live_reload() {
        let dir = project(&[BOOTSTRAPPER]);
        let runner = Arc::new(RecordingRunner::emulating());
        let reload = Arc::new(RecordingReload::default());
        let (mut ctx, _logs) = context(dir.path(), "debug-main", runner, true);
        ctx.reload = Some(reload.clone());

        run(&ctx).await.unwrap();
        assert_eq!(*reload.paths.lock().unwrap(), vec!["css/main.css".to_string()]);
    }

    #[tokio::test]
    async fn test_prefixer_template_sees_browser_list() {
        let dir = project(&[BOOTSTRAPPER]);
        let runner = Arc::new(RecordingRunner::emulating());
        let mut options = BuildOptions::default();
        options.tools.prefixer = Some(ToolCommand::new(
            "postcss",
            ["${output}", "--browsers", "${browsers}"],
        ));
        let (ctx, _logs) = context_with(dir.path(), "release-main", runner.clone(), false, options);

        run(&ctx).await.unwrap();

        let prefixer = runner.call("prefixer").unwrap();
        assert_eq!(prefixer.args[1..3], ["--browsers", "last 2 versions, > 1%"]);
    }

    #[test]
    fn test_strip_source_map_comments() {
        let css = "a{b:c}\n/*# sourceMappingURL=main.css.map */\n";
        assert_eq!(strip_source_map_comments(css), "a{b:c}");
    }
}
