//! Variant resolution.
//!
//! Turns the `--variant` option (or a default) into the concrete list of
//! variants a command should build.

use frontforge_core::variant::DEFAULT_VARIANT;
use frontforge_core::{Error, Result, Variant, VariantSelector};
use std::path::Path;
use tracing::debug;

/// Pick the variant string: the CLI value when present, else `default`,
/// else `release-main`.
pub fn variant_option(cli: Option<&str>, default: Option<&str>) -> String {
    cli.filter(|v| !v.is_empty())
        .or(default)
        .unwrap_or(DEFAULT_VARIANT)
        .to_string()
}

/// List the bootstrapper names under `root`: immediate subdirectories,
/// hidden entries skipped, sorted by name.
///
/// A missing or unreadable root is an error, never an empty list.
pub fn discover_bootstrappers(root: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(root).map_err(|e| {
        Error::Discovery(format!(
            "cannot list bootstrappers in {}: {}",
            root.display(),
            e
        ))
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        if entry.path().is_dir() {
            names.push(name);
        }
    }
    names.sort();

    debug!(root = %root.display(), ?names, "Discovered bootstrappers");
    Ok(names)
}

/// Resolve a variant string into concrete variants. Aggregate tokens are
/// expanded against the bootstrappers found under `bootstrappers_root`.
pub fn resolve_variants(value: &str, bootstrappers_root: &Path) -> Result<Vec<Variant>> {
    let selector: VariantSelector = value.parse()?;
    if !selector.is_aggregate() {
        return selector.expand(std::iter::empty::<String>());
    }

    let names = discover_bootstrappers(bootstrappers_root)?;
    if names.is_empty() {
        return Err(Error::Discovery(format!(
            "no bootstrappers found in {}",
            bootstrappers_root.display()
        )));
    }
    selector.expand(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn bootstrappers(names: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in names {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        dir
    }

    #[test]
    fn test_variant_option_precedence() {
        assert_eq!(variant_option(Some("debug-admin"), Some("debug-main")), "debug-admin");
        assert_eq!(variant_option(None, Some("debug-main")), "debug-main");
        assert_eq!(variant_option(None, None), "release-main");
        assert_eq!(variant_option(Some(""), None), "release-main");
    }

    #[test]
    fn test_discovery_skips_hidden_and_files() {
        let dir = bootstrappers(&["main", "admin", ".git", ".cache"]);
        fs::write(dir.path().join("base.scss"), "body {}").unwrap();

        let names = discover_bootstrappers(dir.path()).unwrap();
        assert_eq!(names, vec!["admin", "main"]);
    }

    #[test]
    fn test_discovery_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = discover_bootstrappers(&dir.path().join("missing"));
        assert!(matches!(result, Err(Error::Discovery(_))));
    }

    #[test]
    fn test_resolve_all_and_all_debug() {
        let dir = bootstrappers(&["main", "admin"]);

        let release: Vec<String> = resolve_variants("all", dir.path())
            .unwrap()
            .into_iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(release, vec!["release-admin", "release-main"]);

        let debug: Vec<String> = resolve_variants("all-debug", dir.path())
            .unwrap()
            .into_iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(debug, vec!["debug-admin", "debug-main"]);
    }

    #[test]
    fn test_resolve_single_does_not_touch_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let variants = resolve_variants("debug-admin", &dir.path().join("missing")).unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].name(), "admin");
    }

    #[test]
    fn test_resolve_all_with_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_variants("all", &dir.path().join("missing"));
        assert!(matches!(result, Err(Error::Discovery(_))));
    }
}
