//! File matching and copying helpers shared by the steps.

use frontforge_core::{Error, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// A file matched by a glob, with its path relative to the glob's literal
/// base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    pub path: PathBuf,
    pub relative: PathBuf,
}

fn has_glob_meta(s: &str) -> bool {
    s.contains(['*', '?', '[', '{'])
}

/// Split a pattern into its literal leading directories.
/// `views/**/*.html` has base `views`; `index.html` has base ``.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();
    for (idx, part) in components.iter().enumerate() {
        if has_glob_meta(part) || idx + 1 == components.len() {
            break;
        }
        base.push(part);
    }
    base
}

fn compile(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| Error::Config(format!("invalid glob '{}': {}", pattern, e)))
}

/// Build a set of globs matched against both full relative paths and bare
/// file names.
pub fn glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::Config(format!("invalid glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| Error::Config(format!("invalid glob set: {}", e)))
}

/// Whether `relative` (or its file name) matches any glob in `set`.
pub fn matches_set(set: &GlobSet, relative: &Path) -> bool {
    set.is_match(url_path(relative))
        || relative
            .file_name()
            .map(|name| set.is_match(Path::new(name)))
            .unwrap_or(false)
}

/// Find the files under `root` matching `pattern` (relative to `root`,
/// forward slashes). A missing base directory yields no matches.
pub fn match_glob(root: &Path, pattern: &str) -> Result<Vec<MatchedFile>> {
    if !has_glob_meta(pattern) {
        let path = root.join(pattern);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let relative = path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_default();
        return Ok(vec![MatchedFile { path, relative }]);
    }

    let matcher = compile(pattern)?;
    let base = glob_base(pattern);
    let base_dir = root.join(&base);
    if !base_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut matched = Vec::new();
    for path in walk_files(&base_dir)? {
        let Ok(from_root) = path.strip_prefix(root) else {
            continue;
        };
        if !matcher.is_match(url_path(from_root)) {
            continue;
        }
        let relative = path
            .strip_prefix(&base_dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| from_root.to_path_buf());
        matched.push(MatchedFile { path, relative });
    }
    Ok(matched)
}

/// All regular files below `dir`, sorted. A missing directory is empty.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Copy `src` to `dest`, creating parent directories.
pub fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(src, dest)?;
    Ok(())
}

/// Copy every file matching `pattern` into `dest_dir`, preserving paths
/// relative to the glob base. Returns the written files.
pub fn copy_glob(root: &Path, pattern: &str, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for file in match_glob(root, pattern)? {
        let dest = dest_dir.join(&file.relative);
        copy_file(&file.path, &dest)?;
        written.push(dest);
    }
    Ok(written)
}

/// True when `dest` is missing or older than `src`.
pub fn is_newer(src: &Path, dest: &Path) -> bool {
    let modified = |p: &Path| p.metadata().and_then(|m| m.modified()).ok();
    match (modified(src), modified(dest)) {
        (_, None) => true,
        (Some(s), Some(d)) => s > d,
        (None, Some(_)) => true,
    }
}

/// Remove a directory tree, treating a missing directory as done.
pub fn remove_dir(dir: &Path) -> Result<bool> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Forward-slash form of a relative path, as used in URLs and manifests.
pub fn url_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
