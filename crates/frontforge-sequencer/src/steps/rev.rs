//! Content-hash revisioning of release output.
//!
//! Moves the staged tree into the distribution folder, renaming every file
//! that is not excluded to `<stem>.<hash>.<ext>` and rewriting references
//! to it in html, css and js files.

use crate::context::BuildContext;
use crate::fsutil::{glob_set, matches_set, url_path, walk_files};
use frontforge_core::{Error, Result, StepOutcome};
use globset::GlobSet;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

pub const REV_MANIFEST: &str = "rev-manifest.json";

const HASH_LEN: usize = 8;
const REWRITTEN_EXTENSIONS: &[&str] = &["html", "css", "js"];

pub async fn run(ctx: &BuildContext) -> Result<StepOutcome> {
    if !ctx.variant.is_release() {
        return Ok(StepOutcome::skipped("debug builds are not revisioned"));
    }
    if !ctx.stages_for_rev() {
        return Ok(StepOutcome::skipped("revisioning is disabled"));
    }

    let stage = ctx.temp_dir();
    let dist = ctx.dist_dir();
    let excluded = glob_set(&ctx.options.revision_exclude)?;

    let mut staged = Vec::new();
    for path in walk_files(&stage)? {
        let rewrite = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| REWRITTEN_EXTENSIONS.contains(&ext));
        staged.push(StagedFile {
            relative: relative_to(&path, &stage)?,
            content: std::fs::read(&path)?,
            rewrite,
        });
    }

    let renames = settle_renames(&staged, &excluded)?;
    let rewriter = ReferenceRewriter::new(&renames)?;
    for file in &staged {
        let target = renames.get(&file.relative).unwrap_or(&file.relative);
        let dest = dist.join(target);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&dest, file.output(rewriter.as_ref()))?;
    }

    let manifest = serde_json::to_string_pretty(&renames)
        .map_err(|e| Error::Internal(format!("failed to encode rev manifest: {}", e)))?;
    std::fs::create_dir_all(&dist)?;
    std::fs::write(dist.join(REV_MANIFEST), manifest)?;

    info!(
        variant = %ctx.variant,
        files = staged.len(),
        revisioned = renames.len(),
        "Revisioned"
    );
    Ok(StepOutcome::Completed)
}

struct StagedFile {
    relative: String,
    content: Vec<u8>,
    rewrite: bool,
}

impl StagedFile {
    /// Content as written to the distribution folder.
    fn output(&self, rewriter: Option<&ReferenceRewriter<'_>>) -> Cow<'_, [u8]> {
        let Some(rewriter) = rewriter.filter(|_| self.rewrite) else {
            return Cow::Borrowed(&self.content);
        };
        match std::str::from_utf8(&self.content) {
            Ok(text) => Cow::Owned(rewriter.rewrite(text).into_bytes()),
            Err(_) => Cow::Borrowed(&self.content),
        }
    }
}

/// Name every revisioned file after the hash of its rewritten content.
/// Renaming a file changes the files that reference it, so hashing repeats
/// until the names settle. Reference cycles stop after one round per file.
fn settle_renames(staged: &[StagedFile], excluded: &GlobSet) -> Result<BTreeMap<String, String>> {
    let revisioned: Vec<&StagedFile> = staged
        .iter()
        .filter(|f| f.relative != "index.html" && !matches_set(excluded, Path::new(&f.relative)))
        .collect();

    let mut renames: BTreeMap<String, String> = revisioned
        .iter()
        .map(|f| (f.relative.clone(), revisioned_name(&f.relative, &f.content)))
        .collect();
    for _ in 0..=revisioned.len() {
        let next: BTreeMap<String, String> = {
            let rewriter = ReferenceRewriter::new(&renames)?;
            revisioned
                .iter()
                .map(|f| {
                    let content = f.output(rewriter.as_ref());
                    (f.relative.clone(), revisioned_name(&f.relative, &content))
                })
                .collect()
        };
        if next == renames {
            return Ok(renames);
        }
        renames = next;
    }
    debug!("Revisioned names did not settle, references form a cycle");
    Ok(renames)
}

fn relative_to(path: &Path, base: &Path) -> Result<String> {
    path.strip_prefix(base)
        .map(url_path)
        .map_err(|_| Error::Internal(format!("{} is outside {}", path.display(), base.display())))
}

/// `css/main.css` with content `c` becomes `css/main.<sha256(c)[..8]>.css`.
pub fn revisioned_name(relative: &str, content: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(content));
    let hash = &digest[..HASH_LEN];

    let (dir, file) = match relative.rfind('/') {
        Some(idx) => (&relative[..=idx], &relative[idx + 1..]),
        None => ("", relative),
    };
    match file.find('.') {
        Some(idx) if idx > 0 => format!("{}{}.{}{}", dir, &file[..idx], hash, &file[idx..]),
        _ => format!("{}{}.{}", dir, file, hash),
    }
}

/// Replaces original paths with revisioned ones in a single pass, longest
/// path first. A path only matches at the start of a reference, optionally
/// behind `/`, `./` or `../`, so `js/main.js` leaves `vendor/js/main.js`
/// alone.
struct ReferenceRewriter<'a> {
    pattern: Regex,
    renames: &'a BTreeMap<String, String>,
}

impl<'a> ReferenceRewriter<'a> {
    fn new(renames: &'a BTreeMap<String, String>) -> Result<Option<Self>> {
        if renames.is_empty() {
            return Ok(None);
        }
        let mut originals: Vec<&String> = renames.keys().collect();
        originals.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = originals
            .iter()
            .map(|o| regex::escape(o))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"((?:^|[^A-Za-z0-9_./-])(?:\.{{0,2}}/)?)({})", alternation);
        let pattern = Regex::new(&pattern)
            .map_err(|e| Error::Internal(format!("failed to build rewrite pattern: {}", e)))?;
        Ok(Some(Self { pattern, renames }))
    }

    fn rewrite(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &regex::Captures| {
                let original = &caps[2];
                let renamed = self.renames.get(original).map_or(original, String::as_str);
                format!("{}{}", &caps[1], renamed)
            })
            .into_owned()
    }
}
