//! Build variants.
//!
//! A variant pairs a build mode with a named bootstrapper directory, written
//! as `<mode>-<name>` (e.g. `release-main`, `debug-admin`).

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};

/// The variant used when neither the CLI nor the caller supplies one.
pub const DEFAULT_VARIANT: &str = "release-main";

/// Aggregate token selecting every discovered bootstrapper in release mode.
pub const ALL_RELEASE: &str = "all";

/// Aggregate token selecting every discovered bootstrapper in debug mode.
pub const ALL_DEBUG: &str = "all-debug";

/// Build mode of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[display("release")]
    Release,
    #[display("debug")]
    Debug,
}

impl BuildMode {
    pub fn is_release(self) -> bool {
        matches!(self, BuildMode::Release)
    }
}

/// A concrete build variant such as `release-main`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct Variant(String);

impl Variant {
    /// Create a variant from its string form.
    ///
    /// Aggregate tokens are not concrete variants and are rejected here; use
    /// [`VariantSelector`] for those.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::InvalidVariant("variant must not be empty".to_string()));
        }
        if value == ALL_RELEASE || value == ALL_DEBUG {
            return Err(Error::InvalidVariant(format!(
                "'{}' selects several variants and cannot be used here",
                value
            )));
        }
        let variant = Self(value);
        if variant.name().is_empty() {
            return Err(Error::InvalidVariant(format!(
                "variant '{}' has an empty name segment",
                variant.0
            )));
        }
        Ok(variant)
    }

    /// Build a variant from a mode and a bootstrapper name.
    pub fn with_mode(mode: BuildMode, name: &str) -> Result<Self> {
        Self::new(format!("{}-{}", mode, name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything after the first hyphen. A variant without a hyphen is its
    /// own name.
    pub fn name(&self) -> &str {
        match self.0.find('-') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Release iff the variant contains `release` anywhere.
    pub fn is_release(&self) -> bool {
        self.0.contains("release")
    }

    /// Debug iff the variant contains `debug` anywhere. Drives the `DEBUG`
    /// flag handed to tools, which is not simply `!is_release()`.
    pub fn is_debug(&self) -> bool {
        self.0.contains("debug")
    }

    pub fn mode(&self) -> BuildMode {
        if self.is_release() {
            BuildMode::Release
        } else {
            BuildMode::Debug
        }
    }

    /// Directory for this variant under `base`: `base/<name>`.
    pub fn target_dir(&self, base: &Path) -> PathBuf {
        base.join(self.name())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// What the user asked to build: one variant, or every discovered
/// bootstrapper in a given mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantSelector {
    Single(Variant),
    AllRelease,
    AllDebug,
}

impl VariantSelector {
    pub fn is_aggregate(&self) -> bool {
        !matches!(self, VariantSelector::Single(_))
    }

    /// Expand the selector against discovered bootstrapper names.
    ///
    /// A single variant ignores `names` and yields itself.
    pub fn expand<I, S>(&self, names: I) -> Result<Vec<Variant>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mode = match self {
            VariantSelector::Single(variant) => return Ok(vec![variant.clone()]),
            VariantSelector::AllRelease => BuildMode::Release,
            VariantSelector::AllDebug => BuildMode::Debug,
        };

        names
            .into_iter()
            .map(|name| Variant::with_mode(mode, name.as_ref()))
            .collect()
    }
}

impl FromStr for VariantSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ALL_RELEASE => Ok(VariantSelector::AllRelease),
            ALL_DEBUG => Ok(VariantSelector::AllDebug),
            other => Variant::new(other).map(VariantSelector::Single),
        }
    }
}
