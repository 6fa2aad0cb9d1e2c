//! Build step sequencing for frontforge.
//!
//! Runs a build plan for one or more variants, one variant at a time, and
//! keeps a file watcher that re-runs individual steps on source changes.

pub mod context;
pub mod fsutil;
pub mod sequencer;
pub mod steps;
pub mod watch;

#[cfg(test)]
pub(crate) mod testing;

pub use context::BuildContext;
pub use sequencer::{BuildEvent, BuildResult, Sequencer, StepState, VariantResult};
pub use watch::{WatchRule, steps_for_changes, watch, watch_rules};
