//! Build steps and build plans.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A single step a build can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    #[display("clean")]
    Clean,
    #[display("pre-build")]
    PreBuild,
    #[display("views")]
    Views,
    #[display("styles")]
    Styles,
    #[display("images")]
    Images,
    #[display("assets")]
    Assets,
    #[display("scripts")]
    Scripts,
    #[display("rev")]
    Rev,
    #[display("manifest")]
    Manifest,
    #[display("post-build")]
    PostBuild,
    #[display("test")]
    Test,
    #[display("analysis")]
    Analysis,
}

/// One stage of a plan: a lone step, or a group of steps run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStage {
    Single(StepKind),
    Parallel(Vec<StepKind>),
}

impl PlanStage {
    pub fn steps(&self) -> &[StepKind] {
        match self {
            PlanStage::Single(kind) => std::slice::from_ref(kind),
            PlanStage::Parallel(kinds) => kinds,
        }
    }
}

/// Ordered list of stages executed for every variant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildPlan {
    pub stages: Vec<PlanStage>,
}

impl BuildPlan {
    /// The full build: clean, pre-build, the parallel compile/copy group,
    /// then revisioning, manifest and post-build.
    pub fn standard() -> Self {
        Self {
            stages: vec![
                PlanStage::Single(StepKind::Clean),
                PlanStage::Single(StepKind::PreBuild),
                PlanStage::Parallel(vec![
                    StepKind::Views,
                    StepKind::Styles,
                    StepKind::Images,
                    StepKind::Assets,
                    StepKind::Scripts,
                ]),
                PlanStage::Single(StepKind::Rev),
                PlanStage::Single(StepKind::Manifest),
                PlanStage::Single(StepKind::PostBuild),
            ],
        }
    }

    pub fn single(kind: StepKind) -> Self {
        Self {
            stages: vec![PlanStage::Single(kind)],
        }
    }

    /// Keep only the steps accepted by `keep`. Groups left with one step
    /// collapse to a single stage; empty groups are dropped.
    pub fn retain(mut self, mut keep: impl FnMut(StepKind) -> bool) -> Self {
        self.stages = self
            .stages
            .into_iter()
            .filter_map(|stage| match stage {
                PlanStage::Single(kind) => keep(kind).then_some(PlanStage::Single(kind)),
                PlanStage::Parallel(kinds) => {
                    let mut kinds: Vec<StepKind> =
                        kinds.into_iter().filter(|k| keep(*k)).collect();
                    match kinds.len() {
                        0 => None,
                        1 => kinds.pop().map(PlanStage::Single),
                        _ => Some(PlanStage::Parallel(kinds)),
                    }
                }
            })
            .collect();
        self
    }

    /// All steps in execution order.
    pub fn steps(&self) -> impl Iterator<Item = StepKind> + '_ {
        self.stages.iter().flat_map(|s| s.steps().iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// How a step finished when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        StepOutcome::Skipped {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_plan_order() {
        let plan = BuildPlan::standard();
        let steps: Vec<StepKind> = plan.steps().collect();
        assert_eq!(steps.first(), Some(&StepKind::Clean));
        assert_eq!(steps.last(), Some(&StepKind::PostBuild));

        let rev = steps.iter().position(|s| *s == StepKind::Rev).unwrap();
        let manifest = steps.iter().position(|s| *s == StepKind::Manifest).unwrap();
        let styles = steps.iter().position(|s| *s == StepKind::Styles).unwrap();
        assert!(styles < rev);
        assert!(rev < manifest);
    }

    #[test]
    fn test_retain_collapses_groups() {
        let plan = BuildPlan::standard().retain(|k| {
            !matches!(
                k,
                StepKind::Views | StepKind::Images | StepKind::Assets | StepKind::Scripts
            )
        });
        assert!(plan.stages.contains(&PlanStage::Single(StepKind::Styles)));
        assert!(
            !plan
                .stages
                .iter()
                .any(|s| matches!(s, PlanStage::Parallel(_)))
        );

        let empty = BuildPlan::standard().retain(|_| false);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_step_display_names() {
        assert_eq!(StepKind::PreBuild.to_string(), "pre-build");
        assert_eq!(StepKind::PostBuild.to_string(), "post-build");
        assert_eq!(StepKind::Scripts.to_string(), "scripts");
    }
}
