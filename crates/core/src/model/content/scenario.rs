use serde::{Deserialize, Serialize};

use crate::model::ids::{ScenarioId, StepId};

//
// ─── GRADE BUCKET ──────────────────────────────────────────────────────────────
//

/// Outcome band of a finished scenario, assigned from `total / max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradeBucket {
    NeedsWork,
    Satisfactory,
    Good,
    Excellent,
}

impl GradeBucket {
    /// Bucket for a finished run.
    ///
    /// The ratio is effectively clamped to `[0, 1]`: negative totals land in
    /// `NeedsWork`, totals above the maximum in `Excellent`. A non-positive
    /// maximum cannot be graded and yields `NeedsWork`.
    #[must_use]
    pub fn from_points(total: i64, max: i64) -> Self {
        if max <= 0 {
            return GradeBucket::NeedsWork;
        }
        // Integer comparison of total/max against the percentage thresholds
        // keeps 18/20 exactly on the 0.90 boundary.
        let scaled = i128::from(total) * 100;
        let max = i128::from(max);
        if scaled >= max * 90 {
            GradeBucket::Excellent
        } else if scaled >= max * 75 {
            GradeBucket::Good
        } else if scaled >= max * 60 {
            GradeBucket::Satisfactory
        } else {
            GradeBucket::NeedsWork
        }
    }

    /// Wire name, matching the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GradeBucket::Excellent => "excellent",
            GradeBucket::Good => "good",
            GradeBucket::Satisfactory => "satisfactory",
            GradeBucket::NeedsWork => "needsWork",
        }
    }

    /// Learner-facing summary line for the bucket.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            GradeBucket::Excellent => {
                "Outstanding! You demonstrated excellent scenario judgment."
            }
            GradeBucket::Good => {
                "Great choices. You effectively balanced risk and requirements."
            }
            GradeBucket::Satisfactory => {
                "You made solid progress. Review the scenario carefully to improve further."
            }
            GradeBucket::NeedsWork => "Review the key concepts and try this scenario again.",
        }
    }
}

//
// ─── DEFINITIONS ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    #[serde(default)]
    pub text: String,
    pub points: i64,
    /// Authored content uses either `nextStepId` or the shorter `nextStep`.
    #[serde(default, alias = "nextStep", skip_serializing_if = "Option::is_none")]
    pub next_step_id: Option<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GradeBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl Choice {
    /// A choice ends the scenario when it carries a result or points nowhere.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.result.is_some() || self.next_step_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    #[serde(default)]
    pub narrative: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Step {
    /// Highest-scoring choice of this step, if any.
    #[must_use]
    pub fn best_points(&self) -> Option<i64> {
        self.choices.iter().map(|c| c.points).max()
    }
}

/// A branching scenario with its resolved maximum score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDefinition {
    pub id: ScenarioId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub context: String,
    pub max_points: i64,
    pub steps: Vec<Step>,
}

impl ScenarioDefinition {
    /// Entry point of every run.
    #[must_use]
    pub fn initial_step(&self) -> Option<&Step> {
        self.steps.first()
    }

    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// Sum of the best choice per step; the fallback maximum for scenarios
    /// that do not declare one.
    #[must_use]
    pub fn best_possible_points(steps: &[Step]) -> i64 {
        steps
            .iter()
            .filter_map(Step::best_points)
            .fold(0_i64, i64::saturating_add)
    }
}
