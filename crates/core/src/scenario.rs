//! Scenario step engine.
//!
//! A run is a walk over the steps of one [`ScenarioDefinition`]:
//! `InProgress(step)` until a terminal choice yields `Complete(outcome)`.
//! The engine keeps no memory between calls; the running total travels with
//! each request.

use serde::Serialize;
use thiserror::Error;

use crate::model::{GradeBucket, ScenarioDefinition, ScenarioId, StepId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScenarioError {
    #[error("scenario {0} has no steps")]
    NoSteps(ScenarioId),

    #[error("scenario {scenario} has no step {step}")]
    UnknownStep { scenario: ScenarioId, step: StepId },

    #[error("choice {index} is out of range for step {step} ({available} choices)")]
    ChoiceOutOfRange {
        step: StepId,
        index: i64,
        available: usize,
    },

    /// Content error surfaced at request time: a choice points nowhere.
    #[error("step {step} in scenario {scenario} points to missing step {next}")]
    DanglingStep {
        scenario: ScenarioId,
        step: StepId,
        next: StepId,
    },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub total_points: i64,
    pub max_points: i64,
    pub grade: GradeBucket,
    pub message: String,
}

impl ScenarioOutcome {
    #[must_use]
    pub fn grade(total_points: i64, max_points: i64) -> Self {
        let grade = GradeBucket::from_points(total_points, max_points);
        let message = if max_points <= 0 {
            "Unable to determine grading thresholds for this scenario.".to_owned()
        } else {
            grade.message().to_owned()
        };
        Self {
            total_points,
            max_points,
            grade,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioState {
    InProgress(StepId),
    Complete(ScenarioOutcome),
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Continue {
        next_step_id: StepId,
        points: i64,
        feedback: String,
    },
    Complete {
        points: i64,
        feedback: String,
        result: ScenarioOutcome,
    },
}

impl StepOutcome {
    /// Points gained by this choice alone.
    #[must_use]
    pub fn points(&self) -> i64 {
        match self {
            StepOutcome::Continue { points, .. } | StepOutcome::Complete { points, .. } => *points,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, StepOutcome::Complete { .. })
    }

    /// State the run is in after this transition.
    #[must_use]
    pub fn state(&self) -> ScenarioState {
        match self {
            StepOutcome::Continue { next_step_id, .. } => {
                ScenarioState::InProgress(next_step_id.clone())
            }
            StepOutcome::Complete { result, .. } => ScenarioState::Complete(result.clone()),
        }
    }
}

/// Where every run starts, including re-runs of a completed scenario.
///
/// # Errors
///
/// Returns `ScenarioError::NoSteps` for an empty scenario.
pub fn initial_state(scenario: &ScenarioDefinition) -> Result<ScenarioState, ScenarioError> {
    scenario
        .initial_step()
        .map(|step| ScenarioState::InProgress(step.id.clone()))
        .ok_or_else(|| ScenarioError::NoSteps(scenario.id.clone()))
}

/// Apply one choice.
///
/// `accumulated_points` is the running total before this step. Penalties are
/// allowed; the engine imposes no floor.
///
/// # Errors
///
/// Returns `UnknownStep` / `ChoiceOutOfRange` for invalid requests and
/// `DanglingStep` when the chosen branch leads to a step that does not exist.
pub fn submit_choice(
    scenario: &ScenarioDefinition,
    step_id: &StepId,
    choice_index: i64,
    accumulated_points: i64,
) -> Result<StepOutcome, ScenarioError> {
    let step = scenario
        .step(step_id)
        .ok_or_else(|| ScenarioError::UnknownStep {
            scenario: scenario.id.clone(),
            step: step_id.clone(),
        })?;

    let choice = usize::try_from(choice_index)
        .ok()
        .and_then(|i| step.choices.get(i))
        .ok_or_else(|| ScenarioError::ChoiceOutOfRange {
            step: step_id.clone(),
            index: choice_index,
            available: step.choices.len(),
        })?;

    let points = choice.points;
    let feedback = choice.feedback.clone().unwrap_or_default();

    if !choice.is_terminal() {
        if let Some(next) = &choice.next_step_id {
            if scenario.step(next).is_none() {
                return Err(ScenarioError::DanglingStep {
                    scenario: scenario.id.clone(),
                    step: step_id.clone(),
                    next: next.clone(),
                });
            }
            return Ok(StepOutcome::Continue {
                next_step_id: next.clone(),
                points,
                feedback,
            });
        }
    }

    let total = accumulated_points.saturating_add(points);
    Ok(StepOutcome::Complete {
        points,
        feedback,
        result: ScenarioOutcome::grade(total, scenario.max_points),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Choice, Step};

    fn choice(points: i64, next: Option<&str>) -> Choice {
        Choice {
            text: format!("{points} points"),
            points,
            next_step_id: next.map(StepId::new),
            result: None,
            feedback: Some(format!("you got {points}")),
        }
    }

    fn incident_response() -> ScenarioDefinition {
        ScenarioDefinition {
            id: ScenarioId::new("incident"),
            title: "Incident response".into(),
            context: "A model starts drifting".into(),
            max_points: 20,
            steps: vec![
                Step {
                    id: StepId::new("detect"),
                    narrative: "Alerts fire".into(),
                    choices: vec![choice(10, Some("contain")), choice(2, Some("contain"))],
                },
                Step {
                    id: StepId::new("contain"),
                    narrative: "Now what".into(),
                    choices: vec![choice(8, None), choice(4, None), choice(-15, None)],
                },
            ],
        }
    }

    #[test]
    fn starts_at_first_step() {
        assert_eq!(
            initial_state(&incident_response()).unwrap(),
            ScenarioState::InProgress(StepId::new("detect"))
        );
    }

    #[test]
    fn non_terminal_choice_echoes_points_and_next_step() {
        let outcome = submit_choice(&incident_response(), &StepId::new("detect"), 0, 0).unwrap();
        assert_eq!(
            outcome,
            StepOutcome::Continue {
                next_step_id: StepId::new("contain"),
                points: 10,
                feedback: "you got 10".into(),
            }
        );
        assert_eq!(outcome.state(), ScenarioState::InProgress(StepId::new("contain")));
    }

    #[test]
    fn walk_to_excellent() {
        let scenario = incident_response();
        let first = submit_choice(&scenario, &StepId::new("detect"), 0, 0).unwrap();
        let last =
            submit_choice(&scenario, &StepId::new("contain"), 0, first.points()).unwrap();

        let StepOutcome::Complete { result, points, .. } = last else {
            panic!("expected completion");
        };
        assert_eq!(points, 8);
        assert_eq!(result.total_points, 18);
        assert_eq!(result.max_points, 20);
        assert_eq!(result.grade, GradeBucket::Excellent);
    }

    #[test]
    fn fourteen_of_twenty_is_satisfactory() {
        let outcome = submit_choice(&incident_response(), &StepId::new("contain"), 1, 10).unwrap();
        let ScenarioState::Complete(result) = outcome.state() else {
            panic!("expected completion");
        };
        assert_eq!(result.total_points, 14);
        assert_eq!(result.grade, GradeBucket::Satisfactory);
    }

    #[test]
    fn penalties_can_push_total_negative() {
        let outcome = submit_choice(&incident_response(), &StepId::new("contain"), 2, 2).unwrap();
        let ScenarioState::Complete(result) = outcome.state() else {
            panic!("expected completion");
        };
        assert_eq!(result.total_points, -13);
        assert_eq!(result.grade, GradeBucket::NeedsWork);
    }

    #[test]
    fn explicit_result_ends_the_run_even_with_next_step() {
        let mut scenario = incident_response();
        scenario.steps[0].choices[1].result = Some(GradeBucket::NeedsWork);
        let outcome = submit_choice(&scenario, &StepId::new("detect"), 1, 0).unwrap();
        assert!(outcome.is_complete());
    }

    #[test]
    fn invalid_requests_are_rejected() {
        let scenario = incident_response();
        assert!(matches!(
            submit_choice(&scenario, &StepId::new("nope"), 0, 0),
            Err(ScenarioError::UnknownStep { .. })
        ));
        assert!(matches!(
            submit_choice(&scenario, &StepId::new("detect"), 2, 0),
            Err(ScenarioError::ChoiceOutOfRange { available: 2, .. })
        ));
        assert!(matches!(
            submit_choice(&scenario, &StepId::new("detect"), -1, 0),
            Err(ScenarioError::ChoiceOutOfRange { index: -1, .. })
        ));
    }

    #[test]
    fn dangling_branch_is_reported() {
        let mut scenario = incident_response();
        scenario.steps[0].choices[0].next_step_id = Some(StepId::new("ghost"));
        assert!(matches!(
            submit_choice(&scenario, &StepId::new("detect"), 0, 0),
            Err(ScenarioError::DanglingStep { .. })
        ));
    }

    #[test]
    fn zero_max_points_cannot_be_graded() {
        let outcome = ScenarioOutcome::grade(5, 0);
        assert_eq!(outcome.grade, GradeBucket::NeedsWork);
        assert!(outcome.message.starts_with("Unable"));
    }
}
