use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use course_core::model::{
    ScenarioDefinition, ScenarioId, ScenarioProgress, ScenarioSessionId, StepId,
};
use course_core::scenario::{self, ScenarioError, ScenarioOutcome, StepOutcome};
use serde::{Deserialize, Serialize};
use storage::repository::{ProgressStore, update_with};
use storage::CourseContent;
use tracing::{debug, info, instrument, warn};

use crate::Clock;
use crate::error::ScenarioServiceError;

/// One choice in the stateless protocol; the caller carries the running total.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceRequest {
    pub step_id: StepId,
    pub choice_index: i64,
    #[serde(default)]
    pub accumulated_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceResponse {
    pub points: i64,
    pub feedback: String,
    pub next_step_id: Option<StepId>,
    pub is_complete: bool,
    pub final_result: Option<ScenarioOutcome>,
}

impl From<StepOutcome> for ChoiceResponse {
    fn from(outcome: StepOutcome) -> Self {
        match outcome {
            StepOutcome::Continue {
                next_step_id,
                points,
                feedback,
            } => Self {
                points,
                feedback,
                next_step_id: Some(next_step_id),
                is_complete: false,
                final_result: None,
            },
            StepOutcome::Complete {
                points,
                feedback,
                result,
            } => Self {
                points,
                feedback,
                next_step_id: None,
                is_complete: true,
                final_result: Some(result),
            },
        }
    }
}

/// Where a fresh run begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioStart {
    pub scenario_id: ScenarioId,
    pub step_id: StepId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub session_id: ScenarioSessionId,
    pub scenario_id: ScenarioId,
    pub step_id: StepId,
    pub total_points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionChoiceResponse {
    #[serde(flatten)]
    pub choice: ChoiceResponse,
    pub total_points: i64,
}

/// Server-held run: the running total never leaves the process.
#[derive(Debug, Clone)]
struct ScenarioSession {
    scenario_id: ScenarioId,
    step_id: StepId,
    total_points: i64,
}

/// Open server-held runs.
///
/// At most one run per scenario is open; opening another replaces it, so the
/// registry never holds more entries than the course has scenarios.
#[derive(Debug, Default)]
pub struct ScenarioSessions {
    open: Mutex<HashMap<ScenarioSessionId, ScenarioSession>>,
}

impl ScenarioSessions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ScenarioSessionId, ScenarioSession>> {
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of runs currently open.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Close every open run. Returns how many were closed.
    pub fn clear(&self) -> usize {
        let mut open = self.lock();
        let closed = open.len();
        open.clear();
        closed
    }

    fn open(&self, session_id: ScenarioSessionId, session: ScenarioSession) {
        let mut open = self.lock();
        open.retain(|_, existing| existing.scenario_id != session.scenario_id);
        open.insert(session_id, session);
    }

    fn take(&self, session_id: ScenarioSessionId) -> Option<ScenarioSession> {
        self.lock().remove(&session_id)
    }

    /// Put a run back unless a newer run of the same scenario was opened in
    /// the meantime.
    fn put_back(&self, session_id: ScenarioSessionId, session: ScenarioSession) {
        let mut open = self.lock();
        if open
            .values()
            .all(|existing| existing.scenario_id != session.scenario_id)
        {
            open.insert(session_id, session);
        }
    }
}

/// Drives scenario runs and records finished ones.
pub struct ScenarioService {
    clock: Clock,
    content: Arc<CourseContent>,
    progress: Arc<dyn ProgressStore>,
    sessions: Arc<ScenarioSessions>,
}

impl ScenarioService {
    #[must_use]
    pub fn new(
        clock: Clock,
        content: Arc<CourseContent>,
        progress: Arc<dyn ProgressStore>,
        sessions: Arc<ScenarioSessions>,
    ) -> Self {
        Self {
            clock,
            content,
            progress,
            sessions,
        }
    }

    fn scenario(&self, scenario_id: &ScenarioId) -> Result<&ScenarioDefinition, ScenarioServiceError> {
        self.content
            .course
            .scenario(scenario_id)
            .ok_or_else(|| ScenarioServiceError::ScenarioNotFound(scenario_id.clone()))
    }

    fn initial_step(scenario: &ScenarioDefinition) -> Result<StepId, ScenarioServiceError> {
        let step = scenario
            .initial_step()
            .ok_or_else(|| ScenarioError::NoSteps(scenario.id.clone()))?;
        Ok(step.id.clone())
    }

    /// Initial step of a run. Re-running a completed scenario starts here too.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioNotFound` for an unknown scenario.
    pub fn start(&self, scenario_id: &ScenarioId) -> Result<ScenarioStart, ScenarioServiceError> {
        let scenario = self.scenario(scenario_id)?;
        Ok(ScenarioStart {
            scenario_id: scenario.id.clone(),
            step_id: Self::initial_step(scenario)?,
        })
    }

    /// Apply one choice of a client-driven run. A completing choice is
    /// recorded, replacing any earlier result for the scenario.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioNotFound`, `Scenario` for an unknown step or choice,
    /// and `Storage` if a completed run cannot be recorded.
    #[instrument(skip(self))]
    pub async fn submit_choice(
        &self,
        scenario_id: &ScenarioId,
        request: &ChoiceRequest,
    ) -> Result<ChoiceResponse, ScenarioServiceError> {
        let scenario = self.scenario(scenario_id)?;
        let outcome = scenario::submit_choice(
            scenario,
            &request.step_id,
            request.choice_index,
            request.accumulated_points,
        )
        .inspect_err(|err| warn!(%scenario_id, error = %err, "scenario choice rejected"))?;

        if let StepOutcome::Complete { result, .. } = &outcome {
            self.record(scenario_id, result).await?;
        }
        Ok(outcome.into())
    }

    /// Open a server-held run at the initial step. Any run of the same
    /// scenario that is still open is discarded.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioNotFound` for an unknown scenario.
    #[instrument(skip(self))]
    pub fn start_session(
        &self,
        scenario_id: &ScenarioId,
    ) -> Result<SessionStart, ScenarioServiceError> {
        let scenario = self.scenario(scenario_id)?;
        let step_id = Self::initial_step(scenario)?;
        let session_id = ScenarioSessionId::random();
        self.sessions.open(
            session_id,
            ScenarioSession {
                scenario_id: scenario.id.clone(),
                step_id: step_id.clone(),
                total_points: 0,
            },
        );
        debug!(%session_id, %scenario_id, "scenario session opened");
        Ok(SessionStart {
            session_id,
            scenario_id: scenario.id.clone(),
            step_id,
            total_points: 0,
        })
    }

    /// Advance a server-held run. The session closes once the run completes
    /// and its result is recorded; a rejected choice leaves it where it was.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown or closed session, `Scenario`
    /// for an invalid choice, and `Storage` if a completed run cannot be
    /// recorded.
    #[instrument(skip(self))]
    pub async fn choose(
        &self,
        session_id: ScenarioSessionId,
        choice_index: i64,
    ) -> Result<SessionChoiceResponse, ScenarioServiceError> {
        let session = self
            .sessions
            .take(session_id)
            .ok_or(ScenarioServiceError::SessionNotFound(session_id))?;

        let outcome = match self.step(&session, choice_index) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.sessions.put_back(session_id, session);
                return Err(err);
            }
        };
        let total_points = session.total_points.saturating_add(outcome.points());

        // Continuing runs go back before any await, so only the recording of
        // a finished run can be interrupted.
        match &outcome {
            StepOutcome::Continue { next_step_id, .. } => {
                self.sessions.put_back(
                    session_id,
                    ScenarioSession {
                        scenario_id: session.scenario_id.clone(),
                        step_id: next_step_id.clone(),
                        total_points,
                    },
                );
            }
            StepOutcome::Complete { result, .. } => {
                if let Err(err) = self.record(&session.scenario_id, result).await {
                    self.sessions.put_back(session_id, session);
                    return Err(err);
                }
                debug!(%session_id, "scenario session closed");
            }
        }

        Ok(SessionChoiceResponse {
            choice: outcome.into(),
            total_points,
        })
    }

    fn step(
        &self,
        session: &ScenarioSession,
        choice_index: i64,
    ) -> Result<StepOutcome, ScenarioServiceError> {
        let scenario = self.scenario(&session.scenario_id)?;
        Ok(scenario::submit_choice(
            scenario,
            &session.step_id,
            choice_index,
            session.total_points,
        )?)
    }

    async fn record(
        &self,
        scenario_id: &ScenarioId,
        result: &ScenarioOutcome,
    ) -> Result<(), ScenarioServiceError> {
        let now = self.clock.now();
        let entry = ScenarioProgress {
            score: result.total_points,
            max_score: result.max_points,
            grade: result.grade,
            completed_at: Some(now),
        };
        update_with(self.progress.as_ref(), now, |p| {
            p.record_scenario(scenario_id, entry);
        })
        .await?;
        info!(
            %scenario_id,
            score = result.total_points,
            max = result.max_points,
            grade = result.grade.as_str(),
            "scenario completed"
        );
        Ok(())
    }
}
