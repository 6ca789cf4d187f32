use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use course_core::derivation::{self, ProgressReport};
use course_core::model::{BadgeId, Course, LessonId, Module, ModuleId, Progress};
use serde_json::{Map, Value};
use storage::repository::{ProgressStore, update_with};
use storage::CourseContent;
use tracing::{info, instrument, warn};

use crate::Clock;
use crate::error::ProgressServiceError;
use crate::scenario_service::ScenarioSessions;

/// Record the first moment a write leaves `module` complete.
pub(crate) fn stamp_completion(
    course: &Course,
    module: &Module,
    progress: &mut Progress,
    now: DateTime<Utc>,
) {
    if derivation::is_module_completed(course, module, progress) {
        let module_progress = progress.module_mut(&module.id);
        if module_progress.completed_at.is_none() {
            module_progress.completed_at = Some(now);
        }
    }
}

/// Lesson completion, capstone state, reset and the derived views.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    content: Arc<CourseContent>,
    progress: Arc<dyn ProgressStore>,
    sessions: Arc<ScenarioSessions>,
}

impl ProgressService {
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

    /// Raw progress document.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be read.
    pub async fn progress(&self) -> Result<Progress, ProgressServiceError> {
        Ok(self.progress.read().await?)
    }

    /// Mark a lesson of `module_id` as completed. Completing it again is a
    /// no-op apart from the activity timestamp.
    ///
    /// # Errors
    ///
    /// Returns `ModuleNotFound` / `LessonNotFound` for ids outside the course
    /// and `Storage` if the write fails.
    #[instrument(skip(self))]
    pub async fn mark_lesson_complete(
        &self,
        module_id: &ModuleId,
        lesson_id: &LessonId,
    ) -> Result<Progress, ProgressServiceError> {
        let course = &self.content.course;
        let module = course.module(module_id).ok_or_else(|| {
            warn!(%module_id, "lesson completion for unknown module");
            ProgressServiceError::ModuleNotFound(module_id.clone())
        })?;
        if !module.has_lesson(lesson_id) {
            warn!(%module_id, %lesson_id, "lesson completion for unknown lesson");
            return Err(ProgressServiceError::LessonNotFound {
                module: module_id.clone(),
                lesson: lesson_id.clone(),
            });
        }

        let now = self.clock.now();
        let (progress, ()) = update_with(self.progress.as_ref(), now, |p| {
            p.module_mut(module_id)
                .lessons_completed
                .insert(lesson_id.clone());
            stamp_completion(course, module, p, now);
        })
        .await?;

        info!(%module_id, %lesson_id, "lesson completed");
        Ok(progress)
    }

    /// Shallow-merge `update` into the stored capstone state.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the write fails.
    #[instrument(skip(self, update))]
    pub async fn save_capstone(
        &self,
        update: Map<String, Value>,
    ) -> Result<Progress, ProgressServiceError> {
        let keys = update.len();
        let (progress, ()) = update_with(self.progress.as_ref(), self.clock.now(), move |p| {
            p.merge_capstone(update);
        })
        .await?;
        info!(keys, "capstone state saved");
        Ok(progress)
    }

    /// Discard all learner state and return the fresh document. Open
    /// scenario sessions are closed as well.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be reset.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> Result<Progress, ProgressServiceError> {
        let progress = self.progress.reset().await?;
        let sessions = self.sessions.clear();
        info!(sessions, "progress reset");
        Ok(progress)
    }

    /// Every badge the learner currently holds.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be read.
    pub async fn badges(&self) -> Result<BTreeSet<BadgeId>, ProgressServiceError> {
        let progress = self.progress.read().await?;
        Ok(derivation::derive_earned_badge_ids(
            &self.content.course,
            &progress,
        ))
    }

    /// Per-module status, overall percentage and badges in one view.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the store cannot be read.
    pub async fn report(&self) -> Result<ProgressReport, ProgressServiceError> {
        let progress = self.progress.read().await?;
        Ok(derivation::progress_report(&self.content.course, &progress))
    }
}
