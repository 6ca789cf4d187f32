use std::sync::Arc;

use course_core::grading::{AnswerSet, QuizGrade, grade_quiz};
use course_core::model::{BadgeId, ModuleId, Progress, QuizId};
use serde::Serialize;
use storage::repository::{ProgressStore, update_with};
use storage::CourseContent;
use tracing::{info, instrument, warn};

use crate::Clock;
use crate::error::QuizServiceError;
use crate::progress_service::stamp_completion;

/// Badge attached to a passing submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarnedBadge {
    pub id: BadgeId,
    pub name: Option<String>,
    pub emoji: Option<String>,
    /// `true` only for the submission that first added the badge.
    pub is_new: bool,
}

/// Graded attempt plus the document it was recorded into.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
    #[serde(flatten)]
    pub grade: QuizGrade,
    pub badge_earned: Option<EarnedBadge>,
    pub progress: Progress,
}

/// Grades quiz attempts and folds them into learner progress.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    content: Arc<CourseContent>,
    progress: Arc<dyn ProgressStore>,
}

impl QuizService {
    #[must_use]
    pub fn new(clock: Clock, content: Arc<CourseContent>, progress: Arc<dyn ProgressStore>) -> Self {
        Self {
            clock,
            content,
            progress,
        }
    }

    /// Grade `answers` and record the attempt for `module_id`.
    ///
    /// Every check runs before the store is touched, so a rejected
    /// submission leaves progress unchanged. Retakes are never an error.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::QuizNotFound` / `ModuleNotFound` for unknown
    /// ids, `QuizModuleMismatch` when the module does not own the quiz,
    /// `Grading` for malformed answers or an empty quiz, and `Storage` if the
    /// attempt cannot be persisted.
    #[instrument(skip(self, answers))]
    pub async fn submit(
        &self,
        quiz_id: &QuizId,
        module_id: &ModuleId,
        answers: &AnswerSet,
    ) -> Result<QuizSubmission, QuizServiceError> {
        let course = &self.content.course;
        let quiz = course
            .quiz(quiz_id)
            .ok_or_else(|| QuizServiceError::QuizNotFound(quiz_id.clone()))?;
        let module = course
            .module(module_id)
            .ok_or_else(|| QuizServiceError::ModuleNotFound(module_id.clone()))?;
        if module.quiz_id.as_ref() != Some(quiz_id) {
            warn!(%quiz_id, %module_id, "quiz submitted against the wrong module");
            return Err(QuizServiceError::QuizModuleMismatch {
                quiz: quiz_id.clone(),
                module: module_id.clone(),
            });
        }

        let grade = grade_quiz(quiz, answers).inspect_err(|err| {
            warn!(%quiz_id, error = %err, "quiz submission rejected");
        })?;

        let now = self.clock.now();
        let (score, passed) = (grade.score, grade.passed);
        let (progress, badge_is_new) = update_with(self.progress.as_ref(), now, |p| {
            let module_progress = p.module_mut(&module.id);
            module_progress.record_quiz_attempt(score, passed);
            let mut is_new = false;
            if passed {
                if let Some(badge) = module.badge_id() {
                    module_progress.badge_earned = true;
                    is_new = p.award_badge(badge);
                }
            }
            stamp_completion(course, module, p, now);
            is_new
        })
        .await?;

        info!(%quiz_id, %module_id, score, passed, "quiz attempt recorded");

        let badge_earned = module.badge.as_ref().filter(|_| passed).map(|badge| {
            if badge_is_new {
                info!(badge = %badge.id, "badge earned");
            }
            EarnedBadge {
                id: badge.id.clone(),
                name: badge.name.clone(),
                emoji: badge.emoji.clone(),
                is_new: badge_is_new,
            }
        });

        Ok(QuizSubmission {
            grade,
            badge_earned,
            progress,
        })
    }
}
