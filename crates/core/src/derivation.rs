//! Read-side view of a learner's progress.
//!
//! Every function here is pure over `(Course, Progress)`: nothing is cached
//! and nothing is written back. Stored badge flags are only a notification
//! cache; completion is always recomputed from raw counters.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{
    Badge, BadgeId, Course, DEFAULT_PASSING_SCORE, GradeBucket, Module, ModuleId, ModuleProgress,
    Progress,
};

/// Awarded when any quiz was finished with a perfect score.
pub const PERFECT_SCORE_BADGE: &str = "perfect-score";
/// Awarded when any scenario finished at 90% or better.
pub const SCENARIO_STAR_BADGE: &str = "scenario-star";
/// Awarded when every module in the course is completed.
pub const COMPLETIONIST_BADGE: &str = "completionist";

/// Badge ids reserved for course-wide achievements.
pub const FIXED_BADGE_IDS: [&str; 3] = [PERFECT_SCORE_BADGE, SCENARIO_STAR_BADGE, COMPLETIONIST_BADGE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Passing threshold of the module's quiz, or the default when it has none.
#[must_use]
pub fn effective_passing_score(course: &Course, module: &Module) -> u32 {
    course
        .quiz_for(module)
        .map_or(DEFAULT_PASSING_SCORE, |quiz| quiz.passing_score)
}

/// Number of the module's own lessons the learner has completed. Stray ids
/// in the progress document are not counted.
#[must_use]
pub fn completed_lesson_count(module: &Module, progress: Option<&ModuleProgress>) -> usize {
    progress.map_or(0, |p| {
        module
            .lesson_ids()
            .filter(|id| p.lessons_completed.contains(*id))
            .count()
    })
}

/// All lessons done and the quiz passed.
///
/// A module without lessons is trivially lesson-complete; a module without a
/// quiz is trivially quiz-complete.
#[must_use]
pub fn is_module_completed(course: &Course, module: &Module, progress: &Progress) -> bool {
    let module_progress = progress.module(&module.id);
    let lessons_done = completed_lesson_count(module, module_progress) >= module.total_lessons();
    if !lessons_done {
        return false;
    }
    if module.quiz_id.is_none() {
        return true;
    }
    let threshold = effective_passing_score(course, module);
    module_progress.is_some_and(|p| p.quiz_passed || p.quiz_score.is_some_and(|s| s >= threshold))
}

#[must_use]
pub fn module_status(course: &Course, module: &Module, progress: &Progress) -> ModuleStatus {
    if is_module_completed(course, module, progress) {
        ModuleStatus::Completed
    } else if progress
        .module(&module.id)
        .is_some_and(ModuleProgress::has_activity)
    {
        ModuleStatus::InProgress
    } else {
        ModuleStatus::NotStarted
    }
}

#[must_use]
pub fn completed_module_count(course: &Course, progress: &Progress) -> usize {
    course
        .modules()
        .iter()
        .filter(|m| is_module_completed(course, m, progress))
        .count()
}

/// `round(100 * completed / total)`; `0` for a course without modules.
#[must_use]
pub fn overall_progress_percent(course: &Course, progress: &Progress) -> u32 {
    let total = course.modules().len();
    if total == 0 {
        return 0;
    }
    crate::grading::percent_score(completed_module_count(course, progress), total)
}

/// Every badge the learner holds right now.
///
/// Union of the stored badge cache, the badges of completed modules and the
/// course-wide achievements. Ordered, so repeated calls are identical.
#[must_use]
pub fn derive_earned_badge_ids(course: &Course, progress: &Progress) -> BTreeSet<BadgeId> {
    let mut earned = progress.badges.clone();

    let mut all_completed = !course.modules().is_empty();
    for module in course.modules() {
        if is_module_completed(course, module, progress) {
            if let Some(badge) = module.badge_id() {
                earned.insert(badge.clone());
            }
        } else {
            all_completed = false;
        }
    }

    if progress.modules.values().any(|m| m.quiz_score == Some(100)) {
        earned.insert(BadgeId::new(PERFECT_SCORE_BADGE));
    }
    if progress
        .scenarios
        .values()
        .any(|s| s.max_score > 0 && GradeBucket::from_points(s.score, s.max_score) == GradeBucket::Excellent)
    {
        earned.insert(BadgeId::new(SCENARIO_STAR_BADGE));
    }
    if all_completed {
        earned.insert(BadgeId::new(COMPLETIONIST_BADGE));
    }
    earned
}

//
// ─── REPORT ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleReport {
    pub module_id: ModuleId,
    pub number: u32,
    pub title: String,
    pub status: ModuleStatus,
    pub lessons_completed: usize,
    pub total_lessons: usize,
    pub quiz_score: Option<u32>,
    pub quiz_attempts: u32,
    pub quiz_passed: bool,
    pub badge: Option<Badge>,
    pub badge_earned: bool,
}

/// Everything a dashboard needs in one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub modules: Vec<ModuleReport>,
    pub completed_modules: usize,
    pub total_modules: usize,
    pub overall_percent: u32,
    pub badges: BTreeSet<BadgeId>,
}

#[must_use]
pub fn progress_report(course: &Course, progress: &Progress) -> ProgressReport {
    let badges = derive_earned_badge_ids(course, progress);
    let modules: Vec<ModuleReport> = course
        .modules()
        .iter()
        .map(|module| {
            let module_progress = progress.module(&module.id);
            ModuleReport {
                module_id: module.id.clone(),
                number: module.number,
                title: module.title.clone(),
                status: module_status(course, module, progress),
                lessons_completed: completed_lesson_count(module, module_progress),
                total_lessons: module.total_lessons(),
                quiz_score: module_progress.and_then(|p| p.quiz_score),
                quiz_attempts: module_progress.map_or(0, |p| p.quiz_attempts),
                quiz_passed: module_progress.is_some_and(|p| p.quiz_passed),
                badge: module.badge.clone(),
                badge_earned: module.badge_id().is_some_and(|b| badges.contains(b)),
            }
        })
        .collect();

    let completed_modules = modules
        .iter()
        .filter(|m| m.status == ModuleStatus::Completed)
        .count();

    ProgressReport {
        completed_modules,
        total_modules: modules.len(),
        overall_percent: overall_progress_percent(course, progress),
        modules,
        badges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CourseDocuments, Lesson, LessonId, Question, QuestionId, QuestionKind, QuizDefinition,
        QuizId, ScenarioId, ScenarioProgress,
    };

    fn lessons(ids: &[&str]) -> Vec<Lesson> {
        ids.iter()
            .map(|id| Lesson {
                id: LessonId::new(*id),
                title: String::new(),
                sections: Vec::new(),
            })
            .collect()
    }

    fn course() -> Course {
        let quiz = |id: &str, passing_score| QuizDefinition {
            id: QuizId::new(id),
            title: String::new(),
            passing_score,
            questions: vec![Question {
                id: QuestionId::new("q1"),
                question: String::new(),
                kind: QuestionKind::TrueFalse {
                    correct_answer: true,
                },
                explanation: None,
            }],
        };
        let module = |id: &str, number, lesson_ids: &[&str], quiz: &str, badge: &str| Module {
            id: ModuleId::new(id),
            number,
            title: id.to_owned(),
            description: None,
            lessons: lessons(lesson_ids),
            quiz_id: Some(QuizId::new(quiz)),
            scenario_id: None,
            badge: Some(Badge {
                id: BadgeId::new(badge),
                name: Some(badge.to_owned()),
                emoji: None,
            }),
        };
        Course::from_documents(CourseDocuments {
            modules: vec![
                module("module-1", 1, &["l1", "l2"], "quiz-1", "foundations"),
                module("module-2", 2, &[], "quiz-2", "governor"),
            ],
            quizzes: vec![quiz("quiz-1", 70), quiz("quiz-2", 80)],
            scenarios: Vec::new(),
        })
        .unwrap()
    }

    fn module_id(id: &str) -> ModuleId {
        ModuleId::new(id)
    }

    fn complete_module_one(progress: &mut Progress) {
        let m = progress.module_mut(&module_id("module-1"));
        m.lessons_completed.insert(LessonId::new("l1"));
        m.lessons_completed.insert(LessonId::new("l2"));
        m.record_quiz_attempt(75, true);
    }

    #[test]
    fn empty_progress_is_not_started() {
        let course = course();
        let progress = Progress::default();
        for module in course.modules() {
            assert_eq!(module_status(&course, module, &progress), ModuleStatus::NotStarted);
        }
        assert_eq!(overall_progress_percent(&course, &progress), 0);
        assert!(derive_earned_badge_ids(&course, &progress).is_empty());
    }

    #[test]
    fn lessons_alone_are_in_progress() {
        let course = course();
        let mut progress = Progress::default();
        let m = progress.module_mut(&module_id("module-1"));
        m.lessons_completed.insert(LessonId::new("l1"));
        m.lessons_completed.insert(LessonId::new("l2"));

        let module = &course.modules()[0];
        assert_eq!(completed_lesson_count(module, progress.module(&module.id)), 2);
        assert_eq!(module_status(&course, module, &progress), ModuleStatus::InProgress);
    }

    #[test]
    fn stray_lesson_ids_do_not_count() {
        let course = course();
        let mut progress = Progress::default();
        let m = progress.module_mut(&module_id("module-1"));
        m.lessons_completed.insert(LessonId::new("l1"));
        m.lessons_completed.insert(LessonId::new("elsewhere"));
        m.record_quiz_attempt(100, true);

        let module = &course.modules()[0];
        assert_eq!(completed_lesson_count(module, progress.module(&module.id)), 1);
        assert!(!is_module_completed(&course, module, &progress));
    }

    #[test]
    fn completion_needs_lessons_and_quiz() {
        let course = course();
        let mut progress = Progress::default();
        complete_module_one(&mut progress);
        let module = &course.modules()[0];
        assert!(is_module_completed(&course, module, &progress));
        assert_eq!(overall_progress_percent(&course, &progress), 50);
    }

    #[test]
    fn zero_lesson_module_completes_on_quiz_alone() {
        let course = course();
        let mut progress = Progress::default();
        progress.module_mut(&module_id("module-2")).record_quiz_attempt(85, true);
        assert!(is_module_completed(&course, &course.modules()[1], &progress));
    }

    #[test]
    fn score_at_threshold_counts_without_flag() {
        let course = course();
        let mut progress = Progress::default();
        progress.module_mut(&module_id("module-2")).quiz_score = Some(80);
        progress.module_mut(&module_id("module-2")).quiz_attempts = 1;
        assert!(is_module_completed(&course, &course.modules()[1], &progress));

        progress.module_mut(&module_id("module-2")).quiz_score = Some(79);
        assert!(!is_module_completed(&course, &course.modules()[1], &progress));
    }

    #[test]
    fn completion_is_monotonic_under_more_progress() {
        let course = course();
        let mut progress = Progress::default();
        complete_module_one(&mut progress);
        let module = &course.modules()[0];
        assert!(is_module_completed(&course, module, &progress));

        progress
            .module_mut(&module_id("module-1"))
            .lessons_completed
            .insert(LessonId::new("l1"));
        assert!(is_module_completed(&course, module, &progress));

        progress.module_mut(&module_id("module-1")).quiz_score = Some(100);
        assert!(is_module_completed(&course, module, &progress));

        // A later failing retake lowers the score but not the pass flag.
        progress.module_mut(&module_id("module-1")).record_quiz_attempt(10, false);
        assert!(is_module_completed(&course, module, &progress));
    }

    #[test]
    fn badges_follow_completion_and_achievements() {
        let course = course();
        let mut progress = Progress::default();
        complete_module_one(&mut progress);
        progress.module_mut(&module_id("module-2")).record_quiz_attempt(100, true);
        progress.record_scenario(
            &ScenarioId::new("sc"),
            ScenarioProgress {
                score: 18,
                max_score: 20,
                grade: GradeBucket::Excellent,
                completed_at: None,
            },
        );

        let badges: Vec<String> = derive_earned_badge_ids(&course, &progress)
            .into_iter()
            .map(|b| b.to_string())
            .collect();
        assert_eq!(
            badges,
            [
                COMPLETIONIST_BADGE,
                "foundations",
                "governor",
                PERFECT_SCORE_BADGE,
                SCENARIO_STAR_BADGE
            ]
        );
    }

    #[test]
    fn stored_badges_are_kept_in_the_view() {
        let course = course();
        let mut progress = Progress::default();
        progress.award_badge(&BadgeId::new("legacy"));
        let badges = derive_earned_badge_ids(&course, &progress);
        assert!(badges.contains(&BadgeId::new("legacy")));
    }

    #[test]
    fn derivation_is_idempotent() {
        let course = course();
        let mut progress = Progress::default();
        complete_module_one(&mut progress);
        assert_eq!(
            derive_earned_badge_ids(&course, &progress),
            derive_earned_badge_ids(&course, &progress)
        );
        assert_eq!(progress_report(&course, &progress), progress_report(&course, &progress));
    }

    #[test]
    fn empty_course_has_zero_percent_and_no_completionist() {
        let course = Course::default();
        let progress = Progress::default();
        assert_eq!(overall_progress_percent(&course, &progress), 0);
        assert!(derive_earned_badge_ids(&course, &progress).is_empty());
    }

    #[test]
    fn scenario_star_needs_ninety_percent() {
        let course = course();
        let mut progress = Progress::default();
        progress.record_scenario(
            &ScenarioId::new("sc"),
            ScenarioProgress {
                score: 17,
                max_score: 20,
                grade: GradeBucket::Good,
                completed_at: None,
            },
        );
        assert!(!derive_earned_badge_ids(&course, &progress)
            .contains(&BadgeId::new(SCENARIO_STAR_BADGE)));
    }

    #[test]
    fn report_summarizes_modules() {
        let course = course();
        let mut progress = Progress::default();
        complete_module_one(&mut progress);
        let report = progress_report(&course, &progress);

        assert_eq!(report.total_modules, 2);
        assert_eq!(report.completed_modules, 1);
        assert_eq!(report.overall_percent, 50);
        assert_eq!(report.modules[0].status, ModuleStatus::Completed);
        assert!(report.modules[0].badge_earned);
        assert_eq!(report.modules[1].status, ModuleStatus::NotStarted);
        assert!(!report.modules[1].badge_earned);
    }
}
