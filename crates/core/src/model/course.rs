use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::derivation::FIXED_BADGE_IDS;
use crate::model::content::{
    Module, Question, QuestionKind, QuizDefinition, ScenarioDefinition, Step,
};
use crate::model::ids::{BadgeId, LessonId, ModuleId, QuestionId, QuizId, ScenarioId, StepId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Content rejected while building a [`Course`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("{kind} id cannot be empty")]
    BlankId { kind: &'static str },

    #[error("module number must be >= 1 (module {0})")]
    InvalidModuleNumber(ModuleId),

    #[error("duplicate module id: {0}")]
    DuplicateModule(ModuleId),

    #[error("duplicate module number {number} (modules {first} and {second})")]
    DuplicateModuleNumber {
        number: u32,
        first: ModuleId,
        second: ModuleId,
    },

    #[error("duplicate lesson {lesson} in module {module}")]
    DuplicateLesson { module: ModuleId, lesson: LessonId },

    #[error("module {0} has neither lessons nor a quiz")]
    EmptyModule(ModuleId),

    #[error("module {module} references unknown quiz {quiz}")]
    UnknownQuiz { module: ModuleId, quiz: QuizId },

    #[error("module {module} references unknown scenario {scenario}")]
    UnknownScenario {
        module: ModuleId,
        scenario: ScenarioId,
    },

    #[error("badge {badge} is used by more than one module")]
    DuplicateBadge { badge: BadgeId },

    #[error("badge {badge} on module {module} collides with a built-in achievement")]
    ReservedBadge { module: ModuleId, badge: BadgeId },

    #[error("duplicate quiz id: {0}")]
    DuplicateQuiz(QuizId),

    #[error("quiz {0} has no questions")]
    EmptyQuiz(QuizId),

    #[error("duplicate question {question} in quiz {quiz}")]
    DuplicateQuestion { quiz: QuizId, question: QuestionId },

    #[error("question {question} in quiz {quiz} has no options")]
    NoOptions { quiz: QuizId, question: QuestionId },

    #[error("question {question} in quiz {quiz} marks option {index} correct, but has {options} options")]
    CorrectIndexOutOfRange {
        quiz: QuizId,
        question: QuestionId,
        index: usize,
        options: usize,
    },

    #[error("multi-select question {question} in quiz {quiz} has no correct options")]
    NoCorrectOptions { quiz: QuizId, question: QuestionId },

    #[error("duplicate scenario id: {0}")]
    DuplicateScenario(ScenarioId),

    #[error("scenario {0} has no steps")]
    EmptyScenario(ScenarioId),

    #[error("duplicate step {step} in scenario {scenario}")]
    DuplicateStep { scenario: ScenarioId, step: StepId },

    #[error("step {step} in scenario {scenario} has no choices")]
    StepWithoutChoices { scenario: ScenarioId, step: StepId },

    #[error("step {step} in scenario {scenario} points to missing step {next}")]
    DanglingStep {
        scenario: ScenarioId,
        step: StepId,
        next: StepId,
    },
}

//
// ─── DOCUMENTS ─────────────────────────────────────────────────────────────────
//

/// Scenario as authored; `maxPoints` is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDocument {
    pub id: ScenarioId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub max_points: Option<i64>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl ScenarioDocument {
    fn into_definition(self) -> ScenarioDefinition {
        let max_points = self
            .max_points
            .unwrap_or_else(|| ScenarioDefinition::best_possible_points(&self.steps));
        ScenarioDefinition {
            id: self.id,
            title: self.title,
            context: self.context,
            max_points,
            steps: self.steps,
        }
    }
}

/// Raw, already-parsed content as handed over by a content source.
#[derive(Debug, Clone, Default)]
pub struct CourseDocuments {
    pub modules: Vec<Module>,
    pub quizzes: Vec<QuizDefinition>,
    pub scenarios: Vec<ScenarioDocument>,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// Validated, immutable course content.
///
/// Modules are kept ordered by `number`. Everything downstream works on this
/// canonical shape only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Course {
    modules: Vec<Module>,
    quizzes: BTreeMap<QuizId, QuizDefinition>,
    scenarios: BTreeMap<ScenarioId, ScenarioDefinition>,
}

impl Course {
    /// Normalize and validate raw documents.
    ///
    /// # Errors
    ///
    /// Returns the first `ContentError` found; nothing partial is produced.
    pub fn from_documents(docs: CourseDocuments) -> Result<Self, ContentError> {
        let mut quizzes = BTreeMap::new();
        for quiz in docs.quizzes {
            validate_quiz(&quiz)?;
            if quizzes.contains_key(&quiz.id) {
                return Err(ContentError::DuplicateQuiz(quiz.id));
            }
            quizzes.insert(quiz.id.clone(), quiz);
        }

        let mut scenarios = BTreeMap::new();
        for doc in docs.scenarios {
            let scenario = doc.into_definition();
            validate_scenario(&scenario)?;
            if scenarios.contains_key(&scenario.id) {
                return Err(ContentError::DuplicateScenario(scenario.id));
            }
            scenarios.insert(scenario.id.clone(), scenario);
        }

        let mut modules = docs.modules;
        let mut ids = BTreeSet::new();
        let mut numbers: BTreeMap<u32, ModuleId> = BTreeMap::new();
        let mut badges = BTreeSet::new();
        for module in &modules {
            validate_module(module, &quizzes, &scenarios)?;
            if !ids.insert(module.id.clone()) {
                return Err(ContentError::DuplicateModule(module.id.clone()));
            }
            if let Some(first) = numbers.insert(module.number, module.id.clone()) {
                return Err(ContentError::DuplicateModuleNumber {
                    number: module.number,
                    first,
                    second: module.id.clone(),
                });
            }
            if let Some(badge) = module.badge_id() {
                if !badges.insert(badge.clone()) {
                    return Err(ContentError::DuplicateBadge {
                        badge: badge.clone(),
                    });
                }
            }
        }
        modules.sort_by_key(|m| m.number);

        Ok(Self {
            modules,
            quizzes,
            scenarios,
        })
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn module(&self, id: &ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| &m.id == id)
    }

    #[must_use]
    pub fn quiz(&self, id: &QuizId) -> Option<&QuizDefinition> {
        self.quizzes.get(id)
    }

    pub fn quizzes(&self) -> impl Iterator<Item = &QuizDefinition> {
        self.quizzes.values()
    }

    #[must_use]
    pub fn scenario(&self, id: &ScenarioId) -> Option<&ScenarioDefinition> {
        self.scenarios.get(id)
    }

    pub fn scenarios(&self) -> impl Iterator<Item = &ScenarioDefinition> {
        self.scenarios.values()
    }

    /// The module's own quiz, if it declares one.
    #[must_use]
    pub fn quiz_for(&self, module: &Module) -> Option<&QuizDefinition> {
        module.quiz_id.as_ref().and_then(|id| self.quizzes.get(id))
    }
}

fn validate_module(
    module: &Module,
    quizzes: &BTreeMap<QuizId, QuizDefinition>,
    scenarios: &BTreeMap<ScenarioId, ScenarioDefinition>,
) -> Result<(), ContentError> {
    if module.id.is_blank() {
        return Err(ContentError::BlankId { kind: "module" });
    }
    if module.number == 0 {
        return Err(ContentError::InvalidModuleNumber(module.id.clone()));
    }
    if module.lessons.is_empty() && module.quiz_id.is_none() {
        return Err(ContentError::EmptyModule(module.id.clone()));
    }

    let mut lessons = BTreeSet::new();
    for lesson in &module.lessons {
        if lesson.id.is_blank() {
            return Err(ContentError::BlankId { kind: "lesson" });
        }
        if !lessons.insert(&lesson.id) {
            return Err(ContentError::DuplicateLesson {
                module: module.id.clone(),
                lesson: lesson.id.clone(),
            });
        }
    }

    if let Some(quiz) = module.quiz_id.as_ref().filter(|q| !quizzes.contains_key(*q)) {
        return Err(ContentError::UnknownQuiz {
            module: module.id.clone(),
            quiz: quiz.clone(),
        });
    }
    if let Some(scenario) = module
        .scenario_id
        .as_ref()
        .filter(|s| !scenarios.contains_key(*s))
    {
        return Err(ContentError::UnknownScenario {
            module: module.id.clone(),
            scenario: scenario.clone(),
        });
    }
    if let Some(badge) = module.badge_id() {
        if badge.is_blank() {
            return Err(ContentError::BlankId { kind: "badge" });
        }
        if FIXED_BADGE_IDS.contains(&badge.as_str()) {
            return Err(ContentError::ReservedBadge {
                module: module.id.clone(),
                badge: badge.clone(),
            });
        }
    }
    Ok(())
}

fn validate_quiz(quiz: &QuizDefinition) -> Result<(), ContentError> {
    if quiz.id.is_blank() {
        return Err(ContentError::BlankId { kind: "quiz" });
    }
    if quiz.questions.is_empty() {
        return Err(ContentError::EmptyQuiz(quiz.id.clone()));
    }
    let mut seen = BTreeSet::new();
    for question in &quiz.questions {
        if question.id.is_blank() {
            return Err(ContentError::BlankId { kind: "question" });
        }
        if !seen.insert(&question.id) {
            return Err(ContentError::DuplicateQuestion {
                quiz: quiz.id.clone(),
                question: question.id.clone(),
            });
        }
        validate_answer_key(&quiz.id, question)?;
    }
    Ok(())
}

fn validate_answer_key(quiz: &QuizId, question: &Question) -> Result<(), ContentError> {
    let out_of_range = |index: usize, options: usize| ContentError::CorrectIndexOutOfRange {
        quiz: quiz.clone(),
        question: question.id.clone(),
        index,
        options,
    };
    let no_options = || ContentError::NoOptions {
        quiz: quiz.clone(),
        question: question.id.clone(),
    };

    match &question.kind {
        QuestionKind::TrueFalse { .. } => Ok(()),
        QuestionKind::MultipleChoice {
            options,
            correct_index,
        } => {
            if options.is_empty() {
                return Err(no_options());
            }
            if *correct_index >= options.len() {
                return Err(out_of_range(*correct_index, options.len()));
            }
            Ok(())
        }
        QuestionKind::MultiSelect {
            options,
            correct_indices,
        } => {
            if options.is_empty() {
                return Err(no_options());
            }
            if correct_indices.is_empty() {
                return Err(ContentError::NoCorrectOptions {
                    quiz: quiz.clone(),
                    question: question.id.clone(),
                });
            }
            match correct_indices.iter().find(|&&i| i >= options.len()) {
                Some(&index) => Err(out_of_range(index, options.len())),
                None => Ok(()),
            }
        }
    }
}

fn validate_scenario(scenario: &ScenarioDefinition) -> Result<(), ContentError> {
    if scenario.id.is_blank() {
        return Err(ContentError::BlankId { kind: "scenario" });
    }
    if scenario.steps.is_empty() {
        return Err(ContentError::EmptyScenario(scenario.id.clone()));
    }

    let mut step_ids = BTreeSet::new();
    for step in &scenario.steps {
        if step.id.is_blank() {
            return Err(ContentError::BlankId { kind: "step" });
        }
        if !step_ids.insert(&step.id) {
            return Err(ContentError::DuplicateStep {
                scenario: scenario.id.clone(),
                step: step.id.clone(),
            });
        }
    }

    for step in &scenario.steps {
        if step.choices.is_empty() {
            return Err(ContentError::StepWithoutChoices {
                scenario: scenario.id.clone(),
                step: step.id.clone(),
            });
        }
        for choice in &step.choices {
            if let Some(next) = choice.next_step_id.as_ref().filter(|n| !step_ids.contains(*n)) {
                return Err(ContentError::DanglingStep {
                    scenario: scenario.id.clone(),
                    step: step.id.clone(),
                    next: next.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::content::{Badge, Choice, Lesson};

    fn lesson(id: &str) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            title: id.to_owned(),
            sections: Vec::new(),
        }
    }

    fn module(id: &str, number: u32) -> Module {
        Module {
            id: ModuleId::new(id),
            number,
            title: format!("Module {number}"),
            description: None,
            lessons: vec![lesson("l1")],
            quiz_id: None,
            scenario_id: None,
            badge: None,
        }
    }

    fn quiz(id: &str) -> QuizDefinition {
        QuizDefinition {
            id: QuizId::new(id),
            title: String::new(),
            passing_score: 70,
            questions: vec![Question {
                id: QuestionId::new("q1"),
                question: String::new(),
                kind: QuestionKind::TrueFalse {
                    correct_answer: true,
                },
                explanation: None,
            }],
        }
    }

    fn scenario_doc(max_points: Option<i64>, next: Option<&str>) -> ScenarioDocument {
        ScenarioDocument {
            id: ScenarioId::new("sc-1"),
            title: String::new(),
            context: String::new(),
            max_points,
            steps: vec![Step {
                id: StepId::new("s1"),
                narrative: String::new(),
                choices: vec![
                    Choice {
                        text: "a".into(),
                        points: 4,
                        next_step_id: next.map(StepId::new),
                        result: None,
                        feedback: None,
                    },
                    Choice {
                        text: "b".into(),
                        points: 7,
                        next_step_id: None,
                        result: None,
                        feedback: None,
                    },
                ],
            }],
        }
    }

    #[test]
    fn modules_are_ordered_by_number() {
        let course = Course::from_documents(CourseDocuments {
            modules: vec![module("module-2", 2), module("module-1", 1)],
            ..CourseDocuments::default()
        })
        .unwrap();
        let ids: Vec<_> = course.modules().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["module-1", "module-2"]);
    }

    #[test]
    fn duplicate_module_number_is_rejected() {
        let err = Course::from_documents(CourseDocuments {
            modules: vec![module("a", 1), module("b", 1)],
            ..CourseDocuments::default()
        })
        .unwrap_err();
        assert!(matches!(err, ContentError::DuplicateModuleNumber { number: 1, .. }));
    }

    #[test]
    fn module_with_nothing_to_complete_is_rejected() {
        let mut m = module("a", 1);
        m.lessons.clear();
        let err = Course::from_documents(CourseDocuments {
            modules: vec![m],
            ..CourseDocuments::default()
        })
        .unwrap_err();
        assert_eq!(err, ContentError::EmptyModule(ModuleId::new("a")));
    }

    #[test]
    fn unknown_quiz_reference_is_rejected() {
        let mut m = module("a", 1);
        m.quiz_id = Some(QuizId::new("missing"));
        let err = Course::from_documents(CourseDocuments {
            modules: vec![m],
            quizzes: vec![quiz("quiz-1")],
            ..CourseDocuments::default()
        })
        .unwrap_err();
        assert!(matches!(err, ContentError::UnknownQuiz { .. }));
    }

    #[test]
    fn empty_quiz_is_a_configuration_error() {
        let mut q = quiz("quiz-1");
        q.questions.clear();
        let err = Course::from_documents(CourseDocuments {
            quizzes: vec![q],
            ..CourseDocuments::default()
        })
        .unwrap_err();
        assert_eq!(err, ContentError::EmptyQuiz(QuizId::new("quiz-1")));
    }

    #[test]
    fn correct_index_must_point_at_an_option() {
        let mut q = quiz("quiz-1");
        q.questions[0].kind = QuestionKind::MultipleChoice {
            options: vec!["a".into(), "b".into()],
            correct_index: 2,
        };
        let err = Course::from_documents(CourseDocuments {
            quizzes: vec![q],
            ..CourseDocuments::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ContentError::CorrectIndexOutOfRange {
                index: 2,
                options: 2,
                ..
            }
        ));
    }

    #[test]
    fn dangling_next_step_is_rejected() {
        let err = Course::from_documents(CourseDocuments {
            scenarios: vec![scenario_doc(Some(10), Some("nowhere"))],
            ..CourseDocuments::default()
        })
        .unwrap_err();
        assert!(matches!(err, ContentError::DanglingStep { .. }));
    }

    #[test]
    fn missing_max_points_falls_back_to_best_path() {
        let course = Course::from_documents(CourseDocuments {
            scenarios: vec![scenario_doc(None, None)],
            ..CourseDocuments::default()
        })
        .unwrap();
        let scenario = course.scenario(&ScenarioId::new("sc-1")).unwrap();
        assert_eq!(scenario.max_points, 7);
    }

    #[test]
    fn built_in_badge_ids_are_reserved() {
        let mut m = module("a", 1);
        m.badge = Some(Badge {
            id: BadgeId::new("completionist"),
            name: None,
            emoji: None,
        });
        let err = Course::from_documents(CourseDocuments {
            modules: vec![m],
            ..CourseDocuments::default()
        })
        .unwrap_err();
        assert!(matches!(err, ContentError::ReservedBadge { .. }));
    }

    #[test]
    fn shared_badge_ids_are_rejected() {
        let badge = Badge {
            id: BadgeId::new("explorer"),
            name: None,
            emoji: None,
        };
        let mut a = module("a", 1);
        a.badge = Some(badge.clone());
        let mut b = module("b", 2);
        b.badge = Some(badge);
        let err = Course::from_documents(CourseDocuments {
            modules: vec![a, b],
            ..CourseDocuments::default()
        })
        .unwrap_err();
        assert!(matches!(err, ContentError::DuplicateBadge { .. }));
    }
}
