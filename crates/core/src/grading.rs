//! Quiz grading: a pure function from a quiz definition and a learner's answer
//! set to a graded result. Persisting the attempt is the caller's job.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CorrectAnswer, QuestionId, QuestionKind, QuizDefinition, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GradingError {
    /// The quiz itself is misconfigured; there is nothing to divide by.
    #[error("quiz {0} has no questions")]
    EmptyQuiz(QuizId),

    #[error("quiz {quiz} has no question {question}")]
    UnknownQuestion { quiz: QuizId, question: QuestionId },

    #[error("answer to question {question} must be {expected}")]
    AnswerShape {
        question: QuestionId,
        expected: &'static str,
    },
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// One submitted answer: an option index, a boolean, or a set of indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmittedAnswer {
    Flag(bool),
    Index(i64),
    Indices(Vec<i64>),
}

/// Answers keyed by question id. Missing questions count as incorrect.
pub type AnswerSet = BTreeMap<QuestionId, SubmittedAnswer>;

fn expected_shape(kind: &QuestionKind) -> &'static str {
    match kind {
        QuestionKind::MultipleChoice { .. } => "an option index",
        QuestionKind::TrueFalse { .. } => "true or false",
        QuestionKind::MultiSelect { .. } => "a list of option indices",
    }
}

fn shape_matches(kind: &QuestionKind, answer: &SubmittedAnswer) -> bool {
    matches!(
        (kind, answer),
        (QuestionKind::MultipleChoice { .. }, SubmittedAnswer::Index(_))
            | (QuestionKind::TrueFalse { .. }, SubmittedAnswer::Flag(_))
            | (QuestionKind::MultiSelect { .. }, SubmittedAnswer::Indices(_))
    )
}

fn is_correct(kind: &QuestionKind, answer: &SubmittedAnswer) -> bool {
    match (kind, answer) {
        (QuestionKind::MultipleChoice { correct_index, .. }, SubmittedAnswer::Index(given)) => {
            usize::try_from(*given).is_ok_and(|given| given == *correct_index)
        }
        (QuestionKind::TrueFalse { correct_answer }, SubmittedAnswer::Flag(given)) => {
            given == correct_answer
        }
        (
            QuestionKind::MultiSelect {
                correct_indices, ..
            },
            SubmittedAnswer::Indices(given),
        ) => {
            // Order is irrelevant and duplicates collapse; a negative index can
            // never be part of the key.
            let given: Option<BTreeSet<usize>> =
                given.iter().map(|&i| usize::try_from(i).ok()).collect();
            given.is_some_and(|given| &given == correct_indices)
        }
        _ => false,
    }
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub correct: bool,
    pub user_answer: Option<SubmittedAnswer>,
    pub correct_answer: CorrectAnswer,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizGrade {
    pub score: u32,
    pub passed: bool,
    pub passing_score: u32,
    pub correct_count: usize,
    pub total_questions: usize,
    pub results: Vec<QuestionResult>,
}

/// `round(100 * correct / total)` with halves rounding up. `total` must be > 0.
#[must_use]
pub fn percent_score(correct: usize, total: usize) -> u32 {
    debug_assert!(total > 0);
    let rounded = (correct * 200 + total) / (total * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Grade a full answer set against a quiz.
///
/// Validation happens before anything is scored: answers keyed by unknown
/// questions and answers of the wrong shape are rejected as a whole.
///
/// # Errors
///
/// Returns `GradingError::EmptyQuiz` when the quiz has no questions, and
/// `UnknownQuestion` / `AnswerShape` for malformed answer sets.
pub fn grade_quiz(quiz: &QuizDefinition, answers: &AnswerSet) -> Result<QuizGrade, GradingError> {
    if quiz.questions.is_empty() {
        return Err(GradingError::EmptyQuiz(quiz.id.clone()));
    }

    for (question_id, answer) in answers {
        let question = quiz
            .question(question_id)
            .ok_or_else(|| GradingError::UnknownQuestion {
                quiz: quiz.id.clone(),
                question: question_id.clone(),
            })?;
        if !shape_matches(&question.kind, answer) {
            return Err(GradingError::AnswerShape {
                question: question_id.clone(),
                expected: expected_shape(&question.kind),
            });
        }
    }

    let results: Vec<QuestionResult> = quiz
        .questions
        .iter()
        .map(|question| {
            let user_answer = answers.get(&question.id).cloned();
            QuestionResult {
                question_id: question.id.clone(),
                correct: user_answer
                    .as_ref()
                    .is_some_and(|answer| is_correct(&question.kind, answer)),
                user_answer,
                correct_answer: question.kind.correct_answer(),
                explanation: question.explanation.clone().unwrap_or_default(),
            }
        })
        .collect();

    let total_questions = results.len();
    let correct_count = results.iter().filter(|r| r.correct).count();
    let score = percent_score(correct_count, total_questions);

    Ok(QuizGrade {
        score,
        passed: score >= quiz.passing_score,
        passing_score: quiz.passing_score,
        correct_count,
        total_questions,
        results,
    })
}
