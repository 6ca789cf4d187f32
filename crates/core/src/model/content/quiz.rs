use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, QuizId};

/// Passing threshold applied when a quiz does not declare its own.
pub const DEFAULT_PASSING_SCORE: u32 = 70;

fn default_passing_score() -> u32 {
    DEFAULT_PASSING_SCORE
}

/// Answer key of a question, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        #[serde(rename = "correctIndex")]
        correct_index: usize,
    },
    TrueFalse {
        #[serde(rename = "correctAnswer")]
        correct_answer: bool,
    },
    MultiSelect {
        options: Vec<String>,
        #[serde(rename = "correctIndices")]
        correct_indices: BTreeSet<usize>,
    },
}

impl QuestionKind {
    /// The canonical correct answer, as shown in review.
    #[must_use]
    pub fn correct_answer(&self) -> CorrectAnswer {
        match self {
            QuestionKind::MultipleChoice { correct_index, .. } => {
                CorrectAnswer::Index(*correct_index)
            }
            QuestionKind::TrueFalse { correct_answer } => CorrectAnswer::Flag(*correct_answer),
            QuestionKind::MultiSelect {
                correct_indices, ..
            } => CorrectAnswer::Indices(correct_indices.iter().copied().collect()),
        }
    }
}

/// Correct answer echoed back after grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Flag(bool),
    Index(usize),
    Indices(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(default)]
    pub question: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDefinition {
    pub id: QuizId,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_passing_score")]
    pub passing_score: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuizDefinition {
    #[must_use]
    pub fn question(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| &q.id == id)
    }

    /// Copy of the quiz safe to hand to a learner before grading: answer keys
    /// and explanations are stripped.
    #[must_use]
    pub fn learner_view(&self) -> LearnerQuiz {
        LearnerQuiz {
            id: self.id.clone(),
            title: self.title.clone(),
            passing_score: self.passing_score,
            questions: self
                .questions
                .iter()
                .map(|q| LearnerQuestion {
                    id: q.id.clone(),
                    question: q.question.clone(),
                    kind: match &q.kind {
                        QuestionKind::MultipleChoice { options, .. } => {
                            LearnerQuestionKind::MultipleChoice {
                                options: options.clone(),
                            }
                        }
                        QuestionKind::TrueFalse { .. } => LearnerQuestionKind::TrueFalse,
                        QuestionKind::MultiSelect { options, .. } => {
                            LearnerQuestionKind::MultiSelect {
                                options: options.clone(),
                            }
                        }
                    },
                })
                .collect(),
        }
    }
}

/// Sanitized quiz as served to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerQuiz {
    pub id: QuizId,
    pub title: String,
    pub passing_score: u32,
    pub questions: Vec<LearnerQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LearnerQuestion {
    pub id: QuestionId,
    pub question: String,
    #[serde(flatten)]
    pub kind: LearnerQuestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LearnerQuestionKind {
    MultipleChoice { options: Vec<String> },
    TrueFalse,
    MultiSelect { options: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUIZ: &str = r#"{
        "id": "quiz-1",
        "title": "Module 1 check",
        "questions": [
            { "id": "q1", "type": "multiple_choice", "question": "Pick one",
              "options": ["a", "b", "c"], "correctIndex": 1, "explanation": "b it is" },
            { "id": "q2", "type": "true_false", "question": "True?", "correctAnswer": true },
            { "id": "q3", "type": "multi_select", "question": "Pick many",
              "options": ["a", "b", "c"], "correctIndices": [2, 0, 2] }
        ]
    }"#;

    #[test]
    fn passing_score_defaults_to_seventy() {
        let quiz: QuizDefinition = serde_json::from_str(QUIZ).unwrap();
        assert_eq!(quiz.passing_score, DEFAULT_PASSING_SCORE);
        assert_eq!(quiz.questions.len(), 3);
    }

    #[test]
    fn multi_select_indices_collapse_duplicates() {
        let quiz: QuizDefinition = serde_json::from_str(QUIZ).unwrap();
        let q3 = quiz.question(&QuestionId::new("q3")).unwrap();
        assert_eq!(q3.kind.correct_answer(), CorrectAnswer::Indices(vec![0, 2]));
    }

    #[test]
    fn learner_view_hides_answer_keys() {
        let quiz: QuizDefinition = serde_json::from_str(QUIZ).unwrap();
        let json = serde_json::to_value(quiz.learner_view()).unwrap();
        let text = json.to_string();
        assert!(!text.contains("correctIndex"));
        assert!(!text.contains("correctAnswer"));
        assert!(!text.contains("correctIndices"));
        assert!(!text.contains("explanation"));
        assert_eq!(json["questions"][1]["type"], "true_false");
        assert_eq!(json["questions"][0]["options"][2], "c");
    }
}
