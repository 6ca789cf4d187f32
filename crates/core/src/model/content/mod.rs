mod module;
mod quiz;
mod scenario;

pub use module::{Badge, Lesson, Module};
pub use quiz::{
    CorrectAnswer, DEFAULT_PASSING_SCORE, LearnerQuestion, LearnerQuestionKind, LearnerQuiz,
    Question, QuestionKind, QuizDefinition,
};
pub use scenario::{Choice, GradeBucket, ScenarioDefinition, Step};
