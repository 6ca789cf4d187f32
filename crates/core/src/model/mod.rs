pub mod content;
mod course;
mod ids;
mod progress;

pub use content::{
    Badge, Choice, CorrectAnswer, DEFAULT_PASSING_SCORE, GradeBucket, LearnerQuiz, Lesson, Module,
    Question, QuestionKind, QuizDefinition, ScenarioDefinition, Step,
};
pub use course::{ContentError, Course, CourseDocuments, ScenarioDocument};
pub use ids::{
    BadgeId, LessonId, ModuleId, ParseIdError, QuestionId, QuizId, ScenarioId, ScenarioSessionId,
    StepId,
};
pub use progress::{ModuleProgress, Progress, ScenarioProgress, UserProgress};
