//! Shared error types for the services crate.

use thiserror::Error;

use course_core::grading::GradingError;
use course_core::model::{LessonId, ModuleId, QuizId, ScenarioId, ScenarioSessionId};
use course_core::scenario::ScenarioError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use storage::ContentLoadError;

/// Coarse classification shared by every service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Broken content reached at request time.
    Configuration,
    /// Malformed or inconsistent request; nothing was written.
    InvalidInput,
    /// A referenced id does not exist; nothing was written.
    NotFound,
    /// The progress store failed; the request may be retried.
    Unavailable,
}

fn storage_kind(err: &StorageError) -> ErrorKind {
    if err.is_retryable() {
        ErrorKind::Unavailable
    } else {
        ErrorKind::Configuration
    }
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("module not found: {0}")]
    ModuleNotFound(ModuleId),
    #[error("quiz not found: {0}")]
    QuizNotFound(QuizId),
    #[error("scenario not found: {0}")]
    ScenarioNotFound(ScenarioId),
    #[error("glossary not available")]
    GlossaryNotFound,
    #[error("capstone not available")]
    CapstoneNotFound,
}

impl CatalogError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::NotFound
    }
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("quiz not found: {0}")]
    QuizNotFound(QuizId),
    #[error("module not found: {0}")]
    ModuleNotFound(ModuleId),
    #[error("quiz {quiz} does not belong to module {module}")]
    QuizModuleMismatch { quiz: QuizId, module: ModuleId },
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl QuizServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::QuizNotFound(_) | Self::ModuleNotFound(_) => ErrorKind::NotFound,
            Self::QuizModuleMismatch { .. } => ErrorKind::InvalidInput,
            Self::Grading(GradingError::EmptyQuiz(_)) => ErrorKind::Configuration,
            Self::Grading(_) => ErrorKind::InvalidInput,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `ScenarioService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScenarioServiceError {
    #[error("scenario not found: {0}")]
    ScenarioNotFound(ScenarioId),
    #[error("scenario session not found: {0}")]
    SessionNotFound(ScenarioSessionId),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ScenarioServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ScenarioNotFound(_)
            | Self::SessionNotFound(_)
            | Self::Scenario(ScenarioError::UnknownStep { .. }) => ErrorKind::NotFound,
            Self::Scenario(ScenarioError::ChoiceOutOfRange { .. }) => ErrorKind::InvalidInput,
            Self::Scenario(_) => ErrorKind::Configuration,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("module not found: {0}")]
    ModuleNotFound(ModuleId),
    #[error("lesson {lesson} not found in module {module}")]
    LessonNotFound { module: ModuleId, lesson: LessonId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressServiceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ModuleNotFound(_) | Self::LessonNotFound { .. } => ErrorKind::NotFound,
            Self::Storage(err) => storage_kind(err),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Content(#[from] ContentLoadError),
}
