use std::sync::Arc;

use course_core::model::{
    LearnerQuiz, Lesson, Module, ModuleId, QuizId, ScenarioDefinition, ScenarioId,
};
use serde_json::{Map, Value};
use storage::CourseContent;

use crate::error::CatalogError;

/// Read-only access to loaded course content.
#[derive(Clone)]
pub struct CatalogService {
    content: Arc<CourseContent>,
}

impl CatalogService {
    #[must_use]
    pub fn new(content: Arc<CourseContent>) -> Self {
        Self { content }
    }

    /// Modules ordered by number.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        self.content.course.modules()
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ModuleNotFound` for an unknown module.
    pub fn lessons(&self, module_id: &ModuleId) -> Result<&[Lesson], CatalogError> {
        self.content
            .course
            .module(module_id)
            .map(|m| m.lessons.as_slice())
            .ok_or_else(|| CatalogError::ModuleNotFound(module_id.clone()))
    }

    /// Quiz as shown to the learner, without answers or explanations.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::QuizNotFound` for an unknown quiz.
    pub fn quiz(&self, quiz_id: &QuizId) -> Result<LearnerQuiz, CatalogError> {
        self.content
            .course
            .quiz(quiz_id)
            .map(|q| q.learner_view())
            .ok_or_else(|| CatalogError::QuizNotFound(quiz_id.clone()))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::ScenarioNotFound` for an unknown scenario.
    pub fn scenario(&self, scenario_id: &ScenarioId) -> Result<&ScenarioDefinition, CatalogError> {
        self.content
            .course
            .scenario(scenario_id)
            .ok_or_else(|| CatalogError::ScenarioNotFound(scenario_id.clone()))
    }

    /// # Errors
    ///
    /// Returns `CatalogError::GlossaryNotFound` when no glossary was loaded.
    pub fn glossary(&self) -> Result<&Value, CatalogError> {
        self.content
            .glossary
            .as_ref()
            .ok_or(CatalogError::GlossaryNotFound)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::CapstoneNotFound` when no capstone was loaded.
    pub fn capstone(&self) -> Result<&Map<String, Value>, CatalogError> {
        self.content
            .capstone
            .as_ref()
            .ok_or(CatalogError::CapstoneNotFound)
    }
}
