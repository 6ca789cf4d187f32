use serde::{Deserialize, Serialize};

use crate::model::ids::{BadgeId, LessonId, ModuleId, QuizId, ScenarioId};

/// Achievement attached to a module, awarded when the module is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: BadgeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

/// A single lesson. Sections are presentation content and are carried through
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sections: Vec<serde_json::Value>,
}

/// A top-level course unit.
///
/// `number` is mandatory: content without it is rejected at load instead of
/// being inferred from the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: ModuleId,
    pub number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<QuizId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_id: Option<ScenarioId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
}

impl Module {
    #[must_use]
    pub fn total_lessons(&self) -> usize {
        self.lessons.len()
    }

    #[must_use]
    pub fn has_lesson(&self, lesson_id: &LessonId) -> bool {
        self.lessons.iter().any(|lesson| &lesson.id == lesson_id)
    }

    pub fn lesson_ids(&self) -> impl Iterator<Item = &LessonId> {
        self.lessons.iter().map(|lesson| &lesson.id)
    }

    #[must_use]
    pub fn badge_id(&self) -> Option<&BadgeId> {
        self.badge.as_ref().map(|badge| &badge.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_requires_number() {
        let raw = r#"{ "id": "module-1", "title": "Foundations" }"#;
        assert!(serde_json::from_str::<Module>(raw).is_err());
    }

    #[test]
    fn module_reads_camel_case_fields() {
        let raw = r#"{
            "id": "module-2",
            "number": 2,
            "title": "Govern",
            "quizId": "quiz-2",
            "badge": { "id": "governor", "name": "Governor", "emoji": "🏛" },
            "lessons": [{ "id": "l1", "title": "Intro" }, { "id": "l2" }]
        }"#;
        let module: Module = serde_json::from_str(raw).unwrap();
        assert_eq!(module.quiz_id, Some(QuizId::new("quiz-2")));
        assert_eq!(module.badge_id(), Some(&BadgeId::new("governor")));
        assert_eq!(module.total_lessons(), 2);
        assert!(module.has_lesson(&LessonId::new("l2")));
        assert!(!module.has_lesson(&LessonId::new("l3")));
    }
}
