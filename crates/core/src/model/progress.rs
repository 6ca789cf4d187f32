use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::content::GradeBucket;
use crate::model::ids::{BadgeId, LessonId, ModuleId, ScenarioId};

/// Learner-level bookkeeping. Display only; never used in derivation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProgress {
    pub started_at: Option<DateTime<Utc>>,
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Raw per-module counters.
///
/// Completion and status are never stored here; they are derived on every
/// read from these counters and the module definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleProgress {
    pub lessons_completed: BTreeSet<LessonId>,
    pub quiz_score: Option<u32>,
    pub quiz_attempts: u32,
    pub quiz_passed: bool,
    pub badge_earned: bool,
    /// First time the module was observed complete by a write.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ModuleProgress {
    /// Fold one graded attempt into the counters.
    ///
    /// The latest score wins (retakes overwrite), the attempt counter always
    /// increments and `quiz_passed` never regresses. Returns `true` when this
    /// attempt is the first passing one.
    pub fn record_quiz_attempt(&mut self, score: u32, passed: bool) -> bool {
        let first_pass = passed && !self.quiz_passed;
        self.quiz_attempts = self.quiz_attempts.saturating_add(1);
        self.quiz_score = Some(score);
        self.quiz_passed = self.quiz_passed || passed;
        first_pass
    }

    /// Any lesson, attempt or recorded score.
    #[must_use]
    pub fn has_activity(&self) -> bool {
        !self.lessons_completed.is_empty() || self.quiz_attempts > 0 || self.quiz_score.is_some()
    }
}

/// Last finished run of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioProgress {
    pub score: i64,
    pub max_score: i64,
    pub grade: GradeBucket,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// The single persisted learner document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    pub user: UserProgress,
    pub modules: BTreeMap<ModuleId, ModuleProgress>,
    pub scenarios: BTreeMap<ScenarioId, ScenarioProgress>,
    pub capstone: Map<String, Value>,
    pub badges: BTreeSet<BadgeId>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            user: UserProgress::default(),
            modules: BTreeMap::new(),
            scenarios: BTreeMap::new(),
            capstone: default_capstone(),
            badges: BTreeSet::new(),
        }
    }
}

fn default_capstone() -> Map<String, Value> {
    let mut capstone = Map::new();
    capstone.insert("started".into(), Value::Bool(false));
    capstone.insert("currentStep".into(), Value::Null);
    capstone.insert("selectedSystem".into(), Value::Null);
    capstone.insert("responses".into(), Value::Object(Map::new()));
    capstone
}

impl Progress {
    #[must_use]
    pub fn module(&self, id: &ModuleId) -> Option<&ModuleProgress> {
        self.modules.get(id)
    }

    /// Counters for the module, created empty on first touch.
    pub fn module_mut(&mut self, id: &ModuleId) -> &mut ModuleProgress {
        self.modules.entry(id.clone()).or_default()
    }

    #[must_use]
    pub fn scenario(&self, id: &ScenarioId) -> Option<&ScenarioProgress> {
        self.scenarios.get(id)
    }

    /// Store a finished scenario run, replacing any earlier one.
    pub fn record_scenario(&mut self, id: &ScenarioId, result: ScenarioProgress) {
        self.scenarios.insert(id.clone(), result);
    }

    /// Add a badge to the notification cache. Returns `true` if it was not
    /// there yet.
    pub fn award_badge(&mut self, badge: &BadgeId) -> bool {
        self.badges.insert(badge.clone())
    }

    /// Shallow-merge learner capstone state; keys present in `update` replace
    /// stored ones.
    pub fn merge_capstone(&mut self, update: Map<String, Value>) {
        for (key, value) in update {
            self.capstone.insert(key, value);
        }
    }

    /// Stamp `started_at` the first time the learner does anything.
    pub fn mark_started(&mut self, at: DateTime<Utc>) {
        if self.user.started_at.is_none() {
            self.user.started_at = Some(at);
        }
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.user.last_active_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn retake_overwrites_score_but_not_pass() {
        let mut m = ModuleProgress::default();
        assert!(!m.record_quiz_attempt(60, false));
        assert!(m.record_quiz_attempt(80, true));
        assert!(!m.record_quiz_attempt(50, false));

        assert_eq!(m.quiz_attempts, 3);
        assert_eq!(m.quiz_score, Some(50));
        assert!(m.quiz_passed);
    }

    #[test]
    fn second_pass_is_not_first_pass() {
        let mut m = ModuleProgress::default();
        assert!(m.record_quiz_attempt(90, true));
        assert!(!m.record_quiz_attempt(100, true));
    }

    #[test]
    fn default_document_round_trips_camel_case() {
        let progress = Progress::default();
        let json = serde_json::to_value(&progress).unwrap();
        assert_eq!(json["capstone"]["started"], Value::Bool(false));
        assert!(json["user"]["startedAt"].is_null());
        assert!(json["modules"].as_object().unwrap().is_empty());

        let back: Progress = serde_json::from_value(json).unwrap();
        assert_eq!(back, progress);
    }

    #[test]
    fn missing_fields_read_as_defaults() {
        let raw = r#"{ "modules": { "module-1": { "quizAttempts": 2 } } }"#;
        let progress: Progress = serde_json::from_str(raw).unwrap();
        let m = progress.module(&ModuleId::new("module-1")).unwrap();
        assert_eq!(m.quiz_attempts, 2);
        assert!(m.lessons_completed.is_empty());
        assert!(progress.badges.is_empty());
    }

    #[test]
    fn started_at_is_stamped_once() {
        let mut progress = Progress::default();
        let first = fixed_now();
        progress.mark_started(first);
        progress.mark_started(first + chrono::Duration::days(1));
        assert_eq!(progress.user.started_at, Some(first));
    }

    #[test]
    fn capstone_merge_is_shallow() {
        let mut progress = Progress::default();
        let mut update = Map::new();
        update.insert("started".into(), Value::Bool(true));
        update.insert("selectedSystem".into(), Value::String("triage-bot".into()));
        progress.merge_capstone(update);

        assert_eq!(progress.capstone["started"], Value::Bool(true));
        assert_eq!(progress.capstone["selectedSystem"], "triage-bot");
        assert!(progress.capstone.contains_key("responses"));
    }
}
