//! Course content read from a directory of JSON documents.
//!
//! Layout:
//!
//! - `modules.json` (required): `{ "modules": [...] }`
//! - `quizzes.json`: `{ "quizzes": { "<quizId>": {...} } }`
//! - `scenarios.json`: a list, an id-keyed map, `{ "scenarios": [...] | {...} }`
//!   or one scenario object
//! - `module{N}_lessons.json`: `{ "lessons": [...] }`, replaces module N's lessons
//! - `glossary.json`: `{ "terms": [...] }`
//! - `capstone.json`: any object
//!
//! Parsing only reshapes documents; every semantic check happens in
//! [`Course::from_documents`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use course_core::model::{
    ContentError, Course, CourseDocuments, Lesson, Module, QuizDefinition, ScenarioDocument,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

pub const MODULES_FILE: &str = "modules.json";
pub const QUIZZES_FILE: &str = "quizzes.json";
pub const SCENARIOS_FILE: &str = "scenarios.json";
pub const GLOSSARY_FILE: &str = "glossary.json";
pub const CAPSTONE_FILE: &str = "capstone.json";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentLoadError {
    #[error("content file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid content format in {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// Validated course plus the display-only documents served alongside it.
#[derive(Debug, Clone, Default)]
pub struct CourseContent {
    pub course: Course,
    pub glossary: Option<Value>,
    pub capstone: Option<Map<String, Value>>,
}

/// Load and validate every content document under `dir`.
///
/// # Errors
///
/// Returns `ContentLoadError` if `modules.json` is missing, a file cannot be
/// read or parsed, a document has the wrong shape, or the assembled course
/// fails validation.
pub fn load_course_dir(dir: &Path) -> Result<CourseContent, ContentLoadError> {
    let modules_path = dir.join(MODULES_FILE);
    let modules_doc = read_json(&modules_path)?.ok_or(ContentLoadError::Missing(modules_path.clone()))?;
    let mut modules: Vec<Module> = parse_list_field(&modules_path, modules_doc, "modules")?;

    for module in &mut modules {
        let lessons_path = dir.join(format!("module{}_lessons.json", module.number));
        if let Some(doc) = read_json(&lessons_path)? {
            module.lessons = parse_list_field::<Lesson>(&lessons_path, doc, "lessons")?;
        }
    }

    let quizzes_path = dir.join(QUIZZES_FILE);
    let quizzes = match read_json(&quizzes_path)? {
        Some(doc) => parse_quizzes(&quizzes_path, doc)?,
        None => Vec::new(),
    };

    let scenarios_path = dir.join(SCENARIOS_FILE);
    let scenarios = match read_json(&scenarios_path)? {
        Some(doc) => parse_scenarios(&scenarios_path, doc)?,
        None => Vec::new(),
    };

    let glossary_path = dir.join(GLOSSARY_FILE);
    let glossary = read_json(&glossary_path)?
        .map(|doc| {
            if doc.get("terms").is_some_and(Value::is_array) {
                Ok(doc)
            } else {
                Err(format_error(&glossary_path, "expected an object with a terms array"))
            }
        })
        .transpose()?;

    let capstone_path = dir.join(CAPSTONE_FILE);
    let capstone = read_json(&capstone_path)?
        .map(|doc| match doc {
            Value::Object(map) => Ok(map),
            _ => Err(format_error(&capstone_path, "expected an object")),
        })
        .transpose()?;

    let course = Course::from_documents(CourseDocuments {
        modules,
        quizzes,
        scenarios,
    })?;

    Ok(CourseContent {
        course,
        glossary,
        capstone,
    })
}

/// `Ok(None)` when the file does not exist.
fn read_json(path: &Path) -> Result<Option<Value>, ContentLoadError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ContentLoadError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| ContentLoadError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn format_error(path: &Path, reason: impl Into<String>) -> ContentLoadError {
    ContentLoadError::Format {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

fn decode<T: DeserializeOwned>(path: &Path, value: Value) -> Result<T, ContentLoadError> {
    serde_json::from_value(value).map_err(|err| format_error(path, err.to_string()))
}

fn parse_list_field<T: DeserializeOwned>(
    path: &Path,
    doc: Value,
    field: &str,
) -> Result<Vec<T>, ContentLoadError> {
    let Value::Object(mut map) = doc else {
        return Err(format_error(path, "expected an object"));
    };
    match map.remove(field) {
        Some(list @ Value::Array(_)) => decode(path, list),
        _ => Err(format_error(path, format!("expected a {field} array"))),
    }
}

/// Entries of an id-keyed map, with the key filled in as `id` when absent.
fn keyed_entries(path: &Path, map: Map<String, Value>) -> Result<Vec<Value>, ContentLoadError> {
    map.into_iter()
        .map(|(key, entry)| match entry {
            Value::Object(mut fields) => {
                fields.entry("id").or_insert(Value::String(key));
                Ok(Value::Object(fields))
            }
            _ => Err(format_error(path, format!("entry {key} is not an object"))),
        })
        .collect()
}

fn parse_quizzes(path: &Path, doc: Value) -> Result<Vec<QuizDefinition>, ContentLoadError> {
    let Value::Object(mut map) = doc else {
        return Err(format_error(path, "expected an object"));
    };
    let Some(Value::Object(quizzes)) = map.remove("quizzes") else {
        return Err(format_error(path, "expected a quizzes object"));
    };
    keyed_entries(path, quizzes)?
        .into_iter()
        .map(|entry| decode(path, entry))
        .collect()
}

fn parse_scenarios(path: &Path, doc: Value) -> Result<Vec<ScenarioDocument>, ContentLoadError> {
    let entries = match doc {
        Value::Array(list) => list,
        Value::Object(mut map) => match map.remove("scenarios") {
            Some(Value::Array(list)) => list,
            Some(Value::Object(keyed)) => keyed_entries(path, keyed)?,
            Some(_) => return Err(format_error(path, "scenarios must be a list or an object")),
            None if map.contains_key("steps") => vec![Value::Object(map)],
            None => keyed_entries(path, map)?,
        },
        _ => return Err(format_error(path, "expected a list or an object")),
    };
    entries
        .into_iter()
        .map(|mut entry| {
            prefer_short_next_step(&mut entry);
            decode(path, entry)
        })
        .collect()
}

/// When a choice carries both `nextStep` and `nextStepId`, `nextStep` wins.
fn prefer_short_next_step(scenario: &mut Value) {
    let Some(steps) = scenario.get_mut("steps").and_then(Value::as_array_mut) else {
        return;
    };
    let choices = steps
        .iter_mut()
        .filter_map(|step| step.get_mut("choices").and_then(Value::as_array_mut))
        .flatten()
        .filter_map(Value::as_object_mut);
    for choice in choices {
        if choice.contains_key("nextStep") {
            choice.remove("nextStepId");
        }
    }
}
