#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod progress_service;
pub mod quiz_service;
pub mod scenario_service;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use error::{
    AppServicesError, CatalogError, ErrorKind, ProgressServiceError, QuizServiceError,
    ScenarioServiceError,
};
pub use progress_service::ProgressService;
pub use quiz_service::{EarnedBadge, QuizService, QuizSubmission};
pub use scenario_service::{
    ChoiceRequest, ChoiceResponse, ScenarioService, ScenarioSessions, ScenarioStart,
    SessionChoiceResponse, SessionStart,
};
