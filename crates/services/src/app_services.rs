use std::path::Path;
use std::sync::Arc;

use storage::repository::Storage;
use storage::{CourseContent, load_course_dir};
use tracing::info;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::quiz_service::QuizService;
use crate::scenario_service::{ScenarioService, ScenarioSessions};

/// Assembles app-facing services over one course and one progress store.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    quizzes: Arc<QuizService>,
    scenarios: Arc<ScenarioService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Load content from `content_dir` and open `SQLite` progress storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the content fails to load or validate,
    /// or if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        content_dir: &Path,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let content = load_course_dir(content_dir)?;
        info!(
            modules = content.course.modules().len(),
            quizzes = content.course.quizzes().count(),
            scenarios = content.course.scenarios().count(),
            "course content loaded"
        );
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_parts(content, &storage, clock))
    }

    /// Wire services over already-loaded content and storage.
    #[must_use]
    pub fn from_parts(content: CourseContent, storage: &Storage, clock: Clock) -> Self {
        let content = Arc::new(content);
        let sessions = Arc::new(ScenarioSessions::new());
        Self {
            catalog: Arc::new(CatalogService::new(Arc::clone(&content))),
            quizzes: Arc::new(QuizService::new(
                clock,
                Arc::clone(&content),
                Arc::clone(&storage.progress),
            )),
            scenarios: Arc::new(ScenarioService::new(
                clock,
                Arc::clone(&content),
                Arc::clone(&storage.progress),
                Arc::clone(&sessions),
            )),
            progress: Arc::new(ProgressService::new(
                clock,
                content,
                Arc::clone(&storage.progress),
                sessions,
            )),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn quizzes(&self) -> Arc<QuizService> {
        Arc::clone(&self.quizzes)
    }

    #[must_use]
    pub fn scenarios(&self) -> Arc<ScenarioService> {
        Arc::clone(&self.scenarios)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
