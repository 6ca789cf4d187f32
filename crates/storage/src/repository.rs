use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::Progress;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Whether the same request may succeed if sent again.
    ///
    /// A document that cannot be decoded will not fix itself; a busy or
    /// unreachable backend might.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

/// Contract for the single learner progress document.
///
/// `atomic_update` is indivisible relative to other updates on the same
/// store: the mutation sees the latest committed document and its result is
/// committed before the call returns.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Current document, or `Progress::default()` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be loaded or decoded.
    async fn read(&self) -> Result<Progress, StorageError>;

    /// Apply `mutation` exactly once and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be loaded or written; in
    /// that case nothing is persisted.
    async fn atomic_update(
        &self,
        mutation: &mut (dyn for<'p> FnMut(&'p mut Progress) + Send),
    ) -> Result<Progress, StorageError>;

    /// Discard all learner state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored document cannot be removed.
    async fn reset(&self) -> Result<Progress, StorageError>;
}

/// Run one atomic update and hand back both the new document and whatever
/// `mutation` returned.
///
/// Stamps `user.startedAt` on the first write and `user.lastActiveAt` on
/// every write.
///
/// # Errors
///
/// Returns `StorageError` from the underlying store.
pub async fn update_with<T, F>(
    store: &dyn ProgressStore,
    now: DateTime<Utc>,
    mutation: F,
) -> Result<(Progress, T), StorageError>
where
    T: Send,
    F: FnOnce(&mut Progress) -> T + Send,
{
    let mut mutation = Some(mutation);
    let mut output = None;
    let mut apply = |progress: &mut Progress| {
        if let Some(f) = mutation.take() {
            progress.mark_started(now);
            progress.touch(now);
            output = Some(f(progress));
        }
    };
    let progress = store.atomic_update(&mut apply).await?;
    let output = output.ok_or_else(|| {
        StorageError::Connection("progress store did not apply the update".into())
    })?;
    Ok((progress, output))
}

/// Simple in-memory store for tests and throwaway sessions.
#[derive(Clone, Default)]
pub struct InMemoryProgressStore {
    document: Arc<Mutex<Progress>>,
}

impl InMemoryProgressStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn read(&self) -> Result<Progress, StorageError> {
        let guard = self
            .document
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn atomic_update(
        &self,
        mutation: &mut (dyn for<'p> FnMut(&'p mut Progress) + Send),
    ) -> Result<Progress, StorageError> {
        let mut guard = self
            .document
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut next = guard.clone();
        mutation(&mut next);
        *guard = next.clone();
        Ok(next)
    }

    async fn reset(&self) -> Result<Progress, StorageError> {
        let mut guard = self
            .document
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Progress::default();
        Ok(guard.clone())
    }
}

/// Aggregate of storage backends handed to the service layer.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressStore> = Arc::new(InMemoryProgressStore::new());
        Self { progress }
    }
}
