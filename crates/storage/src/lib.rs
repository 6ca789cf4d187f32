pub mod content;
pub mod repository;
pub mod sqlite;

pub use content::{ContentLoadError, CourseContent, load_course_dir};
pub use repository::{InMemoryProgressStore, ProgressStore, Storage, StorageError, update_with};
