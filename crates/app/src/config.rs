use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;

/// Command-line configuration. Every flag also reads from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "course-server", version, about = "Course assessment and progress API")]
pub struct Config {
    /// `SQLite` URL or path for learner progress.
    #[arg(long = "db", env = "COURSE_DB_URL", default_value = "sqlite://course.sqlite3")]
    pub db_url: String,

    /// Directory holding modules.json, quizzes.json, scenarios.json and lesson files.
    #[arg(long = "content", env = "COURSE_CONTENT_DIR", default_value = "data/course_content")]
    pub content_dir: PathBuf,

    /// Address to listen on.
    #[arg(long, env = "COURSE_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// Allowed CORS origin; repeat for more than one.
    #[arg(
        long = "allow-origin",
        default_values_t = [
            "http://localhost:5173".to_string(),
            "http://localhost:3000".to_string(),
        ]
    )]
    pub allow_origins: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Turn a bare or relative path into an absolute `sqlite://` URL.
#[must_use]
pub fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_string();
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file and its parent directory so `SQLite` can open it.
///
/// # Errors
///
/// Returns `ConfigError::InvalidDbUrl` for a URL without a path, or an I/O
/// error if the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ConfigError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ConfigError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let config = Config::try_parse_from(["course-server"]).unwrap();
        assert_eq!(config.bind.port(), 8000);
        assert_eq!(config.allow_origins.len(), 2);
        assert_eq!(config.content_dir, PathBuf::from("data/course_content"));
    }

    #[test]
    fn repeated_origins_replace_defaults() {
        let config = Config::try_parse_from([
            "course-server",
            "--allow-origin",
            "https://course.example",
            "--bind",
            "0.0.0.0:9000",
        ])
        .unwrap();
        assert_eq!(config.allow_origins, ["https://course.example"]);
        assert_eq!(config.bind.port(), 9000);
    }

    #[test]
    fn urls_are_normalized_to_absolute_paths() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/course.db"),
            "sqlite:///tmp/course.db"
        );
        assert_eq!(normalize_sqlite_url("/var/course.db"), "sqlite:///var/course.db");
        assert!(normalize_sqlite_url("course.db").starts_with("sqlite:///"));
    }

    #[test]
    fn prepare_creates_file_and_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("course.sqlite3");
        prepare_sqlite_file(&format!("sqlite://{}", path.display())).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn prepare_rejects_empty_path() {
        assert!(prepare_sqlite_file("sqlite://").is_err());
    }
}
