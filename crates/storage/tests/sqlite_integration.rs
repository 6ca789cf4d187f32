use chrono::Duration;
use course_core::model::{
    BadgeId, GradeBucket, LessonId, ModuleId, Progress, ScenarioId, ScenarioProgress,
};
use course_core::time::fixed_now;
use serde_json::{Map, Value};
use storage::repository::{ProgressStore, update_with};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn sqlite_reads_defaults_before_first_write() {
    let repo = connect("memdb_defaults").await;
    assert_eq!(repo.read().await.unwrap(), Progress::default());
}

#[tokio::test]
async fn sqlite_roundtrips_full_document() {
    let repo = connect("memdb_roundtrip").await;
    let module = ModuleId::new("module-1");

    let (written, first_pass) = update_with(&repo, fixed_now(), |p| {
        let m = p.module_mut(&module);
        m.lessons_completed.insert(LessonId::new("1-1"));
        let first = m.record_quiz_attempt(80, true);
        p.award_badge(&BadgeId::new("foundations"));
        p.record_scenario(
            &ScenarioId::new("sc-1"),
            ScenarioProgress {
                score: 18,
                max_score: 20,
                grade: GradeBucket::Excellent,
                completed_at: Some(fixed_now()),
            },
        );
        let mut capstone = Map::new();
        capstone.insert("started".into(), Value::Bool(true));
        p.merge_capstone(capstone);
        first
    })
    .await
    .unwrap();

    assert!(first_pass);
    let read = repo.read().await.unwrap();
    assert_eq!(read, written);
    assert_eq!(read.module(&module).unwrap().quiz_score, Some(80));
    assert_eq!(read.capstone["started"], Value::Bool(true));
    assert_eq!(read.user.started_at, Some(fixed_now()));
}

#[tokio::test]
async fn sqlite_updates_see_previous_writes() {
    let repo = connect("memdb_sequential").await;
    let module = ModuleId::new("module-1");
    for (i, score) in [60_u32, 80, 50].into_iter().enumerate() {
        let at = fixed_now() + Duration::minutes(i64::try_from(i).unwrap());
        update_with(&repo, at, |p| {
            p.module_mut(&module).record_quiz_attempt(score, score >= 70);
        })
        .await
        .unwrap();
    }

    let progress = repo.read().await.unwrap();
    let m = progress.module(&module).unwrap();
    assert_eq!(m.quiz_attempts, 3);
    assert_eq!(m.quiz_score, Some(50));
    assert!(m.quiz_passed);
    assert_eq!(progress.user.started_at, Some(fixed_now()));
    assert_eq!(
        progress.user.last_active_at,
        Some(fixed_now() + Duration::minutes(2))
    );
}

#[tokio::test]
async fn sqlite_concurrent_updates_are_serialized() {
    let repo = connect("memdb_concurrent").await;
    let mut handles = Vec::new();
    for _ in 0..10 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            update_with(&repo, fixed_now(), |p| {
                p.module_mut(&ModuleId::new("module-1")).quiz_attempts += 1;
            })
            .await
            .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    let progress = repo.read().await.unwrap();
    assert_eq!(
        progress.module(&ModuleId::new("module-1")).unwrap().quiz_attempts,
        10
    );
}

#[tokio::test]
async fn sqlite_reset_clears_document() {
    let repo = connect("memdb_reset").await;
    update_with(&repo, fixed_now(), |p| {
        p.award_badge(&BadgeId::new("foundations"));
    })
    .await
    .unwrap();

    assert_eq!(repo.reset().await.unwrap(), Progress::default());
    assert_eq!(repo.read().await.unwrap(), Progress::default());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn file_database_survives_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.db");
    std::fs::File::create(&path).unwrap();
    let url = format!("sqlite://{}", path.display());
    let module = ModuleId::new("module-1");

    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    update_with(&repo, fixed_now(), |p| {
        p.module_mut(&module).lessons_completed.insert(LessonId::new("1-1"));
    })
    .await
    .unwrap();
    drop(repo);

    let reopened = SqliteRepository::connect(&url).await.expect("reconnect");
    let progress = reopened.read().await.unwrap();
    assert!(progress.module(&module).unwrap().lessons_completed.contains(&LessonId::new("1-1")));
}

#[tokio::test]
async fn missing_database_file_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("absent.db").display());
    assert!(SqliteRepository::connect(&url).await.is_err());
}
