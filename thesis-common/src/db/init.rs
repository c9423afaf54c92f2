//! Database initialization
//!
//! Creates the database file and schema on first run; idempotent on every
//! later start.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) the database at `db_path` and ensure the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// In-memory database with the full schema
///
/// Single connection that is never recycled; every connection to
/// `sqlite::memory:` would otherwise see its own empty database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    crate::db::migrations::run_migrations(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes (CREATE IF NOT EXISTS)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    let mut conn = pool.acquire().await?;

    create_schema_version_table(&mut conn).await?;
    create_students_table(&mut conn).await?;
    create_lectures_table(&mut conn).await?;
    create_admins_table(&mut conn).await?;
    create_theses_table(&mut conn).await?;
    create_thesis_lectures_table(&mut conn).await?;
    create_progresses_table(&mut conn).await?;
    create_comments_table(&mut conn).await?;

    Ok(())
}

async fn create_schema_version_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_students_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            nim TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            department TEXT NOT NULL DEFAULT '',
            year TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_lectures_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lectures (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            nidn TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            department TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_admins_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_theses_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS theses (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL REFERENCES students(id),
            supervisor_id TEXT NOT NULL REFERENCES lectures(id),
            title TEXT NOT NULL,
            abstract TEXT NOT NULL,
            research_field TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'Pending'
                CHECK (status IN ('Pending', 'In Progress', 'Under Review', 'Completed')),
            is_proposal_ready INTEGER NOT NULL DEFAULT 0,
            is_final_exam_ready INTEGER NOT NULL DEFAULT 0,
            submission_date TEXT NOT NULL,
            completed_date TEXT,
            draft_document_url TEXT NOT NULL DEFAULT '',
            final_document_url TEXT NOT NULL DEFAULT '',
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_theses_student ON theses(student_id)")
        .execute(&mut *conn)
        .await?;

    Ok(())
}

async fn create_thesis_lectures_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS thesis_lectures (
            id TEXT PRIMARY KEY,
            thesis_id TEXT NOT NULL REFERENCES theses(id) ON DELETE CASCADE,
            lecture_id TEXT NOT NULL REFERENCES lectures(id),
            role TEXT NOT NULL CHECK (role IN ('Supervisor', 'Examiner')),
            examiner_type TEXT
                CHECK (examiner_type IN ('ProposalDefenseExaminer', 'FinalDefenseExaminer')),
            proposal_defense_approved_at TEXT,
            final_defense_approved_at TEXT,
            finalize_approved_at TEXT,
            created_at TEXT NOT NULL,
            UNIQUE (thesis_id, lecture_id),
            CHECK ((role = 'Examiner') = (examiner_type IS NOT NULL))
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_thesis_lectures_lecture ON thesis_lectures(lecture_id)",
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_progresses_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS progresses (
            id TEXT PRIMARY KEY,
            thesis_id TEXT NOT NULL REFERENCES theses(id) ON DELETE CASCADE,
            reviewer_id TEXT NOT NULL REFERENCES lectures(id),
            progress_description TEXT NOT NULL,
            document_url TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'Pending'
                CHECK (status IN ('Pending', 'Reviewed', 'Rejected')),
            achievement_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_progresses_thesis_reviewer ON progresses(thesis_id, reviewer_id)",
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn create_comments_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            progress_id TEXT NOT NULL REFERENCES progresses(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            user_type TEXT NOT NULL CHECK (user_type IN ('Student', 'Lecture')),
            parent_id TEXT REFERENCES comments(id),
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_progress ON comments(progress_id)")
        .execute(&mut *conn)
        .await?;

    Ok(())
}
