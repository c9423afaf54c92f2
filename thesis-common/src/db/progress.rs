//! Progress report queries

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{parse_enum, parse_time, parse_uuid};
use crate::models::{Progress, ProgressStatus};
use crate::time::to_db;
use crate::Result;

const COLUMNS: &str = r#"
    id, thesis_id, reviewer_id, progress_description, document_url, status,
    achievement_date, created_at, updated_at
"#;

fn progress_from_row(row: &SqliteRow) -> Result<Progress> {
    let id: String = row.try_get("id")?;
    let thesis_id: String = row.try_get("thesis_id")?;
    let reviewer_id: String = row.try_get("reviewer_id")?;
    let status: String = row.try_get("status")?;
    let achievement_date: String = row.try_get("achievement_date")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Progress {
        id: parse_uuid(&id, "progresses.id")?,
        thesis_id: parse_uuid(&thesis_id, "progresses.thesis_id")?,
        reviewer_id: parse_uuid(&reviewer_id, "progresses.reviewer_id")?,
        progress_description: row.try_get("progress_description")?,
        document_url: row.try_get("document_url")?,
        status: parse_enum(&status, "progresses.status")?,
        achievement_date: parse_time(&achievement_date, "progresses.achievement_date")?,
        created_at: parse_time(&created_at, "progresses.created_at")?,
        updated_at: parse_time(&updated_at, "progresses.updated_at")?,
    })
}

pub async fn insert_progress(conn: &mut SqliteConnection, progress: &Progress) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO progresses (
            id, thesis_id, reviewer_id, progress_description, document_url, status,
            achievement_date, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(progress.id.to_string())
    .bind(progress.thesis_id.to_string())
    .bind(progress.reviewer_id.to_string())
    .bind(&progress.progress_description)
    .bind(&progress.document_url)
    .bind(progress.status.as_str())
    .bind(to_db(&progress.achievement_date))
    .bind(to_db(&progress.created_at))
    .bind(to_db(&progress.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find_progress_by_id(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Progress>> {
    let sql = format!("SELECT {} FROM progresses WHERE id = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(progress_from_row).transpose()
}

/// All reports of a thesis in submission order
pub async fn list_progress_by_thesis(
    conn: &mut SqliteConnection,
    thesis_id: Uuid,
) -> Result<Vec<Progress>> {
    let sql = format!(
        "SELECT {} FROM progresses WHERE thesis_id = ? ORDER BY created_at, rowid",
        COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(thesis_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(progress_from_row).collect()
}

/// Reports of a thesis addressed to one reviewer
pub async fn find_progress_by_reviewer_and_thesis(
    conn: &mut SqliteConnection,
    reviewer_id: Uuid,
    thesis_id: Uuid,
) -> Result<Vec<Progress>> {
    let sql = format!(
        "SELECT {} FROM progresses WHERE reviewer_id = ? AND thesis_id = ? ORDER BY created_at, rowid",
        COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(reviewer_id.to_string())
        .bind(thesis_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(progress_from_row).collect()
}

/// Set a report's status unless it is already Reviewed
///
/// Returns false when the row was already Reviewed (or is missing), so a
/// review can only ever be recorded once.
pub async fn update_progress_status(
    conn: &mut SqliteConnection,
    id: Uuid,
    status: ProgressStatus,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE progresses SET status = ?, updated_at = ?
        WHERE id = ? AND status <> 'Reviewed'
        "#,
    )
    .bind(status.as_str())
    .bind(to_db(&crate::time::now()))
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
