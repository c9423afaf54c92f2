//! Thesis queries

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

use super::{opt_time_to_db, parse_enum, parse_opt_time, parse_time, parse_uuid};
use crate::models::{LectureRole, Thesis};
use crate::time::to_db;
use crate::{Error, Result};

const THESIS_COLUMNS: &str = r#"
    t.id, t.student_id, t.supervisor_id, t.title, t.abstract, t.research_field,
    t.status, t.is_proposal_ready, t.is_final_exam_ready, t.submission_date,
    t.completed_date, t.draft_document_url, t.final_document_url, t.version,
    t.created_at, t.updated_at
"#;

fn thesis_from_row(row: &SqliteRow) -> Result<Thesis> {
    let id: String = row.try_get("id")?;
    let student_id: String = row.try_get("student_id")?;
    let supervisor_id: String = row.try_get("supervisor_id")?;
    let status: String = row.try_get("status")?;
    let submission_date: String = row.try_get("submission_date")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Thesis {
        id: parse_uuid(&id, "theses.id")?,
        student_id: parse_uuid(&student_id, "theses.student_id")?,
        supervisor_id: parse_uuid(&supervisor_id, "theses.supervisor_id")?,
        title: row.try_get("title")?,
        abstract_text: row.try_get("abstract")?,
        research_field: row.try_get("research_field")?,
        status: parse_enum(&status, "theses.status")?,
        is_proposal_ready: row.try_get("is_proposal_ready")?,
        is_final_exam_ready: row.try_get("is_final_exam_ready")?,
        submission_date: parse_time(&submission_date, "theses.submission_date")?,
        completed_date: parse_opt_time(row.try_get("completed_date")?, "theses.completed_date")?,
        draft_document_url: row.try_get("draft_document_url")?,
        final_document_url: row.try_get("final_document_url")?,
        created_at: parse_time(&created_at, "theses.created_at")?,
        updated_at: parse_time(&updated_at, "theses.updated_at")?,
        version: row.try_get("version")?,
        lectures: Vec::new(),
    })
}

/// Insert a new thesis row
pub async fn insert_thesis(conn: &mut SqliteConnection, thesis: &Thesis) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO theses (
            id, student_id, supervisor_id, title, abstract, research_field, status,
            is_proposal_ready, is_final_exam_ready, submission_date, completed_date,
            draft_document_url, final_document_url, version, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(thesis.id.to_string())
    .bind(thesis.student_id.to_string())
    .bind(thesis.supervisor_id.to_string())
    .bind(&thesis.title)
    .bind(&thesis.abstract_text)
    .bind(&thesis.research_field)
    .bind(thesis.status.as_str())
    .bind(thesis.is_proposal_ready)
    .bind(thesis.is_final_exam_ready)
    .bind(to_db(&thesis.submission_date))
    .bind(opt_time_to_db(&thesis.completed_date))
    .bind(&thesis.draft_document_url)
    .bind(&thesis.final_document_url)
    .bind(thesis.version)
    .bind(to_db(&thesis.created_at))
    .bind(to_db(&thesis.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Thesis row only (assignments not loaded)
pub async fn find_thesis_by_id(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Thesis>> {
    let sql = format!("SELECT {} FROM theses t WHERE t.id = ?", THESIS_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(thesis_from_row).transpose()
}

/// Thesis with its lecturer assignments
pub async fn load_thesis(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Thesis>> {
    let Some(mut thesis) = find_thesis_by_id(conn, id).await? else {
        return Ok(None);
    };
    thesis.lectures = super::find_thesis_lectures_by_thesis_id(conn, id).await?;
    Ok(Some(thesis))
}

/// Write back a thesis read earlier, checked against its version
///
/// Fails with `Conflict` if the row changed since it was read. On success
/// `thesis.version` and `thesis.updated_at` reflect the stored row.
pub async fn update_thesis(conn: &mut SqliteConnection, thesis: &mut Thesis) -> Result<()> {
    let updated_at = crate::time::now();
    let result = sqlx::query(
        r#"
        UPDATE theses SET
            title = ?, abstract = ?, research_field = ?, status = ?,
            is_proposal_ready = ?, is_final_exam_ready = ?, completed_date = ?,
            draft_document_url = ?, final_document_url = ?,
            version = version + 1, updated_at = ?
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(&thesis.title)
    .bind(&thesis.abstract_text)
    .bind(&thesis.research_field)
    .bind(thesis.status.as_str())
    .bind(thesis.is_proposal_ready)
    .bind(thesis.is_final_exam_ready)
    .bind(opt_time_to_db(&thesis.completed_date))
    .bind(&thesis.draft_document_url)
    .bind(&thesis.final_document_url)
    .bind(to_db(&updated_at))
    .bind(thesis.id.to_string())
    .bind(thesis.version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict(format!(
            "thesis {} was modified concurrently",
            thesis.id
        )));
    }

    thesis.version += 1;
    thesis.updated_at = updated_at;
    Ok(())
}

async fn fetch_theses(
    conn: &mut SqliteConnection,
    sql: &str,
    binds: &[String],
) -> Result<Vec<Thesis>> {
    let mut query = sqlx::query(sql);
    for value in binds {
        query = query.bind(value);
    }
    let rows = query.fetch_all(&mut *conn).await?;

    let mut theses = rows.iter().map(thesis_from_row).collect::<Result<Vec<_>>>()?;
    attach_lectures(conn, &mut theses).await?;
    Ok(theses)
}

/// Fill `lectures` for a batch of theses with one query
async fn attach_lectures(conn: &mut SqliteConnection, theses: &mut [Thesis]) -> Result<()> {
    if theses.is_empty() {
        return Ok(());
    }

    let mut by_thesis: HashMap<Uuid, Vec<_>> = HashMap::new();
    for tl in super::list_all_thesis_lectures(conn).await? {
        by_thesis.entry(tl.thesis_id).or_default().push(tl);
    }
    for thesis in theses.iter_mut() {
        thesis.lectures = by_thesis.remove(&thesis.id).unwrap_or_default();
    }
    Ok(())
}

/// All theses, newest first, with assignments
pub async fn list_theses(conn: &mut SqliteConnection) -> Result<Vec<Thesis>> {
    let sql = format!(
        "SELECT {} FROM theses t ORDER BY t.created_at DESC, t.rowid DESC",
        THESIS_COLUMNS
    );
    fetch_theses(conn, &sql, &[]).await
}

/// Theses owned by one student, newest first, with assignments
pub async fn list_theses_by_student(
    conn: &mut SqliteConnection,
    student_id: Uuid,
) -> Result<Vec<Thesis>> {
    let sql = format!(
        "SELECT {} FROM theses t WHERE t.student_id = ? ORDER BY t.created_at DESC, t.rowid DESC",
        THESIS_COLUMNS
    );
    fetch_theses(conn, &sql, &[student_id.to_string()]).await
}

/// Theses a lecturer is assigned to, optionally restricted to one role
///
/// Each thesis appears once even if the lecturer is also its nominated
/// supervisor.
pub async fn list_theses_by_lecture(
    conn: &mut SqliteConnection,
    lecture_id: Uuid,
    role: Option<LectureRole>,
) -> Result<Vec<Thesis>> {
    match role {
        Some(role) => {
            let sql = format!(
                r#"
                SELECT {} FROM theses t
                WHERE EXISTS (
                    SELECT 1 FROM thesis_lectures tl
                    WHERE tl.thesis_id = t.id AND tl.lecture_id = ? AND tl.role = ?
                )
                ORDER BY t.created_at DESC, t.rowid DESC
                "#,
                THESIS_COLUMNS
            );
            fetch_theses(conn, &sql, &[lecture_id.to_string(), role.as_str().to_string()]).await
        }
        None => {
            let sql = format!(
                r#"
                SELECT {} FROM theses t
                WHERE EXISTS (
                    SELECT 1 FROM thesis_lectures tl
                    WHERE tl.thesis_id = t.id AND tl.lecture_id = ?
                )
                ORDER BY t.created_at DESC, t.rowid DESC
                "#,
                THESIS_COLUMNS
            );
            fetch_theses(conn, &sql, &[lecture_id.to_string()]).await
        }
    }
}
