//! Lecturer assignment queries (`thesis_lectures`)

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{opt_time_to_db, parse_enum, parse_opt_time, parse_time, parse_uuid};
use crate::models::{ExaminerType, ThesisLecture};
use crate::time::to_db;
use crate::{Error, Result};

const COLUMNS: &str = r#"
    id, thesis_id, lecture_id, role, examiner_type, proposal_defense_approved_at,
    final_defense_approved_at, finalize_approved_at, created_at
"#;

fn thesis_lecture_from_row(row: &SqliteRow) -> Result<ThesisLecture> {
    let id: String = row.try_get("id")?;
    let thesis_id: String = row.try_get("thesis_id")?;
    let lecture_id: String = row.try_get("lecture_id")?;
    let role: String = row.try_get("role")?;
    let examiner_type: Option<String> = row.try_get("examiner_type")?;
    let created_at: String = row.try_get("created_at")?;

    let tl = ThesisLecture {
        id: parse_uuid(&id, "thesis_lectures.id")?,
        thesis_id: parse_uuid(&thesis_id, "thesis_lectures.thesis_id")?,
        lecture_id: parse_uuid(&lecture_id, "thesis_lectures.lecture_id")?,
        role: parse_enum(&role, "thesis_lectures.role")?,
        examiner_type: examiner_type
            .map(|v| parse_enum::<ExaminerType>(&v, "thesis_lectures.examiner_type"))
            .transpose()?,
        proposal_defense_approved_at: parse_opt_time(
            row.try_get("proposal_defense_approved_at")?,
            "thesis_lectures.proposal_defense_approved_at",
        )?,
        final_defense_approved_at: parse_opt_time(
            row.try_get("final_defense_approved_at")?,
            "thesis_lectures.final_defense_approved_at",
        )?,
        finalize_approved_at: parse_opt_time(
            row.try_get("finalize_approved_at")?,
            "thesis_lectures.finalize_approved_at",
        )?,
        created_at: parse_time(&created_at, "thesis_lectures.created_at")?,
    };
    tl.validate_shape()?;
    Ok(tl)
}

/// Assignments of one thesis in assignment order
pub async fn find_thesis_lectures_by_thesis_id(
    conn: &mut SqliteConnection,
    thesis_id: Uuid,
) -> Result<Vec<ThesisLecture>> {
    let sql = format!(
        "SELECT {} FROM thesis_lectures WHERE thesis_id = ? ORDER BY created_at, rowid",
        COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(thesis_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(thesis_lecture_from_row).collect()
}

pub(crate) async fn list_all_thesis_lectures(
    conn: &mut SqliteConnection,
) -> Result<Vec<ThesisLecture>> {
    let sql = format!(
        "SELECT {} FROM thesis_lectures ORDER BY created_at, rowid",
        COLUMNS
    );
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;

    rows.iter().map(thesis_lecture_from_row).collect()
}

/// Insert an assignment
///
/// A second assignment of the same lecturer to the same thesis fails with
/// `Conflict`.
pub async fn create_thesis_lecture(conn: &mut SqliteConnection, tl: &ThesisLecture) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO thesis_lectures (
            id, thesis_id, lecture_id, role, examiner_type, proposal_defense_approved_at,
            final_defense_approved_at, finalize_approved_at, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(tl.id.to_string())
    .bind(tl.thesis_id.to_string())
    .bind(tl.lecture_id.to_string())
    .bind(tl.role.as_str())
    .bind(tl.examiner_type.map(ExaminerType::as_str))
    .bind(opt_time_to_db(&tl.proposal_defense_approved_at))
    .bind(opt_time_to_db(&tl.final_defense_approved_at))
    .bind(opt_time_to_db(&tl.finalize_approved_at))
    .bind(to_db(&tl.created_at))
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(Error::Conflict(format!(
            "lecture {} is already assigned to thesis {}",
            tl.lecture_id, tl.thesis_id
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Persist the approval stamps of an assignment
///
/// Role and examiner type are immutable and never written here.
pub async fn update_thesis_lecture(conn: &mut SqliteConnection, tl: &ThesisLecture) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE thesis_lectures SET
            proposal_defense_approved_at = ?,
            final_defense_approved_at = ?,
            finalize_approved_at = ?
        WHERE id = ?
        "#,
    )
    .bind(opt_time_to_db(&tl.proposal_defense_approved_at))
    .bind(opt_time_to_db(&tl.final_defense_approved_at))
    .bind(opt_time_to_db(&tl.finalize_approved_at))
    .bind(tl.id.to_string())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::not_found(format!("thesis lecture {}", tl.id)));
    }
    Ok(())
}
