//! Comment queries

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{parse_enum, parse_opt_uuid, parse_time, parse_uuid};
use crate::models::Comment;
use crate::time::to_db;
use crate::Result;

const COLUMNS: &str =
    "id, progress_id, user_id, user_type, parent_id, content, created_at, updated_at";

fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    let id: String = row.try_get("id")?;
    let progress_id: String = row.try_get("progress_id")?;
    let user_id: String = row.try_get("user_id")?;
    let user_type: String = row.try_get("user_type")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Comment {
        id: parse_uuid(&id, "comments.id")?,
        progress_id: parse_uuid(&progress_id, "comments.progress_id")?,
        user_id: parse_uuid(&user_id, "comments.user_id")?,
        user_type: parse_enum(&user_type, "comments.user_type")?,
        parent_id: parse_opt_uuid(row.try_get("parent_id")?, "comments.parent_id")?,
        content: row.try_get("content")?,
        created_at: parse_time(&created_at, "comments.created_at")?,
        updated_at: parse_time(&updated_at, "comments.updated_at")?,
    })
}

pub async fn create_comment(conn: &mut SqliteConnection, comment: &Comment) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO comments (
            id, progress_id, user_id, user_type, parent_id, content, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(comment.id.to_string())
    .bind(comment.progress_id.to_string())
    .bind(comment.user_id.to_string())
    .bind(comment.user_type.as_str())
    .bind(comment.parent_id.map(|p| p.to_string()))
    .bind(&comment.content)
    .bind(to_db(&comment.created_at))
    .bind(to_db(&comment.updated_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn find_comment_by_id(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Comment>> {
    let sql = format!("SELECT {} FROM comments WHERE id = ?", COLUMNS);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(comment_from_row).transpose()
}

/// Comments of a progress report in creation order (flat)
pub async fn list_comments_by_progress(
    conn: &mut SqliteConnection,
    progress_id: Uuid,
) -> Result<Vec<Comment>> {
    let sql = format!(
        "SELECT {} FROM comments WHERE progress_id = ? ORDER BY created_at, rowid",
        COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(progress_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(comment_from_row).collect()
}
