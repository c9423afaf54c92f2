//! Participant queries
//!
//! Rows are written by the registration collaborator; this service only
//! reads them (inserts exist for that collaborator and for tests).

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{parse_time, parse_uuid};
use crate::models::{Admin, Lecture, Student, UserType};
use crate::time::to_db;
use crate::Result;

fn student_from_row(row: &SqliteRow) -> Result<Student> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Student {
        id: parse_uuid(&id, "students.id")?,
        name: row.try_get("name")?,
        nim: row.try_get("nim")?,
        email: row.try_get("email")?,
        department: row.try_get("department")?,
        year: row.try_get("year")?,
        created_at: parse_time(&created_at, "students.created_at")?,
    })
}

fn lecture_from_row(row: &SqliteRow) -> Result<Lecture> {
    let id: String = row.try_get("id")?;
    let created_at: String = row.try_get("created_at")?;
    Ok(Lecture {
        id: parse_uuid(&id, "lectures.id")?,
        name: row.try_get("name")?,
        nidn: row.try_get("nidn")?,
        email: row.try_get("email")?,
        department: row.try_get("department")?,
        created_at: parse_time(&created_at, "lectures.created_at")?,
    })
}

pub async fn insert_student(conn: &mut SqliteConnection, student: &Student) -> Result<()> {
    sqlx::query(
        "INSERT INTO students (id, name, nim, email, department, year, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(student.id.to_string())
    .bind(&student.name)
    .bind(&student.nim)
    .bind(&student.email)
    .bind(&student.department)
    .bind(&student.year)
    .bind(to_db(&student.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_lecture(conn: &mut SqliteConnection, lecture: &Lecture) -> Result<()> {
    sqlx::query(
        "INSERT INTO lectures (id, name, nidn, email, department, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(lecture.id.to_string())
    .bind(&lecture.name)
    .bind(&lecture.nidn)
    .bind(&lecture.email)
    .bind(&lecture.department)
    .bind(to_db(&lecture.created_at))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn insert_admin(conn: &mut SqliteConnection, admin: &Admin) -> Result<()> {
    sqlx::query("INSERT INTO admins (id, name, email, created_at) VALUES (?, ?, ?, ?)")
        .bind(admin.id.to_string())
        .bind(&admin.name)
        .bind(&admin.email)
        .bind(to_db(&admin.created_at))
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn find_student_by_id(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Student>> {
    let row = sqlx::query(
        "SELECT id, name, nim, email, department, year, created_at FROM students WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(student_from_row).transpose()
}

pub async fn find_lecture_by_id(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<Lecture>> {
    let row = sqlx::query(
        "SELECT id, name, nidn, email, department, created_at FROM lectures WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(lecture_from_row).transpose()
}

/// Classify a user id as student or lecturer (student checked first)
pub async fn resolve_user_type(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<UserType>> {
    if find_student_by_id(conn, id).await?.is_some() {
        return Ok(Some(UserType::Student));
    }
    if find_lecture_by_id(conn, id).await?.is_some() {
        return Ok(Some(UserType::Lecture));
    }
    Ok(None)
}
