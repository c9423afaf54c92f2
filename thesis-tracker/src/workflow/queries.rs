//! Read-side operations
//!
//! Every thesis returned to a caller is annotated with its completion score,
//! computed from the thesis' progress reports at read time.

use serde::Serialize;
use sqlx::SqliteConnection;
use std::collections::HashSet;
use thesis_common::db;
use thesis_common::models::{CommentThread, Progress, Thesis, ThesisLecture, UserRole};
use thesis_common::{calculate_progress, Error, Result, ThesisProgress};
use uuid::Uuid;

use super::{require_thesis, Workflow};

/// Thesis as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ThesisView {
    #[serde(flatten)]
    pub thesis: Thesis,
    pub supervisors: Vec<ThesisLecture>,
    pub examiners: Vec<ThesisLecture>,
    pub thesis_progress: ThesisProgress,
}

impl ThesisView {
    pub fn new(thesis: Thesis, progresses: &[Progress]) -> Self {
        let thesis_progress = calculate_progress(&thesis, progresses);
        let supervisors = thesis.supervisors().cloned().collect();
        let examiners = thesis.examiners().cloned().collect();
        Self {
            thesis,
            supervisors,
            examiners,
            thesis_progress,
        }
    }
}

async fn annotate(conn: &mut SqliteConnection, theses: Vec<Thesis>) -> Result<Vec<ThesisView>> {
    let mut views = Vec::with_capacity(theses.len());
    for thesis in theses {
        let progresses = db::list_progress_by_thesis(conn, thesis.id).await?;
        views.push(ThesisView::new(thesis, &progresses));
    }
    Ok(views)
}

impl Workflow {
    pub async fn get_thesis(&self, thesis_id: Uuid) -> Result<ThesisView> {
        let mut conn = self.db.acquire().await?;
        let thesis = require_thesis(&mut conn, thesis_id).await?;
        let progresses = db::list_progress_by_thesis(&mut conn, thesis_id).await?;
        Ok(ThesisView::new(thesis, &progresses))
    }

    /// Annotate an already-loaded thesis (used after mutations)
    pub async fn view(&self, thesis: Thesis) -> Result<ThesisView> {
        let mut conn = self.db.acquire().await?;
        let progresses = db::list_progress_by_thesis(&mut conn, thesis.id).await?;
        Ok(ThesisView::new(thesis, &progresses))
    }

    pub async fn list_theses(&self) -> Result<Vec<ThesisView>> {
        let mut conn = self.db.acquire().await?;
        let theses = db::list_theses(&mut conn).await?;
        annotate(&mut conn, theses).await
    }

    pub async fn list_theses_by_student(&self, student_id: Uuid) -> Result<Vec<ThesisView>> {
        let mut conn = self.db.acquire().await?;
        let theses = db::list_theses_by_student(&mut conn, student_id).await?;
        annotate(&mut conn, theses).await
    }

    /// Theses relevant to the caller
    ///
    /// Students see their own, lecturers every thesis they supervise or
    /// examine, admins everything.
    pub async fn list_my_theses(&self, role: UserRole, user_id: Uuid) -> Result<Vec<ThesisView>> {
        let mut conn = self.db.acquire().await?;
        let theses = match role {
            UserRole::Student => db::list_theses_by_student(&mut conn, user_id).await?,
            UserRole::Lecture => {
                let mut seen = HashSet::new();
                db::list_theses_by_lecture(&mut conn, user_id, None)
                    .await?
                    .into_iter()
                    .filter(|t| seen.insert(t.id))
                    .collect()
            }
            UserRole::Admin => db::list_theses(&mut conn).await?,
        };
        annotate(&mut conn, theses).await
    }

    pub async fn thesis_progress(&self, thesis_id: Uuid) -> Result<ThesisProgress> {
        Ok(self.get_thesis(thesis_id).await?.thesis_progress)
    }

    pub async fn get_progress(&self, progress_id: Uuid) -> Result<Progress> {
        let mut conn = self.db.acquire().await?;
        db::find_progress_by_id(&mut conn, progress_id)
            .await?
            .ok_or_else(|| Error::not_found("progress not found"))
    }

    pub async fn list_progress_by_thesis(&self, thesis_id: Uuid) -> Result<Vec<Progress>> {
        let mut conn = self.db.acquire().await?;
        db::find_thesis_by_id(&mut conn, thesis_id)
            .await?
            .ok_or_else(|| Error::not_found("thesis not found"))?;
        db::list_progress_by_thesis(&mut conn, thesis_id).await
    }

    /// Comments on a report, grouped into threads
    pub async fn list_comments(&self, progress_id: Uuid) -> Result<Vec<CommentThread>> {
        let mut conn = self.db.acquire().await?;
        db::find_progress_by_id(&mut conn, progress_id)
            .await?
            .ok_or_else(|| Error::not_found("progress not found"))?;
        let comments = db::list_comments_by_progress(&mut conn, progress_id).await?;
        Ok(CommentThread::build(comments))
    }
}
