//! Progress Review Engine

use serde::Serialize;
use sqlx::SqliteConnection;
use thesis_common::db;
use thesis_common::events::ThesisEvent;
use thesis_common::models::{Comment, Progress, ProgressStatus, UserType};
use thesis_common::{Error, Result};
use tracing::info;
use uuid::Uuid;

use super::{contention, require_thesis, Workflow};

/// Result of a review: the reviewer's comment and the updated report
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub comment: Comment,
    pub progress: Progress,
}

async fn require_progress(conn: &mut SqliteConnection, progress_id: Uuid) -> Result<Progress> {
    db::find_progress_by_id(conn, progress_id)
        .await?
        .ok_or_else(|| Error::not_found("progress not found"))
}

/// A reply must point at a comment on the same report
async fn check_parent(
    conn: &mut SqliteConnection,
    progress_id: Uuid,
    parent_id: Option<Uuid>,
) -> Result<()> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };
    match db::find_comment_by_id(conn, parent_id).await? {
        Some(parent) if parent.progress_id == progress_id => Ok(()),
        _ => Err(Error::invalid_state("invalid parent comment")),
    }
}

fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::InvalidInput("comment content is required".to_string()));
    }
    Ok(())
}

impl Workflow {
    /// Record the designated reviewer's feedback and mark the report Reviewed
    ///
    /// A report can be reviewed exactly once.
    pub async fn review_progress(
        &self,
        progress_id: Uuid,
        caller_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<ReviewOutcome> {
        require_content(content)?;

        let mut tx = self.db.begin().await?;
        let (outcome, events) = review_in_tx(&mut tx, progress_id, caller_id, content, parent_id)
            .await
            .map_err(contention)?;
        tx.commit().await.map_err(|e| contention(e.into()))?;

        info!(
            progress_id = %progress_id,
            reviewer_id = %caller_id,
            thesis_id = %outcome.progress.thesis_id,
            "Progress reviewed"
        );
        self.publish(events);
        Ok(outcome)
    }

    /// Comment on a report as a student or lecturer, independent of review state
    pub async fn add_comment(
        &self,
        progress_id: Uuid,
        user_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Comment> {
        require_content(content)?;

        let mut conn = self.db.acquire().await?;
        require_progress(&mut conn, progress_id).await?;

        let user_type = db::resolve_user_type(&mut conn, user_id)
            .await?
            .ok_or_else(|| Error::not_found("user not found"))?;

        check_parent(&mut conn, progress_id, parent_id).await?;

        let comment = Comment::new(
            progress_id,
            user_id,
            user_type,
            parent_id,
            content.trim().to_string(),
        );
        db::create_comment(&mut conn, &comment).await?;

        info!(
            progress_id = %progress_id,
            user_id = %user_id,
            user_type = user_type.as_str(),
            "Comment added"
        );
        Ok(comment)
    }
}

async fn review_in_tx(
    conn: &mut SqliteConnection,
    progress_id: Uuid,
    caller_id: Uuid,
    content: &str,
    parent_id: Option<Uuid>,
) -> Result<(ReviewOutcome, Vec<ThesisEvent>)> {
    let mut progress = require_progress(conn, progress_id).await?;

    if progress.reviewer_id != caller_id {
        return Err(Error::forbidden("user is not the reviewer"));
    }
    if progress.is_reviewed() {
        return Err(Error::invalid_state("progress already reviewed"));
    }

    check_parent(conn, progress_id, parent_id).await?;

    let comment = Comment::new(
        progress_id,
        caller_id,
        UserType::Lecture,
        parent_id,
        content.trim().to_string(),
    );
    db::create_comment(conn, &comment).await?;

    if !db::update_progress_status(conn, progress_id, ProgressStatus::Reviewed).await? {
        return Err(Error::invalid_state("progress already reviewed"));
    }
    progress = require_progress(conn, progress_id).await?;

    // Approval reads review state, so reviews take the thesis version too
    let mut thesis = require_thesis(conn, progress.thesis_id).await?;
    db::update_thesis(conn, &mut thesis).await?;

    let event = ThesisEvent::ProgressReviewed {
        progress_id,
        thesis_id: progress.thesis_id,
        reviewer_id: caller_id,
        comment_id: comment.id,
        timestamp: comment.created_at,
    };
    Ok((ReviewOutcome { comment, progress }, vec![event]))
}
