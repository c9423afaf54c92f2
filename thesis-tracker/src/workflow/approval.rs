//! Approval Workflow Engine
//!
//! Supervisors approve twice through the same operation: the first approval
//! fills the proposal-defense slot, the second the final-defense slot. Once
//! every supervisor has approved a slot the matching readiness flag flips.
//! Final defense examiners then approve finalization; when all of them have,
//! the thesis moves to Under Review. Flags and status only ever move forward.

use sqlx::SqliteConnection;
use thesis_common::db;
use thesis_common::events::{ExamStage, ThesisEvent};
use thesis_common::models::{ProgressStatus, Thesis, ThesisLecture, ThesisStatus};
use thesis_common::{Error, Result};
use tracing::info;
use uuid::Uuid;

use super::{contention, require_thesis, Workflow};

/// Supervisor approval tallies over a set of assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorQuorum {
    pub supervisors: usize,
    pub proposal_approved: usize,
    pub final_approved: usize,
}

impl SupervisorQuorum {
    pub fn of(lectures: &[ThesisLecture]) -> Self {
        let supervisors: Vec<&ThesisLecture> =
            lectures.iter().filter(|tl| tl.is_supervisor()).collect();
        Self {
            supervisors: supervisors.len(),
            proposal_approved: supervisors
                .iter()
                .filter(|tl| tl.proposal_defense_approved_at.is_some())
                .count(),
            final_approved: supervisors
                .iter()
                .filter(|tl| tl.final_defense_approved_at.is_some())
                .count(),
        }
    }

    pub fn all_proposal_approved(&self) -> bool {
        self.supervisors > 0 && self.proposal_approved == self.supervisors
    }

    pub fn all_final_approved(&self) -> bool {
        self.supervisors > 0 && self.final_approved == self.supervisors
    }
}

/// Finalize approval tally over final defense examiners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizeQuorum {
    pub examiners: usize,
    pub approved: usize,
}

impl FinalizeQuorum {
    pub fn of(lectures: &[ThesisLecture]) -> Self {
        let examiners: Vec<&ThesisLecture> =
            lectures.iter().filter(|tl| tl.is_final_examiner()).collect();
        Self {
            examiners: examiners.len(),
            approved: examiners
                .iter()
                .filter(|tl| tl.finalize_approved_at.is_some())
                .count(),
        }
    }

    pub fn all_approved(&self) -> bool {
        self.examiners > 0 && self.approved == self.examiners
    }
}

/// Replace one assignment by id, leaving the others untouched
fn with_assignment(lectures: Vec<ThesisLecture>, updated: &ThesisLecture) -> Vec<ThesisLecture> {
    lectures
        .into_iter()
        .map(|tl| if tl.id == updated.id { updated.clone() } else { tl })
        .collect()
}

/// Thesis plus assignments; an unassigned thesis cannot be approved
async fn load_for_approval(conn: &mut SqliteConnection, thesis_id: Uuid) -> Result<Thesis> {
    let thesis = require_thesis(conn, thesis_id).await?;
    if thesis.lectures.is_empty() {
        return Err(Error::invalid_state("no lecture assigned to this thesis"));
    }
    Ok(thesis)
}

/// A lecturer may only approve once every report addressed to them is handled
async fn ensure_reviews_complete(
    conn: &mut SqliteConnection,
    thesis_id: Uuid,
    lecture_id: Uuid,
) -> Result<()> {
    let progresses = db::find_progress_by_reviewer_and_thesis(conn, lecture_id, thesis_id).await?;

    if progresses.is_empty() {
        return Err(Error::invalid_state(
            "lecture must have at least one progress assigned to them",
        ));
    }
    if progresses.iter().any(|p| p.status == ProgressStatus::Pending) {
        return Err(Error::invalid_state(
            "all progress must be reviewed before thesis can be approved",
        ));
    }
    Ok(())
}

impl Workflow {
    /// Supervisor approval for proposal defense, then for final defense
    pub async fn approve_for_defense(&self, thesis_id: Uuid, lecture_id: Uuid) -> Result<Thesis> {
        let mut tx = self.db.begin().await?;
        let (thesis, events) = approve_defense_in_tx(&mut tx, thesis_id, lecture_id)
            .await
            .map_err(contention)?;
        tx.commit().await.map_err(|e| contention(e.into()))?;

        info!(
            thesis_id = %thesis_id,
            lecture_id = %lecture_id,
            proposal_ready = thesis.is_proposal_ready,
            final_exam_ready = thesis.is_final_exam_ready,
            "Defense approval recorded"
        );
        self.publish(events);
        Ok(thesis)
    }

    /// Final defense examiner approval to finalize
    pub async fn approve_for_finalize(&self, thesis_id: Uuid, lecture_id: Uuid) -> Result<Thesis> {
        let mut tx = self.db.begin().await?;
        let (thesis, events) = approve_finalize_in_tx(&mut tx, thesis_id, lecture_id)
            .await
            .map_err(contention)?;
        tx.commit().await.map_err(|e| contention(e.into()))?;

        info!(
            thesis_id = %thesis_id,
            lecture_id = %lecture_id,
            status = %thesis.status,
            "Finalize approval recorded"
        );
        self.publish(events);
        Ok(thesis)
    }

    /// Archive a thesis that has passed every gate (admin)
    pub async fn mark_completed(&self, thesis_id: Uuid) -> Result<Thesis> {
        let mut tx = self.db.begin().await?;
        let (thesis, events) = complete_in_tx(&mut tx, thesis_id)
            .await
            .map_err(contention)?;
        tx.commit().await.map_err(|e| contention(e.into()))?;

        info!(thesis_id = %thesis_id, "Thesis completed");
        self.publish(events);
        Ok(thesis)
    }
}

async fn approve_defense_in_tx(
    conn: &mut SqliteConnection,
    thesis_id: Uuid,
    lecture_id: Uuid,
) -> Result<(Thesis, Vec<ThesisEvent>)> {
    let mut thesis = load_for_approval(conn, thesis_id).await?;

    let mut assignment = thesis
        .assignment_for(lecture_id)
        .cloned()
        .ok_or_else(|| Error::invalid_state("lecture not assigned to this thesis"))?;
    if !assignment.is_supervisor() {
        return Err(Error::forbidden(
            "only lecture assigned as supervisor can approve thesis for defense",
        ));
    }

    ensure_reviews_complete(conn, thesis_id, lecture_id).await?;

    let now = thesis_common::time::now();
    assignment.stamp_defense_approval(now);
    thesis.lectures = with_assignment(std::mem::take(&mut thesis.lectures), &assignment);

    let quorum = SupervisorQuorum::of(&thesis.lectures);
    let mut events = Vec::new();

    if quorum.all_proposal_approved() && thesis.mark_proposal_ready() {
        events.push(ThesisEvent::ReadyForExam {
            thesis_id,
            stage: ExamStage::ProposalDefense,
            timestamp: now,
        });
    }
    if quorum.all_final_approved()
        && quorum.all_proposal_approved()
        && thesis.is_proposal_ready
        && thesis.mark_final_exam_ready()
    {
        events.push(ThesisEvent::ReadyForExam {
            thesis_id,
            stage: ExamStage::FinalDefense,
            timestamp: now,
        });
    }

    db::update_thesis_lecture(conn, &assignment).await?;
    db::update_thesis(conn, &mut thesis).await?;

    Ok((thesis, events))
}

async fn approve_finalize_in_tx(
    conn: &mut SqliteConnection,
    thesis_id: Uuid,
    lecture_id: Uuid,
) -> Result<(Thesis, Vec<ThesisEvent>)> {
    let mut thesis = load_for_approval(conn, thesis_id).await?;

    let mut assignment = thesis
        .assignment_for(lecture_id)
        .cloned()
        .ok_or_else(|| Error::invalid_state("lecture not assigned to this thesis"))?;
    if !assignment.is_final_examiner() {
        return Err(Error::forbidden(
            "only lecture assigned as final defense examiner can approve thesis to be finalized",
        ));
    }

    ensure_reviews_complete(conn, thesis_id, lecture_id).await?;

    if !thesis.is_final_exam_ready {
        return Err(Error::invalid_state("thesis is not ready for finalization"));
    }

    let now = thesis_common::time::now();
    assignment.finalize_approved_at = Some(now);
    thesis.lectures = with_assignment(std::mem::take(&mut thesis.lectures), &assignment);

    let mut events = Vec::new();
    if FinalizeQuorum::of(&thesis.lectures).all_approved()
        && thesis.advance_status(ThesisStatus::UnderReview)
    {
        events.push(ThesisEvent::ReadyForFinalSubmission {
            thesis_id,
            timestamp: now,
        });
    }

    db::update_thesis_lecture(conn, &assignment).await?;
    db::update_thesis(conn, &mut thesis).await?;

    Ok((thesis, events))
}

async fn complete_in_tx(
    conn: &mut SqliteConnection,
    thesis_id: Uuid,
) -> Result<(Thesis, Vec<ThesisEvent>)> {
    let mut thesis = require_thesis(conn, thesis_id).await?;

    if thesis.status == ThesisStatus::Completed {
        return Err(Error::invalid_state("thesis is already completed"));
    }
    if !(thesis.is_proposal_ready && thesis.is_final_exam_ready) {
        return Err(Error::invalid_state(
            "thesis must pass proposal and final defense before completion",
        ));
    }
    if thesis.status != ThesisStatus::UnderReview {
        return Err(Error::invalid_state(
            "thesis must be Under Review before completion",
        ));
    }
    if !thesis.has_final_document() {
        return Err(Error::invalid_state(
            "final document must be uploaded before completion",
        ));
    }

    let now = thesis_common::time::now();
    thesis.advance_status(ThesisStatus::Completed);
    thesis.completed_date = Some(now);
    db::update_thesis(conn, &mut thesis).await?;

    let event = ThesisEvent::ThesisCompleted {
        thesis_id,
        timestamp: now,
    };
    Ok((thesis, vec![event]))
}
