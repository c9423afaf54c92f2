//! Lecture Assignment Engine

use sqlx::SqliteConnection;
use thesis_common::db;
use thesis_common::events::ThesisEvent;
use thesis_common::models::{ExaminerType, LectureRole, ThesisLecture, ThesisStatus};
use thesis_common::{Error, Result};
use tracing::info;
use uuid::Uuid;

use super::{contention, require_thesis, Workflow};

impl Workflow {
    /// Attach a lecturer to a thesis as supervisor or examiner
    ///
    /// Examiner sub-type follows the thesis readiness at this moment and is
    /// never revised afterwards. Assigning the nominated main supervisor moves
    /// the thesis to In Progress.
    pub async fn assign_lecture(
        &self,
        thesis_id: Uuid,
        lecture_id: Uuid,
        role: LectureRole,
    ) -> Result<ThesisLecture> {
        let mut tx = self.db.begin().await?;
        let (assignment, events) = assign_in_tx(&mut tx, thesis_id, lecture_id, role)
            .await
            .map_err(contention)?;
        tx.commit().await.map_err(|e| contention(e.into()))?;

        info!(
            thesis_id = %thesis_id,
            lecture_id = %lecture_id,
            role = %role,
            examiner_type = ?assignment.examiner_type,
            "Lecture assigned"
        );
        self.publish(events);
        Ok(assignment)
    }
}

async fn assign_in_tx(
    conn: &mut SqliteConnection,
    thesis_id: Uuid,
    lecture_id: Uuid,
    role: LectureRole,
) -> Result<(ThesisLecture, Vec<ThesisEvent>)> {
    let mut thesis = require_thesis(conn, thesis_id).await?;
    db::find_lecture_by_id(conn, lecture_id)
        .await?
        .ok_or_else(|| Error::not_found("lecture not found"))?;

    if let Some(existing) = thesis.assignment_for(lecture_id) {
        let msg = if existing.role != role {
            "lecture is already assigned a different role for this thesis"
        } else {
            "lecture is already assigned this role for this thesis"
        };
        return Err(Error::Conflict(msg.to_string()));
    }

    let assignment = match role {
        LectureRole::Supervisor => ThesisLecture::supervisor(thesis_id, lecture_id),
        LectureRole::Examiner => {
            if !thesis.is_proposal_ready {
                return Err(Error::invalid_state(
                    "thesis status must be Proposal Ready before assigning proposal defense examiner",
                ));
            }
            let kind = ExaminerType::for_readiness(thesis.is_final_exam_ready);
            ThesisLecture::examiner(thesis_id, lecture_id, kind)
        }
    };

    db::create_thesis_lecture(conn, &assignment).await?;

    if role == LectureRole::Supervisor && lecture_id == thesis.supervisor_id {
        thesis.advance_status(ThesisStatus::InProgress);
    }
    // Always written: the version bump serializes assignment against approvals
    db::update_thesis(conn, &mut thesis).await?;

    let event = ThesisEvent::LectureAssigned {
        thesis_id,
        lecture_id,
        role,
        examiner_type: assignment.examiner_type,
        timestamp: assignment.created_at,
    };
    Ok((assignment, vec![event]))
}
