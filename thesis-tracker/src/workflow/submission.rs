//! Student-side submissions: proposals, progress reports, documents

use serde::Deserialize;
use sqlx::SqliteConnection;
use thesis_common::db;
use thesis_common::events::ThesisEvent;
use thesis_common::models::{DocumentKind, Progress, Thesis, ThesisStatus};
use thesis_common::{Error, Result};
use tracing::info;
use uuid::Uuid;

use super::{contention, require_len, require_thesis, Workflow};

/// New thesis proposal
#[derive(Debug, Clone, Deserialize)]
pub struct ProposalRequest {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub research_field: String,
    /// Nominated main supervisor
    pub supervisor_id: Uuid,
}

impl ProposalRequest {
    fn validate(&self) -> Result<()> {
        require_len(&self.title, 3, "title")?;
        require_len(&self.abstract_text, 10, "abstract")?;
        require_len(&self.research_field, 3, "research_field")
    }
}

/// New progress report addressed to one assigned lecturer
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressRequest {
    pub thesis_id: Uuid,
    pub reviewer_id: Uuid,
    pub progress_description: String,
    #[serde(default)]
    pub document_url: String,
}

/// Thesis owned by `student_id`, or Forbidden
async fn require_owned_thesis(
    conn: &mut SqliteConnection,
    thesis_id: Uuid,
    student_id: Uuid,
) -> Result<Thesis> {
    let thesis = require_thesis(conn, thesis_id).await?;
    if thesis.student_id != student_id {
        return Err(Error::forbidden("thesis does not belong to this student"));
    }
    Ok(thesis)
}

impl Workflow {
    /// Submit a proposal; the thesis starts Pending
    pub async fn submit_proposal(&self, student_id: Uuid, req: ProposalRequest) -> Result<Thesis> {
        req.validate()?;

        let mut tx = self.db.begin().await?;
        db::find_student_by_id(&mut tx, student_id)
            .await?
            .ok_or_else(|| Error::not_found("student not found"))?;
        db::find_lecture_by_id(&mut tx, req.supervisor_id)
            .await?
            .ok_or_else(|| Error::not_found("supervisor not found"))?;

        let thesis = Thesis::new_proposal(
            student_id,
            req.supervisor_id,
            req.title.trim().to_string(),
            req.abstract_text.trim().to_string(),
            req.research_field.trim().to_string(),
        );
        db::insert_thesis(&mut tx, &thesis).await?;
        tx.commit().await?;

        info!(
            thesis_id = %thesis.id,
            student_id = %student_id,
            supervisor_id = %thesis.supervisor_id,
            "Proposal submitted"
        );
        self.publish(vec![ThesisEvent::ProposalSubmitted {
            thesis_id: thesis.id,
            student_id,
            supervisor_id: thesis.supervisor_id,
            timestamp: thesis.submission_date,
        }]);
        Ok(thesis)
    }

    /// Submit a progress report on the caller's own thesis
    pub async fn add_progress(&self, student_id: Uuid, req: ProgressRequest) -> Result<Progress> {
        require_len(&req.progress_description, 10, "progress_description")?;

        let mut tx = self.db.begin().await?;
        let (progress, events) = add_progress_in_tx(&mut tx, student_id, req)
            .await
            .map_err(contention)?;
        tx.commit().await.map_err(|e| contention(e.into()))?;

        info!(
            progress_id = %progress.id,
            thesis_id = %progress.thesis_id,
            reviewer_id = %progress.reviewer_id,
            "Progress submitted"
        );
        self.publish(events);
        Ok(progress)
    }

    /// Record an uploaded document URL reported by the storage backend
    pub async fn record_document(
        &self,
        student_id: Uuid,
        thesis_id: Uuid,
        kind: DocumentKind,
        url: &str,
    ) -> Result<Thesis> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidInput("document url is required".to_string()));
        }

        let mut tx = self.db.begin().await?;
        let mut thesis = require_owned_thesis(&mut tx, thesis_id, student_id)
            .await
            .map_err(contention)?;
        if thesis.status == ThesisStatus::Completed {
            return Err(Error::invalid_state("thesis is already completed"));
        }

        match kind {
            DocumentKind::Draft => thesis.draft_document_url = url.to_string(),
            DocumentKind::Final => thesis.final_document_url = url.to_string(),
        }
        db::update_thesis(&mut tx, &mut thesis)
            .await
            .map_err(contention)?;
        tx.commit().await.map_err(|e| contention(e.into()))?;

        info!(thesis_id = %thesis_id, kind = ?kind, "Document recorded");
        if kind == DocumentKind::Final {
            self.publish(vec![ThesisEvent::FinalDocumentUploaded {
                thesis_id,
                timestamp: thesis.updated_at,
            }]);
        }
        Ok(thesis)
    }
}

async fn add_progress_in_tx(
    conn: &mut SqliteConnection,
    student_id: Uuid,
    req: ProgressRequest,
) -> Result<(Progress, Vec<ThesisEvent>)> {
    let mut thesis = require_owned_thesis(conn, req.thesis_id, student_id).await?;

    if thesis.status == ThesisStatus::Completed {
        return Err(Error::invalid_state("thesis is already completed"));
    }
    if !thesis.is_assigned(req.reviewer_id) {
        return Err(Error::invalid_state(
            "reviewer is not assigned to this thesis",
        ));
    }

    let progress = Progress::new(
        thesis.id,
        req.reviewer_id,
        req.progress_description.trim().to_string(),
        req.document_url.trim().to_string(),
    );
    db::insert_progress(conn, &progress).await?;
    // New pending work blocks the reviewer's approval, so it takes the version
    db::update_thesis(conn, &mut thesis).await?;

    let event = ThesisEvent::ProgressSubmitted {
        progress_id: progress.id,
        thesis_id: thesis.id,
        reviewer_id: progress.reviewer_id,
        timestamp: progress.created_at,
    };
    Ok((progress, vec![event]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_request_reads_abstract_key() {
        let json = serde_json::json!({
            "title": "Graph neural nets",
            "abstract": "Learning on molecular graphs",
            "research_field": "Machine Learning",
            "supervisor_id": Uuid::new_v4(),
        });
        let req: ProposalRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.abstract_text, "Learning on molecular graphs");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_proposal_validation_minimums() {
        let req = ProposalRequest {
            title: "AI".to_string(),
            abstract_text: "short".to_string(),
            research_field: "ML".to_string(),
            supervisor_id: Uuid::new_v4(),
        };
        let err = req.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("title")));
    }
}
