//! Thesis entity and its lifecycle status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::assignment::{ExaminerType, LectureRole, ThesisLecture};
use crate::Error;

/// Thesis lifecycle status
///
/// Ordered: Pending < InProgress < UnderReview < Completed. Status never
/// moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ThesisStatus {
    /// Submitted, waiting for the nominated supervisor to be assigned
    Pending,
    /// Main supervisor assigned, student working on the thesis
    #[serde(rename = "In Progress")]
    InProgress,
    /// All final defense examiners approved; awaiting final document and admin
    #[serde(rename = "Under Review")]
    UnderReview,
    /// Archived by admin (final state)
    Completed,
}

impl ThesisStatus {
    pub const ALL: [ThesisStatus; 4] = [
        ThesisStatus::Pending,
        ThesisStatus::InProgress,
        ThesisStatus::UnderReview,
        ThesisStatus::Completed,
    ];

    /// Ordinal position in the lifecycle
    pub fn index(self) -> usize {
        match self {
            ThesisStatus::Pending => 0,
            ThesisStatus::InProgress => 1,
            ThesisStatus::UnderReview => 2,
            ThesisStatus::Completed => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThesisStatus::Pending => "Pending",
            ThesisStatus::InProgress => "In Progress",
            ThesisStatus::UnderReview => "Under Review",
            ThesisStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ThesisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThesisStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThesisStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown thesis status: {}", s)))
    }
}

/// Which document slot an upload fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Draft,
    Final,
}

impl FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DocumentKind::Draft),
            "final" => Ok(DocumentKind::Final),
            other => Err(Error::InvalidInput(format!("unknown document kind: {}", other))),
        }
    }
}

/// A thesis tracked from proposal submission to completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thesis {
    pub id: Uuid,
    pub student_id: Uuid,
    /// Main supervisor nominated by the student at submission
    pub supervisor_id: Uuid,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub research_field: String,
    pub status: ThesisStatus,
    pub is_proposal_ready: bool,
    pub is_final_exam_ready: bool,
    pub submission_date: DateTime<Utc>,
    pub completed_date: Option<DateTime<Utc>>,
    pub draft_document_url: String,
    pub final_document_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped on every write
    #[serde(skip)]
    pub version: i64,
    /// Lecturer assignments (loaded alongside the thesis)
    #[serde(skip)]
    pub lectures: Vec<ThesisLecture>,
}

impl Thesis {
    /// New thesis proposal in `Pending` state
    pub fn new_proposal(
        student_id: Uuid,
        supervisor_id: Uuid,
        title: String,
        abstract_text: String,
        research_field: String,
    ) -> Self {
        let now = crate::time::now();
        Self {
            id: crate::uuid_utils::generate(),
            student_id,
            supervisor_id,
            title,
            abstract_text,
            research_field,
            status: ThesisStatus::Pending,
            is_proposal_ready: false,
            is_final_exam_ready: false,
            submission_date: now,
            completed_date: None,
            draft_document_url: String::new(),
            final_document_url: String::new(),
            created_at: now,
            updated_at: now,
            version: 0,
            lectures: Vec::new(),
        }
    }

    /// Advance status if `target` is further along; never regresses
    ///
    /// Returns true if the status changed.
    pub fn advance_status(&mut self, target: ThesisStatus) -> bool {
        if target > self.status {
            self.status = target;
            true
        } else {
            false
        }
    }

    /// Set the proposal milestone; returns true on the false → true transition
    pub fn mark_proposal_ready(&mut self) -> bool {
        let changed = !self.is_proposal_ready;
        self.is_proposal_ready = true;
        changed
    }

    /// Set the final exam milestone; returns true on the false → true transition
    pub fn mark_final_exam_ready(&mut self) -> bool {
        let changed = !self.is_final_exam_ready;
        self.is_final_exam_ready = true;
        changed
    }

    pub fn has_final_document(&self) -> bool {
        !self.final_document_url.trim().is_empty()
    }

    /// Assignment held by `lecture_id` on this thesis, if any
    pub fn assignment_for(&self, lecture_id: Uuid) -> Option<&ThesisLecture> {
        self.lectures.iter().find(|tl| tl.lecture_id == lecture_id)
    }

    pub fn supervisors(&self) -> impl Iterator<Item = &ThesisLecture> {
        self.lectures
            .iter()
            .filter(|tl| tl.role == LectureRole::Supervisor)
    }

    pub fn examiners(&self) -> impl Iterator<Item = &ThesisLecture> {
        self.lectures
            .iter()
            .filter(|tl| tl.role == LectureRole::Examiner)
    }

    pub fn examiners_of(&self, kind: ExaminerType) -> impl Iterator<Item = &ThesisLecture> {
        self.examiners()
            .filter(move |tl| tl.examiner_type == Some(kind))
    }

    /// True if `lecture_id` holds any assignment on this thesis
    pub fn is_assigned(&self, lecture_id: Uuid) -> bool {
        self.assignment_for(lecture_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal() -> Thesis {
        Thesis::new_proposal(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Graph coloring heuristics".to_string(),
            "A study of greedy coloring orders".to_string(),
            "Algorithms".to_string(),
        )
    }

    #[test]
    fn test_status_order_matches_index() {
        for pair in ThesisStatus::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].index() < pair[1].index());
        }
    }

    #[test]
    fn test_status_parse_round_trip() {
        for status in ThesisStatus::ALL {
            assert_eq!(status.as_str().parse::<ThesisStatus>().unwrap(), status);
        }
        assert!("Archived".parse::<ThesisStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_with_spaces() {
        let json = serde_json::to_string(&ThesisStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
    }

    #[test]
    fn test_advance_status_never_regresses() {
        let mut thesis = proposal();
        assert!(thesis.advance_status(ThesisStatus::UnderReview));
        assert!(!thesis.advance_status(ThesisStatus::InProgress));
        assert_eq!(thesis.status, ThesisStatus::UnderReview);
        assert!(!thesis.advance_status(ThesisStatus::UnderReview));
    }

    #[test]
    fn test_milestones_are_sticky() {
        let mut thesis = proposal();
        assert!(thesis.mark_proposal_ready());
        assert!(!thesis.mark_proposal_ready());
        assert!(thesis.is_proposal_ready);
        assert!(thesis.mark_final_exam_ready());
        assert!(!thesis.mark_final_exam_ready());
    }

    #[test]
    fn test_abstract_field_name_in_json() {
        let json = serde_json::to_value(proposal()).unwrap();
        assert!(json.get("abstract").is_some());
        assert!(json.get("version").is_none());
    }

    #[test]
    fn test_document_kind_parse() {
        assert_eq!("final".parse::<DocumentKind>().unwrap(), DocumentKind::Final);
        assert!("thumbnail".parse::<DocumentKind>().is_err());
    }
}
