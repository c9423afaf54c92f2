//! Lecturer assignment (thesis ↔ lecture join with approval timestamps)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Capacity in which a lecturer is attached to a thesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LectureRole {
    Supervisor,
    Examiner,
}

impl LectureRole {
    pub fn as_str(self) -> &'static str {
        match self {
            LectureRole::Supervisor => "Supervisor",
            LectureRole::Examiner => "Examiner",
        }
    }
}

impl fmt::Display for LectureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LectureRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Supervisor" => Ok(LectureRole::Supervisor),
            "Examiner" => Ok(LectureRole::Examiner),
            other => Err(Error::InvalidInput(format!("unknown lecture role: {}", other))),
        }
    }
}

/// Examiner sub-type, fixed when the examiner is assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExaminerType {
    ProposalDefenseExaminer,
    FinalDefenseExaminer,
}

impl ExaminerType {
    pub fn as_str(self) -> &'static str {
        match self {
            ExaminerType::ProposalDefenseExaminer => "ProposalDefenseExaminer",
            ExaminerType::FinalDefenseExaminer => "FinalDefenseExaminer",
        }
    }

    /// Sub-type for an examiner assigned now, given the thesis readiness
    pub fn for_readiness(is_final_exam_ready: bool) -> Self {
        if is_final_exam_ready {
            ExaminerType::FinalDefenseExaminer
        } else {
            ExaminerType::ProposalDefenseExaminer
        }
    }
}

impl fmt::Display for ExaminerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExaminerType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ProposalDefenseExaminer" => Ok(ExaminerType::ProposalDefenseExaminer),
            "FinalDefenseExaminer" => Ok(ExaminerType::FinalDefenseExaminer),
            other => Err(Error::InvalidInput(format!("unknown examiner type: {}", other))),
        }
    }
}

/// One lecturer's assignment to one thesis
///
/// `examiner_type` is `Some` exactly when `role` is `Examiner`. The defense
/// approval timestamps are only stamped on supervisors, `finalize_approved_at`
/// only on final defense examiners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesisLecture {
    pub id: Uuid,
    pub thesis_id: Uuid,
    pub lecture_id: Uuid,
    pub role: LectureRole,
    pub examiner_type: Option<ExaminerType>,
    pub proposal_defense_approved_at: Option<DateTime<Utc>>,
    pub final_defense_approved_at: Option<DateTime<Utc>>,
    pub finalize_approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ThesisLecture {
    pub fn supervisor(thesis_id: Uuid, lecture_id: Uuid) -> Self {
        Self::new(thesis_id, lecture_id, LectureRole::Supervisor, None)
    }

    pub fn examiner(thesis_id: Uuid, lecture_id: Uuid, kind: ExaminerType) -> Self {
        Self::new(thesis_id, lecture_id, LectureRole::Examiner, Some(kind))
    }

    fn new(
        thesis_id: Uuid,
        lecture_id: Uuid,
        role: LectureRole,
        examiner_type: Option<ExaminerType>,
    ) -> Self {
        Self {
            id: crate::uuid_utils::generate(),
            thesis_id,
            lecture_id,
            role,
            examiner_type,
            proposal_defense_approved_at: None,
            final_defense_approved_at: None,
            finalize_approved_at: None,
            created_at: crate::time::now(),
        }
    }

    pub fn is_supervisor(&self) -> bool {
        self.role == LectureRole::Supervisor
    }

    pub fn is_final_examiner(&self) -> bool {
        self.role == LectureRole::Examiner
            && self.examiner_type == Some(ExaminerType::FinalDefenseExaminer)
    }

    pub fn is_proposal_examiner(&self) -> bool {
        self.role == LectureRole::Examiner
            && self.examiner_type == Some(ExaminerType::ProposalDefenseExaminer)
    }

    /// Stamp the next open supervisor approval slot
    ///
    /// The first call fills `proposal_defense_approved_at`, later calls fill
    /// `final_defense_approved_at`.
    pub fn stamp_defense_approval(&mut self, at: DateTime<Utc>) {
        if self.proposal_defense_approved_at.is_some() {
            self.final_defense_approved_at = Some(at);
        } else {
            self.proposal_defense_approved_at = Some(at);
        }
    }

    /// Check the role/sub-type pairing of a stored row
    pub fn validate_shape(&self) -> Result<(), Error> {
        match (self.role, self.examiner_type) {
            (LectureRole::Supervisor, None) | (LectureRole::Examiner, Some(_)) => Ok(()),
            (LectureRole::Supervisor, Some(kind)) => Err(Error::Internal(format!(
                "assignment {} is a supervisor with examiner type {}",
                self.id, kind
            ))),
            (LectureRole::Examiner, None) => Err(Error::Internal(format!(
                "assignment {} is an examiner without examiner type",
                self.id
            ))),
        }
    }
}
