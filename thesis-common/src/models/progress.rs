//! Progress reports submitted by students for review

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProgressStatus {
    Pending,
    Reviewed,
    Rejected,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::Pending => "Pending",
            ProgressStatus::Reviewed => "Reviewed",
            ProgressStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ProgressStatus::Pending),
            "Reviewed" => Ok(ProgressStatus::Reviewed),
            "Rejected" => Ok(ProgressStatus::Rejected),
            other => Err(Error::InvalidInput(format!("unknown progress status: {}", other))),
        }
    }
}

/// A dated achievement report addressed to one assigned reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub id: Uuid,
    pub thesis_id: Uuid,
    pub reviewer_id: Uuid,
    pub progress_description: String,
    pub document_url: String,
    pub status: ProgressStatus,
    pub achievement_date: DateTime<Utc>,
    /// Immutable; attributes the report to a workflow phase when scoring
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    pub fn new(
        thesis_id: Uuid,
        reviewer_id: Uuid,
        progress_description: String,
        document_url: String,
    ) -> Self {
        let now = crate::time::now();
        Self {
            id: crate::uuid_utils::generate(),
            thesis_id,
            reviewer_id,
            progress_description,
            document_url,
            status: ProgressStatus::Pending,
            achievement_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProgressStatus::Pending
    }

    pub fn is_reviewed(&self) -> bool {
        self.status == ProgressStatus::Reviewed
    }
}
