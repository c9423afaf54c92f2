//! Workflow events and the EventBus
//!
//! Workflow engines emit a [`ThesisEvent`] after their transaction commits.
//! The notification dispatcher subscribes and turns events into mail; no
//! engine waits on, or observes the outcome of, delivery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{ExaminerType, LectureRole};

/// Which defense a thesis became ready for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamStage {
    ProposalDefense,
    FinalDefense,
}

impl ExamStage {
    /// Human-readable stage name used in notifications
    pub fn label(self) -> &'static str {
        match self {
            ExamStage::ProposalDefense => "Proposal Defense",
            ExamStage::FinalDefense => "Final Thesis Defense",
        }
    }
}

impl fmt::Display for ExamStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Thesis workflow events
///
/// Serialized with an internal `type` tag so they can be logged or forwarded
/// as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ThesisEvent {
    /// Student submitted a proposal
    ///
    /// Notifies: student, nominated supervisor
    ProposalSubmitted {
        thesis_id: Uuid,
        student_id: Uuid,
        supervisor_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Lecturer attached to a thesis
    ///
    /// Notifies: the assigned lecturer
    LectureAssigned {
        thesis_id: Uuid,
        lecture_id: Uuid,
        role: LectureRole,
        examiner_type: Option<ExaminerType>,
        timestamp: DateTime<Utc>,
    },

    /// Student submitted a progress report
    ///
    /// Notifies: the designated reviewer
    ProgressSubmitted {
        progress_id: Uuid,
        thesis_id: Uuid,
        reviewer_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Reviewer reviewed a progress report
    ///
    /// Notifies: student
    ProgressReviewed {
        progress_id: Uuid,
        thesis_id: Uuid,
        reviewer_id: Uuid,
        comment_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// All supervisors approved; thesis ready for a defense
    ///
    /// Notifies: student
    ReadyForExam {
        thesis_id: Uuid,
        stage: ExamStage,
        timestamp: DateTime<Utc>,
    },

    /// All final defense examiners approved; thesis moved to Under Review
    ///
    /// Notifies: student
    ReadyForFinalSubmission {
        thesis_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Final document recorded for a thesis
    ///
    /// Notifies: supervisors
    FinalDocumentUploaded {
        thesis_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Admin archived the thesis
    ///
    /// Notifies: student, every assigned lecturer
    ThesisCompleted {
        thesis_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl ThesisEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &str {
        match self {
            ThesisEvent::ProposalSubmitted { .. } => "ProposalSubmitted",
            ThesisEvent::LectureAssigned { .. } => "LectureAssigned",
            ThesisEvent::ProgressSubmitted { .. } => "ProgressSubmitted",
            ThesisEvent::ProgressReviewed { .. } => "ProgressReviewed",
            ThesisEvent::ReadyForExam { .. } => "ReadyForExam",
            ThesisEvent::ReadyForFinalSubmission { .. } => "ReadyForFinalSubmission",
            ThesisEvent::FinalDocumentUploaded { .. } => "FinalDocumentUploaded",
            ThesisEvent::ThesisCompleted { .. } => "ThesisCompleted",
        }
    }

    /// Thesis the event concerns
    pub fn thesis_id(&self) -> Uuid {
        match self {
            ThesisEvent::ProposalSubmitted { thesis_id, .. }
            | ThesisEvent::LectureAssigned { thesis_id, .. }
            | ThesisEvent::ProgressSubmitted { thesis_id, .. }
            | ThesisEvent::ProgressReviewed { thesis_id, .. }
            | ThesisEvent::ReadyForExam { thesis_id, .. }
            | ThesisEvent::ReadyForFinalSubmission { thesis_id, .. }
            | ThesisEvent::FinalDocumentUploaded { thesis_id, .. }
            | ThesisEvent::ThesisCompleted { thesis_id, .. } => *thesis_id,
        }
    }
}

/// Broadcast bus for workflow events
///
/// Cloning shares the same channel. Slow subscribers lose the oldest events
/// once `capacity` is exceeded (they observe `RecvError::Lagged`).
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ThesisEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ThesisEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ThesisEvent,
    ) -> Result<usize, broadcast::error::SendError<ThesisEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ThesisEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!(event_type = e.0.event_type(), "No subscribers for event");
        }
    }

    /// Emit a batch in order
    pub fn emit_all(&self, events: impl IntoIterator<Item = ThesisEvent>) {
        for event in events {
            self.emit_lossy(event);
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
