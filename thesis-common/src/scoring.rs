//! Progress Scoring Engine
//!
//! Weighted 0-100 completion score over four phases:
//!
//! | Phase    | Weight | Parts                                         |
//! |----------|--------|-----------------------------------------------|
//! | Initial  | 10     | submission 5, in progress 5                   |
//! | Proposal | 25     | reviewed progress 15, supervisor approval 10  |
//! | Research | 35     | reviewed progress 20, supervisor approval 15  |
//! | Final    | 30     | progress 10, finalize 13, upload 5, complete 2 |
//!
//! Progress reports are attributed to a phase by their creation time relative
//! to the supervisors' approval stamps (see [`PhaseWindows`]). Pure function;
//! no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::{ExaminerType, Progress, ProgressStatus, Thesis, ThesisLecture, ThesisStatus};

pub const INITIAL_SUBMISSION_WEIGHT: f64 = 5.0;
pub const IN_PROGRESS_WEIGHT: f64 = 5.0;
pub const PROPOSAL_PROGRESS_WEIGHT: f64 = 15.0;
pub const PROPOSAL_APPROVAL_WEIGHT: f64 = 10.0;
pub const RESEARCH_PROGRESS_WEIGHT: f64 = 20.0;
pub const RESEARCH_APPROVAL_WEIGHT: f64 = 15.0;
pub const FINAL_PROGRESS_WEIGHT: f64 = 10.0;
pub const FINALIZE_APPROVAL_WEIGHT: f64 = 13.0;
pub const FINAL_DOCUMENT_WEIGHT: f64 = 5.0;
pub const COMPLETION_WEIGHT: f64 = 2.0;

pub const INITIAL_PHASE_MAX: f64 = INITIAL_SUBMISSION_WEIGHT + IN_PROGRESS_WEIGHT;
pub const PROPOSAL_PHASE_MAX: f64 = PROPOSAL_PROGRESS_WEIGHT + PROPOSAL_APPROVAL_WEIGHT;
pub const RESEARCH_PHASE_MAX: f64 = RESEARCH_PROGRESS_WEIGHT + RESEARCH_APPROVAL_WEIGHT;
pub const FINAL_PHASE_MAX: f64 =
    FINAL_PROGRESS_WEIGHT + FINALIZE_APPROVAL_WEIGHT + FINAL_DOCUMENT_WEIGHT + COMPLETION_WEIGHT;

/// Per-phase breakdown of a thesis score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressDetails {
    pub initial_phase: f64,
    pub proposal_phase: f64,
    pub research_phase: f64,
    pub final_phase: f64,
}

/// Completion score attached to thesis responses
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThesisProgress {
    pub total_progress: f64,
    pub details: ProgressDetails,
}

impl ThesisProgress {
    fn from_details(details: ProgressDetails) -> Self {
        let total = details.initial_phase
            + details.proposal_phase
            + details.research_phase
            + details.final_phase;
        Self {
            total_progress: total.clamp(0.0, 100.0),
            details,
        }
    }

    /// Fixed split reported for completed theses
    pub fn completed() -> Self {
        Self::from_details(ProgressDetails {
            initial_phase: INITIAL_PHASE_MAX,
            proposal_phase: PROPOSAL_PHASE_MAX,
            research_phase: RESEARCH_PHASE_MAX,
            final_phase: FINAL_PHASE_MAX,
        })
    }
}

/// Phase boundaries derived from supervisor approval stamps
///
/// `research_start` is the latest supervisor proposal-defense approval,
/// `final_start` the latest supervisor final-defense approval. Ties between
/// supervisors approving at different times resolve to the latest stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseWindows {
    pub research_start: Option<DateTime<Utc>>,
    pub final_start: Option<DateTime<Utc>>,
}

impl PhaseWindows {
    pub fn from_lectures(lectures: &[ThesisLecture]) -> Self {
        let supervisors = || lectures.iter().filter(|tl| tl.is_supervisor());
        Self {
            research_start: crate::time::latest(
                supervisors().map(|tl| tl.proposal_defense_approved_at),
            ),
            final_start: crate::time::latest(
                supervisors().map(|tl| tl.final_defense_approved_at),
            ),
        }
    }

    /// Created strictly before the research start, or any time if none yet
    pub fn in_proposal(&self, created_at: DateTime<Utc>) -> bool {
        self.research_start.map_or(true, |start| created_at < start)
    }

    /// Created strictly between research start and final start
    pub fn in_research(&self, created_at: DateTime<Utc>) -> bool {
        match self.research_start {
            Some(start) if created_at > start => {
                self.final_start.map_or(true, |end| created_at < end)
            }
            _ => false,
        }
    }

    /// Created strictly after the final start
    pub fn in_final(&self, created_at: DateTime<Utc>) -> bool {
        self.final_start.is_some_and(|start| created_at > start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Proposal,
    Research,
    Final,
}

/// Compute the weighted completion score for a thesis
///
/// `thesis.lectures` must hold the thesis' assignments; `progresses` are the
/// thesis' progress reports (reports for other theses are ignored).
pub fn calculate_progress(thesis: &Thesis, progresses: &[Progress]) -> ThesisProgress {
    if thesis.status == ThesisStatus::Completed {
        return ThesisProgress::completed();
    }

    let progresses: Vec<&Progress> = progresses
        .iter()
        .filter(|p| p.thesis_id == thesis.id)
        .collect();
    let windows = PhaseWindows::from_lectures(&thesis.lectures);

    ThesisProgress::from_details(ProgressDetails {
        initial_phase: initial_phase(thesis),
        proposal_phase: proposal_phase(thesis, &progresses, &windows),
        research_phase: research_phase(thesis, &progresses, &windows),
        final_phase: final_phase(thesis, &progresses, &windows),
    })
}

fn initial_phase(thesis: &Thesis) -> f64 {
    // Every stored thesis has been submitted
    let mut score = INITIAL_SUBMISSION_WEIGHT;
    if thesis.status.index() >= ThesisStatus::InProgress.index() {
        score += IN_PROGRESS_WEIGHT;
    }
    score
}

fn proposal_phase(thesis: &Thesis, progresses: &[&Progress], windows: &PhaseWindows) -> f64 {
    if thesis.is_proposal_ready {
        return PROPOSAL_PHASE_MAX;
    }

    let reviewed = review_ratio(thesis, Phase::Proposal, progresses, windows);
    let approved = ratio(
        thesis.supervisors().filter(|tl| tl.proposal_defense_approved_at.is_some()).count(),
        thesis.supervisors().count(),
    );

    reviewed * PROPOSAL_PROGRESS_WEIGHT + approved * PROPOSAL_APPROVAL_WEIGHT
}

fn research_phase(thesis: &Thesis, progresses: &[&Progress], windows: &PhaseWindows) -> f64 {
    if !thesis.is_proposal_ready {
        return 0.0;
    }
    if thesis.is_final_exam_ready {
        return RESEARCH_PHASE_MAX;
    }

    let reviewed = review_ratio(thesis, Phase::Research, progresses, windows);
    let approved = ratio(
        thesis.supervisors().filter(|tl| tl.final_defense_approved_at.is_some()).count(),
        thesis.supervisors().count(),
    );

    reviewed * RESEARCH_PROGRESS_WEIGHT + approved * RESEARCH_APPROVAL_WEIGHT
}

fn final_phase(thesis: &Thesis, progresses: &[&Progress], windows: &PhaseWindows) -> f64 {
    let mut score = 0.0;

    if thesis.is_final_exam_ready {
        score += review_ratio(thesis, Phase::Final, progresses, windows) * FINAL_PROGRESS_WEIGHT;

        let finalized = ratio(
            thesis
                .examiners_of(ExaminerType::FinalDefenseExaminer)
                .filter(|tl| tl.finalize_approved_at.is_some())
                .count(),
            thesis.examiners_of(ExaminerType::FinalDefenseExaminer).count(),
        );
        score += finalized * FINALIZE_APPROVAL_WEIGHT;
    }

    if thesis.has_final_document() {
        score += FINAL_DOCUMENT_WEIGHT;
    }
    if thesis.status == ThesisStatus::Completed {
        score += COMPLETION_WEIGHT;
    }

    score
}

/// Share of expected lecturers with at least one reviewed report in the window
fn review_ratio(
    thesis: &Thesis,
    phase: Phase,
    progresses: &[&Progress],
    windows: &PhaseWindows,
) -> f64 {
    let expected: HashSet<Uuid> = match phase {
        Phase::Proposal => thesis.supervisors().map(|tl| tl.lecture_id).collect(),
        Phase::Research => thesis
            .supervisors()
            .chain(thesis.examiners_of(ExaminerType::ProposalDefenseExaminer))
            .map(|tl| tl.lecture_id)
            .collect(),
        Phase::Final => thesis
            .supervisors()
            .chain(thesis.examiners_of(ExaminerType::FinalDefenseExaminer))
            .map(|tl| tl.lecture_id)
            .collect(),
    };

    let in_window = |p: &Progress| match phase {
        Phase::Proposal => windows.in_proposal(p.created_at),
        Phase::Research => windows.in_research(p.created_at),
        Phase::Final => windows.in_final(p.created_at),
    };

    let completed: HashSet<Uuid> = progresses
        .iter()
        .filter(|p| p.status == ProgressStatus::Reviewed && in_window(**p))
        .map(|p| p.reviewer_id)
        .filter(|reviewer| expected.contains(reviewer))
        .collect();

    ratio(completed.len(), expected.len())
}

fn ratio(count: usize, expected: usize) -> f64 {
    if expected == 0 {
        return 0.0;
    }
    (count as f64 / expected as f64).min(1.0)
}
