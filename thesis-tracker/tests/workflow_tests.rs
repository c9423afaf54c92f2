//! Workflow engine tests against an in-memory database
//!
//! Covers assignment rules, approval quorums and gating, exactly-once review,
//! scoring of live theses and the full lifecycle to completion.

mod helpers;

use helpers::world;
use thesis_common::events::{ExamStage, ThesisEvent};
use thesis_common::models::{
    DocumentKind, ExaminerType, LectureRole, ProgressStatus, ThesisStatus, UserType,
};
use thesis_common::{calculate_progress, db, Error};
use thesis_tracker::workflow::{ProgressRequest, ProposalRequest};
use uuid::Uuid;

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_proposal_starts_pending() {
    let w = world(1).await;
    let mut rx = w.events.subscribe();

    let thesis = w.proposal().await;
    assert_eq!(thesis.status, ThesisStatus::Pending);
    assert!(!thesis.is_proposal_ready && !thesis.is_final_exam_ready);

    match rx.try_recv().unwrap() {
        ThesisEvent::ProposalSubmitted {
            thesis_id,
            supervisor_id,
            ..
        } => {
            assert_eq!(thesis_id, thesis.id);
            assert_eq!(supervisor_id, w.lecture(0));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_proposal_validates_input_and_references() {
    let w = world(1).await;

    let short = ProposalRequest {
        title: "AI".to_string(),
        abstract_text: "Long enough abstract".to_string(),
        research_field: "Machine Learning".to_string(),
        supervisor_id: w.lecture(0),
    };
    let err = w.workflow.submit_proposal(w.student.id, short).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let unknown_supervisor = ProposalRequest {
        title: "Edge caching".to_string(),
        abstract_text: "Long enough abstract".to_string(),
        research_field: "Systems".to_string(),
        supervisor_id: Uuid::new_v4(),
    };
    let err = w
        .workflow
        .submit_proposal(w.student.id, unknown_supervisor)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(msg) if msg == "supervisor not found"));
}

// =============================================================================
// Lecture assignment
// =============================================================================

#[tokio::test]
async fn test_assigning_main_supervisor_moves_to_in_progress() {
    let w = world(2).await;
    let thesis = w.proposal().await;

    // A co-supervisor alone does not start the thesis
    w.workflow
        .assign_lecture(thesis.id, w.lecture(1), LectureRole::Supervisor)
        .await
        .unwrap();
    assert_eq!(w.load(thesis.id).await.status, ThesisStatus::Pending);

    let tl = w
        .workflow
        .assign_lecture(thesis.id, w.lecture(0), LectureRole::Supervisor)
        .await
        .unwrap();
    assert_eq!(tl.role, LectureRole::Supervisor);
    assert_eq!(tl.examiner_type, None);
    assert_eq!(w.load(thesis.id).await.status, ThesisStatus::InProgress);
}

#[tokio::test]
async fn test_assign_unknown_thesis_or_lecture_not_found() {
    let w = world(1).await;
    let thesis = w.proposal().await;

    let err = w
        .workflow
        .assign_lecture(Uuid::new_v4(), w.lecture(0), LectureRole::Supervisor)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(msg) if msg == "thesis not found"));

    let err = w
        .workflow
        .assign_lecture(thesis.id, Uuid::new_v4(), LectureRole::Supervisor)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(msg) if msg == "lecture not found"));
}

#[tokio::test]
async fn test_examiner_requires_proposal_ready() {
    let w = world(2).await;
    let thesis = w.supervised_thesis(1).await;

    let err = w
        .workflow
        .assign_lecture(thesis.id, w.lecture(1), LectureRole::Examiner)
        .await
        .unwrap_err();
    match err {
        Error::InvalidState(msg) => assert!(msg.contains("Proposal Ready")),
        other => panic!("expected InvalidState, got {:?}", other),
    }
    assert!(w.load(thesis.id).await.examiners().next().is_none());
}

#[tokio::test]
async fn test_supervisor_cannot_also_be_examiner() {
    let w = world(1).await;
    let thesis = w.proposal_ready_thesis(1).await;

    let err = w
        .workflow
        .assign_lecture(thesis.id, w.lecture(0), LectureRole::Examiner)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(msg) if msg.contains("different role")));
}

#[tokio::test]
async fn test_duplicate_assignment_conflicts() {
    let w = world(1).await;
    let thesis = w.supervised_thesis(1).await;

    let err = w
        .workflow
        .assign_lecture(thesis.id, w.lecture(0), LectureRole::Supervisor)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(w.load(thesis.id).await.lectures.len(), 1);
}

#[tokio::test]
async fn test_examiner_type_is_frozen_at_assignment() {
    let w = world(3).await;
    let thesis = w.proposal_ready_thesis(1).await;

    let early = w
        .workflow
        .assign_lecture(thesis.id, w.lecture(1), LectureRole::Examiner)
        .await
        .unwrap();
    assert_eq!(early.examiner_type, Some(ExaminerType::ProposalDefenseExaminer));

    // Second supervisor approval makes the thesis final-exam ready
    let thesis = w
        .workflow
        .approve_for_defense(thesis.id, w.lecture(0))
        .await
        .unwrap();
    assert!(thesis.is_final_exam_ready);

    let late = w
        .workflow
        .assign_lecture(thesis.id, w.lecture(2), LectureRole::Examiner)
        .await
        .unwrap();
    assert_eq!(late.examiner_type, Some(ExaminerType::FinalDefenseExaminer));

    let stored = w.load(thesis.id).await;
    let early_now = stored.assignment_for(w.lecture(1)).unwrap();
    assert_eq!(
        early_now.examiner_type,
        Some(ExaminerType::ProposalDefenseExaminer)
    );
}

// =============================================================================
// Approval workflow
// =============================================================================

#[tokio::test]
async fn test_proposal_quorum_needs_every_supervisor() {
    for n in 1..=3 {
        let w = world(n).await;
        let thesis = w.supervised_thesis(n).await;
        for i in 0..n {
            w.reviewed_progress(thesis.id, w.lecture(i)).await;
        }

        for i in 0..n - 1 {
            let t = w
                .workflow
                .approve_for_defense(thesis.id, w.lecture(i))
                .await
                .unwrap();
            assert!(!t.is_proposal_ready, "n = {}, after {} approvals", n, i + 1);
        }

        let t = w
            .workflow
            .approve_for_defense(thesis.id, w.lecture(n - 1))
            .await
            .unwrap();
        assert!(t.is_proposal_ready, "n = {}", n);
        assert!(!t.is_final_exam_ready);
        assert!(w.load(thesis.id).await.is_proposal_ready);
    }
}

#[tokio::test]
async fn test_approval_gating() {
    let w = world(2).await;
    let thesis = w.proposal_ready_thesis(1).await;
    w.workflow
        .assign_lecture(thesis.id, w.lecture(1), LectureRole::Examiner)
        .await
        .unwrap();

    // Examiner cannot approve for defense
    let err = w
        .workflow
        .approve_for_defense(thesis.id, w.lecture(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    // Pending report blocks the supervisor
    w.submit_progress(thesis.id, w.lecture(0)).await;
    let err = w
        .workflow
        .approve_for_defense(thesis.id, w.lecture(0))
        .await
        .unwrap_err();
    assert!(
        matches!(err, Error::InvalidState(msg) if msg == "all progress must be reviewed before thesis can be approved")
    );

    let stored = w.load(thesis.id).await;
    assert!(stored
        .assignment_for(w.lecture(0))
        .unwrap()
        .final_defense_approved_at
        .is_none());
}

#[tokio::test]
async fn test_approval_without_reports_or_assignment() {
    let w = world(2).await;
    let thesis = w.proposal().await;

    let err = w
        .workflow
        .approve_for_defense(thesis.id, w.lecture(0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(msg) if msg == "no lecture assigned to this thesis"));

    w.workflow
        .assign_lecture(thesis.id, w.lecture(0), LectureRole::Supervisor)
        .await
        .unwrap();

    let err = w
        .workflow
        .approve_for_defense(thesis.id, w.lecture(0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(msg) if msg.contains("at least one progress")));

    let err = w
        .workflow
        .approve_for_defense(thesis.id, w.lecture(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    let err = w
        .workflow
        .approve_for_defense(Uuid::new_v4(), w.lecture(0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_ready_for_exam_events() {
    let w = world(1).await;
    let thesis = w.supervised_thesis(1).await;
    w.reviewed_progress(thesis.id, w.lecture(0)).await;

    let mut rx = w.events.subscribe();
    w.workflow.approve_for_defense(thesis.id, w.lecture(0)).await.unwrap();
    w.workflow.approve_for_defense(thesis.id, w.lecture(0)).await.unwrap();

    let stages: Vec<ExamStage> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|e| match e {
            ThesisEvent::ReadyForExam { stage, .. } => Some(stage),
            _ => None,
        })
        .collect();
    assert_eq!(stages, vec![ExamStage::ProposalDefense, ExamStage::FinalDefense]);
}

#[tokio::test]
async fn test_only_final_examiners_approve_finalize() {
    let w = world(3).await;
    let thesis = w.proposal_ready_thesis(1).await;
    w.workflow
        .assign_lecture(thesis.id, w.lecture(1), LectureRole::Examiner)
        .await
        .unwrap();
    w.reviewed_progress(thesis.id, w.lecture(1)).await;

    let err = w
        .workflow
        .approve_for_finalize(thesis.id, w.lecture(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = w
        .workflow
        .approve_for_finalize(thesis.id, w.lecture(0))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = w
        .workflow
        .approve_for_finalize(thesis.id, w.lecture(2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(msg) if msg == "lecture not assigned to this thesis"));
}

#[tokio::test]
async fn test_finalize_quorum_moves_to_under_review() {
    let w = world(3).await;
    let thesis = w.final_ready_thesis(1).await;
    for i in 1..=2 {
        w.workflow
            .assign_lecture(thesis.id, w.lecture(i), LectureRole::Examiner)
            .await
            .unwrap();
        w.reviewed_progress(thesis.id, w.lecture(i)).await;
    }

    let t = w
        .workflow
        .approve_for_finalize(thesis.id, w.lecture(1))
        .await
        .unwrap();
    assert_eq!(t.status, ThesisStatus::InProgress);

    let mut rx = w.events.subscribe();
    let t = w
        .workflow
        .approve_for_finalize(thesis.id, w.lecture(2))
        .await
        .unwrap();
    assert_eq!(t.status, ThesisStatus::UnderReview);
    assert!(matches!(
        rx.try_recv().unwrap(),
        ThesisEvent::ReadyForFinalSubmission { .. }
    ));
}

#[tokio::test]
async fn test_full_lifecycle_is_monotonic_and_scores_100() {
    let w = world(2).await;
    let mut statuses = Vec::new();
    let mut flags = Vec::new();
    let mut record = |t: &thesis_common::models::Thesis| {
        statuses.push(t.status);
        flags.push((t.is_proposal_ready, t.is_final_exam_ready));
    };

    let thesis = w.final_ready_thesis(1).await;
    record(&thesis);

    w.workflow
        .assign_lecture(thesis.id, w.lecture(1), LectureRole::Examiner)
        .await
        .unwrap();
    w.reviewed_progress(thesis.id, w.lecture(1)).await;
    let thesis = w
        .workflow
        .approve_for_finalize(thesis.id, w.lecture(1))
        .await
        .unwrap();
    record(&thesis);
    assert_eq!(thesis.status, ThesisStatus::UnderReview);

    // No final document yet
    let err = w.workflow.mark_completed(thesis.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    let thesis = w
        .workflow
        .record_document(
            w.student.id,
            thesis.id,
            DocumentKind::Final,
            "https://files.example.edu/final.pdf",
        )
        .await
        .unwrap();
    record(&thesis);

    let thesis = w.workflow.mark_completed(thesis.id).await.unwrap();
    record(&thesis);
    assert_eq!(thesis.status, ThesisStatus::Completed);
    assert!(thesis.completed_date.is_some());

    assert!(statuses.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(flags
        .windows(2)
        .all(|pair| (!pair[0].0 || pair[1].0) && (!pair[0].1 || pair[1].1)));

    let progress = w.workflow.thesis_progress(thesis.id).await.unwrap();
    assert_eq!(progress.total_progress, 100.0);
    assert_eq!(progress.details.final_phase, 30.0);

    let err = w.workflow.mark_completed(thesis.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
}

#[tokio::test]
async fn test_mark_completed_requires_under_review() {
    let w = world(1).await;
    let thesis = w.final_ready_thesis(1).await;
    w.workflow
        .record_document(w.student.id, thesis.id, DocumentKind::Final, "https://f/final.pdf")
        .await
        .unwrap();

    let err = w.workflow.mark_completed(thesis.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(msg) if msg.contains("Under Review")));
}

#[tokio::test]
async fn test_concurrent_supervisor_approvals_reach_quorum() {
    let w = world(2).await;
    let thesis = w.supervised_thesis(2).await;
    w.reviewed_progress(thesis.id, w.lecture(0)).await;
    w.reviewed_progress(thesis.id, w.lecture(1)).await;

    let (a, b) = tokio::join!(
        w.workflow.approve_for_defense(thesis.id, w.lecture(0)),
        w.workflow.approve_for_defense(thesis.id, w.lecture(1)),
    );
    a.unwrap();
    b.unwrap();

    let stored = w.load(thesis.id).await;
    assert!(stored.is_proposal_ready);
    assert!(stored
        .supervisors()
        .all(|tl| tl.proposal_defense_approved_at.is_some()));
}

#[tokio::test]
async fn test_stale_thesis_write_conflicts() {
    let w = world(1).await;
    let thesis = w.supervised_thesis(1).await;

    let mut first = w.load(thesis.id).await;
    let mut second = w.load(thesis.id).await;
    let mut conn = w.pool.acquire().await.unwrap();
    db::update_thesis(&mut conn, &mut first).await.unwrap();

    second.is_proposal_ready = true;
    let err = db::update_thesis(&mut conn, &mut second).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    drop(conn);
    assert!(!w.load(thesis.id).await.is_proposal_ready);
}

// =============================================================================
// Progress review
// =============================================================================

#[tokio::test]
async fn test_review_happens_exactly_once() {
    let w = world(1).await;
    let thesis = w.supervised_thesis(1).await;
    let progress = w.submit_progress(thesis.id, w.lecture(0)).await;
    assert_eq!(progress.status, ProgressStatus::Pending);

    let outcome = w
        .workflow
        .review_progress(progress.id, w.lecture(0), "Clarify the method section", None)
        .await
        .unwrap();
    assert_eq!(outcome.progress.status, ProgressStatus::Reviewed);
    assert_eq!(outcome.comment.user_type, UserType::Lecture);

    let err = w
        .workflow
        .review_progress(progress.id, w.lecture(0), "Second opinion", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    let threads = w.workflow.list_comments(progress.id).await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].comment.content, "Clarify the method section");
    let stored = w.workflow.get_progress(progress.id).await.unwrap();
    assert_eq!(stored.status, ProgressStatus::Reviewed);
}

#[tokio::test]
async fn test_only_designated_reviewer_reviews() {
    let w = world(2).await;
    let thesis = w.supervised_thesis(2).await;
    let progress = w.submit_progress(thesis.id, w.lecture(0)).await;

    let err = w
        .workflow
        .review_progress(progress.id, w.lecture(1), "Not mine", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(msg) if msg == "user is not the reviewer"));

    let err = w
        .workflow
        .review_progress(Uuid::new_v4(), w.lecture(0), "Missing", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = w
        .workflow
        .review_progress(progress.id, w.lecture(0), "   ", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_comments_thread_and_validate_parent() {
    let w = world(1).await;
    let thesis = w.supervised_thesis(1).await;
    let first = w.submit_progress(thesis.id, w.lecture(0)).await;
    let second = w.submit_progress(thesis.id, w.lecture(0)).await;

    let question = w
        .workflow
        .add_comment(first.id, w.student.id, "Is the dataset size enough?", None)
        .await
        .unwrap();
    assert_eq!(question.user_type, UserType::Student);

    let answer = w
        .workflow
        .add_comment(first.id, w.lecture(0), "Yes, for a pilot", Some(question.id))
        .await
        .unwrap();
    assert_eq!(answer.user_type, UserType::Lecture);

    let err = w
        .workflow
        .add_comment(second.id, w.student.id, "Wrong thread", Some(question.id))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(msg) if msg == "invalid parent comment"));

    let err = w
        .workflow
        .add_comment(first.id, Uuid::new_v4(), "Who am I", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let threads = w.workflow.list_comments(first.id).await.unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].replies.len(), 1);
    assert_eq!(threads[0].replies[0].id, answer.id);
}

#[tokio::test]
async fn test_add_progress_rules() {
    let w = world(2).await;
    let thesis = w.supervised_thesis(1).await;

    let request = |reviewer_id: Uuid| ProgressRequest {
        thesis_id: thesis.id,
        reviewer_id,
        progress_description: "Collected the first survey batch".to_string(),
        document_url: String::new(),
    };

    let err = w
        .workflow
        .add_progress(w.other_student.id, request(w.lecture(0)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = w
        .workflow
        .add_progress(w.student.id, request(w.lecture(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    let progress = w
        .workflow
        .add_progress(w.student.id, request(w.lecture(0)))
        .await
        .unwrap();
    assert_eq!(progress.status, ProgressStatus::Pending);
    assert_eq!(
        w.workflow.list_progress_by_thesis(thesis.id).await.unwrap().len(),
        1
    );
}

// =============================================================================
// Scoring of live theses
// =============================================================================

#[tokio::test]
async fn test_two_supervisor_scoring_scenario() {
    let w = world(2).await;
    let thesis = w.supervised_thesis(2).await;
    w.reviewed_progress(thesis.id, w.lecture(0)).await;
    w.reviewed_progress(thesis.id, w.lecture(1)).await;

    let t = w
        .workflow
        .approve_for_defense(thesis.id, w.lecture(0))
        .await
        .unwrap();
    assert!(!t.is_proposal_ready);

    let progresses = w.workflow.list_progress_by_thesis(thesis.id).await.unwrap();
    let score = calculate_progress(&w.load(thesis.id).await, &progresses);
    // 15 for both supervisors' reviewed reports, 10 x 1/2 for approvals
    assert_eq!(score.details.proposal_phase, 20.0);
    assert_eq!(score.details.research_phase, 0.0);
    assert_eq!(score.details.initial_phase, 10.0);

    w.workflow
        .approve_for_defense(thesis.id, w.lecture(1))
        .await
        .unwrap();
    let score = w.workflow.thesis_progress(thesis.id).await.unwrap();
    assert_eq!(score.details.proposal_phase, 25.0);
    assert!(score.total_progress >= 35.0 && score.total_progress <= 100.0);
}

#[tokio::test]
async fn test_list_my_theses_by_role() {
    let w = world(3).await;
    let thesis = w.proposal_ready_thesis(1).await;
    w.workflow
        .assign_lecture(thesis.id, w.lecture(1), LectureRole::Examiner)
        .await
        .unwrap();

    let mine = w
        .workflow
        .list_my_theses(thesis_common::models::UserRole::Student, w.student.id)
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);

    let examined = w
        .workflow
        .list_my_theses(thesis_common::models::UserRole::Lecture, w.lecture(1))
        .await
        .unwrap();
    assert_eq!(examined.len(), 1);
    assert_eq!(examined[0].examiners.len(), 1);
    assert_eq!(examined[0].supervisors.len(), 1);

    let none = w
        .workflow
        .list_my_theses(thesis_common::models::UserRole::Lecture, w.lecture(2))
        .await
        .unwrap();
    assert!(none.is_empty());

    let all = w
        .workflow
        .list_my_theses(thesis_common::models::UserRole::Admin, w.admin.id)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}
