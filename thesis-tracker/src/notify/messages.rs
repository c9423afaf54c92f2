//! Plain-text notification content

use thesis_common::events::ThesisEvent;
use thesis_common::models::{ExaminerType, LectureRole};

/// Who a message is addressed to, relative to the thesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Student,
    Lecturer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

impl Notice {
    fn new(subject: impl Into<String>, body: String) -> Self {
        Self {
            subject: subject.into(),
            body,
        }
    }
}

/// Render the message `audience` receives for `event`
pub fn render(event: &ThesisEvent, thesis_title: &str, audience: Audience, name: &str) -> Notice {
    let greeting = format!("Dear {},\n\n", name);
    let closing = "\n\nThesis Track";

    match (event, audience) {
        (ThesisEvent::ProposalSubmitted { .. }, Audience::Student) => Notice::new(
            "Thesis proposal submitted",
            format!(
                "{}Your thesis proposal \"{}\" has been submitted and is waiting for supervisor assignment.{}",
                greeting, thesis_title, closing
            ),
        ),
        (ThesisEvent::ProposalSubmitted { .. }, Audience::Lecturer) => Notice::new(
            "New thesis proposal submission",
            format!(
                "{}A student nominated you as supervisor for the thesis proposal \"{}\".{}",
                greeting, thesis_title, closing
            ),
        ),
        (ThesisEvent::LectureAssigned { role, examiner_type, .. }, _) => {
            let capacity = match (role, examiner_type) {
                (LectureRole::Supervisor, _) => "supervisor",
                (LectureRole::Examiner, Some(ExaminerType::ProposalDefenseExaminer)) => {
                    "proposal defense examiner"
                }
                (LectureRole::Examiner, Some(ExaminerType::FinalDefenseExaminer)) => {
                    "final defense examiner"
                }
                (LectureRole::Examiner, None) => "examiner",
            };
            Notice::new(
                "Thesis lecture assigned",
                format!(
                    "{}You have been assigned as {} for the thesis \"{}\".{}",
                    greeting, capacity, thesis_title, closing
                ),
            )
        }
        (ThesisEvent::ProgressSubmitted { .. }, _) => Notice::new(
            "New progress report submission",
            format!(
                "{}A new progress report for \"{}\" is waiting for your review.{}",
                greeting, thesis_title, closing
            ),
        ),
        (ThesisEvent::ProgressReviewed { .. }, _) => Notice::new(
            "Progress report reviewed",
            format!(
                "{}Your progress report for \"{}\" has been reviewed. See the comments for feedback.{}",
                greeting, thesis_title, closing
            ),
        ),
        (ThesisEvent::ReadyForExam { stage, .. }, _) => Notice::new(
            format!("Thesis ready for {}", stage.label()),
            format!(
                "{}All supervisors approved \"{}\". The thesis is ready for the {}.{}",
                greeting,
                thesis_title,
                stage.label(),
                closing
            ),
        ),
        (ThesisEvent::ReadyForFinalSubmission { .. }, _) => Notice::new(
            "Thesis approved, ready for final submission",
            format!(
                "{}All final defense examiners approved \"{}\". Please upload the final document.{}",
                greeting, thesis_title, closing
            ),
        ),
        (ThesisEvent::FinalDocumentUploaded { .. }, _) => Notice::new(
            "Final thesis document uploaded",
            format!(
                "{}The final document for \"{}\" has been uploaded.{}",
                greeting, thesis_title, closing
            ),
        ),
        (ThesisEvent::ThesisCompleted { .. }, Audience::Student) => Notice::new(
            "Thesis completed",
            format!(
                "{}Congratulations, your thesis \"{}\" is complete and archived.{}",
                greeting, thesis_title, closing
            ),
        ),
        (ThesisEvent::ThesisCompleted { .. }, Audience::Lecturer) => Notice::new(
            "Thesis completed",
            format!(
                "{}The thesis \"{}\" you were assigned to is complete and archived.{}",
                greeting, thesis_title, closing
            ),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thesis_common::events::ExamStage;
    use uuid::Uuid;

    #[test]
    fn test_ready_for_exam_names_stage() {
        let event = ThesisEvent::ReadyForExam {
            thesis_id: Uuid::new_v4(),
            stage: ExamStage::FinalDefense,
            timestamp: chrono::Utc::now(),
        };
        let notice = render(&event, "Edge Caching", Audience::Student, "Ayu");
        assert_eq!(notice.subject, "Thesis ready for Final Thesis Defense");
        assert!(notice.body.starts_with("Dear Ayu,"));
        assert!(notice.body.contains("\"Edge Caching\""));
    }

    #[test]
    fn test_completion_differs_by_audience() {
        let event = ThesisEvent::ThesisCompleted {
            thesis_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        };
        let student = render(&event, "T", Audience::Student, "S");
        let lecturer = render(&event, "T", Audience::Lecturer, "L");
        assert_eq!(student.subject, lecturer.subject);
        assert_ne!(student.body, lecturer.body);
    }

    #[test]
    fn test_examiner_assignment_mentions_kind() {
        let event = ThesisEvent::LectureAssigned {
            thesis_id: Uuid::new_v4(),
            lecture_id: Uuid::new_v4(),
            role: LectureRole::Examiner,
            examiner_type: Some(ExaminerType::FinalDefenseExaminer),
            timestamp: chrono::Utc::now(),
        };
        let notice = render(&event, "T", Audience::Lecturer, "L");
        assert!(notice.body.contains("final defense examiner"));
    }
}
