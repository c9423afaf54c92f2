//! Event subscriber that resolves recipients and hands mail to a [`Mailer`]

use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use thesis_common::db;
use thesis_common::events::{EventBus, ThesisEvent};
use thesis_common::models::Thesis;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::messages::{render, Audience};
use super::{Mailer, NotifyError, OutgoingMail};

struct Recipient {
    audience: Audience,
    name: String,
    email: String,
}

pub struct NotificationDispatcher {
    db: SqlitePool,
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    pub fn new(db: SqlitePool, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    /// Subscribe now and process events on a background task
    ///
    /// The subscription is taken before the task starts, so no event emitted
    /// after this call is missed.
    pub fn spawn(self, events: &EventBus) -> JoinHandle<()> {
        let rx = events.subscribe();
        tokio::spawn(self.run(rx))
    }

    /// Process events until every sender is dropped
    pub async fn run(self, mut rx: broadcast::Receiver<ThesisEvent>) {
        debug!(mailer = self.mailer.name(), "Notification dispatcher started");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    self.handle(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Notification dispatcher lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, notification dispatcher stopping");
                    break;
                }
            }
        }
    }

    /// Deliver one event; returns the number of messages accepted
    ///
    /// Never fails: lookup and send errors are logged and skipped.
    pub async fn handle(&self, event: &ThesisEvent) -> usize {
        let (title, recipients) = match self.resolve(event).await {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(
                    event_type = event.event_type(),
                    thesis_id = %event.thesis_id(),
                    error = %e,
                    "Could not resolve notification recipients"
                );
                return 0;
            }
        };

        let mut sent = 0;
        for recipient in recipients {
            let notice = render(event, &title, recipient.audience, &recipient.name);
            let mail = OutgoingMail {
                to_name: recipient.name,
                to_email: recipient.email,
                subject: notice.subject,
                body: notice.body,
            };
            match self.mailer.send(&mail).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(
                    event_type = event.event_type(),
                    to = %mail.to_email,
                    error = %e,
                    "Notification send failed"
                ),
            }
        }
        sent
    }

    async fn resolve(&self, event: &ThesisEvent) -> Result<(String, Vec<Recipient>), NotifyError> {
        let mut conn = self
            .db
            .acquire()
            .await
            .map_err(thesis_common::Error::from)?;
        let thesis = db::load_thesis(&mut conn, event.thesis_id())
            .await?
            .ok_or_else(|| thesis_common::Error::not_found("thesis not found"))?;

        let mut recipients = Vec::new();
        match event {
            ThesisEvent::ProposalSubmitted { supervisor_id, .. } => {
                push_student(&mut conn, &thesis, &mut recipients).await?;
                push_lecturer(&mut conn, *supervisor_id, &mut recipients).await?;
            }
            ThesisEvent::LectureAssigned { lecture_id, .. } => {
                push_lecturer(&mut conn, *lecture_id, &mut recipients).await?;
            }
            ThesisEvent::ProgressSubmitted { reviewer_id, .. } => {
                push_lecturer(&mut conn, *reviewer_id, &mut recipients).await?;
            }
            ThesisEvent::ProgressReviewed { .. }
            | ThesisEvent::ReadyForExam { .. }
            | ThesisEvent::ReadyForFinalSubmission { .. } => {
                push_student(&mut conn, &thesis, &mut recipients).await?;
            }
            ThesisEvent::FinalDocumentUploaded { .. } => {
                for tl in thesis.supervisors() {
                    push_lecturer(&mut conn, tl.lecture_id, &mut recipients).await?;
                }
            }
            ThesisEvent::ThesisCompleted { .. } => {
                push_student(&mut conn, &thesis, &mut recipients).await?;
                for tl in &thesis.lectures {
                    push_lecturer(&mut conn, tl.lecture_id, &mut recipients).await?;
                }
            }
        }

        Ok((thesis.title, recipients))
    }
}

async fn push_student(
    conn: &mut SqliteConnection,
    thesis: &Thesis,
    out: &mut Vec<Recipient>,
) -> Result<(), NotifyError> {
    match db::find_student_by_id(conn, thesis.student_id).await? {
        Some(student) => out.push(Recipient {
            audience: Audience::Student,
            name: student.name,
            email: student.email,
        }),
        None => warn!(student_id = %thesis.student_id, "Student missing, notification skipped"),
    }
    Ok(())
}

async fn push_lecturer(
    conn: &mut SqliteConnection,
    lecture_id: Uuid,
    out: &mut Vec<Recipient>,
) -> Result<(), NotifyError> {
    match db::find_lecture_by_id(conn, lecture_id).await? {
        Some(lecture) => out.push(Recipient {
            audience: Audience::Lecturer,
            name: lecture.name,
            email: lecture.email,
        }),
        None => warn!(lecture_id = %lecture_id, "Lecture missing, notification skipped"),
    }
    Ok(())
}
