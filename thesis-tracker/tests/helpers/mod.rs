//! Shared fixtures for thesis-tracker integration tests
//!
//! Every fixture runs against its own in-memory database.

#![allow(dead_code)]

use sqlx::SqlitePool;
use thesis_common::db;
use thesis_common::events::EventBus;
use thesis_common::models::{Admin, Lecture, LectureRole, Progress, Student, Thesis};
use thesis_tracker::workflow::{ProgressRequest, ProposalRequest};
use thesis_tracker::{AppState, Workflow};
use uuid::Uuid;

pub struct World {
    pub pool: SqlitePool,
    pub events: EventBus,
    pub workflow: Workflow,
    pub student: Student,
    pub other_student: Student,
    /// lectures[0] is always the nominated main supervisor
    pub lectures: Vec<Lecture>,
    pub admin: Admin,
}

/// Database with two students, `n_lectures` lecturers and one admin
pub async fn world(n_lectures: usize) -> World {
    let pool = db::connect_in_memory().await.unwrap();
    let events = EventBus::new(64);
    let workflow = Workflow::new(pool.clone(), events.clone());

    let student = Student::new("Ayu Lestari", "2101001", "ayu@student.example.edu", "Informatics", "2021");
    let other_student = Student::new("Bima Sakti", "2101002", "bima@student.example.edu", "Informatics", "2021");
    let lectures: Vec<Lecture> = (0..n_lectures)
        .map(|i| {
            Lecture::new(
                &format!("Dr. Lecturer {}", i),
                &format!("00{:08}", i),
                &format!("lecturer{}@example.edu", i),
                "Informatics",
            )
        })
        .collect();
    let admin = Admin::new("Registrar", "registrar@example.edu");

    let mut conn = pool.acquire().await.unwrap();
    db::insert_student(&mut conn, &student).await.unwrap();
    db::insert_student(&mut conn, &other_student).await.unwrap();
    for lecture in &lectures {
        db::insert_lecture(&mut conn, lecture).await.unwrap();
    }
    db::insert_admin(&mut conn, &admin).await.unwrap();
    drop(conn);

    World {
        pool,
        events,
        workflow,
        student,
        other_student,
        lectures,
        admin,
    }
}

impl World {
    pub fn lecture(&self, i: usize) -> Uuid {
        self.lectures[i].id
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(self.pool.clone(), self.events.clone())
    }

    /// Proposal by `student` nominating lectures[0]
    pub async fn proposal(&self) -> Thesis {
        self.workflow
            .submit_proposal(
                self.student.id,
                ProposalRequest {
                    title: "Adaptive caching for edge inference".to_string(),
                    abstract_text: "Reducing latency of model serving at the network edge".to_string(),
                    research_field: "Distributed Systems".to_string(),
                    supervisor_id: self.lecture(0),
                },
            )
            .await
            .unwrap()
    }

    /// Proposal with lectures[0..n] assigned as supervisors
    pub async fn supervised_thesis(&self, n: usize) -> Thesis {
        let thesis = self.proposal().await;
        for i in 0..n {
            self.workflow
                .assign_lecture(thesis.id, self.lecture(i), LectureRole::Supervisor)
                .await
                .unwrap();
        }
        thesis
    }

    pub async fn submit_progress(&self, thesis_id: Uuid, reviewer_id: Uuid) -> Progress {
        self.workflow
            .add_progress(
                self.student.id,
                ProgressRequest {
                    thesis_id,
                    reviewer_id,
                    progress_description: "Finished the literature review chapter".to_string(),
                    document_url: "https://files.example.edu/progress.pdf".to_string(),
                },
            )
            .await
            .unwrap()
    }

    /// Submit a report to `reviewer_id` and have them review it
    pub async fn reviewed_progress(&self, thesis_id: Uuid, reviewer_id: Uuid) -> Progress {
        let progress = self.submit_progress(thesis_id, reviewer_id).await;
        self.workflow
            .review_progress(progress.id, reviewer_id, "Good work, continue", None)
            .await
            .unwrap()
            .progress
    }

    /// Supervisors lectures[0..n] each review one report and approve once
    pub async fn proposal_ready_thesis(&self, n: usize) -> Thesis {
        let thesis = self.supervised_thesis(n).await;
        for i in 0..n {
            self.reviewed_progress(thesis.id, self.lecture(i)).await;
        }
        let mut latest = thesis;
        for i in 0..n {
            latest = self
                .workflow
                .approve_for_defense(latest.id, self.lecture(i))
                .await
                .unwrap();
        }
        assert!(latest.is_proposal_ready);
        latest
    }

    /// Proposal-ready thesis whose supervisors approved a second time
    pub async fn final_ready_thesis(&self, n: usize) -> Thesis {
        let thesis = self.proposal_ready_thesis(n).await;
        let mut latest = thesis;
        for i in 0..n {
            latest = self
                .workflow
                .approve_for_defense(latest.id, self.lecture(i))
                .await
                .unwrap();
        }
        assert!(latest.is_final_exam_ready);
        latest
    }

    pub async fn load(&self, thesis_id: Uuid) -> Thesis {
        let mut conn = self.pool.acquire().await.unwrap();
        db::load_thesis(&mut conn, thesis_id).await.unwrap().unwrap()
    }
}
