//! Workflow engines
//!
//! Every mutating operation runs in one SQLite transaction and writes the
//! thesis row through the version-checked `update_thesis`, so two operations
//! racing on the same thesis cannot both commit. Events are published only
//! after commit.

pub mod approval;
pub mod assignment;
pub mod queries;
pub mod review;
pub mod submission;

pub use approval::{FinalizeQuorum, SupervisorQuorum};
pub use queries::ThesisView;
pub use review::ReviewOutcome;
pub use submission::{ProgressRequest, ProposalRequest};

use sqlx::{SqliteConnection, SqlitePool};
use thesis_common::db;
use thesis_common::events::{EventBus, ThesisEvent};
use thesis_common::models::Thesis;
use thesis_common::{Error, Result};
use tracing::info;
use uuid::Uuid;

/// Entry point for all thesis workflow operations
#[derive(Clone)]
pub struct Workflow {
    db: SqlitePool,
    events: EventBus,
}

impl Workflow {
    pub fn new(db: SqlitePool, events: EventBus) -> Self {
        Self { db, events }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Hand committed events to the notification side
    fn publish(&self, events: Vec<ThesisEvent>) {
        for event in &events {
            info!(
                event_type = event.event_type(),
                thesis_id = %event.thesis_id(),
                "Workflow event"
            );
        }
        self.events.emit_all(events);
    }
}

/// Lock contention inside a workflow transaction means another writer won
pub(crate) fn contention(err: Error) -> Error {
    let busy = matches!(
        &err,
        Error::Database(sqlx::Error::Database(db_err))
            if matches!(db_err.code().as_deref(), Some("5") | Some("6") | Some("517"))
    );
    if busy {
        Error::Conflict("thesis was modified concurrently, retry the request".to_string())
    } else {
        err
    }
}

/// Load a thesis with its assignments or fail NotFound
pub(crate) async fn require_thesis(conn: &mut SqliteConnection, thesis_id: Uuid) -> Result<Thesis> {
    db::load_thesis(conn, thesis_id)
        .await?
        .ok_or_else(|| Error::not_found("thesis not found"))
}

/// Minimum trimmed length for free-text input
pub(crate) fn require_len(value: &str, min: usize, field: &str) -> Result<()> {
    if value.trim().chars().count() < min {
        return Err(Error::InvalidInput(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    Ok(())
}
