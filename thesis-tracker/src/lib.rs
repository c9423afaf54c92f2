//! thesis-tracker library - thesis supervision workflow service
//!
//! Lecture assignment, staged approvals, progress review and scoring over a
//! SQLite store, with workflow notifications delivered by mail.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thesis_common::events::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod error;
pub mod notify;
pub mod workflow;

pub use error::{ApiError, ApiResult};
pub use workflow::Workflow;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Workflow events, consumed by the notification dispatcher
    pub event_bus: EventBus,
    pub workflow: Workflow,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        let workflow = Workflow::new(db.clone(), event_bus.clone());
        Self {
            db,
            event_bus,
            workflow,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// `/health` is public; everything under `/api/v1` requires caller identity
/// headers.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(api::thesis_routes())
        .merge(api::progress_routes());

    Router::new()
        .merge(api::health_routes())
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
