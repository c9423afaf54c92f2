//! Progress report endpoints: submission, review, comments

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use thesis_common::models::{Comment, CommentThread, Progress, UserRole};
use uuid::Uuid;

use super::Caller;
use crate::error::ApiResult;
use crate::workflow::{ProgressRequest, ReviewOutcome};
use crate::AppState;

/// Body of a review or a comment
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

/// POST /progress
pub async fn add_progress(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<ProgressRequest>,
) -> ApiResult<(StatusCode, Json<Progress>)> {
    caller.require(UserRole::Student)?;
    let progress = state.workflow.add_progress(caller.id, req).await?;
    Ok((StatusCode::CREATED, Json(progress)))
}

/// GET /progress/:id
pub async fn get_progress(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Progress>> {
    Ok(Json(state.workflow.get_progress(id).await?))
}

/// GET /progress/thesis/:thesis_id
pub async fn list_progress_by_thesis(
    State(state): State<AppState>,
    _caller: Caller,
    Path(thesis_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Progress>>> {
    Ok(Json(state.workflow.list_progress_by_thesis(thesis_id).await?))
}

/// POST /progress/:id/review
pub async fn review_progress(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<ReviewOutcome>> {
    caller.require(UserRole::Lecture)?;
    let outcome = state
        .workflow
        .review_progress(id, caller.id, &req.content, req.parent_id)
        .await?;
    Ok(Json(outcome))
}

/// POST /progress/:id/comment
pub async fn add_comment(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    caller.require_any(&[UserRole::Student, UserRole::Lecture])?;
    let comment = state
        .workflow
        .add_comment(id, caller.id, &req.content, req.parent_id)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /progress/:id/comments
pub async fn list_comments(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentThread>>> {
    Ok(Json(state.workflow.list_comments(id).await?))
}

pub fn progress_routes() -> Router<AppState> {
    Router::new()
        .route("/progress", post(add_progress))
        .route("/progress/thesis/:thesis_id", get(list_progress_by_thesis))
        .route("/progress/:id", get(get_progress))
        .route("/progress/:id/review", post(review_progress))
        .route("/progress/:id/comment", post(add_comment))
        .route("/progress/:id/comments", get(list_comments))
}
