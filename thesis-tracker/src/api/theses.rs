//! Thesis endpoints: submission, reads, assignment, approvals, documents

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use thesis_common::models::{DocumentKind, LectureRole, ThesisLecture, UserRole};
use thesis_common::ThesisProgress;
use uuid::Uuid;

use super::Caller;
use crate::error::{ApiError, ApiResult};
use crate::workflow::{ProposalRequest, ThesisView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub url: String,
}

/// POST /theses
pub async fn submit_proposal(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<ProposalRequest>,
) -> ApiResult<(StatusCode, Json<ThesisView>)> {
    caller.require(UserRole::Student)?;
    let thesis = state.workflow.submit_proposal(caller.id, req).await?;
    let view = state.workflow.view(thesis).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /theses
pub async fn list_theses(
    State(state): State<AppState>,
    _caller: Caller,
) -> ApiResult<Json<Vec<ThesisView>>> {
    Ok(Json(state.workflow.list_theses().await?))
}

/// GET /theses/me
pub async fn list_my_theses(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<ThesisView>>> {
    let theses = state.workflow.list_my_theses(caller.role, caller.id).await?;
    Ok(Json(theses))
}

/// GET /theses/:id
pub async fn get_thesis(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ThesisView>> {
    Ok(Json(state.workflow.get_thesis(id).await?))
}

/// GET /theses/student/:student_id
pub async fn list_theses_by_student(
    State(state): State<AppState>,
    _caller: Caller,
    Path(student_id): Path<Uuid>,
) -> ApiResult<Json<Vec<ThesisView>>> {
    Ok(Json(state.workflow.list_theses_by_student(student_id).await?))
}

/// GET /theses/:id/progress
pub async fn thesis_progress(
    State(state): State<AppState>,
    _caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ThesisProgress>> {
    Ok(Json(state.workflow.thesis_progress(id).await?))
}

async fn assign(
    state: &AppState,
    caller: Caller,
    thesis_id: Uuid,
    lecture_id: Uuid,
    role: LectureRole,
) -> ApiResult<(StatusCode, Json<ThesisLecture>)> {
    caller.require(UserRole::Admin)?;
    let assignment = state
        .workflow
        .assign_lecture(thesis_id, lecture_id, role)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// POST /theses/:id/supervisor/:lecture_id
pub async fn assign_supervisor(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, lecture_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<(StatusCode, Json<ThesisLecture>)> {
    assign(&state, caller, id, lecture_id, LectureRole::Supervisor).await
}

/// POST /theses/:id/examiner/:lecture_id
pub async fn assign_examiner(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, lecture_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<(StatusCode, Json<ThesisLecture>)> {
    assign(&state, caller, id, lecture_id, LectureRole::Examiner).await
}

/// POST /theses/:id/approve/defense
pub async fn approve_for_defense(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ThesisView>> {
    caller.require(UserRole::Lecture)?;
    let thesis = state.workflow.approve_for_defense(id, caller.id).await?;
    Ok(Json(state.workflow.view(thesis).await?))
}

/// POST /theses/:id/approve/finalize
pub async fn approve_for_finalize(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ThesisView>> {
    caller.require(UserRole::Lecture)?;
    let thesis = state.workflow.approve_for_finalize(id, caller.id).await?;
    Ok(Json(state.workflow.view(thesis).await?))
}

/// POST /theses/:id/complete
pub async fn mark_completed(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ThesisView>> {
    caller.require(UserRole::Admin)?;
    let thesis = state.workflow.mark_completed(id).await?;
    Ok(Json(state.workflow.view(thesis).await?))
}

/// PUT /theses/:id/documents/:kind
///
/// Called once the storage backend has accepted the upload.
pub async fn record_document(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, kind)): Path<(Uuid, String)>,
    Json(req): Json<DocumentRequest>,
) -> ApiResult<Json<ThesisView>> {
    caller.require(UserRole::Student)?;
    let kind: DocumentKind = kind
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("unknown document kind: {}", kind)))?;
    let thesis = state
        .workflow
        .record_document(caller.id, id, kind, &req.url)
        .await?;
    Ok(Json(state.workflow.view(thesis).await?))
}

pub fn thesis_routes() -> Router<AppState> {
    Router::new()
        .route("/theses", post(submit_proposal).get(list_theses))
        .route("/theses/me", get(list_my_theses))
        .route("/theses/student/:student_id", get(list_theses_by_student))
        .route("/theses/:id", get(get_thesis))
        .route("/theses/:id/progress", get(thesis_progress))
        .route("/theses/:id/supervisor/:lecture_id", post(assign_supervisor))
        .route("/theses/:id/examiner/:lecture_id", post(assign_examiner))
        .route("/theses/:id/approve/defense", post(approve_for_defense))
        .route("/theses/:id/approve/finalize", post(approve_for_finalize))
        .route("/theses/:id/complete", post(mark_completed))
        .route("/theses/:id/documents/:kind", put(record_document))
}
