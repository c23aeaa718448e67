//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use geonote_common::AppResult;
use geonote_core::{CreateCommentInput, UpdateCommentInput};
use geonote_db::entities::comment;

use crate::{endpoints::lane_param, extractors::Principal, middleware::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/contributions/{contribution_id}/comments",
            get(list).post(create),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/contributions/{contribution_id}/comments/{comment_id}",
            patch(update).delete(remove),
        )
}

async fn list(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id)): Path<(String, String, String)>,
) -> AppResult<Json<Vec<comment::Model>>> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    let comments = state
        .comment_service
        .list(&principal, &project_id, lane, grouping_id, &contribution_id)
        .await?;
    Ok(Json(comments))
}

async fn create(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id)): Path<(String, String, String)>,
    Json(input): Json<CreateCommentInput>,
) -> AppResult<(StatusCode, Json<comment::Model>)> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    let created = state
        .comment_service
        .create(
            &principal,
            &project_id,
            lane,
            grouping_id,
            &contribution_id,
            input,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id, comment_id)): Path<(
        String,
        String,
        String,
        String,
    )>,
    Json(input): Json<UpdateCommentInput>,
) -> AppResult<Json<comment::Model>> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    let updated = state
        .comment_service
        .update(
            &principal,
            &project_id,
            lane,
            grouping_id,
            &contribution_id,
            &comment_id,
            input,
        )
        .await?;
    Ok(Json(updated))
}

async fn remove(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id, comment_id)): Path<(
        String,
        String,
        String,
        String,
    )>,
) -> AppResult<StatusCode> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    state
        .comment_service
        .delete(
            &principal,
            &project_id,
            lane,
            grouping_id,
            &contribution_id,
            &comment_id,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
