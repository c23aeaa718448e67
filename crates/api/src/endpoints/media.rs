//! Media endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::get,
};
use geonote_common::{AppError, AppResult};
use geonote_core::{CreateMediaInput, MediaRecord};

use crate::{endpoints::lane_param, extractors::Principal, middleware::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/contributions/{contribution_id}/media",
            get(list).post(upload),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/contributions/{contribution_id}/media/{file_id}",
            axum::routing::delete(remove),
        )
}

async fn list(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id)): Path<(String, String, String)>,
) -> AppResult<Json<Vec<MediaRecord>>> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    let records = state
        .media_service
        .list(&principal, &project_id, lane, grouping_id, &contribution_id)
        .await?;
    Ok(Json(records))
}

async fn upload(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id)): Path<(String, String, String)>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<MediaRecord>)> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    let input = read_upload(multipart).await?;
    let record = state
        .media_service
        .upload(
            &principal,
            &project_id,
            lane,
            grouping_id,
            &contribution_id,
            input,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn remove(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id, file_id)): Path<(
        String,
        String,
        String,
        String,
    )>,
) -> AppResult<StatusCode> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    state
        .media_service
        .delete(
            &principal,
            &project_id,
            lane,
            grouping_id,
            &contribution_id,
            &file_id,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Collect the `file`, `name` and `description` parts of the upload form.
async fn read_upload(mut multipart: Multipart) -> AppResult<CreateMediaInput> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut name = None;
    let mut description = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .unwrap_or("unnamed")
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid file part: {e}")))?;
                file = Some((file_name, content_type, data.to_vec()));
            }
            Some("name") => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid name part: {e}")))?,
                );
            }
            Some("description") => {
                description = Some(
                    field.text().await.map_err(|e| {
                        AppError::BadRequest(format!("Invalid description part: {e}"))
                    })?,
                );
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) = file
        .ok_or_else(|| AppError::BadRequest("Missing file part".to_string()))?;
    Ok(CreateMediaInput {
        file_name,
        content_type,
        data,
        name,
        description,
    })
}
