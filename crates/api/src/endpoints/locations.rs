//! Location endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use geonote_common::AppResult;
use geonote_core::UpdateLocationInput;
use geonote_db::entities::location;

use crate::{extractors::Principal, middleware::AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/locations", get(list))
        .route(
            "/projects/{project_id}/locations/{location_id}",
            get(show).patch(update),
        )
}

async fn list(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<Vec<location::Model>>> {
    let locations = state.location_service.list(&principal, &project_id).await?;
    Ok(Json(locations))
}

async fn show(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, location_id)): Path<(String, String)>,
) -> AppResult<Json<location::Model>> {
    let location = state
        .location_service
        .get(&principal, &project_id, &location_id)
        .await?;
    Ok(Json(location))
}

async fn update(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, location_id)): Path<(String, String)>,
    Json(input): Json<UpdateLocationInput>,
) -> AppResult<Json<location::Model>> {
    let updated = state
        .location_service
        .update(&principal, &project_id, &location_id, input)
        .await?;
    Ok(Json(updated))
}
