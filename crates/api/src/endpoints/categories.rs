//! Category and field endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use geonote_common::{AppError, AppResult};
use geonote_core::fields::{CategorySchema, FieldSchema};
use geonote_core::{
    CreateCategoryInput, CreateFieldInput, CreateLookupValueInput, UpdateCategoryInput,
    UpdateFieldInput,
};
use geonote_db::entities::{category, field, lookup_value};
use serde::Deserialize;

use crate::{extractors::Principal, middleware::AppState};

/// New ordering for categories or fields.
#[derive(Deserialize)]
pub struct ReorderRequest {
    pub ordered_ids: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/categories",
            get(list).post(create),
        )
        .route("/projects/{project_id}/categories/reorder", post(reorder))
        .route(
            "/projects/{project_id}/categories/{category_id}",
            get(show).patch(update).delete(remove),
        )
        .route(
            "/projects/{project_id}/categories/{category_id}/fields",
            get(list_fields).post(create_field),
        )
        .route(
            "/projects/{project_id}/categories/{category_id}/fields/reorder",
            post(reorder_fields),
        )
        .route(
            "/projects/{project_id}/categories/{category_id}/fields/{field_id}",
            get(show_field).patch(update_field),
        )
        .route(
            "/projects/{project_id}/categories/{category_id}/fields/{field_id}/values",
            post(create_value),
        )
        .route(
            "/projects/{project_id}/categories/{category_id}/fields/{field_id}/values/{value_id}",
            delete(deactivate_value),
        )
}

async fn list(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<Vec<CategorySchema>>> {
    let schemas = state.category_service.list(&principal, &project_id).await?;
    Ok(Json(schemas))
}

async fn show(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id)): Path<(String, String)>,
) -> AppResult<Json<CategorySchema>> {
    let schema = state
        .category_service
        .get(&principal, &project_id, &category_id)
        .await?;
    Ok(Json(schema))
}

async fn create(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<category::Model>)> {
    let created = state
        .category_service
        .create(&principal, &project_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id)): Path<(String, String)>,
    Json(input): Json<UpdateCategoryInput>,
) -> AppResult<Json<category::Model>> {
    let updated = state
        .category_service
        .update(&principal, &project_id, &category_id, input)
        .await?;
    Ok(Json(updated))
}

async fn remove(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .category_service
        .delete(&principal, &project_id, &category_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<ReorderRequest>,
) -> AppResult<StatusCode> {
    state
        .category_service
        .reorder(&principal, &project_id, &req.ordered_ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_fields(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id)): Path<(String, String)>,
) -> AppResult<Json<Vec<FieldSchema>>> {
    let schema = state
        .category_service
        .get(&principal, &project_id, &category_id)
        .await?;
    Ok(Json(schema.fields))
}

async fn show_field(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id, field_id)): Path<(String, String, String)>,
) -> AppResult<Json<FieldSchema>> {
    let schema = state
        .category_service
        .get(&principal, &project_id, &category_id)
        .await?;
    schema
        .fields
        .into_iter()
        .find(|f| f.id == field_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("field {field_id}")))
}

async fn create_field(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id)): Path<(String, String)>,
    Json(input): Json<CreateFieldInput>,
) -> AppResult<(StatusCode, Json<field::Model>)> {
    let created = state
        .category_service
        .create_field(&principal, &project_id, &category_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_field(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id, field_id)): Path<(String, String, String)>,
    Json(input): Json<UpdateFieldInput>,
) -> AppResult<Json<field::Model>> {
    let updated = state
        .category_service
        .update_field(&principal, &project_id, &category_id, &field_id, input)
        .await?;
    Ok(Json(updated))
}

async fn reorder_fields(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id)): Path<(String, String)>,
    Json(req): Json<ReorderRequest>,
) -> AppResult<StatusCode> {
    state
        .category_service
        .reorder_fields(&principal, &project_id, &category_id, &req.ordered_ids)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_value(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id, field_id)): Path<(String, String, String)>,
    Json(input): Json<CreateLookupValueInput>,
) -> AppResult<(StatusCode, Json<lookup_value::Model>)> {
    let created = state
        .category_service
        .create_lookup_value(&principal, &project_id, &category_id, &field_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn deactivate_value(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, category_id, field_id, value_id)): Path<(String, String, String, String)>,
) -> AppResult<Json<lookup_value::Model>> {
    let deactivated = state
        .category_service
        .deactivate_lookup_value(&principal, &project_id, &category_id, &field_id, &value_id)
        .await?;
    Ok(Json(deactivated))
}
