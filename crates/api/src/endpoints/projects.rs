//! Project endpoints: the project itself, its administrators and its user
//! groups.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
};
use geonote_common::AppResult;
use geonote_core::roles::Role;
use geonote_core::{CreateGroupInput, CreateProjectInput, UpdateGroupInput, UpdateProjectInput};
use geonote_db::entities::{project, project_admin, user_group, user_group_member};
use serde::{Deserialize, Serialize};

use crate::{extractors::Principal, middleware::AppState};

/// Project response, annotated with the caller's resolved role.
#[derive(Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_private: bool,
    pub status: project::ProjectStatus,
    pub everyone_contributes: project::EveryoneContributes,
    pub geographic_extent: Option<serde_json::Value>,
    pub created_at: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_contribute: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_moderate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
}

impl ProjectResponse {
    fn summary(p: project::Model, role: Role) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            is_private: p.is_private,
            status: p.status,
            everyone_contributes: p.everyone_contributes,
            geographic_extent: p.geographic_extent,
            created_at: p.created_at.to_rfc3339(),
            role,
            can_contribute: None,
            can_moderate: None,
            is_admin: None,
        }
    }
}

/// Request naming a user to grant or attach.
#[derive(Deserialize)]
pub struct UserIdRequest {
    pub user_id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list).post(create))
        .route(
            "/projects/{project_id}",
            get(show).patch(update).delete(remove),
        )
        .route("/projects/{project_id}/admins", get(admins).post(add_admin))
        .route(
            "/projects/{project_id}/admins/{user_id}",
            delete(remove_admin),
        )
        .route(
            "/projects/{project_id}/groups",
            get(groups).post(create_group),
        )
        .route("/projects/{project_id}/groups/{group_id}", patch(update_group))
        .route(
            "/projects/{project_id}/groups/{group_id}/members",
            post(add_member),
        )
        .route(
            "/projects/{project_id}/groups/{group_id}/members/{user_id}",
            delete(remove_member),
        )
}

async fn list(
    Principal(principal): Principal,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProjectResponse>>> {
    let projects = state.project_service.list(&principal).await?;
    Ok(Json(
        projects
            .into_iter()
            .map(|(p, role)| ProjectResponse::summary(p, role))
            .collect(),
    ))
}

async fn show(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<ProjectResponse>> {
    let (project, role, caps) = state.project_service.get(&principal, &project_id).await?;
    let mut response = ProjectResponse::summary(project, role);
    response.can_contribute = Some(caps.can_contribute);
    response.can_moderate = Some(caps.can_moderate);
    response.is_admin = Some(caps.is_admin);
    Ok(Json(response))
}

async fn create(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Json(input): Json<CreateProjectInput>,
) -> AppResult<(StatusCode, Json<project::Model>)> {
    let created = state.project_service.create(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(input): Json<UpdateProjectInput>,
) -> AppResult<Json<project::Model>> {
    let updated = state
        .project_service
        .update(&principal, &project_id, input)
        .await?;
    Ok(Json(updated))
}

async fn remove(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<StatusCode> {
    state.project_service.delete(&principal, &project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn admins(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<Vec<project_admin::Model>>> {
    let records = state.project_service.admins(&principal, &project_id).await?;
    Ok(Json(records))
}

async fn add_admin(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<(StatusCode, Json<project_admin::Model>)> {
    let record = state
        .project_service
        .add_admin(&principal, &project_id, &req.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn remove_admin(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, user_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .project_service
        .remove_admin(&principal, &project_id, &user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn groups(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<Vec<user_group::Model>>> {
    let records = state.project_service.groups(&principal, &project_id).await?;
    Ok(Json(records))
}

async fn create_group(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(input): Json<CreateGroupInput>,
) -> AppResult<(StatusCode, Json<user_group::Model>)> {
    let created = state
        .project_service
        .create_group(&principal, &project_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_group(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, group_id)): Path<(String, String)>,
    Json(input): Json<UpdateGroupInput>,
) -> AppResult<Json<user_group::Model>> {
    let updated = state
        .project_service
        .update_group(&principal, &project_id, &group_id, input)
        .await?;
    Ok(Json(updated))
}

async fn add_member(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, group_id)): Path<(String, String)>,
    Json(req): Json<UserIdRequest>,
) -> AppResult<(StatusCode, Json<user_group_member::Model>)> {
    let record = state
        .project_service
        .add_member(&principal, &project_id, &group_id, &req.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn remove_member(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, group_id, user_id)): Path<(String, String, String)>,
) -> AppResult<StatusCode> {
    state
        .project_service
        .remove_member(&principal, &project_id, &group_id, &user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
