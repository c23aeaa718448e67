//! Data grouping endpoints: the groupings themselves, their rules and their
//! access grants.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use geonote_common::AppResult;
use geonote_core::{CreateGroupingInput, CreateRuleInput, UpdateGroupingInput};
use geonote_db::entities::{grouping, grouping_access, rule};
use serde::Deserialize;

use crate::{extractors::Principal, middleware::AppState};

/// Access grant request for one user group.
#[derive(Deserialize)]
pub struct GrantAccessRequest {
    /// Grants read access to the grouping's data on top of the implied
    /// metadata visibility.
    #[serde(default)]
    pub can_read: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/data-groupings",
            get(list).post(create),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}",
            get(show).patch(update).delete(remove),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/rules",
            get(rules).post(create_rule),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/rules/{rule_id}",
            axum::routing::patch(update_rule).delete(remove_rule),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/access",
            get(access_records),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/access/{group_id}",
            put(grant_access).delete(revoke_access),
        )
}

async fn list(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<Vec<grouping::Model>>> {
    let groupings = state.grouping_service.list(&principal, &project_id).await?;
    Ok(Json(groupings))
}

async fn show(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id)): Path<(String, String)>,
) -> AppResult<Json<grouping::Model>> {
    let grouping = state
        .grouping_service
        .get(&principal, &project_id, &grouping_id)
        .await?;
    Ok(Json(grouping))
}

async fn create(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(input): Json<CreateGroupingInput>,
) -> AppResult<(StatusCode, Json<grouping::Model>)> {
    let created = state
        .grouping_service
        .create(&principal, &project_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id)): Path<(String, String)>,
    Json(input): Json<UpdateGroupingInput>,
) -> AppResult<Json<grouping::Model>> {
    let updated = state
        .grouping_service
        .update(&principal, &project_id, &grouping_id, input)
        .await?;
    Ok(Json(updated))
}

async fn remove(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state
        .grouping_service
        .delete(&principal, &project_id, &grouping_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rules(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id)): Path<(String, String)>,
) -> AppResult<Json<Vec<rule::Model>>> {
    let rules = state
        .grouping_service
        .rules(&principal, &project_id, &grouping_id)
        .await?;
    Ok(Json(rules))
}

async fn create_rule(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id)): Path<(String, String)>,
    Json(input): Json<CreateRuleInput>,
) -> AppResult<(StatusCode, Json<rule::Model>)> {
    let created = state
        .grouping_service
        .create_rule(&principal, &project_id, &grouping_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_rule(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id, rule_id)): Path<(String, String, String)>,
    Json(input): Json<CreateRuleInput>,
) -> AppResult<Json<rule::Model>> {
    let updated = state
        .grouping_service
        .update_rule(&principal, &project_id, &grouping_id, &rule_id, input)
        .await?;
    Ok(Json(updated))
}

async fn remove_rule(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id, rule_id)): Path<(String, String, String)>,
) -> AppResult<StatusCode> {
    state
        .grouping_service
        .delete_rule(&principal, &project_id, &grouping_id, &rule_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn access_records(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id)): Path<(String, String)>,
) -> AppResult<Json<Vec<grouping_access::Model>>> {
    let records = state
        .grouping_service
        .access_records(&principal, &project_id, &grouping_id)
        .await?;
    Ok(Json(records))
}

async fn grant_access(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id, group_id)): Path<(String, String, String)>,
    Json(req): Json<GrantAccessRequest>,
) -> AppResult<Json<grouping_access::Model>> {
    let record = state
        .grouping_service
        .grant_access(&principal, &project_id, &grouping_id, &group_id, req.can_read)
        .await?;
    Ok(Json(record))
}

async fn revoke_access(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, grouping_id, group_id)): Path<(String, String, String)>,
) -> AppResult<StatusCode> {
    state
        .grouping_service
        .revoke_access(&principal, &project_id, &grouping_id, &group_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
