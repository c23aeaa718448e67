//! Contribution endpoints.
//!
//! Reads go through one of three lanes under the data-groupings path:
//! `all-contributions` (moderation), `my-contributions` (own records) or a
//! grouping id (filtered by that grouping's rules). Creation is lane-free.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use geonote_common::{AppError, AppResult};
use geonote_core::policy::Lane;
use geonote_core::{
    ContributionFeature, CreateContributionInput, LocationInput, UpdateContributionInput,
};
use geonote_db::entities::contribution::ContributionStatus;
use geonote_db::entities::contribution_snapshot;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{extractors::Principal, middleware::AppState};

/// Map the lane path segment onto a lane and an optional grouping id.
pub(crate) fn lane_param(segment: &str) -> (Lane, Option<&str>) {
    match segment {
        "all-contributions" => (Lane::All, None),
        "my-contributions" => (Lane::Mine, None),
        grouping_id => (Lane::Grouping, Some(grouping_id)),
    }
}

/// Wire shape of a new contribution: a GeoJSON-like feature whose
/// `properties` bag carries `category`, an optional `location` and an
/// optional requested `status` alongside the field values.
#[derive(Deserialize)]
pub struct FeatureEnvelope {
    #[serde(rename = "type")]
    pub feature_type: Option<String>,
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl FeatureEnvelope {
    fn into_input(mut self) -> AppResult<CreateContributionInput> {
        let category_id = match self.properties.remove("category") {
            Some(Value::String(id)) => id,
            Some(_) => {
                return Err(AppError::validation_field("category", "must be an id string"));
            }
            None => return Err(AppError::validation_field("category", "is required")),
        };
        let location = match self.properties.remove("location") {
            Some(value) => serde_json::from_value::<LocationInput>(value)
                .map_err(|e| AppError::validation_field("location", e.to_string()))?,
            None => LocationInput::New {
                name: None,
                description: None,
                private: false,
            },
        };
        let status = take_status(&mut self.properties)?;

        Ok(CreateContributionInput {
            category_id,
            location,
            geometry: self.geometry,
            status,
            properties: self.properties,
        })
    }
}

/// Wire shape of a contribution update: a partial `properties` bag that may
/// carry a requested `status`.
#[derive(Deserialize)]
pub struct UpdateEnvelope {
    pub properties: Option<Map<String, Value>>,
}

impl UpdateEnvelope {
    fn into_input(self) -> AppResult<UpdateContributionInput> {
        let Some(mut properties) = self.properties else {
            return Ok(UpdateContributionInput::default());
        };
        let status = take_status(&mut properties)?;
        Ok(UpdateContributionInput {
            properties: Some(properties),
            status,
        })
    }
}

fn take_status(properties: &mut Map<String, Value>) -> AppResult<Option<ContributionStatus>> {
    match properties.remove("status") {
        None => Ok(None),
        Some(value) => serde_json::from_value::<ContributionStatus>(value)
            .map(Some)
            .map_err(|e| AppError::validation_field("status", e.to_string())),
    }
}

/// A lane listing rendered as a GeoJSON feature collection.
#[derive(Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: &'static str,
    pub features: Vec<ContributionFeature>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/contributions",
            get(list_all).post(create),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/contributions",
            get(list),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/contributions/{contribution_id}",
            get(show).patch(update).delete(remove),
        )
        .route(
            "/projects/{project_id}/data-groupings/{grouping_id}/contributions/{contribution_id}/history",
            get(history),
        )
}

async fn create(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(envelope): Json<FeatureEnvelope>,
) -> AppResult<(StatusCode, Json<ContributionFeature>)> {
    let feature = state
        .contribution_service
        .create(&principal, &project_id, envelope.into_input()?)
        .await?;
    Ok((StatusCode::CREATED, Json(feature)))
}

/// The moderation lane without the lane prefix.
async fn list_all(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> AppResult<Json<FeatureCollection>> {
    let features = state
        .contribution_service
        .list(&principal, &project_id, Lane::All, None)
        .await?;
    Ok(Json(FeatureCollection {
        collection_type: "FeatureCollection",
        features,
    }))
}

async fn list(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment)): Path<(String, String)>,
) -> AppResult<Json<FeatureCollection>> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    let features = state
        .contribution_service
        .list(&principal, &project_id, lane, grouping_id)
        .await?;
    Ok(Json(FeatureCollection {
        collection_type: "FeatureCollection",
        features,
    }))
}

async fn show(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id)): Path<(String, String, String)>,
) -> AppResult<Json<ContributionFeature>> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    let feature = state
        .contribution_service
        .get(&principal, &project_id, lane, grouping_id, &contribution_id)
        .await?;
    Ok(Json(feature))
}

async fn update(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id)): Path<(String, String, String)>,
    Json(envelope): Json<UpdateEnvelope>,
) -> AppResult<Json<ContributionFeature>> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    let feature = state
        .contribution_service
        .update(
            &principal,
            &project_id,
            lane,
            grouping_id,
            &contribution_id,
            envelope.into_input()?,
        )
        .await?;
    Ok(Json(feature))
}

async fn remove(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id)): Path<(String, String, String)>,
) -> AppResult<StatusCode> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    state
        .contribution_service
        .delete(&principal, &project_id, lane, grouping_id, &contribution_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn history(
    Principal(principal): Principal,
    State(state): State<AppState>,
    Path((project_id, lane_segment, contribution_id)): Path<(String, String, String)>,
) -> AppResult<Json<Vec<contribution_snapshot::Model>>> {
    let (lane, grouping_id) = lane_param(&lane_segment);
    let snapshots = state
        .contribution_service
        .history(&principal, &project_id, lane, grouping_id, &contribution_id)
        .await?;
    Ok(Json(snapshots))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lane_segments_resolve() {
        assert_eq!(lane_param("all-contributions"), (Lane::All, None));
        assert_eq!(lane_param("my-contributions"), (Lane::Mine, None));
        assert_eq!(
            lane_param("01jgrouping"),
            (Lane::Grouping, Some("01jgrouping"))
        );
    }

    #[test]
    fn envelope_splits_reserved_property_keys() {
        let envelope: FeatureEnvelope = serde_json::from_str(
            r#"{
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-0.13, 51.52]},
                "properties": {
                    "category": "cat-1",
                    "location": {"name": "L", "private": true},
                    "status": "draft",
                    "name": "X",
                    "age": 12
                }
            }"#,
        )
        .unwrap();

        let input = envelope.into_input().unwrap();
        assert_eq!(input.category_id, "cat-1");
        assert_eq!(input.status, Some(ContributionStatus::Draft));
        assert!(matches!(
            input.location,
            LocationInput::New { private: true, .. }
        ));
        assert_eq!(input.properties.len(), 2);
        assert_eq!(input.properties["age"], 12);
    }

    #[test]
    fn envelope_without_category_is_rejected() {
        let envelope: FeatureEnvelope =
            serde_json::from_str(r#"{"type": "Feature", "properties": {"name": "X"}}"#).unwrap();
        assert!(envelope.into_input().is_err());
    }
}
