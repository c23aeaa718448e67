//! Contribution creation, lane-based reading, update and delete.
//!
//! Contributions travel as GeoJSON features: the geometry comes from the
//! location row, everything else rides in `properties` and `meta`.

use chrono::Utc;
use geonote_common::{AppError, AppResult, IdGenerator};
use geonote_db::entities::contribution::ContributionStatus;
use geonote_db::entities::grouping::GroupingStatus;
use geonote_db::entities::{contribution, contribution_snapshot, grouping, location, user};
use geonote_db::repositories::{
    ContributionRepository, ContributionUpdate, GroupingRepository, LocationRepository,
};
use sea_orm::{ColumnTrait, Condition, Set};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fields::CategorySchema;
use crate::filter::CompiledGrouping;
use crate::lifecycle;
use crate::policy::{self, Lane};
use crate::roles::{Capabilities, ProjectContext};
use crate::services::category::CategoryService;
use crate::services::context::ContextLoader;
use crate::services::grouping::GroupingService;
use crate::validate::{self, ValidationMode};

/// Where a new contribution sits: an existing location or an inline one
/// built from the feature's geometry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LocationInput {
    Existing {
        id: String,
    },
    New {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        private: bool,
    },
}

/// Input for creating a contribution.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContributionInput {
    pub category_id: String,
    pub location: LocationInput,
    /// GeoJSON geometry for an inline location.
    pub geometry: Option<Value>,
    /// Only `draft` may be requested; anything else is decided server-side.
    pub status: Option<ContributionStatus>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Input for updating a contribution. Provided property keys are merged
/// over the stored bag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContributionInput {
    pub properties: Option<Map<String, Value>>,
    pub status: Option<ContributionStatus>,
}

/// Non-property metadata of a contribution feature.
#[derive(Debug, Clone, Serialize)]
pub struct ContributionMeta {
    pub category_id: String,
    pub status: ContributionStatus,
    pub creator_id: String,
    pub updator_id: Option<String>,
    pub version: i32,
    pub display_field: Option<String>,
    pub num_media: i32,
    pub num_comments: i32,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
    pub updated_at: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub location: LocationMeta,
}

/// Location metadata carried alongside the geometry.
#[derive(Debug, Clone, Serialize)]
pub struct LocationMeta {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A contribution rendered as a GeoJSON feature.
#[derive(Debug, Clone, Serialize)]
pub struct ContributionFeature {
    #[serde(rename = "type")]
    pub feature_type: &'static str,
    pub id: String,
    pub geometry: Value,
    pub properties: Value,
    pub meta: ContributionMeta,
}

impl ContributionFeature {
    fn from_parts(contribution: contribution::Model, location: location::Model) -> Self {
        Self {
            feature_type: "Feature",
            id: contribution.id,
            geometry: location.geometry,
            properties: contribution.properties,
            meta: ContributionMeta {
                category_id: contribution.category_id,
                status: contribution.status,
                creator_id: contribution.creator_id,
                updator_id: contribution.updator_id,
                version: contribution.version,
                display_field: contribution.display_field,
                num_media: contribution.num_media,
                num_comments: contribution.num_comments,
                created_at: contribution.created_at,
                updated_at: contribution.updated_at,
                location: LocationMeta {
                    id: location.id,
                    name: location.name,
                    description: location.description,
                },
            },
        }
    }
}

/// Service for contributions.
#[derive(Clone)]
pub struct ContributionService {
    contributions: ContributionRepository,
    locations: LocationRepository,
    grouping_repo: GroupingRepository,
    groupings: GroupingService,
    categories: CategoryService,
    context: ContextLoader,
    ids: IdGenerator,
}

impl ContributionService {
    /// Create a new contribution service.
    #[must_use]
    pub const fn new(
        contributions: ContributionRepository,
        locations: LocationRepository,
        grouping_repo: GroupingRepository,
        groupings: GroupingService,
        categories: CategoryService,
        context: ContextLoader,
        ids: IdGenerator,
    ) -> Self {
        Self {
            contributions,
            locations,
            grouping_repo,
            groupings,
            categories,
            context,
            ids,
        }
    }

    /// Create a contribution from a feature payload.
    pub async fn create(
        &self,
        principal: &user::Model,
        project_id: &str,
        input: CreateContributionInput,
    ) -> AppResult<ContributionFeature> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::contribution_create(principal, &ctx, &caps)?;

        let schemas = self.categories.schemas(project_id).await?;
        let schema = schemas
            .iter()
            .find(|s| s.id == input.category_id && s.active)
            .ok_or_else(|| {
                AppError::BadRequest("Unknown or inactive category".to_string())
            })?;

        let draft = match input.status {
            None => false,
            Some(ContributionStatus::Draft) => true,
            Some(_) => {
                return Err(AppError::BadRequest(
                    "New contributions may only request draft status".to_string(),
                ));
            }
        };

        let mut properties = input.properties;
        validate::replace_null(&mut properties);
        let mode = if draft {
            ValidationMode::Draft
        } else {
            ValidationMode::Strict
        };
        validate::validate_properties(schema, &properties, mode)?;

        let (location_id, new_location) = self
            .resolve_location(principal, project_id, input.location, input.geometry)
            .await?;

        let status = if draft {
            ContributionStatus::Draft
        } else {
            lifecycle::submit_status(schema.default_status, caps.can_moderate)
        };
        let display_field = derive_display(schema, &properties);

        let id = self.ids.generate();
        let model = contribution::ActiveModel {
            id: Set(id.clone()),
            project_id: Set(project_id.to_string()),
            category_id: Set(schema.id.clone()),
            location_id: Set(location_id),
            status: Set(status),
            properties: Set(Value::Object(properties)),
            creator_id: Set(principal.id.clone()),
            updator_id: Set(None),
            version: Set(1),
            display_field: Set(display_field),
            num_media: Set(0),
            num_comments: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };
        self.contributions.create(model, new_location).await?;

        let (contribution, location) = self
            .contributions
            .find_with_location(project_id, &id)
            .await?
            .ok_or_else(|| AppError::Internal("created contribution vanished".to_string()))?;
        Ok(ContributionFeature::from_parts(contribution, location))
    }

    /// Contributions visible through a lane, newest first.
    pub async fn list(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
    ) -> AppResult<Vec<ContributionFeature>> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_read(&ctx, &caps)?;

        let visibility = match lane {
            Lane::All => {
                if !caps.can_moderate {
                    return Err(AppError::Forbidden(
                        "Moderator permission required".to_string(),
                    ));
                }
                Condition::all()
                    .add(contribution::Column::Status.ne(ContributionStatus::Deleted))
                    .add(
                        Condition::any()
                            .add(contribution::Column::Status.ne(ContributionStatus::Draft))
                            .add(contribution::Column::CreatorId.eq(principal.id.as_str())),
                    )
            }
            Lane::Mine => {
                if principal.is_anonymous {
                    return Err(AppError::Unauthorized);
                }
                Condition::all()
                    .add(contribution::Column::CreatorId.eq(principal.id.as_str()))
                    .add(contribution::Column::Status.ne(ContributionStatus::Deleted))
            }
            Lane::Grouping => {
                let grouping_id = grouping_id.ok_or_else(|| {
                    AppError::BadRequest("A grouping lane needs a grouping id".to_string())
                })?;
                let (_, compiled) = self
                    .grouping_for_lane(&ctx, &caps, project_id, grouping_id)
                    .await?;
                Condition::all()
                    .add(contribution::Column::Status.is_in(readable_statuses(&caps)))
                    .add(compiled.to_condition())
            }
        };

        let rows = self.contributions.list(project_id, visibility).await?;
        Ok(rows
            .into_iter()
            .map(|(c, l)| ContributionFeature::from_parts(c, l))
            .collect())
    }

    /// A single contribution through a lane.
    pub async fn get(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
    ) -> AppResult<ContributionFeature> {
        let (_, _, contribution, location) = self
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;
        Ok(ContributionFeature::from_parts(contribution, location))
    }

    /// Update a contribution through a lane: merge properties, move status.
    pub async fn update(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
        input: UpdateContributionInput,
    ) -> AppResult<ContributionFeature> {
        let (ctx, caps, contribution, _) = self
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;

        let schemas = self.categories.schemas(project_id).await?;
        let schema = schemas
            .iter()
            .find(|s| s.id == contribution.category_id)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "contribution {contribution_id} references missing category"
                ))
            })?;

        let decision = policy::contribution_update(
            principal,
            &ctx,
            &caps,
            &contribution,
            input.status,
            schema.default_status,
        )?;

        let mut merged = contribution
            .properties
            .as_object()
            .cloned()
            .unwrap_or_default();
        if let Some(mut incoming) = input.properties {
            validate::replace_null(&mut incoming);
            for (key, value) in incoming {
                merged.insert(key, value);
            }
        }
        let mode = if decision.new_status == ContributionStatus::Draft {
            ValidationMode::Draft
        } else {
            ValidationMode::Strict
        };
        validate::validate_properties(schema, &merged, mode)?;
        let display_field = derive_display(schema, &merged);

        let updated = self
            .contributions
            .apply_update(
                contribution,
                ContributionUpdate {
                    properties: Some(Value::Object(merged)),
                    status: Some(decision.new_status),
                    display_field: Some(display_field),
                    updator_id: Some(principal.id.clone()),
                },
                &self.ids,
            )
            .await?;

        let location = self.locations.get_by_id(&updated.location_id).await?;
        Ok(ContributionFeature::from_parts(updated, location))
    }

    /// Soft-delete a contribution through a lane.
    pub async fn delete(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
    ) -> AppResult<()> {
        let (ctx, caps, contribution, _) = self
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;
        policy::contribution_delete(principal, &ctx, &caps, &contribution)?;

        self.contributions
            .apply_update(
                contribution,
                ContributionUpdate {
                    status: Some(ContributionStatus::Deleted),
                    updator_id: Some(principal.id.clone()),
                    ..Default::default()
                },
                &self.ids,
            )
            .await?;
        Ok(())
    }

    /// Snapshot history of a contribution, newest first.
    pub async fn history(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
    ) -> AppResult<Vec<contribution_snapshot::Model>> {
        self.load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;
        self.contributions.snapshots(contribution_id).await
    }

    // ==================== Lane plumbing ====================

    /// Load a contribution through a lane, enforcing the read policy.
    /// Shared with the comment and media services.
    pub(crate) async fn load_for_lane(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
    ) -> AppResult<(ProjectContext, Capabilities, contribution::Model, location::Model)> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::project_read(&ctx, &caps)?;

        let (contribution, location) = self
            .contributions
            .find_with_location(project_id, contribution_id)
            .await?
            .ok_or_else(|| AppError::ContributionNotFound(contribution_id.to_string()))?;

        let grouping_admits = if lane == Lane::Grouping {
            let grouping_id = grouping_id.ok_or_else(|| {
                AppError::BadRequest("A grouping lane needs a grouping id".to_string())
            })?;
            let (_, compiled) = self
                .grouping_for_lane(&ctx, &caps, project_id, grouping_id)
                .await?;
            compiled.matches(&contribution)
        } else {
            false
        };

        policy::contribution_read(lane, principal, &caps, &contribution, grouping_admits)?;
        Ok((ctx, caps, contribution, location))
    }

    /// Resolve the grouping of a grouping-lane request and compile its
    /// filter. Hidden groupings read as missing, view-only ones as
    /// forbidden.
    async fn grouping_for_lane(
        &self,
        ctx: &ProjectContext,
        caps: &Capabilities,
        project_id: &str,
        grouping_id: &str,
    ) -> AppResult<(grouping::Model, CompiledGrouping)> {
        let grouping = self
            .grouping_repo
            .find_by_id(project_id, grouping_id)
            .await?
            .filter(|g| g.status != GroupingStatus::Deleted)
            .ok_or_else(|| AppError::NotFound(format!("grouping {grouping_id}")))?;

        if !self.groupings.can_view(ctx, caps, &grouping).await? {
            return Err(AppError::NotFound(format!("grouping {grouping_id}")));
        }
        if !self.groupings.can_read(ctx, caps, &grouping).await? {
            return Err(AppError::Forbidden(
                "You are not allowed to read the data of this grouping".to_string(),
            ));
        }

        let rules = self.grouping_repo.rules(&grouping.id).await?;
        let schemas = self.categories.schemas(project_id).await?;
        let compiled = CompiledGrouping::compile(&rules, &schemas)?;
        Ok((grouping, compiled))
    }

    /// Resolve the location reference of a create payload.
    ///
    /// Existing locations must be usable from the project; inline ones need
    /// a geometry and are scoped to the project when marked private.
    async fn resolve_location(
        &self,
        principal: &user::Model,
        project_id: &str,
        input: LocationInput,
        geometry: Option<Value>,
    ) -> AppResult<(String, Option<location::ActiveModel>)> {
        match input {
            LocationInput::Existing { id } => {
                let found = self.locations.find_by_id(&id).await?.ok_or_else(|| {
                    AppError::BadRequest(format!("Unknown location {id}"))
                })?;
                if found.is_private
                    && found.private_for_project.as_deref() != Some(project_id)
                {
                    return Err(AppError::BadRequest(
                        "Location is not available to this project".to_string(),
                    ));
                }
                Ok((found.id, None))
            }
            LocationInput::New {
                name,
                description,
                private,
            } => {
                let geometry = geometry.ok_or_else(|| {
                    AppError::validation_field("location", "A new location needs a geometry")
                })?;
                let id = self.ids.generate();
                let model = location::ActiveModel {
                    id: Set(id.clone()),
                    name: Set(name),
                    description: Set(description),
                    geometry: Set(geometry),
                    is_private: Set(private),
                    private_for_project: Set(private.then(|| project_id.to_string())),
                    creator_id: Set(principal.id.clone()),
                    version: Set(1),
                    created_at: Set(Utc::now().into()),
                };
                Ok((id, Some(model)))
            }
        }
    }
}

/// Statuses readable through a grouping: active rows, widened to pending
/// and review for moderators.
fn readable_statuses(caps: &Capabilities) -> Vec<ContributionStatus> {
    if caps.can_moderate {
        vec![
            ContributionStatus::Active,
            ContributionStatus::Pending,
            ContributionStatus::Review,
        ]
    } else {
        vec![ContributionStatus::Active]
    }
}

/// Denormalized `key:value` of the category's display field, if the payload
/// carries it.
fn derive_display(schema: &CategorySchema, properties: &Map<String, Value>) -> Option<String> {
    let field = schema.display_field()?;
    let value = properties.get(&field.key)?;
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(format!("{}:{text}", field.key))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use geonote_db::entities::category::DefaultStatus;
    use geonote_db::entities::project::{EveryoneContributes, ProjectStatus};
    use geonote_db::entities::project;
    use geonote_db::repositories::{CategoryRepository, ProjectRepository};
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    use super::*;
    use crate::cache::CategoryCache;
    use crate::fields::{FieldSchema, FieldType};

    fn schema_with_display() -> CategorySchema {
        CategorySchema {
            id: "c1".to_string(),
            project_id: "p1".to_string(),
            name: "Trees".to_string(),
            description: None,
            active: true,
            default_status: DefaultStatus::Active,
            display_field_id: Some("f1".to_string()),
            fields: vec![FieldSchema {
                id: "f1".to_string(),
                key: "species".to_string(),
                name: "Species".to_string(),
                description: None,
                required: false,
                active: true,
                order: 0,
                field_type: FieldType::Text {
                    maxlength: None,
                    textarea: false,
                },
            }],
        }
    }

    #[test]
    fn display_field_is_denormalized() {
        let mut properties = Map::new();
        properties.insert("species".to_string(), json!("Oak"));
        assert_eq!(
            derive_display(&schema_with_display(), &properties),
            Some("species:Oak".to_string())
        );

        properties.insert("species".to_string(), Value::Null);
        assert_eq!(derive_display(&schema_with_display(), &properties), None);
    }

    #[test]
    fn location_input_accepts_both_shapes() {
        let existing: LocationInput = serde_json::from_value(json!({"id": "l1"})).unwrap();
        assert!(matches!(existing, LocationInput::Existing { .. }));

        let inline: LocationInput =
            serde_json::from_value(json!({"name": "Market square", "private": true})).unwrap();
        assert!(matches!(
            inline,
            LocationInput::New { private: true, .. }
        ));
    }

    #[test]
    fn moderators_read_wider_status_range_through_groupings() {
        let moderator = Capabilities {
            can_access: true,
            can_contribute: true,
            can_moderate: true,
            is_admin: false,
        };
        assert_eq!(readable_statuses(&moderator).len(), 3);

        let viewer = Capabilities::default();
        assert_eq!(readable_statuses(&viewer), vec![ContributionStatus::Active]);
    }

    #[tokio::test]
    async fn anonymous_create_on_auth_project_is_unauthorized() {
        let project = project::Model {
            id: "p1".to_string(),
            name: "Survey".to_string(),
            description: None,
            is_private: false,
            status: ProjectStatus::Active,
            everyone_contributes: EveryoneContributes::Auth,
            creator_id: "u1".to_string(),
            geographic_extent: None,
            created_at: Utc::now().into(),
        };
        // Anonymous context load: project row, then the public grouping probe.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[project]])
            .append_query_results([[btreemap! {
                "num_items" => Into::<sea_orm::Value>::into(1i64)
            }]]);
        let conn = Arc::new(db.into_connection());

        let context = ContextLoader::new(ProjectRepository::new(Arc::clone(&conn)));
        let categories = CategoryService::new(
            CategoryRepository::new(Arc::clone(&conn)),
            ContributionRepository::new(Arc::clone(&conn)),
            GroupingRepository::new(Arc::clone(&conn)),
            context.clone(),
            CategoryCache::new(),
            IdGenerator::new(),
        );
        let service = ContributionService::new(
            ContributionRepository::new(Arc::clone(&conn)),
            LocationRepository::new(Arc::clone(&conn)),
            GroupingRepository::new(Arc::clone(&conn)),
            GroupingService::new(
                GroupingRepository::new(Arc::clone(&conn)),
                ProjectRepository::new(Arc::clone(&conn)),
                categories.clone(),
                context.clone(),
                IdGenerator::new(),
            ),
            categories,
            context,
            IdGenerator::new(),
        );

        let anonymous = user::Model {
            id: "00000000000000000000000000".to_string(),
            display_name: "Anonymous".to_string(),
            display_name_lower: "anonymous".to_string(),
            email: "anonymous@localhost".to_string(),
            email_lower: "anonymous@localhost".to_string(),
            password_hash: None,
            token: None,
            is_anonymous: true,
            is_superuser: false,
            created_at: Utc::now().into(),
        };
        let input = CreateContributionInput {
            category_id: "c1".to_string(),
            location: LocationInput::New {
                name: None,
                description: None,
                private: false,
            },
            geometry: Some(json!({"type": "Point", "coordinates": [0.0, 0.0]})),
            status: None,
            properties: Map::new(),
        };

        let err = service.create(&anonymous, "p1", input).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
