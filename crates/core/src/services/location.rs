//! Location listing and editing.
//!
//! Locations are created inline with contributions; this service covers the
//! reuse surface: listing what a project may attach to and editing rows.

use geonote_common::{AppError, AppResult};
use geonote_db::entities::{location, user};
use geonote_db::repositories::LocationRepository;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use crate::policy;
use crate::services::context::ContextLoader;

/// Input for updating a location. A geometry change bumps the version.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateLocationInput {
    pub name: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub geometry: Option<serde_json::Value>,
}

/// Service for locations.
#[derive(Clone)]
pub struct LocationService {
    locations: LocationRepository,
    context: ContextLoader,
}

impl LocationService {
    /// Create a new location service.
    #[must_use]
    pub const fn new(locations: LocationRepository, context: ContextLoader) -> Self {
        Self { locations, context }
    }

    /// Locations a contributor to this project may attach to: public ones
    /// plus those scoped to the project.
    pub async fn list(
        &self,
        principal: &user::Model,
        project_id: &str,
    ) -> AppResult<Vec<location::Model>> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::contribution_create(principal, &ctx, &caps)?;
        self.locations.list_for_project(project_id).await
    }

    /// A single location, if usable from this project.
    pub async fn get(
        &self,
        principal: &user::Model,
        project_id: &str,
        location_id: &str,
    ) -> AppResult<location::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::contribution_create(principal, &ctx, &caps)?;
        self.usable(project_id, location_id).await
    }

    /// Update a location's name, description or geometry.
    pub async fn update(
        &self,
        principal: &user::Model,
        project_id: &str,
        location_id: &str,
        input: UpdateLocationInput,
    ) -> AppResult<location::Model> {
        let (ctx, caps, _) = self.context.load(principal, project_id).await?;
        policy::contribution_create(principal, &ctx, &caps)?;
        input.validate()?;

        let location = self.usable(project_id, location_id).await?;
        let version = location.version;

        let mut model: location::ActiveModel = location.into();
        if let Some(name) = input.name {
            model.name = Set(name);
        }
        if let Some(description) = input.description {
            model.description = Set(description);
        }
        if let Some(geometry) = input.geometry {
            model.geometry = Set(geometry);
            model.version = Set(version + 1);
        }
        self.locations.update(model).await
    }

    /// A location row this project may reference: public, or scoped to the
    /// project itself.
    async fn usable(&self, project_id: &str, location_id: &str) -> AppResult<location::Model> {
        self.locations
            .find_by_id(location_id)
            .await?
            .filter(|l| !l.is_private || l.private_for_project.as_deref() == Some(project_id))
            .ok_or_else(|| AppError::NotFound(format!("location {location_id}")))
    }
}
