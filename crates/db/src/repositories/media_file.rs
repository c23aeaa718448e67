//! Media file repository.

use std::sync::Arc;

use geonote_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};

use crate::entities::{MediaFile, contribution, media_file};

/// Media file repository for database operations.
#[derive(Clone)]
pub struct MediaFileRepository {
    db: Arc<DatabaseConnection>,
}

impl MediaFileRepository {
    /// Create a new media file repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a media file by ID within a contribution.
    pub async fn find_by_id(
        &self,
        contribution_id: &str,
        file_id: &str,
    ) -> AppResult<Option<media_file::Model>> {
        MediaFile::find_by_id(file_id)
            .filter(media_file::Column::ContributionId.eq(contribution_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active media files of a contribution, newest first.
    pub async fn list(&self, contribution_id: &str) -> AppResult<Vec<media_file::Model>> {
        MediaFile::find()
            .filter(media_file::Column::ContributionId.eq(contribution_id))
            .filter(media_file::Column::Status.eq(media_file::MediaStatus::Active))
            .order_by_desc(media_file::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a media record and update the parent contribution (media
    /// counter) in one transaction.
    pub async fn create_with_contribution(
        &self,
        model: media_file::ActiveModel,
        parent: contribution::ActiveModel,
    ) -> AppResult<media_file::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let inserted = model
            .insert(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        parent
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted)
    }

    /// Update a media record and the parent contribution in one transaction.
    pub async fn update_with_contribution(
        &self,
        model: media_file::ActiveModel,
        parent: contribution::ActiveModel,
    ) -> AppResult<media_file::Model> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let updated = model
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        parent
            .update(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, Set};

    use super::*;
    use crate::entities::media_file::{MediaKind, MediaStatus};

    fn media_model() -> media_file::Model {
        media_file::Model {
            id: "01h2xcejqtf2nbrexx3vqjhp50".to_string(),
            contribution_id: "01h2xcejqtf2nbrexx3vqjhp51".to_string(),
            creator_id: "01h2xcejqtf2nbrexx3vqjhp52".to_string(),
            name: "photo.jpg".to_string(),
            description: None,
            kind: MediaKind::Image,
            storage_key: "01h2xcejqtf2nbrexx3vqjhp50/photo.jpg".to_string(),
            status: MediaStatus::Active,
            created_at: Utc::now().into(),
        }
    }

    fn contribution_model() -> contribution::Model {
        contribution::Model {
            id: "01h2xcejqtf2nbrexx3vqjhp51".to_string(),
            project_id: "01h2xcejqtf2nbrexx3vqjhp53".to_string(),
            category_id: "01h2xcejqtf2nbrexx3vqjhp54".to_string(),
            location_id: "01h2xcejqtf2nbrexx3vqjhp55".to_string(),
            status: contribution::ContributionStatus::Active,
            properties: serde_json::json!({}),
            creator_id: "01h2xcejqtf2nbrexx3vqjhp52".to_string(),
            updator_id: None,
            version: 1,
            display_field: None,
            num_media: 1,
            num_comments: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn create_couples_counter_update_into_one_transaction() {
        let file = media_model();
        let parent = contribution_model();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[file.clone()]])
            .append_query_results([[parent.clone()]])
            .into_connection();

        let repo = MediaFileRepository::new(Arc::new(db));
        let model = media_file::ActiveModel {
            id: Set(file.id.clone()),
            contribution_id: Set(file.contribution_id.clone()),
            creator_id: Set(file.creator_id.clone()),
            name: Set(file.name.clone()),
            description: Set(None),
            kind: Set(MediaKind::Image),
            storage_key: Set(file.storage_key.clone()),
            status: Set(MediaStatus::Active),
            created_at: Set(file.created_at),
        };
        let mut parent_model: contribution::ActiveModel = parent.into();
        parent_model.num_media = Set(1);

        let inserted = repo
            .create_with_contribution(model, parent_model)
            .await
            .unwrap();
        assert_eq!(inserted.name, "photo.jpg");

        // Both statements ran inside a single transaction.
        let MediaFileRepository { db } = repo;
        let log = Arc::try_unwrap(db).ok().unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
    }
}
