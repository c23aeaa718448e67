//! Media attachments on contributions.

use std::sync::Arc;

use chrono::Utc;
use geonote_common::{AppError, AppResult, IdGenerator, StorageBackend, generate_storage_key};
use geonote_db::entities::media_file::{MediaKind, MediaStatus};
use geonote_db::entities::{contribution, media_file, user};
use geonote_db::repositories::MediaFileRepository;
use sea_orm::Set;
use serde::Serialize;

use crate::policy::Lane;
use crate::services::contribution::ContributionService;

/// Input for uploading a media file.
#[derive(Debug, Clone)]
pub struct CreateMediaInput {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A media record with its resolved public URL.
#[derive(Debug, Clone, Serialize)]
pub struct MediaRecord {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: MediaKind,
    pub url: String,
    pub creator_id: String,
    pub created_at: chrono::DateTime<chrono::FixedOffset>,
}

/// Service for media files.
#[derive(Clone)]
pub struct MediaService {
    media: MediaFileRepository,
    contributions: ContributionService,
    storage: Arc<dyn StorageBackend>,
    ids: IdGenerator,
}

impl MediaService {
    /// Create a new media service.
    #[must_use]
    pub fn new(
        media: MediaFileRepository,
        contributions: ContributionService,
        storage: Arc<dyn StorageBackend>,
        ids: IdGenerator,
    ) -> Self {
        Self {
            media,
            contributions,
            storage,
            ids,
        }
    }

    /// Active media files of a contribution, newest first.
    pub async fn list(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
    ) -> AppResult<Vec<MediaRecord>> {
        self.contributions
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;
        let files = self.media.list(contribution_id).await?;
        Ok(files.into_iter().map(|f| self.record(f)).collect())
    }

    /// Upload a file and attach it to a contribution. Creator or moderator
    /// only.
    pub async fn upload(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
        input: CreateMediaInput,
    ) -> AppResult<MediaRecord> {
        let (_, caps, contribution, _) = self
            .contributions
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;

        if contribution.creator_id != principal.id && !caps.can_moderate {
            return Err(AppError::Forbidden(
                "Only the creator or a moderator may attach media".to_string(),
            ));
        }
        let kind = kind_from_content_type(&input.content_type)?;

        let id = self.ids.generate();
        let key = generate_storage_key(&id, &input.file_name);
        self.storage
            .upload(&key, &input.data, &input.content_type)
            .await?;

        let model = media_file::ActiveModel {
            id: Set(id),
            contribution_id: Set(contribution_id.to_string()),
            creator_id: Set(principal.id.clone()),
            name: Set(input.name.unwrap_or(input.file_name)),
            description: Set(input.description),
            kind: Set(kind),
            storage_key: Set(key.clone()),
            status: Set(MediaStatus::Active),
            created_at: Set(Utc::now().into()),
        };
        let mut parent: contribution::ActiveModel = contribution.clone().into();
        parent.num_media = Set(contribution.num_media + 1);

        let created = match self.media.create_with_contribution(model, parent).await {
            Ok(created) => created,
            Err(err) => {
                if let Err(e) = self.storage.delete(&key).await {
                    tracing::warn!(
                        storage_key = %key,
                        error = %e,
                        "Failed to clean up stored file after a database error"
                    );
                }
                return Err(err);
            }
        };

        Ok(self.record(created))
    }

    /// Soft-delete a media file. The stored bytes stay behind the key so
    /// historic snapshots keep resolving.
    pub async fn delete(
        &self,
        principal: &user::Model,
        project_id: &str,
        lane: Lane,
        grouping_id: Option<&str>,
        contribution_id: &str,
        file_id: &str,
    ) -> AppResult<()> {
        let (_, caps, contribution, _) = self
            .contributions
            .load_for_lane(principal, project_id, lane, grouping_id, contribution_id)
            .await?;

        let file = self
            .media
            .find_by_id(contribution_id, file_id)
            .await?
            .filter(|f| f.status == MediaStatus::Active)
            .ok_or_else(|| AppError::NotFound(format!("media file {file_id}")))?;
        if file.creator_id != principal.id && !caps.can_moderate {
            return Err(AppError::Forbidden(
                "Only the uploader or a moderator may remove media".to_string(),
            ));
        }

        let mut model: media_file::ActiveModel = file.into();
        model.status = Set(MediaStatus::Deleted);
        let mut parent: contribution::ActiveModel = contribution.clone().into();
        parent.num_media = Set(contribution.num_media - 1);
        self.media.update_with_contribution(model, parent).await?;
        Ok(())
    }

    fn record(&self, file: media_file::Model) -> MediaRecord {
        MediaRecord {
            id: file.id,
            name: file.name,
            description: file.description,
            kind: file.kind,
            url: self.storage.public_url(&file.storage_key),
            creator_id: file.creator_id,
            created_at: file.created_at,
        }
    }
}

/// Map a MIME type to the stored media kind.
fn kind_from_content_type(content_type: &str) -> AppResult<MediaKind> {
    match content_type.split('/').next() {
        Some("image") => Ok(MediaKind::Image),
        Some("audio") => Ok(MediaKind::Audio),
        Some("video") => Ok(MediaKind::Video),
        _ => Err(AppError::BadRequest(format!(
            "Unsupported content type {content_type}"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn content_type_maps_to_kind() {
        assert_eq!(kind_from_content_type("image/png").unwrap(), MediaKind::Image);
        assert_eq!(kind_from_content_type("audio/ogg").unwrap(), MediaKind::Audio);
        assert_eq!(kind_from_content_type("video/mp4").unwrap(), MediaKind::Video);
        assert!(kind_from_content_type("application/pdf").is_err());
    }
}
