//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use geonote_common::{AppError, IdGenerator, StorageBackend};
use geonote_core::cache::CategoryCache;
use geonote_core::{
    CategoryService, CommentService, ContextLoader, ContributionService, GroupingService,
    LocationService, MediaService, ProjectService, UserService,
};
use geonote_db::repositories::{
    CategoryRepository, CommentRepository, ContributionRepository, GroupingRepository,
    LocationRepository, MediaFileRepository, ProjectRepository, UserRepository,
};
use sea_orm::DatabaseConnection;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub project_service: ProjectService,
    pub category_service: CategoryService,
    pub grouping_service: GroupingService,
    pub location_service: LocationService,
    pub contribution_service: ContributionService,
    pub comment_service: CommentService,
    pub media_service: MediaService,
}

impl AppState {
    /// Wire the repositories and services over one database connection.
    #[must_use]
    pub fn build(db: Arc<DatabaseConnection>, storage: Arc<dyn StorageBackend>) -> Self {
        let ids = IdGenerator::new();

        let user_repo = UserRepository::new(Arc::clone(&db));
        let project_repo = ProjectRepository::new(Arc::clone(&db));
        let category_repo = CategoryRepository::new(Arc::clone(&db));
        let grouping_repo = GroupingRepository::new(Arc::clone(&db));
        let location_repo = LocationRepository::new(Arc::clone(&db));
        let contribution_repo = ContributionRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let media_repo = MediaFileRepository::new(Arc::clone(&db));

        let context = ContextLoader::new(project_repo.clone());

        let user_service = UserService::new(user_repo.clone(), ids.clone());
        let project_service = ProjectService::new(
            project_repo.clone(),
            user_repo,
            context.clone(),
            ids.clone(),
        );
        let category_service = CategoryService::new(
            category_repo,
            contribution_repo.clone(),
            grouping_repo.clone(),
            context.clone(),
            CategoryCache::new(),
            ids.clone(),
        );
        let grouping_service = GroupingService::new(
            grouping_repo.clone(),
            project_repo,
            category_service.clone(),
            context.clone(),
            ids.clone(),
        );
        let location_service = LocationService::new(location_repo.clone(), context.clone());
        let contribution_service = ContributionService::new(
            contribution_repo,
            location_repo,
            grouping_repo,
            grouping_service.clone(),
            category_service.clone(),
            context,
            ids.clone(),
        );
        let comment_service = CommentService::new(
            comment_repo,
            contribution_service.clone(),
            ids.clone(),
        );
        let media_service = MediaService::new(
            media_repo,
            contribution_service.clone(),
            storage,
            ids,
        );

        Self {
            user_service,
            project_service,
            category_service,
            grouping_service,
            location_service,
            contribution_service,
            comment_service,
            media_service,
        }
    }
}

/// Authentication middleware.
///
/// Resolves the bearer token to an account, or falls back to the anonymous
/// sentinel when no token is sent. A token that resolves to nothing is
/// rejected outright rather than downgraded to anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_owned);

    let principal = match token {
        Some(token) => state.user_service.authenticate(&token).await,
        None => state.user_service.anonymous().await,
    };

    match principal {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

/// Map a middleware-level failure such as a timeout onto the error envelope.
pub async fn handle_middleware_error(err: tower::BoxError) -> Response {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout.into_response()
    } else {
        AppError::Internal(err.to_string()).into_response()
    }
}
