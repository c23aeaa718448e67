//! API endpoints.

mod categories;
mod comments;
mod contributions;
mod groupings;
mod locations;
mod media;
mod projects;
mod users;

use axum::Router;

use crate::middleware::AppState;

pub(crate) use contributions::lane_param;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(users::router())
        .merge(projects::router())
        .merge(categories::router())
        .merge(groupings::router())
        .merge(locations::router())
        .merge(contributions::router())
        .merge(comments::router())
        .merge(media::router())
}
