//! Request extractors.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use geonote_db::entities::user;

/// The principal a request acts as.
///
/// Always present: the auth middleware inserts either the authenticated
/// account or the anonymous sentinel into request extensions.
#[derive(Debug, Clone)]
pub struct Principal(pub user::Model);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(Principal)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

/// A principal that must be a signed-in account.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<user::Model>()
            .filter(|u| !u.is_anonymous)
            .cloned()
            .map(AuthUser)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}
