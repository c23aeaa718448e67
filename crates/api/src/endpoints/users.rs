//! Account endpoints.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use geonote_common::AppResult;
use geonote_core::CreateUserInput;
use geonote_db::entities::user;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState};

/// Login request.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub display_name: String,
    pub password: String,
}

/// Account response. The password hash never leaves the service layer; the
/// token is only present right after registration or login.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub is_superuser: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserResponse {
    fn public(u: user::Model) -> Self {
        Self {
            id: u.id,
            display_name: u.display_name,
            email: u.email,
            is_superuser: u.is_superuser,
            created_at: u.created_at.to_rfc3339(),
            token: None,
        }
    }

    fn with_token(u: user::Model) -> Self {
        let token = u.token.clone();
        Self {
            token,
            ..Self::public(u)
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/login", post(login))
        .route("/users/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let created = state.user_service.create(input).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::with_token(created))))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<UserResponse>> {
    let account = state
        .user_service
        .login(&req.display_name, &req.password)
        .await?;
    Ok(Json(UserResponse::with_token(account)))
}

async fn me(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(UserResponse::public(user))
}
