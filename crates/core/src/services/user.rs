//! User accounts and authentication.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use geonote_common::{AppError, AppResult, IdGenerator};
use geonote_db::entities::user;
use geonote_db::repositories::UserRepository;
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

/// Input for creating a user account.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Service for user accounts.
#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
    ids: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(users: UserRepository, ids: IdGenerator) -> Self {
        Self { users, ids }
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> AppResult<user::Model> {
        self.users
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// The sentinel principal unauthenticated requests act as.
    pub async fn anonymous(&self) -> AppResult<user::Model> {
        self.users.get_anonymous().await
    }

    /// Register a new account and issue its first token.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .users
            .find_by_display_name(&input.display_name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Display name is already taken".to_string(),
            ));
        }
        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict(
                "Email address is already registered".to_string(),
            ));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
            .to_string();

        let model = user::ActiveModel {
            id: Set(self.ids.generate()),
            display_name: Set(input.display_name.clone()),
            display_name_lower: Set(input.display_name.to_lowercase()),
            email: Set(input.email.clone()),
            email_lower: Set(input.email.to_lowercase()),
            password_hash: Set(Some(password_hash)),
            token: Set(Some(self.ids.generate_token())),
            is_anonymous: Set(false),
            is_superuser: Set(false),
            created_at: Set(Utc::now().into()),
        };
        self.users.create(model).await
    }

    /// Verify credentials and rotate the account's token.
    pub async fn login(&self, display_name: &str, password: &str) -> AppResult<user::Model> {
        let found = self
            .users
            .find_by_display_name(display_name)
            .await?
            .filter(|u| !u.is_anonymous);
        let Some(account) = found else {
            return Err(AppError::Unauthorized);
        };
        let Some(stored) = account.password_hash.clone() else {
            return Err(AppError::Unauthorized);
        };

        let parsed = PasswordHash::new(&stored)
            .map_err(|e| AppError::Internal(format!("stored password hash invalid: {e}")))?;
        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Err(AppError::Unauthorized);
        }

        let mut model: user::ActiveModel = account.into();
        model.token = Set(Some(self.ids.generate_token()));
        self.users.update(model).await
    }

    /// Find a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.users.get_by_id(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    fn user_model(token: Option<&str>) -> user::Model {
        user::Model {
            id: "01h2xcejqtf2nbrexx3vqjhp41".to_string(),
            display_name: "Alice".to_string(),
            display_name_lower: "alice".to_string(),
            email: "alice@example.com".to_string(),
            email_lower: "alice@example.com".to_string(),
            password_hash: None,
            token: token.map(String::from),
            is_anonymous: false,
            is_superuser: false,
            created_at: Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> UserService {
        UserService::new(
            UserRepository::new(Arc::new(db.into_connection())),
            IdGenerator::new(),
        )
    }

    #[tokio::test]
    async fn authenticate_resolves_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user_model(Some("tok"))]]);
        let user = service(db).authenticate("tok").await.unwrap();
        assert_eq!(user.display_name, "Alice");
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()]);
        let err = service(db).authenticate("nope").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn create_rejects_taken_display_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[user_model(None)]]);
        let err = service(db)
            .create(CreateUserInput {
                display_name: "Alice".to_string(),
                email: "other@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        // Display-name lookup misses, email lookup hits the existing row.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new(), vec![user_model(None)]]);
        let err = service(db)
            .create(CreateUserInput {
                display_name: "Bob".to_string(),
                email: "Alice@Example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_rejects_invalid_email() {
        let db = MockDatabase::new(DatabaseBackend::Postgres);
        let err = service(db)
            .create(CreateUserInput {
                display_name: "Bob".to_string(),
                email: "not-an-email".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
