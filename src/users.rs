use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde_json::json;

use crate::{
    auth::{hash_password, verify_password},
    entities::user,
    error::{AppError, AppResult},
    validation::{FieldErrors, validate_credentials},
};

const INVALID_LOGIN: &str = "Invalid username or password";

#[derive(Clone)]
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn register(&self, username: &str, password: &str) -> AppResult<user::Model> {
        validate_credentials(username, password).map_err(AppError::Validation)?;

        if self.find_by_username(username).await?.is_some() {
            return Err(username_taken());
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| anyhow::anyhow!("password hashing task failed: {e}"))?
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;

        let created = user::ActiveModel {
            username: Set(username.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(jiff::Timestamp::now().as_second()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| match e.sql_err() {
            // Lost a race with a concurrent registration of the same name.
            Some(SqlErr::UniqueConstraintViolation(_)) => username_taken(),
            _ => e.into(),
        })?;

        tracing::info!(user_id = created.id, username = %created.username, "registered user");
        Ok(created)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let Some(found) = self.find_by_username(username).await? else {
            return Err(AppError::Unauthorized(INVALID_LOGIN.to_string()));
        };

        let password = password.to_string();
        let hash = found.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("password verification task failed: {e}"))?
            .map_err(|e| anyhow::anyhow!("password verification failed: {e}"))?;

        if !valid {
            tracing::debug!(username, "rejected login");
            return Err(AppError::Unauthorized(INVALID_LOGIN.to_string()));
        }
        Ok(found)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await?)
    }
}

fn username_taken() -> AppError {
    let mut errors = FieldErrors::new();
    errors.insert("username".to_string(), json!(["A user with that username already exists."]));
    AppError::Validation(errors)
}
