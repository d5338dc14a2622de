use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::security::password::{hash_password, verify_password};
use crate::shared::enums::Role;
use crate::shared::schema::users;
use crate::shared::state::AppState;
use crate::users::{User, UserSummary};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

/// Emails are matched case-insensitively by storing them lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    let email = normalize_email(&req.email);
    let name = req.name.trim().to_string();

    if email.is_empty() || name.is_empty() || req.password.is_empty() {
        return Err(ApiError::validation("Missing fields"));
    }

    let role = match req.role.as_deref() {
        Some(raw) => {
            Role::parse(raw).ok_or_else(|| ApiError::validation(format!("unknown role: {raw}")))?
        }
        None => Role::Student,
    };

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    let user = User {
        id: Uuid::new_v4(),
        email,
        name,
        password_hash,
        role,
        created_at: Utc::now(),
    };

    let mut conn = state.conn.get()?;
    diesel::insert_into(users::table)
        .values(&user)
        .execute(&mut conn)
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ApiError::conflict("Email already registered")
            }
            other => other.into(),
        })?;

    info!("registered user {} ({})", user.email, user.role.as_str());
    Ok(Json(user.summary()))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = normalize_email(&req.email);

    let mut conn = state.conn.get()?;
    let user: Option<User> = users::table
        .filter(users::email.eq(&email))
        .first(&mut conn)
        .optional()?;

    // Same outcome for unknown email and wrong password.
    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
    let valid = verify_password(&req.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(format!("password verification failed: {e}")))?;
    if !valid {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = state
        .tokens
        .issue(user.id, user.role, &user.email)
        .map_err(|e| ApiError::Internal(format!("token issuance failed: {e}")))?;

    Ok(Json(LoginResponse {
        token,
        user: user.summary(),
    }))
}

pub fn configure_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Newton@Student.TEST "), "newton@student.test");
        assert_eq!(normalize_email(""), "");
    }

    #[test]
    fn test_register_defaults_to_student_role() {
        assert_eq!(Role::parse("TECH"), Some(Role::Tech));
        let role = None::<String>
            .as_deref()
            .and_then(Role::parse)
            .unwrap_or(Role::Student);
        assert_eq!(role, Role::Student);
    }
}
