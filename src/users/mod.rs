use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::security::middleware::staff_only_middleware;
use crate::shared::enums::Role;
use crate::shared::schema::users;
use crate::shared::state::AppState;

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public profile shape. Never exposes the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl User {
    pub fn summary(&self) -> UserSummary {
        self.into()
    }
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let role_filter = match query.role.as_deref() {
        Some(raw) => Some(
            Role::parse(raw).ok_or_else(|| ApiError::validation(format!("unknown role: {raw}")))?,
        ),
        None => None,
    };

    let mut conn = state.conn.get()?;

    let mut q = users::table.into_boxed();
    if let Some(role) = role_filter {
        q = q.filter(users::role.eq(role));
    }

    let rows: Vec<User> = q.order(users::created_at.asc()).load(&mut conn)?;

    Ok(Json(rows.iter().map(UserSummary::from).collect()))
}

pub fn configure_user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users))
        .route_layer(axum::middleware::from_fn(staff_only_middleware))
}
