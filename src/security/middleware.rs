use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::security::jwt::{extract_bearer_token, Claims};
use crate::shared::enums::Role;
use crate::shared::state::AppState;

/// Authenticated caller context extracted from the bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub email: String,
}

impl TryFrom<Claims> for AuthUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .user_id()
            .map_err(|_| ApiError::unauthorized("Invalid authentication token"))?;
        Ok(Self {
            id,
            role: claims.role,
            email: claims.email,
        })
    }
}

/// Bearer-token middleware. Decodes the token and injects an [`AuthUser`]
/// extension; any failure is a 401, never a 403.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing or invalid token"))?;

    let token = extract_bearer_token(auth_header)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authorization header must use Bearer token format"))?;

    let claims = state
        .tokens
        .decode(token)
        .map_err(|e| ApiError::unauthorized(format!("Unauthorized: {e}")))?;

    let user = AuthUser::try_from(claims)?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Role gate for triage operations. Runs after [`auth_middleware`], so a
/// missing extension means a wiring bug rather than a missing token.
pub async fn staff_only_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Missing or invalid token"))?;

    if !user.role.is_staff() {
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_user_from_claims() {
        let id = Uuid::new_v4();
        let claims = Claims {
            sub: id.to_string(),
            role: Role::Faculty,
            email: "charmant@faculty.test".to_string(),
            iat: 0,
            exp: 0,
        };

        let user = AuthUser::try_from(claims).expect("conversion failed");
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Faculty);
    }

    #[test]
    fn test_bad_subject_is_unauthorized() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            role: Role::Student,
            email: "newton@student.test".to_string(),
            iat: 0,
            exp: 0,
        };

        let err = AuthUser::try_from(claims).expect_err("should fail");
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
