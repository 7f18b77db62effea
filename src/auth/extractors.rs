use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{jwt::JwtKeys, repo::User, services::invalid_token};
use crate::{
    error::AppError,
    scope::{Caller, Role},
    state::AppState,
};

/// Authenticated caller resolved from an access token.
#[derive(Debug)]
pub struct AuthUser(pub Caller);

/// Authenticated caller holding the admin role.
#[derive(Debug)]
pub struct AdminUser(pub Caller);

fn bearer(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("AUTH_MISSING_TOKEN", "Missing bearer token"))?;

    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("AUTH_MISSING_TOKEN", "Missing bearer token"))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer(parts)?;
        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify_access(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            invalid_token()
        })?;

        let Some(role) = User::role_of(&state.db, claims.sub).await? else {
            warn!(user_id = %claims.sub, "token for unknown user");
            return Err(invalid_token());
        };

        Ok(AuthUser(Caller::new(claims.sub, Role::parse(&role))))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(caller) = AuthUser::from_request_parts(parts, state).await?;
        caller.require_admin()?;
        Ok(AdminUser(caller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use uuid::Uuid;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/lessons");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let state = AppState::fake();
        let err = AuthUser::from_request_parts(&mut parts_with(None), &state)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AUTH_MISSING_TOKEN");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let state = AppState::fake();
        let err = AuthUser::from_request_parts(&mut parts_with(Some("Basic abc")), &state)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AUTH_MISSING_TOKEN");
    }

    #[tokio::test]
    async fn garbage_and_refresh_tokens_are_rejected_before_lookup() {
        let state = AppState::fake();
        let err = AuthUser::from_request_parts(&mut parts_with(Some("Bearer nope")), &state)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AUTH_INVALID_TOKEN");

        let refresh = JwtKeys::from_ref(&state).sign_refresh(Uuid::new_v4()).unwrap();
        let header = format!("Bearer {refresh}");
        let err = AdminUser::from_request_parts(&mut parts_with(Some(&header)), &state)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AUTH_INVALID_TOKEN");
    }
}
