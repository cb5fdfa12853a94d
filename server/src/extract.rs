use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::errors::ErrorKind;

use crate::{
    auth::{decode_token, Role},
    error::ApiError,
    http::AppState,
};

/// Authenticated identity decoded from the `Authorization: Bearer` header.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn require(&self, minimum: Role) -> Result<(), ApiError> {
        if self.role.level() >= minimum.level() {
            Ok(())
        } else {
            Err(ApiError::Authorization)
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Authentication("missing bearer token".into()))?;

        let claims = decode_token(bearer.token(), &state.auth).map_err(|err| {
            let message = match err.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                _ => "invalid token",
            };
            ApiError::Authentication(message.into())
        })?;

        let role = Role::parse(&claims.role)
            .ok_or_else(|| ApiError::Authentication("invalid token".into()))?;

        Ok(CurrentUser {
            username: claims.sub,
            role,
        })
    }
}

/// Optional variant for endpoints that are open in some configurations
/// (registration bootstrap). A bad token is simply treated as anonymous.
impl axum::extract::OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match <CurrentUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await {
            Ok(user) => Ok(Some(user)),
            Err(_) => Ok(None),
        }
    }
}
