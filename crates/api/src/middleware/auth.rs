//! JWT-based authentication extractor for Axum handlers.

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use vidshare_core::error::CoreError;
use vidshare_core::types::DbId;

use crate::auth::cookies::{read_cookie, ACCESS_COOKIE};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from an access token.
///
/// The token is taken from an `Authorization: Bearer` header, falling back to
/// the `accessToken` cookie.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
}

fn presented_token(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        let value = header.to_str().map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Malformed Authorization header".into()))
        })?;
        let token = value.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;
        return Ok(Some(token.trim().to_string()));
    }
    Ok(read_cookie(&CookieJar::from_headers(&parts.headers), ACCESS_COOKIE))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = presented_token(parts)?.ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Unauthorized request".into()))
        })?;
        let user_id = state.tokens.verify_access(&token)?;
        Ok(AuthUser { user_id })
    }
}

/// `Option<AuthUser>`: `None` when no token was presented at all. A token
/// that is present but invalid or expired is still rejected.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match presented_token(parts)? {
            Some(token) => {
                let user_id = state.tokens.verify_access(&token)?;
                Ok(Some(AuthUser { user_id }))
            }
            None => Ok(None),
        }
    }
}
