//! Handlers for the `/users` resource (register, login, logout, refresh,
//! current user).

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;
use vidshare_core::accounts::{NewCredential, Profile};
use vidshare_core::assets::{AssetSlot, UploadPlan};
use vidshare_core::error::CoreError;
use vidshare_core::validation::{
    normalize_identifier, validate_not_blank, validate_username, USERNAME_MAX_LEN,
    USERNAME_MIN_LEN,
};

use crate::assets::multipart::{read_form, MultipartForm};
use crate::auth::cookies::{read_cookie, with_session, without_session, REFRESH_COOKIE};
use crate::auth::password::{hash_password_blocking, validate_password_strength, verify_password_blocking};
use crate::auth::tokens::TokenPair;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Text fields of the `POST /users/register` multipart form.
#[derive(Debug, Validate)]
pub struct RegisterForm {
    #[validate(
        length(min = USERNAME_MIN_LEN, max = USERNAME_MAX_LEN),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 100), custom(function = "validate_not_blank"))]
    pub full_name: String,
    pub password: String,
}

/// Request body for `POST /users/login`. Either identifier may be used.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Optional body for `POST /users/refresh-token` when the cookie is absent.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(alias = "refreshToken")]
    pub refresh_token: String,
}

/// Issued session returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Profile>,
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl SessionResponse {
    fn new(pair: TokenPair, now: i64, user: Option<Profile>) -> Self {
        Self {
            user,
            expires_in: pair.access_expires_at - now,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/users/register
///
/// Multipart form: `fullName`, `email`, `username`, `password`, `avatar`
/// (required file), `coverImage` (optional file).
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut form = read_form(multipart, &UploadPlan::PROFILE, &state.config.upload).await?;

    let (input, password_hash) = match check_registration(&state, &mut form).await {
        Ok(checked) => checked,
        Err(e) => {
            form.discard().await;
            return Err(e);
        }
    };

    let staged = state
        .assets
        .stage_upload(form.files, &UploadPlan::PROFILE)
        .await?;

    let new_user = NewCredential {
        username: input.username,
        email: input.email,
        full_name: input.full_name,
        password_hash,
        avatar: staged.required(AssetSlot::Avatar)?,
        cover_image: staged.get(AssetSlot::CoverImage).cloned(),
    };

    let user = match state.credentials.create(&new_user).await {
        Ok(user) => user,
        Err(e) => {
            state.assets.discard_staged(staged, None).await;
            return Err(e.into());
        }
    };

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(
            user.profile(),
            "User registered successfully",
        )),
    ))
}

/// Validate the registration fields, reject duplicates, and hash the
/// password. Runs before anything is uploaded.
async fn check_registration(
    state: &AppState,
    form: &mut MultipartForm,
) -> AppResult<(RegisterForm, String)> {
    let mut input = RegisterForm {
        username: normalize_identifier(form.text("username").unwrap_or_default()),
        email: normalize_identifier(form.text("email").unwrap_or_default()),
        full_name: form
            .take_text("fullName")
            .unwrap_or_default()
            .trim()
            .to_string(),
        password: form.take_text("password").unwrap_or_default(),
    };

    input.validate()?;
    validate_password_strength(&input.password).map_err(CoreError::Validation)?;

    let taken = match state.credentials.find_by_identifier(&input.username).await? {
        Some(_) => true,
        None => state
            .credentials
            .find_by_identifier(&input.email)
            .await?
            .is_some(),
    };
    if taken {
        return Err(AppError::Core(CoreError::Conflict(
            "User with email or username already exists".into(),
        )));
    }

    let password_hash = hash_password_blocking(std::mem::take(&mut input.password)).await?;
    Ok((input, password_hash))
}

/// POST /api/v1/users/login
///
/// Authenticate with username or email plus password. Sets session cookies
/// and returns the issued pair.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let identifier = input
        .username
        .as_deref()
        .or(input.email.as_deref())
        .map(normalize_identifier)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("username or email is required".into()))?;

    let user = state
        .credentials
        .find_by_identifier(&identifier)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Invalid user credentials".into()))
        })?;

    let valid = verify_password_blocking(input.password, user.password_hash.clone()).await?;
    if !valid {
        tracing::info!(user_id = user.id, "Rejected login with wrong password");
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid user credentials".into(),
        )));
    }

    let pair = state.tokens.issue_and_store(user.id).await?;
    let now = state.clock.now();
    let jar = with_session(jar, &pair, now, state.config.cookie_secure);

    Ok((
        jar,
        Json(DataResponse::with_message(
            SessionResponse::new(pair, now, Some(user.profile())),
            "User logged in successfully",
        )),
    ))
}

/// POST /api/v1/users/logout
///
/// Ends the caller's session and clears both cookies.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    jar: CookieJar,
) -> AppResult<impl IntoResponse> {
    state.tokens.revoke(user.user_id).await?;
    Ok((
        without_session(jar, state.config.cookie_secure),
        Json(DataResponse::with_message(
            serde_json::json!({}),
            "User logged out",
        )),
    ))
}

/// POST /api/v1/users/refresh-token
///
/// Rotates the refresh token from the `refreshToken` cookie, or from a JSON
/// body `{ "refresh_token": ... }` when no cookie is sent.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let presented = match read_cookie(&jar, REFRESH_COOKIE) {
        Some(token) => token,
        None if body.is_empty() => {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Unauthorized request".into(),
            )))
        }
        None => {
            serde_json::from_slice::<RefreshRequest>(&body)
                .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?
                .refresh_token
        }
    };

    let pair = state.tokens.rotate(&presented).await?;
    let now = state.clock.now();
    let jar = with_session(jar, &pair, now, state.config.cookie_secure);

    Ok((
        jar,
        Json(DataResponse::with_message(
            SessionResponse::new(pair, now, None),
            "Access token refreshed",
        )),
    ))
}

/// GET /api/v1/users/current-user
pub async fn current_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Profile>>> {
    let credential = state
        .credentials
        .find_by_id(user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user.user_id,
        }))?;
    Ok(Json(DataResponse::new(credential.profile())))
}
