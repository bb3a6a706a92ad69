pub mod auth;
pub mod health;
pub mod videos;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /users/register                  register (public, multipart)
/// /users/login                     login (public)
/// /users/refresh-token             rotate refresh token (public)
/// /users/logout                    logout (requires auth)
/// /users/current-user              current profile (requires auth)
///
/// /videos                          publish (POST, multipart)
/// /videos/{id}                     get, update (PATCH, multipart), delete
/// /videos/toggle/publish/{id}      toggle publish flag (PATCH)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/users", auth::router())
        .nest("/videos", videos::router())
}
