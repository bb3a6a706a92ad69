//! Repository for the `users` table.

use sqlx::PgPool;
use vidshare_core::accounts::NewCredential;
use vidshare_core::types::DbId;

use crate::models::user::UserRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, full_name, password_hash, refresh_token_hash, \
                       avatar_remote_id, avatar_url, cover_image_remote_id, cover_image_url, \
                       created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewCredential) -> Result<UserRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, email, full_name, password_hash, \
                                avatar_remote_id, avatar_url, \
                                cover_image_remote_id, cover_image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.full_name)
            .bind(&input.password_hash)
            .bind(&input.avatar.remote_id)
            .bind(&input.avatar.url)
            .bind(input.cover_image.as_ref().map(|c| c.remote_id.as_str()))
            .bind(input.cover_image.as_ref().map(|c| c.url.as_str()))
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user whose username or email equals `identifier`.
    ///
    /// Both columns are stored lower-case, so the identifier is lowered here.
    pub async fn find_by_identifier(
        pool: &PgPool,
        identifier: &str,
    ) -> Result<Option<UserRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE username = LOWER($1) OR email = LOWER($1) LIMIT 1"
        );
        sqlx::query_as::<_, UserRow>(&query)
            .bind(identifier.trim())
            .fetch_optional(pool)
            .await
    }

    /// Set or clear the stored refresh token digest.
    pub async fn update_refresh_token(
        pool: &PgPool,
        id: DbId,
        token_hash: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET refresh_token_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(token_hash)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Conditionally replace the refresh token digest.
    ///
    /// The `WHERE refresh_token_hash = $2` guard makes this a compare-and-swap:
    /// of two concurrent rotations presenting the same token, only one row
    /// update succeeds. Returns `true` if this call won.
    pub async fn swap_refresh_token(
        pool: &PgPool,
        id: DbId,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token_hash = $3
             WHERE id = $1 AND refresh_token_hash = $2",
        )
        .bind(id)
        .bind(expected_hash)
        .bind(new_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
