//! Account credentials and the store that persists them.

use async_trait::async_trait;
use serde::Serialize;

use crate::assets::AssetRef;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// A registered account as held by the credential store.
///
/// Contains the password hash and refresh token digest -- NEVER serialize
/// this to API responses directly. Use [`Credential::profile`].
#[derive(Debug, Clone)]
pub struct Credential {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    /// SHA-256 hex digest of the single currently valid refresh token.
    pub refresh_token_hash: Option<String>,
    pub avatar: AssetRef,
    pub cover_image: Option<AssetRef>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe account representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: Timestamp,
}

impl Credential {
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar.url.clone(),
            cover_image: self.cover_image.as_ref().map(|c| c.url.clone()),
            created_at: self.created_at,
        }
    }
}

/// DTO for creating a new account.
#[derive(Debug, Clone)]
pub struct NewCredential {
    /// Stored lower-case.
    pub username: String,
    /// Stored lower-case.
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: AssetRef,
    pub cover_image: Option<AssetRef>,
}

/// Persistence for accounts and their stateful refresh token.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert an account. Fails with [`CoreError::Conflict`] when the username
    /// or email is already taken.
    async fn create(&self, input: &NewCredential) -> Result<Credential, CoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<Credential>, CoreError>;

    /// Look up an account by username or email (case-insensitive).
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Credential>, CoreError>;

    /// Unconditionally set (or clear) the stored refresh token digest.
    async fn update_refresh_token(
        &self,
        id: DbId,
        token_hash: Option<&str>,
    ) -> Result<(), CoreError>;

    /// Replace the stored digest with `new_hash` only if it still equals
    /// `expected_hash`. Returns `true` when the swap happened.
    async fn swap_refresh_token(
        &self,
        id: DbId,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, CoreError>;
}
