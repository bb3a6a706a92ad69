//! User row and its conversion into the domain [`Credential`].

use sqlx::FromRow;
use vidshare_core::accounts::Credential;
use vidshare_core::assets::{AssetKind, AssetRef};
use vidshare_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub refresh_token_hash: Option<String>,
    pub avatar_remote_id: String,
    pub avatar_url: String,
    pub cover_image_remote_id: Option<String>,
    pub cover_image_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<UserRow> for Credential {
    fn from(row: UserRow) -> Self {
        let cover_image = match (row.cover_image_remote_id, row.cover_image_url) {
            (Some(remote_id), Some(url)) => Some(AssetRef {
                remote_id,
                url,
                kind: AssetKind::Image,
            }),
            _ => None,
        };
        Credential {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            password_hash: row.password_hash,
            refresh_token_hash: row.refresh_token_hash,
            avatar: AssetRef {
                remote_id: row.avatar_remote_id,
                url: row.avatar_url,
                kind: AssetKind::Image,
            },
            cover_image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
