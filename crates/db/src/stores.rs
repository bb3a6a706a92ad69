//! Postgres-backed implementations of the core store traits.

use async_trait::async_trait;
use vidshare_core::accounts::{Credential, CredentialStore, NewCredential};
use vidshare_core::assets::{AssetRef, AssetSlot};
use vidshare_core::duration::MediaDuration;
use vidshare_core::error::CoreError;
use vidshare_core::media::{AssetSwap, MediaPatch, MediaRecord, MediaStore, NewMediaRecord};
use vidshare_core::orphans::{NewOrphan, OrphanLog, OrphanedAsset};
use vidshare_core::types::DbId;

use crate::error::classify;
use crate::repositories::{OrphanRepo, UserRepo, VideoRepo};
use crate::DbPool;

/// [`CredentialStore`] over the `users` table.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: DbPool,
}

impl PgCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, input: &NewCredential) -> Result<Credential, CoreError> {
        let row = UserRepo::create(&self.pool, input).await.map_err(classify)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Credential>, CoreError> {
        let row = UserRepo::find_by_id(&self.pool, id).await.map_err(classify)?;
        Ok(row.map(Into::into))
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Credential>, CoreError> {
        let row = UserRepo::find_by_identifier(&self.pool, identifier)
            .await
            .map_err(classify)?;
        Ok(row.map(Into::into))
    }

    async fn update_refresh_token(
        &self,
        id: DbId,
        token_hash: Option<&str>,
    ) -> Result<(), CoreError> {
        UserRepo::update_refresh_token(&self.pool, id, token_hash)
            .await
            .map_err(classify)
    }

    async fn swap_refresh_token(
        &self,
        id: DbId,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, CoreError> {
        UserRepo::swap_refresh_token(&self.pool, id, expected_hash, new_hash)
            .await
            .map_err(classify)
    }
}

/// [`MediaStore`] over the `videos` table.
#[derive(Clone)]
pub struct PgMediaStore {
    pool: DbPool,
}

impl PgMediaStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaStore for PgMediaStore {
    async fn create(&self, input: &NewMediaRecord) -> Result<MediaRecord, CoreError> {
        let row = VideoRepo::create(&self.pool, input).await.map_err(classify)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<MediaRecord>, CoreError> {
        let row = VideoRepo::find_by_id(&self.pool, id).await.map_err(classify)?;
        Ok(row.map(Into::into))
    }

    async fn update(
        &self,
        id: DbId,
        patch: &MediaPatch,
    ) -> Result<Option<MediaRecord>, CoreError> {
        let row = VideoRepo::update(&self.pool, id, patch)
            .await
            .map_err(classify)?;
        Ok(row.map(Into::into))
    }

    async fn swap_asset(
        &self,
        id: DbId,
        slot: AssetSlot,
        asset: &AssetRef,
        duration: Option<MediaDuration>,
    ) -> Result<Option<AssetSwap>, CoreError> {
        let columns = VideoRepo::asset_columns(slot)
            .ok_or_else(|| CoreError::Validation(format!("Videos have no '{slot}' asset")))?;
        let swapped = VideoRepo::swap_asset(&self.pool, id, columns, asset, duration)
            .await
            .map_err(classify)?;
        Ok(swapped.map(|s| AssetSwap {
            displaced: s.displaced(slot.kind()),
            record: s.row.into(),
        }))
    }

    async fn delete(&self, id: DbId) -> Result<bool, CoreError> {
        VideoRepo::delete(&self.pool, id).await.map_err(classify)
    }

    async fn toggle_published(&self, id: DbId) -> Result<Option<bool>, CoreError> {
        VideoRepo::toggle_published(&self.pool, id)
            .await
            .map_err(classify)
    }
}

/// [`OrphanLog`] over the `orphaned_assets` table.
#[derive(Clone)]
pub struct PgOrphanLog {
    pool: DbPool,
}

impl PgOrphanLog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrphanLog for PgOrphanLog {
    async fn record(&self, entry: &NewOrphan) -> Result<OrphanedAsset, CoreError> {
        let row = OrphanRepo::create(&self.pool, entry)
            .await
            .map_err(classify)?;
        row.try_into()
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<OrphanedAsset>, CoreError> {
        OrphanRepo::list_recent(&self.pool, limit)
            .await
            .map_err(classify)?
            .into_iter()
            .map(TryInto::try_into)
            .collect()
    }
}
