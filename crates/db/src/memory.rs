//! In-memory store implementations.
//!
//! Semantically equivalent to the Postgres stores (including the atomic
//! refresh-token swap and publish toggle) so the service logic can be
//! exercised without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use vidshare_core::accounts::{Credential, CredentialStore, NewCredential};
use vidshare_core::assets::{AssetRef, AssetSlot};
use vidshare_core::duration::MediaDuration;
use vidshare_core::error::CoreError;
use vidshare_core::media::{AssetSwap, MediaPatch, MediaRecord, MediaStore, NewMediaRecord};
use vidshare_core::orphans::{NewOrphan, OrphanLog, OrphanedAsset};
use vidshare_core::types::DbId;
use vidshare_core::validation::normalize_identifier;

#[derive(Debug)]
struct Table<T> {
    rows: HashMap<DbId, T>,
    next_id: DbId,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    table: Mutex<Table<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(&self, input: &NewCredential) -> Result<Credential, CoreError> {
        let mut table = self.table.lock().await;
        let taken = table
            .rows
            .values()
            .any(|c| c.username == input.username || c.email == input.email);
        if taken {
            return Err(CoreError::Conflict(
                "User with email or username already exists".into(),
            ));
        }

        let id = table.allocate_id();
        let now = Utc::now();
        let credential = Credential {
            id,
            username: input.username.clone(),
            email: input.email.clone(),
            full_name: input.full_name.clone(),
            password_hash: input.password_hash.clone(),
            refresh_token_hash: None,
            avatar: input.avatar.clone(),
            cover_image: input.cover_image.clone(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, credential.clone());
        Ok(credential)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<Credential>, CoreError> {
        Ok(self.table.lock().await.rows.get(&id).cloned())
    }

    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Credential>, CoreError> {
        let needle = normalize_identifier(identifier);
        let table = self.table.lock().await;
        Ok(table
            .rows
            .values()
            .find(|c| c.username == needle || c.email == needle)
            .cloned())
    }

    async fn update_refresh_token(
        &self,
        id: DbId,
        token_hash: Option<&str>,
    ) -> Result<(), CoreError> {
        let mut table = self.table.lock().await;
        if let Some(credential) = table.rows.get_mut(&id) {
            credential.refresh_token_hash = token_hash.map(str::to_string);
            credential.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn swap_refresh_token(
        &self,
        id: DbId,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, CoreError> {
        let mut table = self.table.lock().await;
        match table.rows.get_mut(&id) {
            Some(credential) if credential.refresh_token_hash.as_deref() == Some(expected_hash) => {
                credential.refresh_token_hash = Some(new_hash.to_string());
                credential.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryMediaStore {
    table: Mutex<Table<MediaRecord>>,
}

impl MemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn create(&self, input: &NewMediaRecord) -> Result<MediaRecord, CoreError> {
        let mut table = self.table.lock().await;
        let id = table.allocate_id();
        let now = Utc::now();
        let record = MediaRecord {
            id,
            owner_id: input.owner_id,
            title: input.title.clone(),
            description: input.description.clone(),
            video: input.video.clone(),
            thumbnail: input.thumbnail.clone(),
            duration: input.duration,
            views: 0,
            is_published: true,
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: DbId) -> Result<Option<MediaRecord>, CoreError> {
        Ok(self.table.lock().await.rows.get(&id).cloned())
    }

    async fn update(
        &self,
        id: DbId,
        patch: &MediaPatch,
    ) -> Result<Option<MediaRecord>, CoreError> {
        let mut table = self.table.lock().await;
        let Some(record) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = &patch.title {
            record.title = title.clone();
        }
        if let Some(description) = &patch.description {
            record.description = description.clone();
        }
        record.updated_at = Utc::now();
        Ok(Some(record.clone()))
    }

    async fn swap_asset(
        &self,
        id: DbId,
        slot: AssetSlot,
        asset: &AssetRef,
        duration: Option<MediaDuration>,
    ) -> Result<Option<AssetSwap>, CoreError> {
        let mut table = self.table.lock().await;
        let Some(record) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        let displaced = match slot {
            AssetSlot::Video => {
                if let Some(duration) = duration {
                    record.duration = duration;
                }
                Some(std::mem::replace(&mut record.video, asset.clone()))
            }
            AssetSlot::Thumbnail => record.thumbnail.replace(asset.clone()),
            AssetSlot::Avatar | AssetSlot::CoverImage => {
                return Err(CoreError::Validation(format!(
                    "Videos have no '{slot}' asset"
                )));
            }
        };
        record.updated_at = Utc::now();
        Ok(Some(AssetSwap {
            record: record.clone(),
            displaced,
        }))
    }

    async fn delete(&self, id: DbId) -> Result<bool, CoreError> {
        Ok(self.table.lock().await.rows.remove(&id).is_some())
    }

    async fn toggle_published(&self, id: DbId) -> Result<Option<bool>, CoreError> {
        let mut table = self.table.lock().await;
        Ok(table.rows.get_mut(&id).map(|record| {
            record.is_published = !record.is_published;
            record.is_published
        }))
    }
}

// ---------------------------------------------------------------------------
// Orphans
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryOrphanLog {
    table: Mutex<Table<OrphanedAsset>>,
}

impl MemoryOrphanLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrphanLog for MemoryOrphanLog {
    async fn record(&self, entry: &NewOrphan) -> Result<OrphanedAsset, CoreError> {
        let mut table = self.table.lock().await;
        let id = table.allocate_id();
        let orphan = OrphanedAsset {
            id,
            remote_id: entry.remote_id.clone(),
            kind: entry.kind,
            url: entry.url.clone(),
            media_id: entry.media_id,
            reason: entry.reason,
            detail: entry.detail.clone(),
            created_at: Utc::now(),
        };
        table.rows.insert(id, orphan.clone());
        Ok(orphan)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<OrphanedAsset>, CoreError> {
        let table = self.table.lock().await;
        let mut rows: Vec<_> = table.rows.values().cloned().collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        rows.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(rows)
    }
}
