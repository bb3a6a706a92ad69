//! Video records and the store that persists them.

use async_trait::async_trait;
use serde::Serialize;

use crate::assets::{AssetRef, AssetSlot};
use crate::duration::MediaDuration;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Description stored when the uploader leaves it blank.
pub const DEFAULT_DESCRIPTION: &str = "No Description is provided";

/// A published (or unpublished) video and the remote assets it references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRecord {
    pub id: DbId,
    pub owner_id: DbId,
    pub title: String,
    pub description: String,
    pub video: AssetRef,
    pub thumbnail: Option<AssetRef>,
    pub duration: MediaDuration,
    pub views: i64,
    pub is_published: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MediaRecord {
    /// The asset currently occupying `slot`, if any.
    pub fn asset(&self, slot: AssetSlot) -> Option<&AssetRef> {
        match slot {
            AssetSlot::Video => Some(&self.video),
            AssetSlot::Thumbnail => self.thumbnail.as_ref(),
            AssetSlot::Avatar | AssetSlot::CoverImage => None,
        }
    }

    /// Every remote asset this record owns, primary first.
    pub fn assets(&self) -> Vec<(AssetSlot, &AssetRef)> {
        let mut out = vec![(AssetSlot::Video, &self.video)];
        if let Some(thumb) = &self.thumbnail {
            out.push((AssetSlot::Thumbnail, thumb));
        }
        out
    }
}

/// DTO for creating a media record once its assets are confirmed.
#[derive(Debug, Clone)]
pub struct NewMediaRecord {
    pub owner_id: DbId,
    pub title: String,
    pub description: String,
    pub video: AssetRef,
    pub thumbnail: Option<AssetRef>,
    pub duration: MediaDuration,
}

/// Partial update of the text fields. Only `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct MediaPatch {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl MediaPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

/// Outcome of [`MediaStore::swap_asset`].
#[derive(Debug, Clone)]
pub struct AssetSwap {
    /// The record after the swap.
    pub record: MediaRecord,
    /// The asset the swap took out of the slot, read in the same atomic step.
    pub displaced: Option<AssetRef>,
}

/// Persistence for media records.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn create(&self, input: &NewMediaRecord) -> Result<MediaRecord, CoreError>;

    async fn find_by_id(&self, id: DbId) -> Result<Option<MediaRecord>, CoreError>;

    /// Apply `patch`. Returns `None` if no record with `id` exists.
    async fn update(&self, id: DbId, patch: &MediaPatch)
        -> Result<Option<MediaRecord>, CoreError>;

    /// Point `slot` at `asset` and return the asset it displaced.
    ///
    /// The old value is read and replaced atomically, so concurrent swaps on
    /// one record each displace a distinct asset. `duration` is applied with
    /// the primary video. Returns `None` if no record with `id` exists.
    async fn swap_asset(
        &self,
        id: DbId,
        slot: AssetSlot,
        asset: &AssetRef,
        duration: Option<MediaDuration>,
    ) -> Result<Option<AssetSwap>, CoreError>;

    /// Returns `true` if a record was removed.
    async fn delete(&self, id: DbId) -> Result<bool, CoreError>;

    /// Negate the publish flag in a single atomic update and return the new
    /// value, or `None` if the record does not exist.
    async fn toggle_published(&self, id: DbId) -> Result<Option<bool>, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetKind;
    use chrono::Utc;

    fn asset(id: &str, kind: AssetKind) -> AssetRef {
        AssetRef {
            remote_id: id.to_string(),
            url: format!("https://cdn.test/{id}"),
            kind,
        }
    }

    #[test]
    fn record_lists_primary_asset_first() {
        let record = MediaRecord {
            id: 1,
            owner_id: 1,
            title: "t".into(),
            description: DEFAULT_DESCRIPTION.into(),
            video: asset("v1", AssetKind::Video),
            thumbnail: Some(asset("t1", AssetKind::Image)),
            duration: MediaDuration::default(),
            views: 0,
            is_published: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let slots: Vec<_> = record.assets().into_iter().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![AssetSlot::Video, AssetSlot::Thumbnail]);
        assert!(record.asset(AssetSlot::Avatar).is_none());
    }

    #[test]
    fn default_patch_is_empty() {
        assert!(MediaPatch::default().is_empty());
    }
}
