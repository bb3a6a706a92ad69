//! Staged upload, replacement, and deletion of remote media assets.
//!
//! Every remote asset a record references was confirmed by a successful
//! gateway upload before the record pointed at it. Assets that could not be
//! cleaned up are written to the orphan log instead of being silently lost.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use vidshare_core::assets::{AssetRef, AssetSlot, IncomingFiles, LocalFile, UploadPlan};
use vidshare_core::duration::MediaDuration;
use vidshare_core::error::CoreError;
use vidshare_core::gateway::{AssetGateway, UploadedAsset};
use vidshare_core::media::{MediaRecord, MediaStore};
use vidshare_core::orphans::{NewOrphan, OrphanLog, OrphanReason};
use vidshare_core::types::DbId;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Assets confirmed by [`AssetLifecycleManager::stage_upload`], not yet
/// referenced by any record.
#[derive(Debug, Default)]
pub struct StagedAssets {
    assets: BTreeMap<AssetSlot, AssetRef>,
    duration: Option<MediaDuration>,
}

impl StagedAssets {
    pub fn get(&self, slot: AssetSlot) -> Option<&AssetRef> {
        self.assets.get(&slot)
    }

    /// The asset in a slot the plan marked required.
    pub fn required(&self, slot: AssetSlot) -> Result<AssetRef, CoreError> {
        self.assets
            .get(&slot)
            .cloned()
            .ok_or(CoreError::MissingRequiredAsset(slot))
    }

    /// Normalized duration reported for the primary video, if one was staged.
    pub fn duration(&self) -> Option<MediaDuration> {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

/// Outcome of [`AssetLifecycleManager::replace_asset`].
#[derive(Debug)]
pub struct ReplacedAsset {
    /// The record after the update.
    pub record: MediaRecord,
    /// The newly uploaded asset now referenced by the record.
    pub asset: AssetRef,
    /// Set when the superseded asset could not be deleted remotely. The
    /// replacement itself still succeeded.
    pub cleanup_warning: Option<String>,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Coordinates the remote asset gateway with the media record store.
pub struct AssetLifecycleManager {
    gateway: Arc<dyn AssetGateway>,
    media: Arc<dyn MediaStore>,
    orphans: Arc<dyn OrphanLog>,
    /// Bound on each individual gateway upload or delete.
    timeout: Duration,
}

impl AssetLifecycleManager {
    pub fn new(
        gateway: Arc<dyn AssetGateway>,
        media: Arc<dyn MediaStore>,
        orphans: Arc<dyn OrphanLog>,
        timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            media,
            orphans,
            timeout,
        }
    }

    /// Upload the files of one request according to `plan`.
    ///
    /// Required slots are checked before any network call. Required uploads
    /// run first; if one fails, assets already uploaded in this call are
    /// deleted and the error is returned. Optional upload failures are logged
    /// and the slot is left empty. Every local file in `files` is removed from
    /// disk before this returns, whatever the outcome.
    pub async fn stage_upload(
        &self,
        mut files: IncomingFiles,
        plan: &UploadPlan,
    ) -> Result<StagedAssets, CoreError> {
        let missing = plan
            .required
            .iter()
            .copied()
            .find(|slot| files.get(*slot).is_none_or(LocalFile::is_empty));
        if let Some(slot) = missing {
            remove_all(&mut files).await;
            return Err(CoreError::MissingRequiredAsset(slot));
        }

        let mut staged = StagedAssets::default();

        for &slot in plan.required {
            let Some(file) = files.take(slot) else {
                continue;
            };
            match self.upload_one(slot, file, None).await {
                Ok(uploaded) => staged.insert(slot, uploaded),
                Err(reason) => {
                    remove_all(&mut files).await;
                    self.discard_staged(staged, None).await;
                    return Err(CoreError::UploadFailed { slot, reason });
                }
            }
        }

        for &slot in plan.optional {
            let Some(file) = files.take(slot) else {
                continue;
            };
            if file.is_empty() {
                remove_local(&file).await;
                continue;
            }
            match self.upload_one(slot, file, None).await {
                Ok(uploaded) => staged.insert(slot, uploaded),
                Err(reason) => {
                    tracing::warn!(%slot, %reason, "Optional upload failed, continuing without it");
                }
            }
        }

        // Anything left was not part of the plan.
        remove_all(&mut files).await;

        Ok(staged)
    }

    /// Delete every asset in `staged` after the caller failed to persist the
    /// record that would have referenced them.
    pub async fn discard_staged(&self, staged: StagedAssets, media_id: Option<DbId>) {
        for (_, asset) in staged.assets {
            self.best_effort_delete(&asset, media_id, OrphanReason::RollbackDeleteFailed)
                .await;
        }
    }

    /// Replace the asset in `slot` of media record `media_id` with `file`.
    ///
    /// The new asset is uploaded before anything else changes. The old asset
    /// is deleted only after the record points at the new one, and a failure
    /// there is reported in [`ReplacedAsset::cleanup_warning`] rather than
    /// undoing the replacement.
    pub async fn replace_asset(
        &self,
        media_id: DbId,
        slot: AssetSlot,
        file: LocalFile,
    ) -> Result<ReplacedAsset, CoreError> {
        if !matches!(slot, AssetSlot::Video | AssetSlot::Thumbnail) {
            remove_local(&file).await;
            return Err(CoreError::Validation(format!(
                "Videos have no '{slot}' asset"
            )));
        }
        if file.is_empty() {
            remove_local(&file).await;
            return Err(CoreError::MissingRequiredAsset(slot));
        }

        if self.media.find_by_id(media_id).await?.is_none() {
            remove_local(&file).await;
            return Err(CoreError::NotFound {
                entity: "Video",
                id: media_id,
            });
        }

        let uploaded = self
            .upload_one(slot, file, Some(media_id))
            .await
            .map_err(|reason| CoreError::UploadFailed { slot, reason })?;
        let asset = uploaded.to_ref(slot.kind());
        let duration = match slot {
            AssetSlot::Video => uploaded.duration_seconds.map(MediaDuration::from_seconds),
            _ => None,
        };

        // Clean up what the swap displaced; the slot may have changed since
        // the existence check.
        let swap = match self.media.swap_asset(media_id, slot, &asset, duration).await {
            Ok(Some(swap)) => swap,
            Ok(None) => {
                self.best_effort_delete(&asset, Some(media_id), OrphanReason::RollbackDeleteFailed)
                    .await;
                return Err(CoreError::NotFound {
                    entity: "Video",
                    id: media_id,
                });
            }
            Err(e) => {
                self.best_effort_delete(&asset, Some(media_id), OrphanReason::RollbackDeleteFailed)
                    .await;
                return Err(e);
            }
        };

        let cleanup_warning = match &swap.displaced {
            Some(old) if old.remote_id != asset.remote_id => {
                self.best_effort_delete(old, Some(media_id), OrphanReason::SupersededDeleteFailed)
                    .await
            }
            _ => None,
        };

        tracing::info!(media_id, %slot, remote_id = %asset.remote_id, "Asset replaced");

        Ok(ReplacedAsset {
            record: swap.record,
            asset,
            cleanup_warning,
        })
    }

    /// Delete every remote asset of `media_id`, then the record itself.
    ///
    /// If any remote deletion fails the record is kept and
    /// [`CoreError::AssetDeletionFailed`] is returned; retrying converges
    /// because deleting an already-absent asset succeeds.
    pub async fn delete_media_and_assets(&self, media_id: DbId) -> Result<MediaRecord, CoreError> {
        let record = self
            .media
            .find_by_id(media_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Video",
                id: media_id,
            })?;

        let mut failures = Vec::new();
        for (slot, asset) in record.assets() {
            if let Err(reason) = self.delete_remote(asset).await {
                tracing::warn!(
                    media_id,
                    %slot,
                    remote_id = %asset.remote_id,
                    %reason,
                    "Remote asset deletion failed"
                );
                failures.push(format!("{slot} ({}): {reason}", asset.remote_id));
            }
        }

        if !failures.is_empty() {
            return Err(CoreError::AssetDeletionFailed(failures.join("; ")));
        }

        if !self.media.delete(media_id).await? {
            tracing::debug!(media_id, "Record already removed after asset deletion");
        }

        tracing::info!(media_id, "Video and its assets deleted");
        Ok(record)
    }

    /// Flip the publish flag atomically and return the new value.
    pub async fn toggle_publish(&self, media_id: DbId) -> Result<bool, CoreError> {
        self.media
            .toggle_published(media_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Video",
                id: media_id,
            })
    }

    // -- helpers ------------------------------------------------------------

    /// Upload one local file, then remove it from disk.
    ///
    /// A timed-out upload is logged as an orphan because the gateway may have
    /// stored the object anyway.
    async fn upload_one(
        &self,
        slot: AssetSlot,
        file: LocalFile,
        media_id: Option<DbId>,
    ) -> Result<UploadedAsset, String> {
        let start = Instant::now();
        let result = tokio::time::timeout(self.timeout, self.gateway.upload(&file.path, slot.kind()))
            .await;
        remove_local(&file).await;

        match result {
            Ok(Ok(uploaded)) => {
                tracing::debug!(
                    %slot,
                    remote_id = %uploaded.remote_id,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Asset uploaded"
                );
                Ok(uploaded)
            }
            Ok(Err(e)) => {
                tracing::warn!(%slot, error = %e, "Asset upload failed");
                Err(e.to_string())
            }
            Err(_elapsed) => {
                let detail = format!(
                    "upload of {} timed out after {}s",
                    file.file_name.as_deref().unwrap_or("<unnamed>"),
                    self.timeout.as_secs_f64()
                );
                tracing::warn!(%slot, %detail, "Asset upload timed out");
                self.record_orphan(NewOrphan {
                    remote_id: None,
                    kind: slot.kind(),
                    url: None,
                    media_id,
                    reason: OrphanReason::UploadTimedOut,
                    detail: detail.clone(),
                })
                .await;
                Err(detail)
            }
        }
    }

    async fn delete_remote(&self, asset: &AssetRef) -> Result<(), String> {
        match tokio::time::timeout(self.timeout, self.gateway.delete(&asset.remote_id, asset.kind))
            .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("delete timed out after {}s", self.timeout.as_secs_f64())),
        }
    }

    /// Delete `asset`, logging an orphan on failure. Returns the warning text
    /// when the deletion failed.
    async fn best_effort_delete(
        &self,
        asset: &AssetRef,
        media_id: Option<DbId>,
        reason: OrphanReason,
    ) -> Option<String> {
        let detail = self.delete_remote(asset).await.err()?;
        tracing::warn!(
            remote_id = %asset.remote_id,
            kind = %asset.kind,
            media_id,
            reason = reason.as_str(),
            %detail,
            "Remote asset left orphaned"
        );
        self.record_orphan(NewOrphan {
            remote_id: Some(asset.remote_id.clone()),
            kind: asset.kind,
            url: Some(asset.url.clone()),
            media_id,
            reason,
            detail: detail.clone(),
        })
        .await;
        Some(format!("Failed to delete asset {}: {detail}", asset.remote_id))
    }

    async fn record_orphan(&self, entry: NewOrphan) {
        if let Err(e) = self.orphans.record(&entry).await {
            tracing::error!(error = %e, ?entry, "Failed to write orphan log entry");
        }
    }
}

impl StagedAssets {
    fn insert(&mut self, slot: AssetSlot, uploaded: UploadedAsset) {
        if slot == AssetSlot::Video {
            self.duration = uploaded.duration_seconds.map(MediaDuration::from_seconds);
        }
        self.assets.insert(slot, uploaded.to_ref(slot.kind()));
    }
}

/// Remove a temp file, logging rather than failing when that is not possible.
pub(crate) async fn remove_local(file: &LocalFile) {
    if let Err(e) = file.remove().await {
        tracing::warn!(path = %file.path.display(), error = %e, "Failed to remove temp file");
    }
}

pub(crate) async fn remove_all(files: &mut IncomingFiles) {
    for (_, file) in files.drain() {
        remove_local(&file).await;
    }
}
