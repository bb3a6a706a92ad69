use sqlx::FromRow;
use vidshare_core::assets::AssetKind;
use vidshare_core::error::CoreError;
use vidshare_core::orphans::{OrphanReason, OrphanedAsset};
use vidshare_core::types::{DbId, Timestamp};

/// A row from the `orphaned_assets` table.
#[derive(Debug, Clone, FromRow)]
pub struct OrphanRow {
    pub id: DbId,
    pub remote_id: Option<String>,
    pub kind: String,
    pub url: Option<String>,
    pub media_id: Option<DbId>,
    pub reason: String,
    pub detail: String,
    pub created_at: Timestamp,
}

impl TryFrom<OrphanRow> for OrphanedAsset {
    type Error = CoreError;

    fn try_from(row: OrphanRow) -> Result<Self, Self::Error> {
        let kind = AssetKind::from_name(&row.kind)
            .ok_or_else(|| CoreError::Internal(format!("Unknown asset kind '{}'", row.kind)))?;
        let reason = OrphanReason::from_name(&row.reason).ok_or_else(|| {
            CoreError::Internal(format!("Unknown orphan reason '{}'", row.reason))
        })?;
        Ok(OrphanedAsset {
            id: row.id,
            remote_id: row.remote_id,
            kind,
            url: row.url,
            media_id: row.media_id,
            reason,
            detail: row.detail,
            created_at: row.created_at,
        })
    }
}
