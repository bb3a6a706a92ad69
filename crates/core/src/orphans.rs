//! Structured log of remote assets that could not be cleaned up.
//!
//! Entries are written whenever a best-effort remote deletion fails or an
//! upload ends in an unknown remote state, so an out-of-band reconciliation
//! job can find and remove them later.

use async_trait::async_trait;
use serde::Serialize;

use crate::assets::AssetKind;
use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Why an asset ended up in the orphan log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanReason {
    /// The asset was superseded by a replacement but deleting it failed.
    SupersededDeleteFailed,
    /// The asset was uploaded for an operation that then failed, and deleting
    /// it failed too.
    RollbackDeleteFailed,
    /// The upload timed out; the remote object may or may not exist.
    UploadTimedOut,
}

impl OrphanReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SupersededDeleteFailed => "superseded_delete_failed",
            Self::RollbackDeleteFailed => "rollback_delete_failed",
            Self::UploadTimedOut => "upload_timed_out",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "superseded_delete_failed" => Some(Self::SupersededDeleteFailed),
            "rollback_delete_failed" => Some(Self::RollbackDeleteFailed),
            "upload_timed_out" => Some(Self::UploadTimedOut),
            _ => None,
        }
    }
}

/// DTO for a new orphan log entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrphan {
    /// Remote identifier, when known. Timed-out uploads only know the local
    /// file they were sending.
    pub remote_id: Option<String>,
    pub kind: AssetKind,
    pub url: Option<String>,
    pub media_id: Option<DbId>,
    pub reason: OrphanReason,
    /// Error text from the failed step.
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrphanedAsset {
    pub id: DbId,
    pub remote_id: Option<String>,
    pub kind: AssetKind,
    pub url: Option<String>,
    pub media_id: Option<DbId>,
    pub reason: OrphanReason,
    pub detail: String,
    pub created_at: Timestamp,
}

#[async_trait]
pub trait OrphanLog: Send + Sync {
    async fn record(&self, entry: &NewOrphan) -> Result<OrphanedAsset, CoreError>;

    /// Most recent entries first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<OrphanedAsset>, CoreError>;
}
