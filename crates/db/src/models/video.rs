//! Video row and its conversion into the domain [`MediaRecord`].

use sqlx::FromRow;
use vidshare_core::assets::{AssetKind, AssetRef};
use vidshare_core::duration::MediaDuration;
use vidshare_core::media::MediaRecord;
use vidshare_core::types::{DbId, Timestamp};

/// Full row from the `videos` table.
#[derive(Debug, Clone, FromRow)]
pub struct VideoRow {
    pub id: DbId,
    pub owner_id: DbId,
    pub title: String,
    pub description: String,
    pub video_remote_id: String,
    pub video_url: String,
    pub thumbnail_remote_id: Option<String>,
    pub thumbnail_url: Option<String>,
    pub duration_secs: i64,
    pub views: i64,
    pub is_published: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A [`VideoRow`] returned by an asset swap, plus the asset columns it
/// replaced.
#[derive(Debug, Clone, FromRow)]
pub struct SwappedVideoRow {
    #[sqlx(flatten)]
    pub row: VideoRow,
    pub old_remote_id: Option<String>,
    pub old_url: Option<String>,
}

impl SwappedVideoRow {
    /// The displaced asset, typed with the kind of the swapped slot.
    pub fn displaced(&self, kind: AssetKind) -> Option<AssetRef> {
        match (&self.old_remote_id, &self.old_url) {
            (Some(remote_id), Some(url)) => Some(AssetRef {
                remote_id: remote_id.clone(),
                url: url.clone(),
                kind,
            }),
            _ => None,
        }
    }
}

impl From<VideoRow> for MediaRecord {
    fn from(row: VideoRow) -> Self {
        let thumbnail = match (row.thumbnail_remote_id, row.thumbnail_url) {
            (Some(remote_id), Some(url)) => Some(AssetRef {
                remote_id,
                url,
                kind: AssetKind::Image,
            }),
            _ => None,
        };
        MediaRecord {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            video: AssetRef {
                remote_id: row.video_remote_id,
                url: row.video_url,
                kind: AssetKind::Video,
            },
            thumbnail,
            duration: MediaDuration::from_total_seconds(row.duration_secs),
            views: row.views,
            is_published: row.is_published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
