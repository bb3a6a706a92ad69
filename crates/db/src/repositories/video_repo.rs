//! Repository for the `videos` table.

use sqlx::PgPool;
use vidshare_core::assets::{AssetRef, AssetSlot};
use vidshare_core::duration::MediaDuration;
use vidshare_core::media::{MediaPatch, NewMediaRecord};
use vidshare_core::types::DbId;

use crate::models::video::{SwappedVideoRow, VideoRow};

/// Column list for `videos` queries.
const COLUMNS: &str = "\
    id, owner_id, title, description, \
    video_remote_id, video_url, thumbnail_remote_id, thumbnail_url, \
    duration_secs, views, is_published, created_at, updated_at";

/// Provides CRUD operations for videos.
pub struct VideoRepo;

impl VideoRepo {
    /// Insert a new video, returning the created row.
    pub async fn create(pool: &PgPool, input: &NewMediaRecord) -> Result<VideoRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos (\
                owner_id, title, description, \
                video_remote_id, video_url, thumbnail_remote_id, thumbnail_url, \
                duration_secs\
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VideoRow>(&query)
            .bind(input.owner_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.video.remote_id)
            .bind(&input.video.url)
            .bind(input.thumbnail.as_ref().map(|t| t.remote_id.as_str()))
            .bind(input.thumbnail.as_ref().map(|t| t.url.as_str()))
            .bind(input.duration.total_seconds())
            .fetch_one(pool)
            .await
    }

    /// Find a video by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<VideoRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, VideoRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Update a video's text fields. Only non-`None` fields in `patch` are
    /// applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        patch: &MediaPatch,
    ) -> Result<Option<VideoRow>, sqlx::Error> {
        let query = format!(
            "UPDATE videos SET
                title = COALESCE($2, title),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, VideoRow>(&query)
            .bind(id)
            .bind(patch.title.as_deref())
            .bind(patch.description.as_deref())
            .fetch_optional(pool)
            .await
    }

    /// The `(remote_id, url)` column pair backing `slot`, if videos have one.
    pub fn asset_columns(slot: AssetSlot) -> Option<(&'static str, &'static str)> {
        match slot {
            AssetSlot::Video => Some(("video_remote_id", "video_url")),
            AssetSlot::Thumbnail => Some(("thumbnail_remote_id", "thumbnail_url")),
            AssetSlot::Avatar | AssetSlot::CoverImage => None,
        }
    }

    /// Point an asset column pair at `asset`, returning the new row together
    /// with the pair it replaced.
    ///
    /// The old values come from a `FOR UPDATE` read in the same statement, so
    /// concurrent swaps serialize on the row lock and each one sees the value
    /// the previous one wrote.
    pub async fn swap_asset(
        pool: &PgPool,
        id: DbId,
        (remote_col, url_col): (&str, &str),
        asset: &AssetRef,
        duration: Option<MediaDuration>,
    ) -> Result<Option<SwappedVideoRow>, sqlx::Error> {
        let query = format!(
            "WITH old AS (
                SELECT id AS old_id, {remote_col} AS old_remote_id, {url_col} AS old_url
                FROM videos WHERE id = $1
                FOR UPDATE
             )
             UPDATE videos SET
                {remote_col} = $2,
                {url_col} = $3,
                duration_secs = COALESCE($4, duration_secs)
             FROM old
             WHERE videos.id = old.old_id
             RETURNING {COLUMNS}, old.old_remote_id, old.old_url"
        );
        sqlx::query_as::<_, SwappedVideoRow>(&query)
            .bind(id)
            .bind(&asset.remote_id)
            .bind(&asset.url)
            .bind(duration.map(|d| d.total_seconds()))
            .fetch_optional(pool)
            .await
    }

    /// Delete a video by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip `is_published` in place and return the new value.
    ///
    /// The negation happens inside the UPDATE so concurrent toggles serialize
    /// on the row lock instead of racing a read-then-write.
    pub async fn toggle_published(pool: &PgPool, id: DbId) -> Result<Option<bool>, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "UPDATE videos SET is_published = NOT is_published
             WHERE id = $1
             RETURNING is_published",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
