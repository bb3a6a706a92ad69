//! Repository for the `orphaned_assets` table.

use sqlx::PgPool;
use vidshare_core::orphans::NewOrphan;

use crate::models::orphan::OrphanRow;

const COLUMNS: &str = "id, remote_id, kind, url, media_id, reason, detail, created_at";

pub struct OrphanRepo;

impl OrphanRepo {
    pub async fn create(pool: &PgPool, input: &NewOrphan) -> Result<OrphanRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO orphaned_assets (remote_id, kind, url, media_id, reason, detail)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrphanRow>(&query)
            .bind(input.remote_id.as_deref())
            .bind(input.kind.as_str())
            .bind(input.url.as_deref())
            .bind(input.media_id)
            .bind(input.reason.as_str())
            .bind(&input.detail)
            .fetch_one(pool)
            .await
    }

    /// Most recent entries first.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<OrphanRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM orphaned_assets ORDER BY created_at DESC, id DESC LIMIT $1"
        );
        sqlx::query_as::<_, OrphanRow>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
