//! Vote table queries and the atomic counter update
//!
//! These take a generic executor so the vote engine can run them inside one
//! transaction; the standalone read paths take the pool directly.

use fcat_common::{Error, Result};
use sqlx::{Row, Sqlite};
use uuid::Uuid;

/// Whether a format row exists
pub async fn format_exists<'e, E>(executor: E, format_id: Uuid) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM formats WHERE guid = ?)")
        .bind(format_id.to_string())
        .fetch_one(executor)
        .await?;
    Ok(exists)
}

/// Whether a vote row exists for the `(device_id, format_id)` pair
pub async fn vote_exists<'e, E>(executor: E, device_id: &str, format_id: Uuid) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM votes WHERE device_id = ? AND format_id = ?)",
    )
    .bind(device_id)
    .bind(format_id.to_string())
    .fetch_one(executor)
    .await?;
    Ok(exists)
}

/// Insert the vote row for a pair
///
/// A racing duplicate insert violates the composite primary key and surfaces
/// as `Conflict`; the caller's transaction rolls back and the whole toggle is
/// safe to retry.
pub async fn insert_vote<'e, E>(executor: E, device_id: &str, format_id: Uuid) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("INSERT INTO votes (device_id, format_id, created_at) VALUES (?, ?, ?)")
        .bind(device_id)
        .bind(format_id.to_string())
        .bind(chrono::Utc::now())
        .execute(executor)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(Error::Conflict(
            format!("Vote for {} already recorded", format_id),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Delete the vote row for a pair; Ok(false) when no row existed
pub async fn delete_vote<'e, E>(executor: E, device_id: &str, format_id: Uuid) -> Result<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM votes WHERE device_id = ? AND format_id = ?")
        .bind(device_id)
        .bind(format_id.to_string())
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Adjust a format's vote counter by a relative delta, clamped at zero.
///
/// This is deliberately a single relative UPDATE, never read-then-write of a
/// cached value, so concurrent toggles by different devices on the same
/// format cannot lose updates.
pub async fn adjust_vote_count<'e, E>(executor: E, format_id: Uuid, delta: i64) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE formats SET votes = MAX(votes + ?, 0) WHERE guid = ?")
        .bind(delta)
        .bind(format_id.to_string())
        .execute(executor)
        .await?;
    Ok(())
}

/// Read the committed counter value for a format
pub async fn vote_count<'e, E>(executor: E, format_id: Uuid) -> Result<i64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let votes: i64 = sqlx::query_scalar("SELECT votes FROM formats WHERE guid = ?")
        .bind(format_id.to_string())
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Format {}", format_id)))?;
    Ok(votes)
}

/// All format ids a device has voted for
pub async fn formats_voted_by(db: &sqlx::Pool<Sqlite>, device_id: &str) -> Result<Vec<Uuid>> {
    let rows = sqlx::query("SELECT format_id FROM votes WHERE device_id = ? ORDER BY created_at")
        .bind(device_id)
        .fetch_all(db)
        .await?;

    rows.iter()
        .map(|row| {
            let id: String = row.get("format_id");
            Uuid::parse_str(&id)
                .map_err(|e| Error::Internal(format!("Malformed vote format_id '{}': {}", id, e)))
        })
        .collect()
}
