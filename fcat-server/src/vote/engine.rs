//! Vote transaction engine
//!
//! Performs the toggle-vote operation as one atomic unit against the store
//! and publishes the committed count to the event bus afterwards. The
//! correctness guarantees live in the storage layer, not in process-local
//! locks: the composite `(device_id, format_id)` primary key prevents a
//! double-insert from ever producing two vote rows, and the counter update is
//! a relative delta so concurrent voters on the same format cannot lose
//! updates. This holds even with multiple server processes sharing one
//! database.
//!
//! Trust boundary: the HTTP edge enforces the "only `Requested` formats
//! accept votes" policy before calling in; the engine does not re-check
//! status.

use crate::db::votes;
use fcat_common::events::{CatalogEvent, EventBus};
use fcat_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use tracing::debug;
use uuid::Uuid;

/// Result of a committed toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ToggleOutcome {
    /// Whether the device's vote exists after the toggle
    pub voted: bool,
    /// Committed counter value
    pub votes: i64,
}

/// The vote toggle engine
///
/// Cheap to clone; shares the pool and event bus.
#[derive(Clone)]
pub struct VoteEngine {
    db: Pool<Sqlite>,
    bus: EventBus,
}

impl VoteEngine {
    pub fn new(db: Pool<Sqlite>, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// Toggle the vote for `(device_id, format_id)`.
    ///
    /// One transaction: existence check, vote row insert or delete, relative
    /// counter update (clamped at zero), counter read-back, commit. Any
    /// failure aborts the transaction and leaves both the vote table and the
    /// counter unchanged, so a failed attempt is always safe to retry.
    ///
    /// Errors: `NotFound` for an unknown format; `Conflict` when a racing
    /// toggle for the same pair got there first (retryable).
    pub async fn toggle(&self, device_id: &str, format_id: Uuid) -> Result<ToggleOutcome> {
        let mut tx = self.db.begin().await?;

        if !votes::format_exists(&mut *tx, format_id).await? {
            return Err(Error::NotFound(format!("Format {}", format_id)));
        }

        let voted = if votes::vote_exists(&mut *tx, device_id, format_id).await? {
            votes::delete_vote(&mut *tx, device_id, format_id).await?;
            votes::adjust_vote_count(&mut *tx, format_id, -1).await?;
            false
        } else {
            votes::insert_vote(&mut *tx, device_id, format_id).await?;
            votes::adjust_vote_count(&mut *tx, format_id, 1).await?;
            true
        };

        let committed = votes::vote_count(&mut *tx, format_id).await?;
        tx.commit().await?;

        debug!(
            "Vote toggled: format={} voted={} votes={}",
            format_id, voted, committed
        );

        // Publish only after commit; a rolled-back attempt never broadcasts.
        // Delivery is best-effort and failures never surface to the voter.
        self.bus.emit_lossy(CatalogEvent::VoteCountChanged {
            format_id,
            votes: committed,
            timestamp: chrono::Utc::now(),
        });

        Ok(ToggleOutcome {
            voted,
            votes: committed,
        })
    }

    /// All format ids the device has voted for
    pub async fn votes_by_device(&self, device_id: &str) -> Result<Vec<Uuid>> {
        votes::formats_voted_by(&self.db, device_id).await
    }
}

impl std::fmt::Debug for VoteEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoteEngine")
            .field("subscribers", &self.bus.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::formats;
    use fcat_common::db::init_memory_database;
    use fcat_common::db::models::FormatStatus;

    async fn setup() -> (VoteEngine, Pool<Sqlite>, EventBus) {
        let pool = init_memory_database().await.unwrap();
        let bus = EventBus::new(64);
        (VoteEngine::new(pool.clone(), bus.clone()), pool, bus)
    }

    async fn seed_format(pool: &Pool<Sqlite>, name: &str, votes: i64) -> Uuid {
        let f = formats::insert(pool, name, "image", FormatStatus::Requested)
            .await
            .unwrap();
        if votes > 0 {
            sqlx::query("UPDATE formats SET votes = ? WHERE guid = ?")
                .bind(votes)
                .bind(f.guid.to_string())
                .execute(pool)
                .await
                .unwrap();
        }
        f.guid
    }

    async fn row_count(pool: &Pool<Sqlite>, format_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE format_id = ?")
            .bind(format_id.to_string())
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn toggle_on_then_off_returns_to_original_state() {
        let (engine, pool, _bus) = setup().await;
        let id = seed_format(&pool, "WebP", 3).await;

        let first = engine.toggle("device-1", id).await.unwrap();
        assert_eq!(first, ToggleOutcome { voted: true, votes: 4 });
        assert_eq!(row_count(&pool, id).await, 1);

        let second = engine.toggle("device-1", id).await.unwrap();
        assert_eq!(second, ToggleOutcome { voted: false, votes: 3 });
        assert_eq!(row_count(&pool, id).await, 0);
    }

    #[tokio::test]
    async fn toggle_emits_committed_count_after_each_commit() {
        let (engine, pool, bus) = setup().await;
        let id = seed_format(&pool, "AVIF", 3).await;
        let mut rx = bus.subscribe();

        engine.toggle("device-1", id).await.unwrap();
        engine.toggle("device-1", id).await.unwrap();

        match rx.try_recv().unwrap() {
            CatalogEvent::VoteCountChanged { format_id, votes, .. } => {
                assert_eq!(format_id, id);
                assert_eq!(votes, 4);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            CatalogEvent::VoteCountChanged { votes, .. } => assert_eq!(votes, 3),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_format_is_not_found_and_emits_nothing() {
        let (engine, _pool, bus) = setup().await;
        let mut rx = bus.subscribe();

        let err = engine.toggle("device-1", Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(rx.try_recv().is_err(), "no broadcast for a failed toggle");
    }

    #[tokio::test]
    async fn counter_equals_vote_row_count_after_many_devices() {
        let (engine, pool, _bus) = setup().await;
        let id = seed_format(&pool, "FLAC", 0).await;

        for device in 0..7 {
            engine.toggle(&format!("device-{}", device), id).await.unwrap();
        }
        // Three devices un-vote again
        for device in 0..3 {
            engine.toggle(&format!("device-{}", device), id).await.unwrap();
        }

        let counter: i64 = sqlx::query_scalar("SELECT votes FROM formats WHERE guid = ?")
            .bind(id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(counter, 4);
        assert_eq!(row_count(&pool, id).await, counter);
    }

    #[tokio::test]
    async fn concurrent_toggles_from_same_device_net_one_row_at_most() {
        let (engine, pool, _bus) = setup().await;
        let id = seed_format(&pool, "JXL", 0).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.toggle("device-1", id).await
            }));
        }
        for handle in handles {
            // Conflicts are acceptable (retryable); corruption is not
            let _ = handle.await.unwrap();
        }

        let rows = row_count(&pool, id).await;
        let counter: i64 = sqlx::query_scalar("SELECT votes FROM formats WHERE guid = ?")
            .bind(id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(rows == 0 || rows == 1, "pair uniqueness violated: {} rows", rows);
        assert_eq!(counter, rows, "counter diverged from vote rows");
    }

    #[tokio::test]
    async fn concurrent_toggles_from_different_devices_all_land() {
        let (engine, pool, _bus) = setup().await;
        let id = seed_format(&pool, "AV1", 0).await;

        let mut handles = Vec::new();
        for device in 0..10 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.toggle(&format!("device-{}", device), id).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let counter: i64 = sqlx::query_scalar("SELECT votes FROM formats WHERE guid = ?")
            .bind(id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(counter, 10);
        assert_eq!(row_count(&pool, id).await, 10);
    }
}
