//! Format table queries
//!
//! Row CRUD for the catalog plus the filtered/sorted listing behind the
//! public catalog endpoint. Vote-row operations and the counter update live
//! in [`crate::db::votes`].

use fcat_common::db::models::{Format, FormatStatus};
use fcat_common::reconcile::{CatalogFilter, CatalogSort};
use fcat_common::{Error, Result};
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

const SELECT_COLUMNS: &str = "guid, name, kind, status, votes, created_at";

fn row_to_format(row: &sqlx::sqlite::SqliteRow) -> Result<Format> {
    let guid_str: String = row.get("guid");
    let guid = Uuid::parse_str(&guid_str)
        .map_err(|e| Error::Internal(format!("Malformed format guid '{}': {}", guid_str, e)))?;

    let status_str: String = row.get("status");
    let status = FormatStatus::from_str(&status_str)
        .ok_or_else(|| Error::Internal(format!("Unknown format status '{}'", status_str)))?;

    Ok(Format {
        guid,
        name: row.get("name"),
        kind: row.get("kind"),
        status,
        votes: row.get("votes"),
        created_at: row.get("created_at"),
    })
}

/// Get a format by id
pub async fn get(db: &Pool<Sqlite>, format_id: Uuid) -> Result<Format> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM formats WHERE guid = ?",
        SELECT_COLUMNS
    ))
    .bind(format_id.to_string())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Format {}", format_id)))?;

    row_to_format(&row)
}

/// List formats matching the filter, in the requested order
pub async fn list(
    db: &Pool<Sqlite>,
    filter: &CatalogFilter,
    sort: CatalogSort,
) -> Result<Vec<Format>> {
    let mut sql = format!("SELECT {} FROM formats", SELECT_COLUMNS);

    let mut clauses: Vec<&str> = Vec::new();
    if filter.kind.is_some() {
        clauses.push("kind = ? COLLATE NOCASE");
    }
    if filter.status.is_some() {
        clauses.push("status = ?");
    }
    if filter.search.is_some() {
        clauses.push("name LIKE ? ESCAPE '\\' COLLATE NOCASE");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    sql.push_str(match sort {
        CatalogSort::Votes => " ORDER BY votes DESC, name COLLATE NOCASE ASC",
        CatalogSort::Name => " ORDER BY name COLLATE NOCASE ASC",
        CatalogSort::Newest => " ORDER BY created_at DESC",
    });

    let mut query = sqlx::query(&sql);
    if let Some(kind) = &filter.kind {
        query = query.bind(kind.clone());
    }
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    if let Some(search) = &filter.search {
        let escaped = search.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        query = query.bind(format!("%{}%", escaped));
    }

    let rows = query.fetch_all(db).await?;
    rows.iter().map(row_to_format).collect()
}

/// Insert a new format
///
/// The name must be unique case-insensitively; the storage constraint
/// enforces that, and a violation surfaces as `Conflict` so a duplicate
/// submission never creates a second row.
pub async fn insert(
    db: &Pool<Sqlite>,
    name: &str,
    kind: &str,
    status: FormatStatus,
) -> Result<Format> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Format name must not be empty".to_string()));
    }
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(Error::InvalidInput("Format kind must not be empty".to_string()));
    }

    let format = Format {
        guid: Uuid::new_v4(),
        name: name.to_string(),
        kind: kind.to_string(),
        status,
        votes: 0,
        created_at: chrono::Utc::now(),
    };

    let result = sqlx::query(
        "INSERT INTO formats (guid, name, kind, status, votes, created_at) VALUES (?, ?, ?, ?, 0, ?)",
    )
    .bind(format.guid.to_string())
    .bind(&format.name)
    .bind(&format.kind)
    .bind(format.status.as_str())
    .bind(format.created_at)
    .execute(db)
    .await;

    match result {
        Ok(_) => Ok(format),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            Error::Conflict(format!("Format '{}' already exists", format.name)),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Update a format's lifecycle status, returning the updated row
pub async fn update_status(
    db: &Pool<Sqlite>,
    format_id: Uuid,
    status: FormatStatus,
) -> Result<Format> {
    let result = sqlx::query("UPDATE formats SET status = ? WHERE guid = ?")
        .bind(status.as_str())
        .bind(format_id.to_string())
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Format {}", format_id)));
    }

    get(db, format_id).await
}

/// Delete a format; the votes FK cascade removes its vote rows atomically
pub async fn delete(db: &Pool<Sqlite>, format_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM formats WHERE guid = ?")
        .bind(format_id.to_string())
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Format {}", format_id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fcat_common::db::init_memory_database;

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let pool = init_memory_database().await.unwrap();

        let inserted = insert(&pool, "WebP", "image", FormatStatus::Requested)
            .await
            .unwrap();
        let fetched = get(&pool, inserted.guid).await.unwrap();

        assert_eq!(fetched.name, "WebP");
        assert_eq!(fetched.kind, "image");
        assert_eq!(fetched.status, FormatStatus::Requested);
        assert_eq!(fetched.votes, 0);
    }

    #[tokio::test]
    async fn duplicate_name_is_conflict_case_insensitively() {
        let pool = init_memory_database().await.unwrap();

        insert(&pool, "WebP", "image", FormatStatus::Requested)
            .await
            .unwrap();
        let err = insert(&pool, "webp", "image", FormatStatus::Requested)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM formats")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn empty_name_is_invalid_input() {
        let pool = init_memory_database().await.unwrap();
        let err = insert(&pool, "   ", "image", FormatStatus::Requested)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn get_unknown_format_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let err = get(&pool, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn update_status_persists() {
        let pool = init_memory_database().await.unwrap();
        let f = insert(&pool, "AVIF", "image", FormatStatus::Requested)
            .await
            .unwrap();

        let updated = update_status(&pool, f.guid, FormatStatus::Planned)
            .await
            .unwrap();
        assert_eq!(updated.status, FormatStatus::Planned);

        let err = update_status(&pool, Uuid::new_v4(), FormatStatus::Planned)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_unknown_format_is_not_found() {
        let pool = init_memory_database().await.unwrap();
        let err = delete(&pool, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn list_filters_and_sorts() {
        let pool = init_memory_database().await.unwrap();

        let webp = insert(&pool, "WebP", "image", FormatStatus::Requested)
            .await
            .unwrap();
        insert(&pool, "Opus", "audio", FormatStatus::Supported)
            .await
            .unwrap();
        let avif = insert(&pool, "AVIF", "image", FormatStatus::Requested)
            .await
            .unwrap();

        sqlx::query("UPDATE formats SET votes = 5 WHERE guid = ?")
            .bind(avif.guid.to_string())
            .execute(&pool)
            .await
            .unwrap();

        // Kind filter + vote sort
        let filter = CatalogFilter {
            kind: Some("image".to_string()),
            ..Default::default()
        };
        let rows = list(&pool, &filter, CatalogSort::Votes).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].guid, avif.guid);
        assert_eq!(rows[1].guid, webp.guid);

        // Status filter
        let filter = CatalogFilter {
            status: Some(FormatStatus::Supported),
            ..Default::default()
        };
        let rows = list(&pool, &filter, CatalogSort::Name).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Opus");

        // Case-insensitive name search
        let filter = CatalogFilter {
            search: Some("web".to_string()),
            ..Default::default()
        };
        let rows = list(&pool, &filter, CatalogSort::Name).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "WebP");
    }

    #[tokio::test]
    async fn search_treats_like_wildcards_literally() {
        let pool = init_memory_database().await.unwrap();
        insert(&pool, "MP4 100%", "video", FormatStatus::Requested)
            .await
            .unwrap();
        insert(&pool, "MP4 1000", "video", FormatStatus::Requested)
            .await
            .unwrap();

        let filter = CatalogFilter {
            search: Some("100%".to_string()),
            ..Default::default()
        };
        let rows = list(&pool, &filter, CatalogSort::Name).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "MP4 100%");
    }
}
