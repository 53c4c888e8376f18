//! SQLite-backed content store
//!
//! Items come back in insertion order, which is the order a batch publishes
//! them in.

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::path::Path;

use crate::error::{PostdeckError, Result, StoreError};
use crate::types::{ContentItem, Destination, MediaRef};

#[derive(Clone)]
pub struct ContentStore {
    pool: SqlitePool,
}

impl ContentStore {
    /// Open (creating if needed) the store at `db_path` and run migrations
    pub async fn new(db_path: &str) -> Result<Self> {
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(StoreError::IoError)?;
        }

        // mode=rwc creates the file on first use
        let db_url = format!("sqlite://{}?mode=rwc", expanded_path.replace('\\', "/"));

        let pool = SqlitePool::connect(&db_url)
            .await
            .map_err(StoreError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(StoreError::MigrationError)?;

        tracing::debug!(path = %expanded_path, "content store opened");
        Ok(Self { pool })
    }

    pub async fn add_item(&self, item: &ContentItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO items (id, title, caption, media, destination, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.caption)
        .bind(item.media.as_ref().map(|m| m.as_str()))
        .bind(item.destination.as_str())
        .bind(item.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        Ok(())
    }

    pub async fn get_item(&self, item_id: &str) -> Result<Option<ContentItem>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, caption, media, destination, created_at
            FROM items WHERE id = ?
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::SqlxError)?;

        row.map(|r| item_from_row(&r)).transpose()
    }

    /// All items, optionally narrowed to one destination
    pub async fn list_items(&self, destination: Option<Destination>) -> Result<Vec<ContentItem>> {
        let rows = match destination {
            Some(destination) => {
                sqlx::query(
                    r#"
                    SELECT id, title, caption, media, destination, created_at
                    FROM items WHERE destination = ? ORDER BY seq
                    "#,
                )
                .bind(destination.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, title, caption, media, destination, created_at
                    FROM items ORDER BY seq
                    "#,
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(StoreError::SqlxError)?;

        rows.iter().map(item_from_row).collect()
    }

    /// Remove an item; returns false when nothing had that id
    pub async fn remove_item(&self, item_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(item_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Items a batch for `destination` would publish, in queue order
    pub async fn eligible_items(&self, destination: Destination) -> Result<Vec<ContentItem>> {
        let items = self.list_items(Some(destination)).await?;
        Ok(items
            .into_iter()
            .filter(|item| item.is_eligible(destination))
            .collect())
    }
}

fn item_from_row(row: &SqliteRow) -> Result<ContentItem> {
    let destination: String = row.get("destination");
    let destination = destination.parse::<Destination>().map_err(|e| {
        PostdeckError::InvalidInput(format!("stored item has bad destination: {}", e))
    })?;
    let media: Option<String> = row.get("media");

    Ok(ContentItem {
        id: row.get("id"),
        title: row.get("title"),
        caption: row.get("caption"),
        media: media.map(MediaRef::new),
        destination,
        created_at: row.get("created_at"),
    })
}
