//! Anchor persistence
//!
//! The [`AnchorStore`] trait is the only thing the anchoring core knows about
//! storage. Failures are surfaced unchanged; retry policy belongs to callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

use super::surface::Rect;
use super::types::{AnchorPayload, AnnotationType, TextAnchor};

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt anchor record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Keyed storage for anchors
#[async_trait]
pub trait AnchorStore: Send + Sync {
    /// Insert or fully replace the record with the same id
    async fn save(&self, anchor: &TextAnchor) -> Result<(), StoreError>;

    /// Fetch a record by id
    async fn get(&self, id: &str) -> Result<Option<TextAnchor>, StoreError>;

    /// All records of a document, oldest first
    async fn list_by_document(&self, document_id: &str) -> Result<Vec<TextAnchor>, StoreError>;

    /// Records captured on one page of a document
    async fn list_for_page(
        &self,
        document_id: &str,
        page_number: u32,
    ) -> Result<Vec<TextAnchor>, StoreError> {
        let anchors = self.list_by_document(document_id).await?;
        Ok(anchors
            .into_iter()
            .filter(|a| a.page_number == Some(page_number))
            .collect())
    }

    /// Remove a record, returning whether it existed
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// SQLite-backed anchor store
#[derive(Clone)]
pub struct SqliteAnchorStore {
    pool: SqlitePool,
}

impl SqliteAnchorStore {
    /// Create a new store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the anchors table
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS text_anchors (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                page_number INTEGER,
                selected_text TEXT NOT NULL,
                start_offset INTEGER,
                end_offset INTEGER,
                rect_json TEXT,
                annotation_type TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_text_anchors_document ON text_anchors(document_id);
            CREATE INDEX IF NOT EXISTS idx_text_anchors_page ON text_anchors(document_id, page_number);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, document_id, page_number, selected_text, start_offset, end_offset,
           rect_json, annotation_type, payload_json, created_at, updated_at
    FROM text_anchors
"#;

#[async_trait]
impl AnchorStore for SqliteAnchorStore {
    async fn save(&self, anchor: &TextAnchor) -> Result<(), StoreError> {
        let rect_json = anchor
            .bounding_rect
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let payload_json = anchor.payload_json()?;

        sqlx::query(
            r#"
            INSERT INTO text_anchors (
                id, document_id, page_number, selected_text, start_offset, end_offset,
                rect_json, annotation_type, payload_json, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                document_id = excluded.document_id,
                page_number = excluded.page_number,
                selected_text = excluded.selected_text,
                start_offset = excluded.start_offset,
                end_offset = excluded.end_offset,
                rect_json = excluded.rect_json,
                annotation_type = excluded.annotation_type,
                payload_json = excluded.payload_json,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&anchor.id)
        .bind(&anchor.document_id)
        .bind(anchor.page_number.map(i64::from))
        .bind(&anchor.selected_text)
        .bind(anchor.start_offset.map(|o| o as i64))
        .bind(anchor.end_offset.map(|o| o as i64))
        .bind(&rect_json)
        .bind(anchor.annotation_type.as_str())
        .bind(&payload_json)
        .bind(anchor.created_at.to_rfc3339())
        .bind(anchor.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TextAnchor>, StoreError> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, AnchorRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AnchorRow::into_anchor).transpose()
    }

    async fn list_by_document(&self, document_id: &str) -> Result<Vec<TextAnchor>, StoreError> {
        let sql = format!(
            "{} WHERE document_id = ? ORDER BY created_at ASC, id ASC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AnchorRow>(&sql)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AnchorRow::into_anchor).collect()
    }

    async fn list_for_page(
        &self,
        document_id: &str,
        page_number: u32,
    ) -> Result<Vec<TextAnchor>, StoreError> {
        let sql = format!(
            "{} WHERE document_id = ? AND page_number = ? ORDER BY start_offset ASC, created_at ASC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AnchorRow>(&sql)
            .bind(document_id)
            .bind(i64::from(page_number))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AnchorRow::into_anchor).collect()
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM text_anchors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Internal row type for SQLite queries
#[derive(sqlx::FromRow)]
struct AnchorRow {
    id: String,
    document_id: String,
    page_number: Option<i64>,
    selected_text: String,
    start_offset: Option<i64>,
    end_offset: Option<i64>,
    rect_json: Option<String>,
    annotation_type: String,
    payload_json: String,
    created_at: String,
    updated_at: String,
}

impl AnchorRow {
    fn into_anchor(self) -> Result<TextAnchor, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            id: self.id.clone(),
            reason,
        };

        let bounding_rect: Option<Rect> = self
            .rect_json
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| corrupt(format!("bounding rect: {}", e)))?;
        let payload: AnchorPayload = serde_json::from_str(&self.payload_json)
            .map_err(|e| corrupt(format!("payload: {}", e)))?;

        let created_at = parse_stored_time(&self.created_at).map_err(&corrupt)?;
        let updated_at = parse_stored_time(&self.updated_at).map_err(&corrupt)?;

        let page_number = self
            .page_number
            .map(u32::try_from)
            .transpose()
            .map_err(|e| corrupt(format!("page number: {}", e)))?;

        Ok(TextAnchor {
            id: self.id.clone(),
            document_id: self.document_id.clone(),
            page_number,
            selected_text: self.selected_text.clone(),
            start_offset: self.start_offset.map(|o| o.max(0) as usize),
            end_offset: self.end_offset.map(|o| o.max(0) as usize),
            bounding_rect,
            annotation_type: AnnotationType::new(self.annotation_type.clone()),
            created_at,
            updated_at,
            payload,
        })
    }
}

fn parse_stored_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("timestamp {:?}: {}", value, e))
}
