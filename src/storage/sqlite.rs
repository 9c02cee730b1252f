use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::MetadataStore;
use crate::core::{DocumentError, DocumentResult};
use crate::models::{DocumentPage, DocumentRecord, ListOptions};

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        doc_id       TEXT PRIMARY KEY,
        tenant_id    TEXT NOT NULL,
        created_by   TEXT NOT NULL,
        template_id  TEXT NOT NULL,
        format       TEXT NOT NULL,
        title        TEXT NOT NULL,
        filename     TEXT NOT NULL,
        storage_path TEXT NOT NULL UNIQUE,
        size_bytes   INTEGER NOT NULL,
        page_count   INTEGER,
        status       TEXT NOT NULL,
        metadata     TEXT NOT NULL,
        created_at   TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_documents_tenant_created ON documents (tenant_id, created_at DESC, doc_id DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS branding_profiles (
        tenant_id  TEXT PRIMARY KEY,
        profile    TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
];

pub async fn connect(url: &str, max_connections: u32) -> DocumentResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;
    ensure_schema(&pool).await?;
    tracing::info!(url, "Connected to metadata database");
    Ok(pool)
}

/// Single-connection in-memory database, kept alive for the pool's lifetime.
pub async fn connect_in_memory() -> DocumentResult<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

pub async fn ensure_schema(pool: &SqlitePool) -> DocumentResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Fixed-width timestamps so text ordering matches time ordering.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn corrupt(column: &str, detail: impl std::fmt::Display) -> DocumentError {
    DocumentError::Storage(format!("corrupt {} column: {}", column, detail))
}

fn record_from_row(row: &SqliteRow) -> DocumentResult<DocumentRecord> {
    let format: String = row.try_get("format")?;
    let status: String = row.try_get("status")?;
    let metadata: String = row.try_get("metadata")?;
    let created_at: String = row.try_get("created_at")?;
    let size_bytes: i64 = row.try_get("size_bytes")?;
    let page_count: Option<i64> = row.try_get("page_count")?;

    Ok(DocumentRecord {
        doc_id: row.try_get("doc_id")?,
        tenant_id: row.try_get("tenant_id")?,
        created_by: row.try_get("created_by")?,
        template_id: row.try_get("template_id")?,
        format: format.parse().map_err(|e| corrupt("format", e))?,
        title: row.try_get("title")?,
        filename: row.try_get("filename")?,
        storage_path: row.try_get("storage_path")?,
        size_bytes: size_bytes.max(0) as u64,
        page_count: page_count.map(|n| n as u32),
        status: status.parse().map_err(|e| corrupt("status", e))?,
        metadata: serde_json::from_str(&metadata).map_err(|e| corrupt("metadata", e))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| corrupt("created_at", e))?
            .with_timezone(&Utc),
    })
}

pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteMetadataStore { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn insert(&self, record: &DocumentRecord) -> DocumentResult<()> {
        let metadata = serde_json::to_string(&record.metadata).map_err(DocumentError::storage)?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                doc_id, tenant_id, created_by, template_id, format, title, filename,
                storage_path, size_bytes, page_count, status, metadata, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&record.doc_id)
        .bind(&record.tenant_id)
        .bind(&record.created_by)
        .bind(&record.template_id)
        .bind(record.format.as_str())
        .bind(&record.title)
        .bind(&record.filename)
        .bind(&record.storage_path)
        .bind(record.size_bytes as i64)
        .bind(record.page_count.map(i64::from))
        .bind(record.status.as_str())
        .bind(metadata)
        .bind(timestamp(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, doc_id: &str) -> DocumentResult<Option<DocumentRecord>> {
        let row = sqlx::query("SELECT * FROM documents WHERE doc_id = ?1")
            .bind(doc_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn list(&self, tenant_id: &str, options: ListOptions) -> DocumentResult<DocumentPage> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM documents
            WHERE tenant_id = ?1
            ORDER BY created_at DESC, doc_id DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(tenant_id)
        .bind(options.effective_limit() as i64)
        .bind(options.offset as i64)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        let documents = rows
            .iter()
            .map(record_from_row)
            .collect::<DocumentResult<Vec<_>>>()?;

        Ok(DocumentPage {
            documents,
            total: total.max(0) as u64,
        })
    }

    async fn storage_paths(&self, tenant_id: &str) -> DocumentResult<Vec<String>> {
        let paths: Vec<String> = sqlx::query_scalar("SELECT storage_path FROM documents WHERE tenant_id = ?1")
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(paths)
    }
}
