//! Blob and metadata persistence for generated documents.
//!
//! A document becomes visible only after both writes succeed: the blob goes
//! to the [`ObjectStore`] first, then the record to the [`MetadataStore`].

pub mod local;
pub mod memory;
pub mod s3;
pub mod signing;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{DocumentError, DocumentResult};
use crate::models::{DocumentPage, DocumentRecord, ListOptions};

pub use local::LocalObjectStore;
pub use memory::{MemoryMetadataStore, MemoryObjectStore};
pub use s3::S3ObjectStore;
pub use signing::UrlSigner;
pub use sqlite::SqliteMetadataStore;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> DocumentResult<()>;

    async fn get(&self, key: &str) -> DocumentResult<Vec<u8>>;

    /// Time-limited download link for `key`.
    async fn presign(&self, key: &str, ttl: Duration) -> DocumentResult<String>;

    async fn delete(&self, key: &str) -> DocumentResult<()>;

    async fn list(&self, prefix: &str) -> DocumentResult<Vec<String>>;
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Inserts a new record. Records are write-once; a duplicate `doc_id` is an error.
    async fn insert(&self, record: &DocumentRecord) -> DocumentResult<()>;

    async fn get(&self, doc_id: &str) -> DocumentResult<Option<DocumentRecord>>;

    /// Tenant-scoped page, newest first (`created_at` desc, then `doc_id` desc).
    async fn list(&self, tenant_id: &str, options: ListOptions) -> DocumentResult<DocumentPage>;

    async fn storage_paths(&self, tenant_id: &str) -> DocumentResult<Vec<String>>;
}

/// `documents/{tenant}/{YYYY}/{MM}/{docId}/{filename}`
pub fn storage_path(tenant_id: &str, created_at: DateTime<Utc>, doc_id: &str, filename: &str) -> String {
    format!(
        "documents/{}/{}/{}/{}",
        tenant_id,
        created_at.format("%Y/%m"),
        doc_id,
        filename
    )
}

pub fn tenant_prefix(tenant_id: &str) -> String {
    format!("documents/{}/", tenant_id)
}

#[derive(Clone)]
pub struct DocumentStorage {
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<dyn MetadataStore>,
    url_ttl: Duration,
}

impl DocumentStorage {
    pub fn new(objects: Arc<dyn ObjectStore>, metadata: Arc<dyn MetadataStore>, url_ttl: Duration) -> Self {
        DocumentStorage {
            objects,
            metadata,
            url_ttl,
        }
    }

    pub fn url_ttl(&self) -> Duration {
        self.url_ttl
    }

    /// Writes the blob, then the record, then returns a signed download URL.
    ///
    /// If the record write fails the blob is deleted once, best effort, and
    /// the original failure is returned as a storage error.
    pub async fn save_document(&self, record: &DocumentRecord, bytes: Vec<u8>) -> DocumentResult<String> {
        let path = record.storage_path.as_str();

        self.objects
            .put(path, bytes, record.format.content_type())
            .await?;

        if let Err(e) = self.metadata.insert(record).await {
            tracing::warn!(
                doc_id = %record.doc_id,
                path,
                error = %e,
                "Metadata write failed, removing blob"
            );
            if let Err(cleanup) = self.objects.delete(path).await {
                tracing::error!(
                    doc_id = %record.doc_id,
                    path,
                    error = %cleanup,
                    "Compensating delete failed, blob is orphaned"
                );
            }
            return Err(match e {
                DocumentError::Storage(_) => e,
                other => DocumentError::Storage(other.to_string()),
            });
        }

        tracing::info!(
            doc_id = %record.doc_id,
            tenant_id = %record.tenant_id,
            size = record.size_bytes,
            path,
            "Document stored"
        );

        self.objects.presign(path, self.url_ttl).await
    }

    /// Record for `doc_id`, visible only to the tenant that owns it.
    pub async fn get_document_metadata(&self, doc_id: &str, tenant_id: &str) -> DocumentResult<DocumentRecord> {
        match self.metadata.get(doc_id).await? {
            Some(record) if record.tenant_id == tenant_id => Ok(record),
            Some(_) => {
                tracing::debug!(doc_id, tenant_id, "Cross-tenant lookup rejected");
                Err(DocumentError::DocumentNotFound(doc_id.to_string()))
            }
            None => Err(DocumentError::DocumentNotFound(doc_id.to_string())),
        }
    }

    pub async fn get_document_url(&self, doc_id: &str, tenant_id: &str, ttl: Duration) -> DocumentResult<String> {
        let record = self.get_document_metadata(doc_id, tenant_id).await?;
        self.objects.presign(&record.storage_path, ttl).await
    }

    pub async fn list_documents(&self, tenant_id: &str, options: ListOptions) -> DocumentResult<DocumentPage> {
        self.metadata.list(tenant_id, options).await
    }

    /// Blob keys under the tenant prefix that no record points at.
    pub async fn find_orphaned_blobs(&self, tenant_id: &str) -> DocumentResult<Vec<String>> {
        let known: HashSet<String> = self
            .metadata
            .storage_paths(tenant_id)
            .await?
            .into_iter()
            .collect();

        let mut orphans: Vec<String> = self
            .objects
            .list(&tenant_prefix(tenant_id))
            .await?
            .into_iter()
            .filter(|key| !known.contains(key))
            .collect();
        orphans.sort();

        if !orphans.is_empty() {
            tracing::warn!(tenant_id, count = orphans.len(), "Found orphaned blobs");
        }
        Ok(orphans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentStatus, OutputFormat};
    use chrono::TimeZone;

    fn record(doc_id: &str, tenant_id: &str) -> DocumentRecord {
        let created_at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        DocumentRecord {
            doc_id: doc_id.into(),
            tenant_id: tenant_id.into(),
            created_by: "u1".into(),
            template_id: "memo-executive".into(),
            format: OutputFormat::Pdf,
            title: "Memo".into(),
            filename: "Memo.pdf".into(),
            storage_path: storage_path(tenant_id, created_at, doc_id, "Memo.pdf"),
            size_bytes: 3,
            page_count: Some(1),
            status: DocumentStatus::Ready,
            metadata: serde_json::json!({}),
            created_at,
        }
    }

    fn storage(objects: Arc<MemoryObjectStore>, metadata: Arc<MemoryMetadataStore>) -> DocumentStorage {
        DocumentStorage::new(objects, metadata, Duration::from_secs(60))
    }

    #[test]
    fn storage_path_layout() {
        let created_at = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(
            storage_path("t1", created_at, "abc", "Memo.pdf"),
            "documents/t1/2024/03/abc/Memo.pdf"
        );
    }

    #[tokio::test]
    async fn save_writes_blob_then_record() {
        let objects = Arc::new(MemoryObjectStore::new());
        let metadata = Arc::new(MemoryMetadataStore::new());
        let storage = storage(objects.clone(), metadata.clone());

        let rec = record("d1", "t1");
        let url = storage.save_document(&rec, b"pdf".to_vec()).await.unwrap();

        assert!(url.contains(&rec.storage_path));
        assert!(objects.contains(&rec.storage_path).await);
        assert_eq!(storage.get_document_metadata("d1", "t1").await.unwrap(), rec);
    }

    #[tokio::test]
    async fn failed_record_write_removes_blob() {
        let objects = Arc::new(MemoryObjectStore::new());
        let metadata = Arc::new(MemoryMetadataStore::failing());
        let storage = storage(objects.clone(), metadata);

        let rec = record("d1", "t1");
        let err = storage.save_document(&rec, b"pdf".to_vec()).await.unwrap_err();

        assert!(matches!(err, DocumentError::Storage(_)));
        assert!(!objects.contains(&rec.storage_path).await);
        assert_eq!(objects.write_count(), 1);
    }

    #[tokio::test]
    async fn other_tenant_gets_not_found() {
        let storage = storage(
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MemoryMetadataStore::new()),
        );
        storage.save_document(&record("d1", "t1"), vec![1]).await.unwrap();

        let err = storage.get_document_metadata("d1", "t2").await.unwrap_err();
        assert!(matches!(err, DocumentError::DocumentNotFound(_)));
        let err = storage
            .get_document_url("d1", "t2", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn orphan_sweep_reports_unindexed_blobs() {
        let objects = Arc::new(MemoryObjectStore::new());
        let storage = storage(objects.clone(), Arc::new(MemoryMetadataStore::new()));
        storage.save_document(&record("d1", "t1"), vec![1]).await.unwrap();

        objects
            .put("documents/t1/2024/03/stray/x.pdf", vec![2], "application/pdf")
            .await
            .unwrap();
        objects
            .put("documents/t2/2024/03/other/x.pdf", vec![3], "application/pdf")
            .await
            .unwrap();

        let orphans = storage.find_orphaned_blobs("t1").await.unwrap();
        assert_eq!(orphans, vec!["documents/t1/2024/03/stray/x.pdf".to_string()]);
    }
}
