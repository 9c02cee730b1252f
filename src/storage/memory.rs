use async_trait::async_trait;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use super::{MetadataStore, ObjectStore};
use crate::core::{DocumentError, DocumentResult};
use crate::models::{DocumentPage, DocumentRecord, ListOptions};

/// In-process blob store. Counts writes so callers can assert side effects.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
    writes: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> DocumentResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.objects
            .write()
            .await
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn get(&self, key: &str) -> DocumentResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| DocumentError::DocumentNotFound(key.to_string()))
    }

    async fn presign(&self, key: &str, ttl: Duration) -> DocumentResult<String> {
        let expires = chrono::Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(format!("memory://{}?expires={}", key, expires))
    }

    async fn delete(&self, key: &str) -> DocumentResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> DocumentResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[derive(Default)]
pub struct MemoryMetadataStore {
    records: RwLock<HashMap<String, DocumentRecord>>,
    writes: AtomicUsize,
    fail_inserts: AtomicBool,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose inserts always fail.
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail_inserts.store(true, Ordering::SeqCst);
        store
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: &DocumentRecord) -> DocumentResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(DocumentError::Storage("metadata store unavailable".into()));
        }

        let mut records = self.records.write().await;
        if records.contains_key(&record.doc_id) {
            return Err(DocumentError::Storage(format!(
                "document {} already exists",
                record.doc_id
            )));
        }
        records.insert(record.doc_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, doc_id: &str) -> DocumentResult<Option<DocumentRecord>> {
        Ok(self.records.read().await.get(doc_id).cloned())
    }

    async fn list(&self, tenant_id: &str, options: ListOptions) -> DocumentResult<DocumentPage> {
        let records = self.records.read().await;
        let mut matching: Vec<&DocumentRecord> =
            records.values().filter(|r| r.tenant_id == tenant_id).collect();
        matching.sort_by_key(|r| Reverse((r.created_at, r.doc_id.clone())));

        let total = matching.len() as u64;
        let documents = matching
            .into_iter()
            .skip(options.offset as usize)
            .take(options.effective_limit() as usize)
            .cloned()
            .collect();

        Ok(DocumentPage { documents, total })
    }

    async fn storage_paths(&self, tenant_id: &str) -> DocumentResult<Vec<String>> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| r.storage_path.clone())
            .collect())
    }
}
