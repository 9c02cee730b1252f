use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::branding::store::{BrandingStore, MemoryBrandingStore, SqliteBrandingStore};
use crate::branding::BrandingResolver;
use crate::core::{Settings, StorageBackend};
use crate::generators::{FontChain, FormatGenerator, GeneratorSet, PdfRenderer, StrategyTable};
use crate::service::DocumentService;
use crate::storage::{
    sqlite, DocumentStorage, LocalObjectStore, MemoryMetadataStore, MemoryObjectStore, MetadataStore,
    ObjectStore, S3ObjectStore, SqliteMetadataStore, UrlSigner,
};
use crate::templates::TemplateRegistry;

#[derive(Clone)]
pub struct ApiState {
    pub service: DocumentService,
    pub api_token: String,
    /// Set when blobs live on the local filesystem and `/files` serves them.
    pub files: Option<Arc<LocalObjectStore>>,
}

impl ApiState {
    pub fn new(service: DocumentService, api_token: impl Into<String>) -> Self {
        ApiState {
            service,
            api_token: api_token.into(),
            files: None,
        }
    }

    pub fn with_files(mut self, files: Arc<LocalObjectStore>) -> Self {
        self.files = Some(files);
        self
    }

    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let registry = Arc::new(TemplateRegistry::builtin());
        let strategies = Arc::new(StrategyTable::builtin());
        let mut generators = GeneratorSet::standard(strategies.clone());
        if !settings.pdf.font_paths.is_empty() {
            let paths: Vec<PathBuf> = settings.pdf.font_paths.iter().map(PathBuf::from).collect();
            let fonts = FontChain::configured(&paths);
            tracing::info!(fonts = fonts.len(), "PDF fonts configured");
            generators = generators.with(Arc::new(FormatGenerator::new(
                PdfRenderer::new().with_fonts(fonts),
                strategies,
            )));
        }
        let url_ttl = Duration::from_secs(settings.storage.url_ttl_seconds);

        let mut files = None;
        let (objects, metadata, branding): (Arc<dyn ObjectStore>, Arc<dyn MetadataStore>, Arc<dyn BrandingStore>) =
            match settings.storage.backend {
                StorageBackend::Memory => {
                    tracing::warn!("Using in-memory storage, documents are lost on restart");
                    (
                        Arc::new(MemoryObjectStore::new()),
                        Arc::new(MemoryMetadataStore::new()),
                        Arc::new(MemoryBrandingStore::new()),
                    )
                }
                backend => {
                    let pool = sqlite::connect(&settings.database.url, settings.database.max_connections).await?;
                    let objects: Arc<dyn ObjectStore> = if backend == StorageBackend::S3 {
                        Arc::new(
                            S3ObjectStore::from_env(
                                settings.storage.bucket.clone(),
                                settings.storage.endpoint.as_deref(),
                            )
                            .await,
                        )
                    } else {
                        let local = Arc::new(LocalObjectStore::new(
                            settings.storage.local_root.clone(),
                            settings.storage.public_base_url.clone(),
                            UrlSigner::new(&settings.storage.signing_secret),
                        ));
                        files = Some(local.clone());
                        local
                    };
                    (
                        objects,
                        Arc::new(SqliteMetadataStore::new(pool.clone())),
                        Arc::new(SqliteBrandingStore::new(pool)),
                    )
                }
            };

        tracing::info!(
            backend = ?settings.storage.backend,
            templates = registry.list(None).len(),
            "Storage initialised"
        );

        let service = DocumentService::new(
            registry,
            generators,
            BrandingResolver::new(branding),
            DocumentStorage::new(objects, metadata, url_ttl),
        );

        Ok(ApiState {
            service,
            api_token: settings.auth.api_token.clone(),
            files,
        })
    }
}
