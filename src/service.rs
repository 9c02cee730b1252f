//! Entry point for callers: the generation pipeline plus read operations.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::branding::{apply_branding, BrandingResolver};
use crate::core::{sanitize_filename, DocumentError, DocumentResult};
use crate::generators::GeneratorSet;
use crate::metrics;
use crate::models::{
    DocumentPage, DocumentRecord, DocumentStatus, DocumentView, GenerateRequest, GeneratedDocument,
    ListOptions,
};
use crate::storage::{storage_path, DocumentStorage};
use crate::templates::{
    missing_sections, ContentValidation, TemplateCategory, TemplateRegistry, TemplateSummary,
};

const MAX_ID_LEN: usize = 128;

/// Tenant and user ids end up in storage paths, so only path-safe ids are accepted.
fn check_identity(field: &str, value: &str) -> DocumentResult<()> {
    let valid = !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && !value.starts_with('.')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(DocumentError::InvalidRequest(format!("invalid {}: '{}'", field, value)))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Exposes the resolved title to strategies unless the caller sent a structured `title` section.
fn stamp_title(content: &mut Value, title: &str) {
    if let Some(object) = content.as_object_mut() {
        let replace = object
            .get("title")
            .map_or(true, |existing| existing.is_null() || existing.is_string());
        if replace {
            object.insert("title".to_string(), Value::String(title.to_string()));
        }
    }
}

#[derive(Clone)]
pub struct DocumentService {
    registry: Arc<TemplateRegistry>,
    generators: GeneratorSet,
    branding: BrandingResolver,
    storage: DocumentStorage,
}

impl DocumentService {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        generators: GeneratorSet,
        branding: BrandingResolver,
        storage: DocumentStorage,
    ) -> Self {
        DocumentService {
            registry,
            generators,
            branding,
            storage,
        }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &DocumentStorage {
        &self.storage
    }

    /// Renders, stores and describes one document.
    ///
    /// Lookup, format and content checks all run before any branding load,
    /// rendering or storage write.
    pub async fn generate_document(&self, request: GenerateRequest) -> DocumentResult<GeneratedDocument> {
        let template_id = request.template_id.clone();
        let result = self.run_pipeline(request).await;

        if let Err(e) = &result {
            metrics::record_failure(e.kind());
            tracing::warn!(template_id = %template_id, kind = %e.kind(), error = %e, "Document generation failed");
        }
        result
    }

    async fn run_pipeline(&self, request: GenerateRequest) -> DocumentResult<GeneratedDocument> {
        let GenerateRequest {
            tenant_id,
            user_id,
            template_id,
            format,
            mut content,
            title,
            metadata,
        } = request;

        check_identity("tenant id", &tenant_id)?;
        check_identity("user id", &user_id)?;

        let template = self
            .registry
            .get(&template_id)
            .ok_or_else(|| DocumentError::TemplateNotFound(template_id.clone()))?;

        let format = format.unwrap_or(template.default_format);
        if !template.supports(format) {
            return Err(DocumentError::FormatNotSupported {
                template_id,
                format,
                supported: template.supported_formats.clone(),
            });
        }

        let missing = missing_sections(&template, &content);
        if !missing.is_empty() {
            return Err(DocumentError::MissingSections(missing));
        }

        let profile = self.branding.load_branding(&tenant_id).await?;
        let applied = apply_branding(&template.default_styles, &profile);

        let generator = self
            .generators
            .get(format)
            .ok_or_else(|| DocumentError::Generation(format!("no generator registered for {}", format)))?;

        let title = non_blank(title.as_deref())
            .or_else(|| non_blank(content.get("title").and_then(Value::as_str)))
            .unwrap_or_else(|| template.name.clone());
        stamp_title(&mut content, &title);

        let started = Instant::now();
        let render_template = template.clone();
        let buffer = tokio::task::spawn_blocking(move || {
            generator.generate(&render_template, &content, &applied)
        })
        .await
        .map_err(|e| DocumentError::Generation(format!("render task failed: {}", e)))??;
        let elapsed = started.elapsed();
        metrics::observe_render(format, elapsed.as_secs_f64());

        let doc_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let filename = format!("{}.{}", sanitize_filename(&title), format.extension());
        let size_bytes = buffer.bytes.len() as u64;

        let record = DocumentRecord {
            storage_path: storage_path(&tenant_id, created_at, &doc_id, &filename),
            doc_id,
            tenant_id,
            created_by: user_id,
            template_id: template.id.clone(),
            format,
            title,
            filename,
            size_bytes,
            page_count: buffer.page_count,
            status: DocumentStatus::Ready,
            metadata: metadata.unwrap_or_else(|| Value::Object(Default::default())),
            created_at,
        };

        let download_url = self.storage.save_document(&record, buffer.bytes).await?;
        metrics::record_success(&record.template_id, format, size_bytes);

        tracing::info!(
            doc_id = %record.doc_id,
            tenant_id = %record.tenant_id,
            template_id = %record.template_id,
            format = %format,
            size = size_bytes,
            pages = ?record.page_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Document generated"
        );

        Ok(GeneratedDocument {
            doc_id: record.doc_id,
            filename: record.filename,
            format,
            size_bytes,
            page_count: record.page_count,
            download_url,
            generated_at: created_at,
        })
    }

    /// Record plus a freshly signed link; other tenants see not-found.
    pub async fn get_document(&self, doc_id: &str, tenant_id: &str) -> DocumentResult<DocumentView> {
        let record = self.storage.get_document_metadata(doc_id, tenant_id).await?;
        let download_url = self
            .storage
            .get_document_url(doc_id, tenant_id, self.storage.url_ttl())
            .await?;
        Ok(DocumentView {
            record,
            download_url,
        })
    }

    pub async fn list_documents(&self, tenant_id: &str, options: ListOptions) -> DocumentResult<DocumentPage> {
        self.storage.list_documents(tenant_id, options).await
    }

    pub fn get_templates(&self, category: Option<TemplateCategory>) -> Vec<TemplateSummary> {
        self.registry.list(category)
    }

    pub fn validate_content(&self, template_id: &str, content: &Value) -> DocumentResult<ContentValidation> {
        self.registry.validate_content(template_id, content)
    }

    pub async fn find_orphaned_blobs(&self, tenant_id: &str) -> DocumentResult<Vec<String>> {
        self.storage.find_orphaned_blobs(tenant_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_must_be_path_safe() {
        assert!(check_identity("tenant id", "acme-01").is_ok());
        assert!(check_identity("tenant id", "ws_9.eu").is_ok());
        for bad in ["", "..", "../x", "a/b", "a b", ".hidden"] {
            assert!(matches!(
                check_identity("tenant id", bad),
                Err(DocumentError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn structured_title_section_is_left_alone() {
        let mut content = serde_json::json!({"title": {"main": "Q3", "sub": "Draft"}});
        stamp_title(&mut content, "Quarterly Review");
        assert_eq!(content["title"], serde_json::json!({"main": "Q3", "sub": "Draft"}));

        let mut content = serde_json::json!({"title": "old", "body": "x"});
        stamp_title(&mut content, "Quarterly Review");
        assert_eq!(content["title"], "Quarterly Review");

        let mut content = serde_json::json!({"body": "x"});
        stamp_title(&mut content, "Quarterly Review");
        assert_eq!(content["title"], "Quarterly Review");
    }

    #[test]
    fn blank_strings_are_ignored() {
        assert_eq!(non_blank(Some("  Q3  ")), Some("Q3".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
