use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OutputFormat;

/// Solicitud de generación que recibe el servicio de documentos
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub tenant_id: String,
    pub user_id: String,
    pub template_id: String,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    pub content: serde_json::Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Descriptor devuelto tras generar y almacenar un documento
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDocument {
    pub doc_id: String,
    pub filename: String,
    pub format: OutputFormat,
    pub size_bytes: u64,
    pub page_count: Option<u32>,
    pub download_url: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Blob y metadatos escritos; el único estado que se persiste
    Ready,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Ready => "ready",
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(DocumentStatus::Ready),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

/// Registro persistente de un documento generado (escritura única)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub doc_id: String,
    pub tenant_id: String,
    pub created_by: String,
    pub template_id: String,
    pub format: OutputFormat,
    pub title: String,
    pub filename: String,
    pub storage_path: String,
    pub size_bytes: u64,
    pub page_count: Option<u32>,
    pub status: DocumentStatus,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Metadatos de un documento junto con un enlace de descarga recién firmado
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    #[serde(flatten)]
    pub record: DocumentRecord,
    pub download_url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListOptions {
    #[serde(default = "ListOptions::default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl ListOptions {
    pub const MAX_LIMIT: u32 = 100;

    fn default_limit() -> u32 {
        20
    }

    pub fn new(limit: u32, offset: u32) -> Self {
        ListOptions { limit, offset }
    }

    /// Límite acotado a `1..=MAX_LIMIT`
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        ListOptions {
            limit: Self::default_limit(),
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPage {
    pub documents: Vec<DocumentRecord>,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_limit_is_clamped() {
        assert_eq!(ListOptions::new(0, 0).effective_limit(), 1);
        assert_eq!(ListOptions::new(500, 0).effective_limit(), 100);
        assert_eq!(ListOptions::default().effective_limit(), 20);
    }

    #[test]
    fn request_deserializes_camel_case() {
        let request: GenerateRequest = serde_json::from_value(serde_json::json!({
            "tenantId": "t1",
            "userId": "u1",
            "templateId": "memo-executive",
            "format": "pdf",
            "content": {"body": "x"}
        }))
        .unwrap();
        assert_eq!(request.format, Some(OutputFormat::Pdf));
        assert!(request.title.is_none());
    }
}
