use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::models::OutputFormat;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("missing required sections: {}", .0.join(", "))]
    MissingSections(Vec<String>),

    #[error("format '{format}' is not supported by template '{template_id}' (supported: {})", join_formats(.supported))]
    FormatNotSupported {
        template_id: String,
        format: OutputFormat,
        supported: Vec<OutputFormat>,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Categoría de error expuesta a los llamadores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Generation,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Generation => write!(f, "generation"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::TemplateNotFound(_) | DocumentError::DocumentNotFound(_) => {
                ErrorKind::NotFound
            }
            DocumentError::MissingSections(_)
            | DocumentError::FormatNotSupported { .. }
            | DocumentError::InvalidRequest(_) => ErrorKind::Validation,
            DocumentError::Generation(_) => ErrorKind::Generation,
            DocumentError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn generation(err: impl fmt::Display) -> Self {
        DocumentError::Generation(err.to_string())
    }

    pub fn storage(err: impl fmt::Display) -> Self {
        DocumentError::Storage(err.to_string())
    }
}

fn join_formats(formats: &[OutputFormat]) -> String {
    formats
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<std::io::Error> for DocumentError {
    fn from(error: std::io::Error) -> Self {
        DocumentError::Storage(error.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for DocumentError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        DocumentError::Generation(error.to_string())
    }
}

impl From<zip::result::ZipError> for DocumentError {
    fn from(error: zip::result::ZipError) -> Self {
        DocumentError::Generation(error.to_string())
    }
}

impl From<sqlx::Error> for DocumentError {
    fn from(error: sqlx::Error) -> Self {
        DocumentError::Storage(error.to_string())
    }
}

pub type DocumentResult<T> = Result<T, DocumentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_lists_every_section() {
        let err = DocumentError::MissingSections(vec!["header".into(), "parties".into()]);
        assert_eq!(err.to_string(), "missing required sections: header, parties");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn format_not_supported_is_a_validation_error() {
        let err = DocumentError::FormatNotSupported {
            template_id: "model-cashflow".into(),
            format: OutputFormat::Pptx,
            supported: vec![OutputFormat::Xlsx, OutputFormat::Pdf],
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("supported: xlsx, pdf"));
    }

    #[test]
    fn not_found_kinds() {
        assert_eq!(DocumentError::TemplateNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(DocumentError::DocumentNotFound("x".into()).kind(), ErrorKind::NotFound);
    }
}
