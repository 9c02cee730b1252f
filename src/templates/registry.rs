use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::template_models::{ContentValidation, Template, TemplateCategory, TemplateSummary};
use crate::core::{DocumentError, DocumentResult};

/// Registro central de todas las plantillas disponibles
///
/// Se construye una sola vez al arrancar y se comparte por referencia.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Arc<Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registro con el catálogo integrado
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for template in super::templates::builtin_templates() {
            // Las definiciones integradas están cubiertas por pruebas; una inválida es un error de programación
            if let Err(e) = registry.register(template) {
                tracing::error!(error = %e, "Skipping invalid built-in template");
            }
        }
        registry
    }

    pub fn register(&mut self, template: Template) -> DocumentResult<()> {
        if template.supported_formats.is_empty() {
            return Err(DocumentError::InvalidRequest(format!(
                "template '{}' declares no supported formats",
                template.id
            )));
        }
        if !template.supports(template.default_format) {
            return Err(DocumentError::InvalidRequest(format!(
                "template '{}' default format '{}' is not in its supported formats",
                template.id, template.default_format
            )));
        }
        if self.templates.contains_key(&template.id) {
            return Err(DocumentError::InvalidRequest(format!(
                "template '{}' is already registered",
                template.id
            )));
        }

        tracing::debug!(template_id = %template.id, "Registered template");
        self.templates
            .insert(template.id.clone(), Arc::new(template));
        Ok(())
    }

    /// Obtiene una plantilla por su ID
    pub fn get(&self, template_id: &str) -> Option<Arc<Template>> {
        self.templates.get(template_id).cloned()
    }

    pub fn exists(&self, template_id: &str) -> bool {
        self.templates.contains_key(template_id)
    }

    /// Lista resúmenes, opcionalmente filtrados por categoría, ordenados por ID
    pub fn list(&self, category: Option<TemplateCategory>) -> Vec<TemplateSummary> {
        let mut summaries: Vec<TemplateSummary> = self
            .templates
            .values()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .map(|t| t.summary())
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.values()
    }

    pub fn validate_content(&self, template_id: &str, content: &Value) -> DocumentResult<ContentValidation> {
        let template = self
            .get(template_id)
            .ok_or_else(|| DocumentError::TemplateNotFound(template_id.to_string()))?;
        Ok(check_content(&template, content))
    }
}

/// Secciones requeridas ausentes en el contenido, en el orden de la plantilla
pub fn missing_sections(template: &Template, content: &Value) -> Vec<String> {
    let object = content.as_object();
    template
        .required_sections()
        .filter(|section| {
            object
                .and_then(|map| map.get(&section.id))
                .map_or(true, Value::is_null)
        })
        .map(|section| section.id.clone())
        .collect()
}

pub fn check_content(template: &Template, content: &Value) -> ContentValidation {
    let missing = missing_sections(template, content);
    if missing.is_empty() {
        ContentValidation {
            valid: true,
            missing,
            error: None,
        }
    } else {
        let error = DocumentError::MissingSections(missing.clone()).to_string();
        ContentValidation {
            valid: false,
            missing,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branding::StyleTokens;
    use crate::models::OutputFormat;
    use crate::templates::SectionSpec;
    use serde_json::json;

    fn template(formats: Vec<OutputFormat>, default_format: OutputFormat) -> Template {
        Template {
            id: "custom".into(),
            name: "Custom".into(),
            description: "Test template".into(),
            category: TemplateCategory::Report,
            supported_formats: formats,
            default_format,
            sections: vec![SectionSpec::required("a"), SectionSpec::required("b"), SectionSpec::optional("c")],
            default_styles: StyleTokens::default(),
        }
    }

    #[test]
    fn every_builtin_template_supports_its_default_format() {
        let registry = TemplateRegistry::builtin();
        assert_eq!(registry.list(None).len(), 7);
        for template in registry.iter() {
            assert!(!template.supported_formats.is_empty(), "{}", template.id);
            assert!(template.supports(template.default_format), "{}", template.id);
        }
    }

    #[test]
    fn register_rejects_inconsistent_formats() {
        let mut registry = TemplateRegistry::new();
        assert!(registry.register(template(vec![], OutputFormat::Pdf)).is_err());
        assert!(registry
            .register(template(vec![OutputFormat::Docx], OutputFormat::Pdf))
            .is_err());
        assert!(registry
            .register(template(vec![OutputFormat::Pdf], OutputFormat::Pdf))
            .is_ok());
        assert!(registry
            .register(template(vec![OutputFormat::Pdf], OutputFormat::Pdf))
            .is_err());
    }

    #[test]
    fn validation_reports_every_missing_section() {
        let mut registry = TemplateRegistry::new();
        registry
            .register(template(vec![OutputFormat::Pdf], OutputFormat::Pdf))
            .unwrap();

        let result = registry.validate_content("custom", &json!({"c": 1})).unwrap();
        assert!(!result.valid);
        assert_eq!(result.missing, vec!["a", "b"]);
        assert_eq!(result.error.as_deref(), Some("missing required sections: a, b"));

        let result = registry.validate_content("custom", &json!({"a": 1, "b": null})).unwrap();
        assert_eq!(result.missing, vec!["b"]);

        let result = registry.validate_content("custom", &json!({"a": "", "b": []})).unwrap();
        assert!(result.valid);
    }

    #[test]
    fn non_object_content_misses_everything() {
        let registry = TemplateRegistry::builtin();
        let result = registry.validate_content("memo-executive", &json!("text")).unwrap();
        assert_eq!(result.missing, vec!["header", "body"]);
    }

    #[test]
    fn unknown_template_is_not_found() {
        let registry = TemplateRegistry::builtin();
        let err = registry.validate_content("nope", &json!({})).unwrap_err();
        assert!(matches!(err, DocumentError::TemplateNotFound(_)));
    }

    #[test]
    fn list_filters_by_category() {
        let registry = TemplateRegistry::builtin();
        let financial = registry.list(Some(TemplateCategory::Financial));
        let ids: Vec<_> = financial.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["model-cashflow", "model-proforma"]);
    }
}
