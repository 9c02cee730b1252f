//! Generadores de documentos por formato.
//!
//! Cada generador resuelve una estrategia `(plantilla, formato)`, obtiene un
//! [`Layout`] neutral y lo entrega a su renderizador concreto.

pub mod docx;
pub mod excel;
pub mod fonts;
pub mod layout;
pub mod ooxml;
pub mod pdf;
pub mod pptx;
pub mod strategy;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::branding::AppliedBranding;
use crate::core::DocumentResult;
use crate::models::OutputFormat;
use crate::templates::Template;

pub use docx::DocxRenderer;
pub use excel::XlsxRenderer;
pub use fonts::{FontChain, FontProgram};
pub use layout::Layout;
pub use pdf::PdfRenderer;
pub use pptx::PptxRenderer;
pub use strategy::{GenericStrategy, RenderContext, RenderStrategy, StrategyTable};

/// Resultado binario de un generador
#[derive(Debug, Clone)]
pub struct GeneratedBuffer {
    pub bytes: Vec<u8>,
    pub page_count: Option<u32>,
}

/// Motor concreto de un formato: de operaciones de dibujo a bytes
pub trait FormatRenderer: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn render(&self, layout: &Layout, branding: &AppliedBranding) -> DocumentResult<GeneratedBuffer>;
}

/// `generate(template, content, branding) -> {buffer, pageCount?}`
pub trait DocumentGenerator: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn generate(
        &self,
        template: &Template,
        content: &Value,
        branding: &AppliedBranding,
    ) -> DocumentResult<GeneratedBuffer>;
}

/// Generador que combina la tabla de estrategias con un renderizador
pub struct FormatGenerator<R> {
    renderer: R,
    strategies: Arc<StrategyTable>,
}

impl<R: FormatRenderer> FormatGenerator<R> {
    pub fn new(renderer: R, strategies: Arc<StrategyTable>) -> Self {
        FormatGenerator {
            renderer,
            strategies,
        }
    }
}

impl<R: FormatRenderer> DocumentGenerator for FormatGenerator<R> {
    fn format(&self) -> OutputFormat {
        self.renderer.format()
    }

    fn generate(
        &self,
        template: &Template,
        content: &Value,
        branding: &AppliedBranding,
    ) -> DocumentResult<GeneratedBuffer> {
        let format = self.renderer.format();
        let strategy = self.strategies.resolve(&template.id, format);
        tracing::debug!(
            template_id = %template.id,
            format = %format,
            strategy = strategy.name(),
            "Rendering document"
        );

        let ctx = RenderContext {
            template,
            format,
            content,
            styles: &branding.styles,
        };
        let layout = strategy.render(&ctx)?;
        self.renderer.render(&layout, branding)
    }
}

/// Generadores disponibles indexados por formato
#[derive(Clone, Default)]
pub struct GeneratorSet {
    generators: HashMap<OutputFormat, Arc<dyn DocumentGenerator>>,
}

impl GeneratorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, generator: Arc<dyn DocumentGenerator>) -> Self {
        self.generators.insert(generator.format(), generator);
        self
    }

    /// Los cuatro formatos integrados sobre la misma tabla de estrategias
    pub fn standard(strategies: Arc<StrategyTable>) -> Self {
        Self::new()
            .with(Arc::new(FormatGenerator::new(PdfRenderer::new(), strategies.clone())))
            .with(Arc::new(FormatGenerator::new(DocxRenderer, strategies.clone())))
            .with(Arc::new(FormatGenerator::new(XlsxRenderer, strategies.clone())))
            .with(Arc::new(FormatGenerator::new(PptxRenderer, strategies)))
    }

    pub fn get(&self, format: OutputFormat) -> Option<Arc<dyn DocumentGenerator>> {
        self.generators.get(&format).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branding::{apply_branding, BrandingProfile};
    use crate::templates::TemplateRegistry;
    use serde_json::json;

    #[test]
    fn standard_set_covers_every_format() {
        let set = GeneratorSet::standard(Arc::new(StrategyTable::builtin()));
        for format in OutputFormat::ALL {
            assert_eq!(set.get(format).unwrap().format(), format);
        }
    }

    #[test]
    fn unmatched_pair_uses_generic_dump() {
        let registry = TemplateRegistry::builtin();
        let template = registry.get("model-cashflow").unwrap();
        let branding = apply_branding(&template.default_styles, &BrandingProfile::default());
        let generator = FormatGenerator::new(PdfRenderer::new(), Arc::new(StrategyTable::builtin()));

        let content = json!({"assumptions": {"growth": "5%"}, "projections": {"Revenue": [1, 2]}});
        let buffer = generator.generate(&template, &content, &branding).unwrap();
        assert!(buffer.bytes.starts_with(b"%PDF"));
        assert!(buffer.page_count.unwrap() >= 1);
    }
}
