use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::layout::{Block, Cell, Layout, Page, PageKind, SlideLayout};
use crate::branding::ResolvedStyles;
use crate::core::{flatten_values, leaf_text, DocumentResult};
use crate::models::OutputFormat;
use crate::templates::Template;

/// Entrada común de todas las estrategias de renderizado
pub struct RenderContext<'a> {
    pub template: &'a Template,
    pub format: OutputFormat,
    pub content: &'a Value,
    pub styles: &'a ResolvedStyles,
}

impl<'a> RenderContext<'a> {
    /// `content.title` si existe; si no, el nombre de la plantilla
    pub fn title(&self) -> String {
        self.content
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.template.name.clone())
    }

    pub fn section(&self, id: &str) -> Option<&'a Value> {
        self.content.get(id).filter(|v| !v.is_null())
    }
}

/// Convierte contenido de una plantilla en operaciones de dibujo
pub trait RenderStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn render(&self, ctx: &RenderContext<'_>) -> DocumentResult<Layout>;
}

/// Volcado genérico clave/valor, sin pérdida de información
pub struct GenericStrategy;

impl RenderStrategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> DocumentResult<Layout> {
        let title = ctx.title();
        let mut layout = Layout::new(title.clone());

        // en hojas de cálculo los números y booleanos conservan su tipo
        let rows: Vec<(String, Cell)> = flatten_values(ctx.content)
            .into_iter()
            .map(|(path, leaf)| {
                let typed = matches!(leaf, Value::Number(_) | Value::Bool(_) | Value::String(_));
                let cell = if typed && ctx.format == OutputFormat::Xlsx {
                    Cell::from_json(leaf)
                } else {
                    Cell::text(leaf_text(leaf))
                };
                (path, cell)
            })
            .collect();

        let kind = match ctx.format {
            OutputFormat::Xlsx => PageKind::Sheet,
            OutputFormat::Pptx => PageKind::Slide(SlideLayout::Content),
            _ => PageKind::Body,
        };
        let mut page = Page::titled(kind, if kind == PageKind::Sheet { "Content".to_string() } else { title });
        page.push(Block::Fields(rows));
        layout.push_page(page);

        Ok(layout)
    }
}

/// Tabla de búsqueda `(plantilla, formato) -> estrategia`
pub struct StrategyTable {
    strategies: HashMap<(String, OutputFormat), Arc<dyn RenderStrategy>>,
    fallback: Arc<dyn RenderStrategy>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyTable {
    pub fn new() -> Self {
        StrategyTable {
            strategies: HashMap::new(),
            fallback: Arc::new(GenericStrategy),
        }
    }

    /// Tabla con las estrategias de todas las plantillas integradas
    pub fn builtin() -> Self {
        let mut table = Self::new();
        crate::templates::templates::register_strategies(&mut table);
        table
    }

    pub fn register(
        &mut self,
        template_id: &str,
        formats: &[OutputFormat],
        strategy: Arc<dyn RenderStrategy>,
    ) -> &mut Self {
        for format in formats {
            self.strategies
                .insert((template_id.to_string(), *format), strategy.clone());
        }
        self
    }

    pub fn resolve(&self, template_id: &str, format: OutputFormat) -> Arc<dyn RenderStrategy> {
        self.strategies
            .get(&(template_id.to_string(), format))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn has_specific(&self, template_id: &str, format: OutputFormat) -> bool {
        self.strategies
            .contains_key(&(template_id.to_string(), format))
    }
}
