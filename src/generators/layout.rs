//! Operaciones de dibujo neutrales respecto al formato, producidas por las estrategias.
//!
//! Un [`Layout`] es una lista ordenada de páginas; cada renderizador convierte
//! una página en páginas PDF, una sección DOCX, una diapositiva o una hoja.

use crate::core::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideLayout {
    Title,
    Content,
    TwoColumn,
    Chart,
}

impl SlideLayout {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(ref s) if s == "title" => SlideLayout::Title,
            Some(ref s) if s == "twocolumn" || s == "two-column" || s == "two_column" => {
                SlideLayout::TwoColumn
            }
            Some(ref s) if s == "chart" => SlideLayout::Chart,
            _ => SlideLayout::Content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    /// Portada de página completa
    Cover,
    /// Contenido que fluye y puede ocupar varias páginas físicas
    Body,
    Slide(SlideLayout),
    /// Hoja tabular; el título se usa como nombre de hoja
    Sheet,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub text: String,
    pub value: CellValue,
}

impl Cell {
    pub fn from_json(value: &serde_json::Value) -> Self {
        let classified = CellValue::classify(value);
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            _ => classified.display(),
        };
        Cell {
            text,
            value: classified,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Cell {
            value: CellValue::Text(text.clone()),
            text,
        }
    }

    pub fn number(value: f64) -> Self {
        let value = CellValue::Number(value);
        Cell {
            text: value.display(),
            value,
        }
    }

    pub fn with_value(value: CellValue) -> Self {
        Cell {
            text: value.display(),
            value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub title: Option<String>,
    pub series: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub party: String,
    pub name: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { text: String, level: u8 },
    Paragraph(String),
    /// Líneas consecutivas sin espacio entre ellas (bloques de dirección)
    Lines(Vec<String>),
    Bullets(Vec<String>),
    Numbered(Vec<String>),
    /// Pares etiqueta/valor (encabezado de memo, volcado genérico)
    Fields(Vec<(String, Cell)>),
    Table(Table),
    Columns(Vec<Block>, Vec<Block>),
    Chart(ChartData),
    Signature(Signature),
    Rule,
    Spacer,
}

impl Block {
    pub fn heading(text: impl Into<String>, level: u8) -> Self {
        Block::Heading {
            text: text.into(),
            level,
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph(text.into())
    }

    pub fn field_text(pairs: Vec<(&str, String)>) -> Self {
        Block::Fields(
            pairs
                .into_iter()
                .map(|(label, value)| (label.to_string(), Cell::text(value)))
                .collect(),
        )
    }

    /// Todo el texto del bloque en orden de lectura
    pub fn texts(&self) -> Vec<String> {
        match self {
            Block::Heading { text, .. } | Block::Paragraph(text) => vec![text.clone()],
            Block::Lines(items) | Block::Bullets(items) | Block::Numbered(items) => items.clone(),
            Block::Fields(pairs) => pairs
                .iter()
                .map(|(label, cell)| format!("{}: {}", label, cell.text))
                .collect(),
            Block::Table(table) => {
                let mut out = table.headers.clone();
                for row in &table.rows {
                    out.extend(row.iter().map(|c| c.text.clone()));
                }
                out
            }
            Block::Columns(left, right) => left
                .iter()
                .chain(right.iter())
                .flat_map(|b| b.texts())
                .collect(),
            Block::Chart(chart) => chart
                .title
                .iter()
                .cloned()
                .chain(chart.series.iter().map(|(label, _)| label.clone()))
                .collect(),
            Block::Signature(sig) => std::iter::once(sig.party.clone())
                .chain(sig.name.iter().cloned())
                .chain(sig.title.iter().cloned())
                .chain(sig.date.iter().cloned())
                .collect(),
            Block::Rule | Block::Spacer => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub kind: PageKind,
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn new(kind: PageKind) -> Self {
        Page {
            kind,
            title: None,
            blocks: Vec::new(),
        }
    }

    pub fn titled(kind: PageKind, title: impl Into<String>) -> Self {
        Page {
            kind,
            title: Some(title.into()),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.title.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub title: String,
    pub pages: Vec<Page>,
}

impl Layout {
    pub fn new(title: impl Into<String>) -> Self {
        Layout {
            title: title.into(),
            pages: Vec::new(),
        }
    }

    pub fn push_page(&mut self, page: Page) {
        if !page.is_empty() {
            self.pages.push(page);
        }
    }

    pub fn all_text(&self) -> String {
        let mut out = vec![self.title.clone()];
        for page in &self.pages {
            out.extend(page.title.iter().cloned());
            for block in &page.blocks {
                out.extend(block.texts());
            }
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slide_layout_parsing_defaults_to_content() {
        assert_eq!(SlideLayout::parse(Some("twoColumn")), SlideLayout::TwoColumn);
        assert_eq!(SlideLayout::parse(Some("chart")), SlideLayout::Chart);
        assert_eq!(SlideLayout::parse(Some("weird")), SlideLayout::Content);
        assert_eq!(SlideLayout::parse(None), SlideLayout::Content);
    }

    #[test]
    fn cell_keeps_original_text() {
        let cell = Cell::from_json(&json!("$1,234.56"));
        assert_eq!(cell.text, "$1,234.56");
        assert_eq!(cell.value, CellValue::Currency(1234.56));

        let cell = Cell::from_json(&json!(7));
        assert_eq!(cell.text, "7");
    }

    #[test]
    fn empty_pages_are_skipped() {
        let mut layout = Layout::new("Doc");
        layout.push_page(Page::new(PageKind::Body));
        assert!(layout.pages.is_empty());
    }
}
