use serde_json::Value;

use super::{item_title, table_from};
use crate::branding::StyleTokens;
use crate::core::{field, paragraphs, string_list, DocumentResult};
use crate::generators::layout::{Block, Layout, Page, PageKind};
use crate::generators::strategy::{RenderContext, RenderStrategy};
use crate::models::OutputFormat;
use crate::templates::{SectionSpec, Template, TemplateCategory};

pub const TEMPLATE_ID: &str = "report-standard";

pub fn definition() -> Template {
    Template {
        id: TEMPLATE_ID.to_string(),
        name: "Standard Report".to_string(),
        description: "Cover page, executive summary, body sections and appendix".to_string(),
        category: TemplateCategory::Report,
        supported_formats: vec![OutputFormat::Pdf, OutputFormat::Docx],
        default_format: OutputFormat::Pdf,
        sections: vec![
            SectionSpec::optional("cover"),
            SectionSpec::required("executiveSummary"),
            SectionSpec::required("sections"),
            SectionSpec::optional("appendix"),
        ],
        default_styles: StyleTokens::default().with_sizes(11.0, 20.0),
    }
}

/// Portada → resumen ejecutivo → secciones → apéndice
pub struct ReportStrategy;

impl ReportStrategy {
    fn cover(&self, ctx: &RenderContext<'_>, title: &str) -> Page {
        let mut page = Page::new(PageKind::Cover);
        let cover = ctx.section("cover").unwrap_or(&Value::Null);

        let cover_title = field(cover, &["title"]).unwrap_or_else(|| title.to_string());
        page.push(Block::heading(cover_title, 0));
        if let Some(subtitle) = field(cover, &["subtitle"]) {
            page.push(Block::paragraph(subtitle));
        }

        let mut details = Vec::new();
        if let Some(author) = field(cover, &["author", "preparedBy"]) {
            details.push(("Prepared by", author));
        }
        if let Some(date) = field(cover, &["date"]) {
            details.push(("Date", date));
        }
        if !details.is_empty() {
            page.push(Block::Spacer);
            page.push(Block::field_text(details));
        }
        page
    }

    fn body_section(&self, page: &mut Page, section: &Value, index: usize) {
        page.push(Block::heading(
            item_title(section, &format!("Section {}", index + 1)),
            1,
        ));

        if let Value::String(_) = section {
            for p in paragraphs(section) {
                page.push(Block::Paragraph(p));
            }
            return;
        }

        let body = section
            .get("content")
            .or_else(|| section.get("body"))
            .or_else(|| section.get("paragraphs"))
            .unwrap_or(&Value::Null);
        for p in paragraphs(body) {
            page.push(Block::Paragraph(p));
        }

        let bullets = section.get("bullets").map(string_list).unwrap_or_default();
        if !bullets.is_empty() {
            page.push(Block::Bullets(bullets));
        }

        if let Some(table) = section.get("table").and_then(table_from) {
            page.push(Block::Table(table));
        }
    }
}

impl RenderStrategy for ReportStrategy {
    fn name(&self) -> &'static str {
        "report"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> DocumentResult<Layout> {
        let title = ctx.title();
        let mut layout = Layout::new(title.clone());

        layout.push_page(self.cover(ctx, &title));

        let mut body = Page::new(PageKind::Body);
        body.push(Block::heading("Executive Summary", 1));
        for p in paragraphs(ctx.section("executiveSummary").unwrap_or(&Value::Null)) {
            body.push(Block::Paragraph(p));
        }

        match ctx.section("sections") {
            Some(Value::Array(sections)) => {
                for (i, section) in sections.iter().enumerate() {
                    self.body_section(&mut body, section, i);
                }
            }
            Some(Value::Object(map)) => {
                for (i, (name, section)) in map.iter().enumerate() {
                    let mut section = section.clone();
                    if section.get("title").is_none() {
                        section = match section {
                            Value::Object(mut inner) => {
                                inner.insert("title".into(), Value::String(name.clone()));
                                Value::Object(inner)
                            }
                            other => serde_json::json!({"title": name, "content": other}),
                        };
                    }
                    self.body_section(&mut body, &section, i);
                }
            }
            Some(other) => self.body_section(&mut body, other, 0),
            None => {}
        }
        layout.push_page(body);

        if let Some(appendix) = ctx.section("appendix") {
            let mut page = Page::new(PageKind::Body);
            page.push(Block::heading("Appendix", 1));
            match appendix {
                Value::Array(items) if items.iter().all(Value::is_object) => {
                    for (i, item) in items.iter().enumerate() {
                        self.body_section(&mut page, item, i);
                    }
                }
                other => {
                    if let Some(table) = table_from(other) {
                        page.push(Block::Table(table));
                    } else {
                        for p in paragraphs(other) {
                            page.push(Block::Paragraph(p));
                        }
                    }
                }
            }
            layout.push_page(page);
        }

        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branding::{merge_styles, SYSTEM_STYLES};
    use serde_json::json;

    fn render(content: Value) -> Layout {
        let template = definition();
        let styles = merge_styles(&[&SYSTEM_STYLES]);
        let ctx = RenderContext {
            template: &template,
            format: OutputFormat::Pdf,
            content: &content,
            styles: &styles,
        };
        ReportStrategy.render(&ctx).unwrap()
    }

    #[test]
    fn sections_follow_template_order() {
        let layout = render(json!({
            "title": "Q3 Review",
            "cover": {"subtitle": "Internal", "author": "Finance"},
            "executiveSummary": "Revenue grew.\n\nSpending fell.",
            "sections": [
                {"title": "Sales", "content": "Strong quarter.", "bullets": ["EMEA", "APAC"]},
                {"title": "Costs", "table": {"headers": ["Item", "Amount"], "rows": [["Rent", "$1,000"]]}}
            ],
            "appendix": "Raw data available on request."
        }));

        assert_eq!(layout.pages.len(), 3);
        assert_eq!(layout.pages[0].kind, PageKind::Cover);

        let text = layout.all_text();
        let summary = text.find("Executive Summary").unwrap();
        let sales = text.find("Sales").unwrap();
        let costs = text.find("Costs").unwrap();
        let appendix = text.find("Appendix").unwrap();
        assert!(summary < sales && sales < costs && costs < appendix);
        assert!(text.contains("Prepared by: Finance"));
        assert!(text.contains("$1,000"));
    }

    #[test]
    fn minimal_content_renders_without_appendix() {
        let layout = render(json!({"executiveSummary": "x", "sections": []}));
        assert_eq!(layout.pages.len(), 2);
        assert_eq!(layout.title, "Standard Report");
    }
}
