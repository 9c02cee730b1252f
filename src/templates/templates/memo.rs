use serde_json::Value;

use crate::branding::StyleTokens;
use crate::core::{field, paragraphs, string_list, DocumentResult};
use crate::generators::layout::{Block, Layout, Page, PageKind};
use crate::generators::strategy::{RenderContext, RenderStrategy};
use crate::models::OutputFormat;
use crate::templates::{SectionSpec, Template, TemplateCategory};

pub const TEMPLATE_ID: &str = "memo-executive";

pub fn definition() -> Template {
    Template {
        id: TEMPLATE_ID.to_string(),
        name: "Executive Memo".to_string(),
        description: "TO/FROM/DATE/RE header, body and optional recommendation".to_string(),
        category: TemplateCategory::Memo,
        supported_formats: vec![OutputFormat::Pdf, OutputFormat::Docx],
        default_format: OutputFormat::Pdf,
        sections: vec![
            SectionSpec::required("header"),
            SectionSpec::required("body"),
            SectionSpec::optional("recommendation"),
        ],
        default_styles: StyleTokens::default(),
    }
}

pub struct MemoStrategy;

impl RenderStrategy for MemoStrategy {
    fn name(&self) -> &'static str {
        "memo"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> DocumentResult<Layout> {
        let title = ctx.title();
        let mut layout = Layout::new(title.clone());
        let mut page = Page::titled(PageKind::Body, "MEMORANDUM");

        let header = ctx.section("header").unwrap_or(&Value::Null);
        let mut fields = Vec::new();
        for (label, keys) in [
            ("TO", &["to"][..]),
            ("FROM", &["from"][..]),
            ("CC", &["cc"][..]),
            ("DATE", &["date"][..]),
        ] {
            if let Some(value) = field(header, keys) {
                fields.push((label, value));
            }
        }
        let subject = field(header, &["re", "subject", "regarding"]).unwrap_or(title);
        fields.push(("RE", subject));

        page.push(Block::field_text(fields));
        page.push(Block::Rule);

        for p in paragraphs(ctx.section("body").unwrap_or(&Value::Null)) {
            page.push(Block::Paragraph(p));
        }

        if let Some(recommendation) = ctx.section("recommendation") {
            page.push(Block::heading("Recommendation", 2));
            if recommendation.is_array() {
                page.push(Block::Bullets(string_list(recommendation)));
            } else {
                for p in paragraphs(recommendation) {
                    page.push(Block::Paragraph(p));
                }
            }
        }

        layout.push_page(page);
        Ok(layout)
    }
}
