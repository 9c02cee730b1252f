use serde_json::Value;

use crate::branding::StyleTokens;
use crate::core::{field, paragraphs, string_list, text_of, DocumentResult};
use crate::generators::layout::{Block, Layout, Page, PageKind};
use crate::generators::strategy::{RenderContext, RenderStrategy};
use crate::models::OutputFormat;
use crate::templates::{SectionSpec, Template, TemplateCategory};

pub const TEMPLATE_ID: &str = "letter-formal";

pub fn definition() -> Template {
    Template {
        id: TEMPLATE_ID.to_string(),
        name: "Formal Letter".to_string(),
        description: "Business letter with sender and recipient blocks".to_string(),
        category: TemplateCategory::Letter,
        supported_formats: vec![OutputFormat::Docx, OutputFormat::Pdf],
        default_format: OutputFormat::Docx,
        sections: vec![
            SectionSpec::required("sender"),
            SectionSpec::optional("date"),
            SectionSpec::required("recipient"),
            SectionSpec::optional("salutation"),
            SectionSpec::required("body"),
            SectionSpec::optional("closing"),
        ],
        default_styles: StyleTokens::default().with_font("Georgia").with_sizes(11.0, 14.0),
    }
}

pub struct LetterStrategy;

/// Bloque de dirección: nombre, cargo, organización y líneas de dirección
fn address_block(value: &Value) -> Vec<String> {
    match value {
        Value::Object(_) => {
            let mut lines = Vec::new();
            for key in ["name", "title", "company", "organization"] {
                if let Some(line) = field(value, &[key]) {
                    lines.push(line);
                }
            }
            if let Some(address) = value.get("address") {
                lines.extend(string_list(address));
            }
            for key in ["email", "phone"] {
                if let Some(line) = field(value, &[key]) {
                    lines.push(line);
                }
            }
            lines
        }
        other => string_list(other),
    }
}

impl RenderStrategy for LetterStrategy {
    fn name(&self) -> &'static str {
        "letter"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> DocumentResult<Layout> {
        let mut layout = Layout::new(ctx.title());
        let mut page = Page::new(PageKind::Body);

        let sender = ctx.section("sender").unwrap_or(&Value::Null);
        page.push(Block::Lines(address_block(sender)));
        page.push(Block::Spacer);

        let date = ctx
            .section("date")
            .map(text_of)
            .unwrap_or_else(|| chrono::Utc::now().format("%B %-d, %Y").to_string());
        page.push(Block::paragraph(date));

        let recipient = ctx.section("recipient").unwrap_or(&Value::Null);
        page.push(Block::Lines(address_block(recipient)));
        page.push(Block::Spacer);

        let salutation = ctx.section("salutation").map(text_of).unwrap_or_else(|| {
            match field(recipient, &["name"]) {
                Some(name) => format!("Dear {},", name),
                None => "To whom it may concern,".to_string(),
            }
        });
        page.push(Block::Paragraph(salutation));

        for p in paragraphs(ctx.section("body").unwrap_or(&Value::Null)) {
            page.push(Block::Paragraph(p));
        }

        let closing = ctx.section("closing").map(text_of).unwrap_or_else(|| "Sincerely,".to_string());
        let mut signoff = vec![closing];
        if let Some(name) = field(sender, &["name"]) {
            signoff.push(String::new());
            signoff.push(name);
        }
        page.push(Block::Lines(signoff));

        layout.push_page(page);
        Ok(layout)
    }
}
