use serde_json::Value;

use crate::branding::StyleTokens;
use crate::core::{field, string_list, text_of, DocumentResult};
use crate::generators::layout::{Block, Layout, Page, PageKind, Signature};
use crate::generators::strategy::{RenderContext, RenderStrategy};
use crate::models::OutputFormat;
use crate::templates::{SectionSpec, Template, TemplateCategory};

pub const TEMPLATE_ID: &str = "agreement-standard";

pub fn definition() -> Template {
    Template {
        id: TEMPLATE_ID.to_string(),
        name: "Standard Agreement".to_string(),
        description: "Parties, recitals, numbered terms and signature blocks".to_string(),
        category: TemplateCategory::Contract,
        supported_formats: vec![OutputFormat::Pdf, OutputFormat::Docx],
        default_format: OutputFormat::Pdf,
        sections: vec![
            SectionSpec::required("header"),
            SectionSpec::required("parties"),
            SectionSpec::optional("recitals"),
            SectionSpec::required("terms"),
            SectionSpec::required("signatures"),
        ],
        default_styles: StyleTokens::default().with_font("Times New Roman"),
    }
}

/// Encabezado → partes → considerandos → cláusulas numeradas → firmas
pub struct AgreementStrategy;

fn party_line(party: &Value) -> String {
    match party {
        Value::Object(_) => {
            let name = field(party, &["name", "legalName"]).unwrap_or_default();
            let mut line = name;
            if let Some(role) = field(party, &["role"]) {
                line = format!("{} (\"{}\")", line, role);
            }
            if let Some(address) = field(party, &["address"]) {
                line = format!("{}, {}", line, address);
            }
            line
        }
        other => text_of(other),
    }
}

fn term_text(term: &Value) -> String {
    match term {
        Value::Object(_) => {
            let body = field(term, &["text", "content", "body"]).unwrap_or_default();
            match field(term, &["title", "heading"]) {
                Some(title) if body.is_empty() => title,
                Some(title) => format!("{}. {}", title, body),
                None => body,
            }
        }
        other => text_of(other),
    }
}

fn signature(value: &Value, index: usize) -> Signature {
    match value {
        Value::Object(_) => Signature {
            party: field(value, &["party"]).unwrap_or_else(|| format!("Party {}", index + 1)),
            name: field(value, &["name"]),
            title: field(value, &["title"]),
            date: field(value, &["date"]),
        },
        other => Signature {
            party: text_of(other),
            name: None,
            title: None,
            date: None,
        },
    }
}

fn items(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
        None => Vec::new(),
    }
}

impl RenderStrategy for AgreementStrategy {
    fn name(&self) -> &'static str {
        "agreement"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> DocumentResult<Layout> {
        let header = ctx.section("header").unwrap_or(&Value::Null);
        let title = field(header, &["title"]).unwrap_or_else(|| ctx.title());
        let mut layout = Layout::new(ctx.title());
        let mut page = Page::new(PageKind::Body);

        page.push(Block::heading(title.to_uppercase(), 0));
        let mut details = Vec::new();
        if let Some(date) = field(header, &["effectiveDate", "date"]) {
            details.push(("Effective Date", date));
        }
        if let Some(number) = field(header, &["agreementNumber", "reference"]) {
            details.push(("Reference", number));
        }
        if !details.is_empty() {
            page.push(Block::field_text(details));
        }

        page.push(Block::heading("Parties", 2));
        let parties: Vec<String> = items(ctx.section("parties"))
            .into_iter()
            .map(party_line)
            .filter(|p| !p.is_empty())
            .collect();
        page.push(Block::Lines(parties));

        if let Some(recitals) = ctx.section("recitals") {
            page.push(Block::heading("Recitals", 2));
            for recital in string_list(recitals) {
                page.push(Block::Paragraph(recital));
            }
        }

        page.push(Block::heading("Terms", 2));
        let terms: Vec<String> = items(ctx.section("terms"))
            .into_iter()
            .map(term_text)
            .filter(|t| !t.is_empty())
            .collect();
        page.push(Block::Numbered(terms));

        page.push(Block::paragraph(
            "IN WITNESS WHEREOF, the parties have executed this agreement as of the date first written above.",
        ));
        for (i, sig) in items(ctx.section("signatures")).into_iter().enumerate() {
            page.push(Block::Signature(signature(sig, i)));
        }

        layout.push_page(page);
        Ok(layout)
    }
}
