use serde_json::Value;

use crate::branding::StyleTokens;
use crate::core::{field, paragraphs, string_list, text_of, CellValue, DocumentError, DocumentResult};
use crate::generators::layout::{Block, ChartData, Layout, Page, PageKind, SlideLayout};
use crate::generators::strategy::{RenderContext, RenderStrategy};
use crate::models::OutputFormat;
use crate::templates::{SectionSpec, Template, TemplateCategory};

pub const TEMPLATE_ID: &str = "deck-standard";

pub fn definition() -> Template {
    Template {
        id: TEMPLATE_ID.to_string(),
        name: "Standard Deck".to_string(),
        description: "Slide deck with title, content, two-column and chart layouts".to_string(),
        category: TemplateCategory::Presentation,
        supported_formats: vec![OutputFormat::Pptx, OutputFormat::Pdf],
        default_format: OutputFormat::Pptx,
        sections: vec![SectionSpec::required("slides")],
        default_styles: StyleTokens::default().with_sizes(18.0, 32.0),
    }
}

/// Una diapositiva por elemento de `slides`, en orden
pub struct DeckStrategy;

fn chart_value(label: &str, value: &Value) -> DocumentResult<f64> {
    CellValue::classify(value).as_number().ok_or_else(|| {
        DocumentError::Generation(format!(
            "chart value for '{}' is not numeric: {}",
            label,
            text_of(value)
        ))
    })
}

/// Acepta `{data: [{label, value}]}`, `{labels, values}` o `{series: {label: value}}`.
fn chart_data(chart: &Value) -> DocumentResult<ChartData> {
    let title = field(chart, &["title"]);
    let mut series = Vec::new();

    if let Some(points) = chart.get("data").and_then(Value::as_array) {
        for (i, point) in points.iter().enumerate() {
            let label = field(point, &["label", "name"]).unwrap_or_else(|| format!("{}", i + 1));
            let value = point.get("value").unwrap_or(point);
            let number = chart_value(&label, value)?;
            series.push((label, number));
        }
    } else if let (Some(labels), Some(values)) = (
        chart.get("labels").and_then(Value::as_array),
        chart.get("values").and_then(Value::as_array),
    ) {
        if labels.len() != values.len() {
            return Err(DocumentError::Generation(format!(
                "chart has {} labels but {} values",
                labels.len(),
                values.len()
            )));
        }
        for (label, value) in labels.iter().zip(values) {
            let label = text_of(label);
            let number = chart_value(&label, value)?;
            series.push((label, number));
        }
    } else if let Some(map) = chart.get("series").and_then(Value::as_object) {
        for (label, value) in map {
            series.push((label.clone(), chart_value(label, value)?));
        }
    }

    Ok(ChartData { title, series })
}

fn column(value: &Value) -> Vec<Block> {
    match value {
        Value::Array(_) => vec![Block::Bullets(string_list(value))],
        Value::Object(_) => {
            let mut blocks = Vec::new();
            if let Some(heading) = field(value, &["title", "heading"]) {
                blocks.push(Block::heading(heading, 3));
            }
            if let Some(bullets) = value.get("bullets") {
                blocks.push(Block::Bullets(string_list(bullets)));
            }
            if let Some(body) = value.get("content").or_else(|| value.get("body")) {
                blocks.extend(paragraphs(body).into_iter().map(Block::Paragraph));
            }
            blocks
        }
        other => paragraphs(other).into_iter().map(Block::Paragraph).collect(),
    }
}

fn slide(value: &Value, index: usize) -> DocumentResult<Page> {
    let layout = SlideLayout::parse(value.get("layout").and_then(Value::as_str));
    let title = field(value, &["title", "heading"]).unwrap_or_else(|| format!("Slide {}", index + 1));
    let mut page = Page::titled(PageKind::Slide(layout), title);

    match layout {
        SlideLayout::Title => {
            if let Some(subtitle) = field(value, &["subtitle"]) {
                page.push(Block::Paragraph(subtitle));
            }
        }
        SlideLayout::TwoColumn => {
            let left = value.get("left").map(column).unwrap_or_default();
            let right = value.get("right").map(column).unwrap_or_default();
            page.push(Block::Columns(left, right));
        }
        SlideLayout::Chart => {
            let chart = value.get("chart").unwrap_or(value);
            page.push(Block::Chart(chart_data(chart)?));
        }
        SlideLayout::Content => {
            if let Some(body) = value.get("content").or_else(|| value.get("body")) {
                for p in paragraphs(body) {
                    page.push(Block::Paragraph(p));
                }
            }
            if let Some(bullets) = value.get("bullets") {
                page.push(Block::Bullets(string_list(bullets)));
            }
        }
    }

    Ok(page)
}

impl RenderStrategy for DeckStrategy {
    fn name(&self) -> &'static str {
        "deck"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> DocumentResult<Layout> {
        let mut layout = Layout::new(ctx.title());

        let slides: Vec<&Value> = match ctx.section("slides") {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(other) => vec![other],
            None => Vec::new(),
        };

        if slides.is_empty() {
            let mut cover = Page::titled(PageKind::Slide(SlideLayout::Title), ctx.title());
            cover.push(Block::Spacer);
            layout.push_page(cover);
        }

        for (i, value) in slides.into_iter().enumerate() {
            layout.push_page(slide(value, i)?);
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branding::{merge_styles, SYSTEM_STYLES};
    use serde_json::json;

    fn render(content: Value) -> DocumentResult<Layout> {
        let template = definition();
        let styles = merge_styles(&[&SYSTEM_STYLES]);
        let ctx = RenderContext {
            template: &template,
            format: OutputFormat::Pptx,
            content: &content,
            styles: &styles,
        };
        DeckStrategy.render(&ctx)
    }

    #[test]
    fn each_slide_keeps_its_layout() {
        let layout = render(json!({"slides": [
            {"layout": "title", "title": "Kickoff", "subtitle": "2026"},
            {"title": "Agenda", "bullets": ["Intro", "Plan"]},
            {"layout": "twoColumn", "title": "Compare", "left": ["A"], "right": ["B"]},
            {"layout": "chart", "title": "Sales", "chart": {"labels": ["Q1", "Q2"], "values": [10, "$20"]}}
        ]}))
        .unwrap();

        let kinds: Vec<_> = layout.pages.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PageKind::Slide(SlideLayout::Title),
                PageKind::Slide(SlideLayout::Content),
                PageKind::Slide(SlideLayout::TwoColumn),
                PageKind::Slide(SlideLayout::Chart),
            ]
        );
        assert_eq!(
            layout.pages[3].blocks[0],
            Block::Chart(ChartData {
                title: None,
                series: vec![("Q1".into(), 10.0), ("Q2".into(), 20.0)],
            })
        );
    }

    #[test]
    fn non_numeric_chart_value_is_a_generation_error() {
        let err = render(json!({"slides": [
            {"layout": "chart", "chart": {"data": [{"label": "Q1", "value": "lots"}]}}
        ]}))
        .unwrap_err();
        assert!(matches!(err, DocumentError::Generation(_)));
    }

    #[test]
    fn chart_labels_without_values_are_rejected() {
        let err = render(json!({"slides": [
            {"layout": "chart", "chart": {"labels": ["Q1", "Q2", "Q3"], "values": [10, 20]}}
        ]}))
        .unwrap_err();
        match err {
            DocumentError::Generation(message) => assert!(message.contains("3 labels but 2 values")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn empty_deck_still_has_a_title_slide() {
        let layout = render(json!({"slides": []})).unwrap();
        assert_eq!(layout.pages.len(), 1);
    }
}
