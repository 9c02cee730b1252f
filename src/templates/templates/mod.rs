// Plantillas integradas: definición + estrategias de renderizado

mod agreement;
mod deck;
mod financial;
mod letter;
mod memo;
mod report;

use serde_json::Value;
use std::sync::Arc;

use crate::core::{field, text_of};
use crate::generators::layout::{Cell, Table};
use crate::generators::strategy::StrategyTable;
use crate::models::OutputFormat;
use crate::templates::Template;

pub use agreement::AgreementStrategy;
pub use deck::DeckStrategy;
pub use financial::FinancialModelStrategy;
pub use letter::LetterStrategy;
pub use memo::MemoStrategy;
pub use report::ReportStrategy;

/// Catálogo integrado, en el orden en que se registra
pub fn builtin_templates() -> Vec<Template> {
    vec![
        report::definition(),
        memo::definition(),
        agreement::definition(),
        letter::definition(),
        deck::definition(),
        financial::cashflow_definition(),
        financial::proforma_definition(),
    ]
}

pub fn register_strategies(table: &mut StrategyTable) {
    let documents = [OutputFormat::Pdf, OutputFormat::Docx];

    table
        .register(report::TEMPLATE_ID, &documents, Arc::new(ReportStrategy))
        .register(memo::TEMPLATE_ID, &documents, Arc::new(MemoStrategy))
        .register(agreement::TEMPLATE_ID, &documents, Arc::new(AgreementStrategy))
        .register(letter::TEMPLATE_ID, &documents, Arc::new(LetterStrategy))
        .register(
            deck::TEMPLATE_ID,
            &[OutputFormat::Pptx, OutputFormat::Pdf],
            Arc::new(DeckStrategy),
        )
        .register(
            financial::CASHFLOW_ID,
            &[OutputFormat::Xlsx],
            Arc::new(FinancialModelStrategy),
        )
        .register(
            financial::PROFORMA_ID,
            &[OutputFormat::Xlsx],
            Arc::new(FinancialModelStrategy),
        );
}

/// Tabla a partir de `{headers, rows}` o de un arreglo de objetos
pub(crate) fn table_from(value: &Value) -> Option<Table> {
    if let Some(rows) = value.get("rows").and_then(Value::as_array) {
        let headers = value
            .get("headers")
            .and_then(Value::as_array)
            .map(|h| h.iter().map(text_of).collect())
            .unwrap_or_default();
        let rows = rows
            .iter()
            .map(|row| match row {
                Value::Array(cells) => cells.iter().map(Cell::from_json).collect(),
                Value::Object(map) => map.values().map(Cell::from_json).collect(),
                other => vec![Cell::from_json(other)],
            })
            .collect();
        return Some(Table { headers, rows });
    }

    let items = value.as_array()?;
    let first = items.first()?.as_object()?;
    let headers: Vec<String> = first.keys().cloned().collect();
    let rows = items
        .iter()
        .map(|item| {
            headers
                .iter()
                .map(|h| item.get(h).map(Cell::from_json).unwrap_or_else(|| Cell::text("")))
                .collect()
        })
        .collect();
    Some(Table { headers, rows })
}

/// Título de un elemento, probando las claves habituales
pub(crate) fn item_title(value: &Value, fallback: &str) -> String {
    field(value, &["title", "heading", "name"]).unwrap_or_else(|| fallback.to_string())
}
