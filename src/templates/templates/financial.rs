use serde_json::{Map, Value};

use crate::branding::StyleTokens;
use crate::core::{field, text_of, CellValue, DocumentError, DocumentResult};
use crate::generators::layout::{Block, Cell, Layout, Page, PageKind, Table};
use crate::generators::strategy::{RenderContext, RenderStrategy};
use crate::models::OutputFormat;
use crate::templates::{SectionSpec, Template, TemplateCategory};

pub const CASHFLOW_ID: &str = "model-cashflow";
pub const PROFORMA_ID: &str = "model-proforma";

fn financial_styles() -> StyleTokens {
    StyleTokens::default().with_font("Calibri").with_sizes(11.0, 14.0)
}

pub fn cashflow_definition() -> Template {
    Template {
        id: CASHFLOW_ID.to_string(),
        name: "Cash Flow Model".to_string(),
        description: "Assumptions and cash flow projections as labeled sheets".to_string(),
        category: TemplateCategory::Financial,
        supported_formats: vec![OutputFormat::Xlsx, OutputFormat::Pdf],
        default_format: OutputFormat::Xlsx,
        sections: vec![
            SectionSpec::required("assumptions"),
            SectionSpec::required("projections"),
            SectionSpec::optional("balanceSheet"),
            SectionSpec::optional("cashFlow"),
        ],
        default_styles: financial_styles(),
    }
}

pub fn proforma_definition() -> Template {
    Template {
        id: PROFORMA_ID.to_string(),
        name: "Pro Forma Model".to_string(),
        description: "Pro forma income statement, balance sheet and cash flow".to_string(),
        category: TemplateCategory::Financial,
        supported_formats: vec![OutputFormat::Xlsx, OutputFormat::Pdf],
        default_format: OutputFormat::Xlsx,
        sections: vec![
            SectionSpec::required("assumptions"),
            SectionSpec::required("incomeStatement"),
            SectionSpec::optional("balanceSheet"),
            SectionSpec::optional("cashFlow"),
        ],
        default_styles: financial_styles(),
    }
}

/// Una hoja etiquetada por sección presente
pub struct FinancialModelStrategy;

const SHEETS: [(&str, &str); 5] = [
    ("assumptions", "Assumptions"),
    ("projections", "Projections"),
    ("incomeStatement", "Income Statement"),
    ("balanceSheet", "Balance Sheet"),
    ("cashFlow", "Cash Flow"),
];

struct LineItem {
    label: String,
    values: Vec<Value>,
}

fn line_items_from_map(map: &Map<String, Value>) -> Vec<LineItem> {
    map.iter()
        .map(|(label, value)| LineItem {
            label: label.clone(),
            values: match value {
                Value::Array(values) => values.clone(),
                other => vec![other.clone()],
            },
        })
        .collect()
}

fn line_item(row: &Value, index: usize) -> LineItem {
    let label = field(row, &["label", "name", "item"]).unwrap_or_else(|| format!("Line {}", index + 1));
    let values = match row.get("values") {
        Some(Value::Array(values)) => values.clone(),
        Some(other) => vec![other.clone()],
        None => match row.get("value") {
            Some(value) => vec![value.clone()],
            None => Vec::new(),
        },
    };
    LineItem { label, values }
}

/// Periodos y partidas de una sección de estados financieros
fn statement(value: &Value) -> (Vec<String>, Vec<LineItem>) {
    let periods: Vec<String> = value
        .get("periods")
        .or_else(|| value.get("headers"))
        .and_then(Value::as_array)
        .map(|p| p.iter().map(text_of).collect())
        .unwrap_or_default();

    let items = match value.get("rows").or_else(|| value.get("lineItems")) {
        Some(Value::Array(rows)) => rows.iter().enumerate().map(|(i, r)| line_item(r, i)).collect(),
        Some(Value::Object(map)) => line_items_from_map(map),
        _ => match value {
            Value::Array(rows) => rows.iter().enumerate().map(|(i, r)| line_item(r, i)).collect(),
            Value::Object(map) => line_items_from_map(map),
            other => vec![LineItem {
                label: "Value".to_string(),
                values: vec![other.clone()],
            }],
        },
    };
    (periods, items)
}

/// Suma de una fila; `None` cuando la fila contiene porcentajes
fn row_total(sheet: &str, item: &LineItem, cells: &[Cell]) -> DocumentResult<Option<Cell>> {
    let mut total = 0.0;
    let mut currency = false;
    for cell in cells {
        match &cell.value {
            CellValue::Empty => {}
            CellValue::Percent(_) => return Ok(None),
            CellValue::Currency(n) => {
                currency = true;
                total += n;
            }
            other => match other.as_number() {
                Some(n) => total += n,
                None => {
                    return Err(DocumentError::Generation(format!(
                        "{} line '{}' has a non-numeric value: {}",
                        sheet, item.label, cell.text
                    )))
                }
            },
        }
    }

    let value = if currency {
        CellValue::Currency(total)
    } else {
        CellValue::Number(total)
    };
    Ok(Some(Cell::with_value(value)))
}

fn statement_sheet(title: &str, value: &Value) -> DocumentResult<Page> {
    let (mut periods, items) = statement(value);
    let width = items.iter().map(|i| i.values.len()).max().unwrap_or(0);
    for n in periods.len()..width {
        periods.push(format!("Period {}", n + 1));
    }

    let mut headers = vec!["Line Item".to_string()];
    headers.extend(periods.iter().cloned());
    headers.push("Total".to_string());

    let mut rows = Vec::with_capacity(items.len());
    for item in &items {
        let mut cells: Vec<Cell> = item.values.iter().map(Cell::from_json).collect();
        cells.resize_with(periods.len(), || Cell::with_value(CellValue::Empty));
        let total = row_total(title, item, &cells)?;

        let mut row = vec![Cell::text(item.label.clone())];
        row.extend(cells);
        row.push(total.unwrap_or_else(|| Cell::with_value(CellValue::Empty)));
        rows.push(row);
    }

    let mut page = Page::titled(PageKind::Sheet, title);
    page.push(Block::Table(Table { headers, rows }));
    Ok(page)
}

fn assumptions_sheet(value: &Value) -> Page {
    let rows: Vec<Vec<Cell>> = match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| vec![Cell::text(k.clone()), Cell::from_json(v)])
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let label = field(item, &["label", "name"]).unwrap_or_else(|| format!("Assumption {}", i + 1));
                let value = item.get("value").unwrap_or(item);
                vec![Cell::text(label), Cell::from_json(value)]
            })
            .collect(),
        other => vec![vec![Cell::text("Assumption"), Cell::from_json(other)]],
    };

    let mut page = Page::titled(PageKind::Sheet, "Assumptions");
    page.push(Block::Table(Table {
        headers: vec!["Assumption".to_string(), "Value".to_string()],
        rows,
    }));
    page
}

impl RenderStrategy for FinancialModelStrategy {
    fn name(&self) -> &'static str {
        "financial-model"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> DocumentResult<Layout> {
        let mut layout = Layout::new(ctx.title());

        for (section, title) in SHEETS {
            let Some(value) = ctx.section(section) else {
                continue;
            };
            if !ctx.template.sections.iter().any(|s| s.id == section) {
                continue;
            }
            let page = if section == "assumptions" {
                assumptions_sheet(value)
            } else {
                statement_sheet(title, value)?
            };
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

    fn render(template: Template, content: Value) -> DocumentResult<Layout> {
        let styles = merge_styles(&[&SYSTEM_STYLES]);
        let ctx = RenderContext {
            template: &template,
            format: OutputFormat::Xlsx,
            content: &content,
            styles: &styles,
        };
        FinancialModelStrategy.render(&ctx)
    }

    fn table(page: &Page) -> &Table {
        match &page.blocks[0] {
            Block::Table(table) => table,
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn sheets_are_labeled_and_totals_are_added() {
        let layout = render(
            cashflow_definition(),
            json!({
                "assumptions": {"Growth": "42%", "Starting cash": "$1,234.56"},
                "projections": {
                    "periods": ["2026", "2027"],
                    "rows": [
                        {"label": "Revenue", "values": ["$100", "$250.50"]},
                        {"label": "Margin", "values": ["10%", "12%"]},
                        {"label": "Units", "values": [3, "4"]}
                    ]
                },
                "cashFlow": {"Operating": [1, 2]}
            }),
        )
        .unwrap();

        let titles: Vec<_> = layout.pages.iter().map(|p| p.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["Assumptions", "Projections", "Cash Flow"]);

        let assumptions = table(&layout.pages[0]);
        assert_eq!(assumptions.rows[0][1].value, CellValue::Percent(0.42));
        assert_eq!(assumptions.rows[1][1].value, CellValue::Currency(1234.56));

        let projections = table(&layout.pages[1]);
        assert_eq!(projections.headers, vec!["Line Item", "2026", "2027", "Total"]);
        assert_eq!(projections.rows[0][3].value, CellValue::Currency(350.5));
        assert_eq!(projections.rows[1][3].value, CellValue::Empty);
        assert_eq!(projections.rows[2][3].value, CellValue::Number(7.0));
    }

    #[test]
    fn proforma_uses_income_statement() {
        let layout = render(
            proforma_definition(),
            json!({
                "assumptions": [{"label": "Tax rate", "value": "21%"}],
                "incomeStatement": {"Revenue": [10, 20, 30]},
                "projections": {"Ignored": [1]}
            }),
        )
        .unwrap();

        let titles: Vec<_> = layout.pages.iter().map(|p| p.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["Assumptions", "Income Statement"]);
        let income = table(&layout.pages[1]);
        assert_eq!(&income.headers[1..4], &["Period 1", "Period 2", "Period 3"]);
    }

    #[test]
    fn non_numeric_line_item_fails_generation() {
        let err = render(
            cashflow_definition(),
            json!({
                "assumptions": {},
                "projections": {"Revenue": ["$100", "about a hundred"]}
            }),
        )
        .unwrap_err();
        assert!(matches!(err, DocumentError::Generation(_)));
        assert!(err.to_string().contains("Revenue"));
    }
}
