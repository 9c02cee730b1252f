use rust_xlsxwriter::{Color, DocProperties, Format, FormatAlign, FormatBorder, Image, Workbook, Worksheet};
use std::collections::HashSet;

use super::layout::{Block, Cell, Layout, Page, PageKind, Table};
use super::{FormatRenderer, GeneratedBuffer};
use crate::branding::{AppliedBranding, Logo, ResolvedStyles};
use crate::core::{CellValue, DocumentResult};
use crate::models::OutputFormat;

pub const CURRENCY_FORMAT: &str = "$#,##0.00";
pub const PERCENT_FORMAT: &str = "0.00%";
pub const NUMBER_FORMAT: &str = "#,##0.##";

/// Excel limita cabecera y pie a 255 caracteres
const HEADER_FOOTER_LIMIT: usize = 255;
const SHEET_NAME_LIMIT: usize = 31;
const LOGO_HEIGHT_PX: f64 = 40.0;

/// Renderizador XLSX sobre `rust_xlsxwriter`
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxRenderer;

/// Formatos de celda con la marca aplicada
struct SheetFormats {
    title: Format,
    company: Format,
    heading: Format,
    header: Format,
    label: Format,
    text: Format,
    wrapped: Format,
    number: Format,
    money: Format,
    percent: Format,
}

impl SheetFormats {
    fn new(styles: &ResolvedStyles) -> Self {
        let base = Format::new()
            .set_font_name(&styles.font_family)
            .set_font_size(styles.body_font_size as f64)
            .set_font_color(Color::RGB(styles.text.to_u32()));
        let cell = base.clone().set_border(FormatBorder::Thin);

        SheetFormats {
            title: base
                .clone()
                .set_bold()
                .set_font_size(styles.heading_font_size as f64)
                .set_font_color(Color::RGB(styles.accent.to_u32())),
            company: base
                .clone()
                .set_bold()
                .set_font_color(Color::RGB(styles.accent.to_u32())),
            heading: base
                .clone()
                .set_bold()
                .set_font_color(Color::RGB(styles.accent.to_u32())),
            header: base
                .clone()
                .set_bold()
                .set_background_color(Color::RGB(styles.accent.to_u32()))
                .set_font_color(Color::White)
                .set_border(FormatBorder::Thin),
            label: base
                .clone()
                .set_bold()
                .set_font_color(Color::RGB(styles.muted.to_u32())),
            text: cell.clone(),
            wrapped: base.clone().set_text_wrap().set_align(FormatAlign::Top),
            number: cell.clone().set_num_format(NUMBER_FORMAT),
            money: cell.clone().set_num_format(CURRENCY_FORMAT),
            percent: cell.set_num_format(PERCENT_FORMAT),
        }
    }
}

/// Escapa `&` para los códigos de cabecera/pie y respeta el límite de Excel
fn header_footer(prefix: &str, text: &str, suffix: &str) -> String {
    let budget = HEADER_FOOTER_LIMIT.saturating_sub(prefix.len() + suffix.len());
    let escaped_len = |c: char| c.len_utf8() + usize::from(c == '&');

    // se recorta el texto original antes de escapar para no partir un `&&`
    let truncated = text.chars().map(escaped_len).sum::<usize>() > budget;
    let kept = if truncated {
        let limit = budget.saturating_sub(3);
        let mut used = 0;
        let mut end = 0;
        for (i, c) in text.char_indices() {
            if used + escaped_len(c) > limit {
                break;
            }
            used += escaped_len(c);
            end = i + c.len_utf8();
        }
        &text[..end]
    } else {
        text
    };

    let mut body = kept.replace('&', "&&");
    if truncated {
        body.push_str("...");
    }
    format!("{}{}{}", prefix, body, suffix)
}

/// Nombres de hoja válidos y únicos dentro del libro
#[derive(Default)]
struct SheetNames {
    used: HashSet<String>,
}

impl SheetNames {
    fn claim(&mut self, raw: &str, fallback: &str) -> String {
        let cleaned: String = raw
            .chars()
            .map(|c| match c {
                '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '-',
                c => c,
            })
            .collect();
        let cleaned = cleaned.trim().trim_matches('\'').to_string();
        let base = if cleaned.is_empty() { fallback.to_string() } else { cleaned };
        let base: String = base.chars().take(SHEET_NAME_LIMIT).collect();

        let mut name = base.clone();
        let mut n = 2;
        while self.used.contains(&name.to_lowercase()) {
            let suffix = format!(" ({})", n);
            let keep = SHEET_NAME_LIMIT - suffix.chars().count();
            name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
            n += 1;
        }
        self.used.insert(name.to_lowercase());
        name
    }
}

/// Escritor secuencial de una hoja, fila a fila
struct SheetBuilder<'a> {
    worksheet: Worksheet,
    formats: &'a SheetFormats,
    current_row: u32,
    widths: Vec<usize>,
    frozen: bool,
}

impl<'a> SheetBuilder<'a> {
    fn new(name: &str, formats: &'a SheetFormats) -> DocumentResult<Self> {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(name)?;
        Ok(SheetBuilder {
            worksheet,
            formats,
            current_row: 0,
            widths: Vec::new(),
            frozen: false,
        })
    }

    fn track(&mut self, col: u16, text: &str) {
        let col = col as usize;
        if self.widths.len() <= col {
            self.widths.resize(col + 1, 0);
        }
        self.widths[col] = self.widths[col].max(text.chars().count());
    }

    fn write_text(&mut self, col: u16, text: &str, format: &Format) -> DocumentResult<()> {
        self.worksheet
            .write_string_with_format(self.current_row, col, text, format)?;
        self.track(col, text);
        Ok(())
    }

    fn write_cell(&mut self, col: u16, cell: &Cell) -> DocumentResult<()> {
        let row = self.current_row;
        let formats = self.formats;
        match &cell.value {
            CellValue::Empty => {
                self.worksheet.write_blank(row, col, &formats.text)?;
            }
            CellValue::Text(_) => {
                self.worksheet
                    .write_string_with_format(row, col, &cell.text, &formats.text)?;
            }
            CellValue::Number(n) => {
                self.worksheet
                    .write_number_with_format(row, col, *n, &formats.number)?;
            }
            CellValue::Currency(n) => {
                self.worksheet
                    .write_number_with_format(row, col, *n, &formats.money)?;
            }
            CellValue::Percent(n) => {
                self.worksheet
                    .write_number_with_format(row, col, *n, &formats.percent)?;
            }
            CellValue::Bool(b) => {
                self.worksheet
                    .write_boolean_with_format(row, col, *b, &formats.text)?;
            }
        }
        self.track(col, &cell.text);
        Ok(())
    }

    fn add_title(&mut self, company: &str, title: &str) -> DocumentResult<&mut Self> {
        let formats = self.formats;
        self.write_text(0, company, &formats.company)?;
        self.current_row += 1;
        self.worksheet.set_row_height(self.current_row, 24)?;
        self.worksheet
            .write_string_with_format(self.current_row, 0, title, &formats.title)?;
        self.current_row += 2;
        Ok(self)
    }

    fn add_table(&mut self, table: &Table, freeze: bool) -> DocumentResult<&mut Self> {
        let formats = self.formats;
        if !table.headers.is_empty() {
            for (col, header) in table.headers.iter().enumerate() {
                self.write_text(col as u16, header, &formats.header)?;
            }
            self.current_row += 1;
            if freeze && !self.frozen {
                self.worksheet.set_freeze_panes(self.current_row, 0)?;
                self.frozen = true;
            }
        }

        for row in &table.rows {
            for (col, cell) in row.iter().enumerate() {
                self.write_cell(col as u16, cell)?;
            }
            self.current_row += 1;
        }

        self.current_row += 1;
        Ok(self)
    }

    fn add_block(&mut self, block: &Block, freeze: bool) -> DocumentResult<()> {
        let formats = self.formats;
        match block {
            Block::Heading { text, .. } => {
                self.write_text(0, text, &formats.heading)?;
                self.current_row += 1;
            }
            Block::Paragraph(text) => {
                self.worksheet
                    .write_string_with_format(self.current_row, 0, text, &formats.wrapped)?;
                self.current_row += 2;
            }
            Block::Lines(items) | Block::Bullets(items) => {
                for item in items {
                    self.write_text(0, item, &formats.wrapped)?;
                    self.current_row += 1;
                }
                self.current_row += 1;
            }
            Block::Numbered(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.write_text(0, &format!("{}. {}", i + 1, item), &formats.wrapped)?;
                    self.current_row += 1;
                }
                self.current_row += 1;
            }
            Block::Fields(pairs) => {
                for (label, cell) in pairs {
                    self.write_text(0, label, &formats.label)?;
                    self.write_cell(1, cell)?;
                    self.current_row += 1;
                }
                self.current_row += 1;
            }
            Block::Table(table) => {
                self.add_table(table, freeze)?;
            }
            Block::Columns(left, right) => {
                for block in left.iter().chain(right.iter()) {
                    self.add_block(block, false)?;
                }
            }
            Block::Chart(chart) => {
                let table = Table {
                    headers: vec![
                        chart.title.clone().unwrap_or_else(|| "Label".to_string()),
                        "Value".to_string(),
                    ],
                    rows: chart
                        .series
                        .iter()
                        .map(|(label, value)| vec![Cell::text(label.clone()), Cell::number(*value)])
                        .collect(),
                };
                self.add_table(&table, false)?;
            }
            Block::Signature(signature) => {
                self.write_text(0, &signature.party, &formats.label)?;
                self.current_row += 1;
                for value in [&signature.name, &signature.title, &signature.date].into_iter().flatten() {
                    self.write_text(0, value, &formats.text)?;
                    self.current_row += 1;
                }
                self.current_row += 1;
            }
            Block::Rule | Block::Spacer => self.current_row += 1,
        }
        Ok(())
    }

    fn add_logo(&mut self, logo: &Logo) -> DocumentResult<()> {
        let scale = LOGO_HEIGHT_PX / logo.height as f64;
        let mut image = Image::new_from_buffer(&logo.bytes)?;
        image.set_scale_width(scale).set_scale_height(scale);
        let col = (self.widths.len().max(2) + 1) as u16;
        self.worksheet.insert_image(0, col, &image)?;
        Ok(())
    }

    fn finish(mut self, branding: &AppliedBranding) -> DocumentResult<Worksheet> {
        for (col, width) in self.widths.iter().enumerate() {
            let width = (*width as f64 + 2.0).clamp(10.0, 60.0);
            self.worksheet.set_column_width(col as u16, width)?;
        }
        if let Some(logo) = &branding.logo {
            self.add_logo(logo)?;
        }
        self.worksheet
            .set_header(&header_footer("&L", &branding.company_name, ""));
        self.worksheet
            .set_footer(&header_footer("&L", &branding.disclosure, "&RPage &P of &N"));
        Ok(self.worksheet)
    }
}

impl FormatRenderer for XlsxRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Xlsx
    }

    fn render(&self, layout: &Layout, branding: &AppliedBranding) -> DocumentResult<GeneratedBuffer> {
        let formats = SheetFormats::new(&branding.styles);
        let mut names = SheetNames::default();
        let mut workbook = Workbook::new();

        let properties = DocProperties::new()
            .set_title(&layout.title)
            .set_author(&branding.company_name);
        workbook.set_properties(&properties);

        for (i, page) in layout.pages.iter().enumerate() {
            let sheet = render_sheet(page, layout, branding, &formats, &mut names, i)?;
            workbook.push_worksheet(sheet);
        }

        // Hoja final obligatoria con el texto de divulgación completo
        let name = names.claim("Disclosures", "Disclosures");
        let mut disclosures = SheetBuilder::new(&name, &formats)?;
        disclosures.add_title(&branding.company_name, "Disclosures")?;
        disclosures.worksheet.write_string_with_format(
            disclosures.current_row,
            0,
            &branding.disclosure,
            &formats.wrapped,
        )?;
        let mut sheet = disclosures.finish(branding)?;
        sheet.set_column_width(0, 100)?;
        workbook.push_worksheet(sheet);

        let bytes = workbook.save_to_buffer()?;
        tracing::debug!(sheets = layout.pages.len() + 1, size = bytes.len(), "XLSX rendered");
        Ok(GeneratedBuffer {
            bytes,
            page_count: None,
        })
    }
}

fn render_sheet(
    page: &Page,
    layout: &Layout,
    branding: &AppliedBranding,
    formats: &SheetFormats,
    names: &mut SheetNames,
    index: usize,
) -> DocumentResult<Worksheet> {
    let fallback = format!("Sheet{}", index + 1);
    let name = names.claim(page.title.as_deref().unwrap_or(&fallback), &fallback);
    let mut builder = SheetBuilder::new(&name, formats)?;

    let title = match page.kind {
        PageKind::Sheet => page.title.clone().unwrap_or_else(|| layout.title.clone()),
        _ => layout.title.clone(),
    };
    builder.add_title(&branding.company_name, &title)?;

    if page.kind != PageKind::Sheet {
        if let Some(heading) = &page.title {
            builder.add_block(&Block::heading(heading.clone(), 1), false)?;
        }
    }

    let freeze = page.kind == PageKind::Sheet;
    for block in &page.blocks {
        builder.add_block(block, freeze)?;
    }
    builder.finish(branding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branding::{apply_branding, BrandingProfile, StyleTokens, TenantBranding};
    use crate::generators::ooxml::read_part;
    use serde_json::json;

    fn png_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        let img = image::RgbImage::from_pixel(8, 4, image::Rgb([200, 40, 40]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn branding(footer: Option<&str>) -> AppliedBranding {
        let profile = BrandingProfile::from_tenant(TenantBranding {
            company_name: Some("Acme".into()),
            footer_text: footer.map(str::to_string),
            ..Default::default()
        });
        apply_branding(&StyleTokens::default(), &profile)
    }

    fn sheet_layout() -> Layout {
        let mut layout = Layout::new("Model");
        let mut page = Page::titled(PageKind::Sheet, "Assumptions");
        page.push(Block::Table(Table {
            headers: vec!["Assumption".into(), "Value".into()],
            rows: vec![
                vec![Cell::text("Starting cash"), Cell::from_json(&json!("$1,234.56"))],
                vec![Cell::text("Growth"), Cell::from_json(&json!("42%"))],
            ],
        }));
        layout.push_page(page);
        layout
    }

    #[test]
    fn currency_and_percent_become_formatted_numbers() {
        let buffer = XlsxRenderer.render(&sheet_layout(), &branding(None)).unwrap();
        assert_eq!(buffer.page_count, None);

        let sheet = read_part(&buffer.bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("<v>1234.56</v>"), "{}", sheet);
        assert!(sheet.contains("<v>0.42</v>"), "{}", sheet);

        let styles = read_part(&buffer.bytes, "xl/styles.xml");
        assert!(styles.contains(r#"formatCode="$#,##0.00""#), "{}", styles);
        assert!(styles.contains(r#"formatCode="0.00%""#), "{}", styles);
    }

    #[test]
    fn disclosure_appears_in_footer_and_final_sheet() {
        let buffer = XlsxRenderer
            .render(&sheet_layout(), &branding(Some("Acme Confidential")))
            .unwrap();

        let workbook = read_part(&buffer.bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"name="Assumptions""#));
        assert!(workbook.contains(r#"name="Disclosures""#));

        let sheet = read_part(&buffer.bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains("Acme Confidential"));

        let strings = read_part(&buffer.bytes, "xl/sharedStrings.xml");
        assert!(strings.contains("Acme Confidential"));
    }

    #[test]
    fn header_footer_text_is_escaped_and_bounded() {
        assert_eq!(header_footer("&L", "R&D", ""), "&LR&&D");
        let long = "x".repeat(400);
        let footer = header_footer("&L", &long, "&RPage &P of &N");
        assert!(footer.len() <= HEADER_FOOTER_LIMIT);
        assert!(footer.ends_with("...&RPage &P of &N"));
    }

    #[test]
    fn truncation_never_splits_an_escaped_ampersand() {
        let text = format!("a{}", "&".repeat(300));
        let footer = header_footer("&L", &text, "");
        assert!(footer.len() <= HEADER_FOOTER_LIMIT);

        let body = footer.strip_prefix("&La").unwrap().strip_suffix("...").unwrap();
        assert!(body.chars().all(|c| c == '&'));
        assert_eq!(body.len() % 2, 0, "lone ampersand in {}", footer);
    }

    #[test]
    fn logo_is_scaled_into_the_sheet() {
        let logo = crate::branding::Logo::decode(&png_bytes()).unwrap();
        let mut branding = branding(None);
        branding.logo = Some(logo);

        let buffer = XlsxRenderer.render(&sheet_layout(), &branding).unwrap();
        let drawing = read_part(&buffer.bytes, "xl/drawings/drawing1.xml");
        assert!(drawing.contains("<xdr:pic>"), "{}", drawing);
    }

    #[test]
    fn sheet_names_are_sanitized_and_unique() {
        let mut names = SheetNames::default();
        assert_eq!(names.claim("Q1/Q2 [draft]", "Sheet1"), "Q1-Q2 -draft-");
        assert_eq!(names.claim("Cash Flow", "Sheet2"), "Cash Flow");
        assert_eq!(names.claim("cash flow", "Sheet3"), "cash flow (2)");
        assert_eq!(names.claim("", "Sheet4"), "Sheet4");
        assert!(names.claim(&"n".repeat(50), "Sheet5").chars().count() <= 31);
    }
}
