use super::layout::{Block, ChartData, Layout, Page, PageKind, Signature, Table};
use super::ooxml::{self, emu, relationship, relationships, xml_escape, Package, XML_HEADER};
use super::{FormatRenderer, GeneratedBuffer};
use crate::branding::{AppliedBranding, Logo, ResolvedStyles};
use crate::core::{format_number, DocumentResult};
use crate::models::OutputFormat;

const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture""#;

/// Ancho útil de la página Carta con márgenes de 56pt, en twips
const CONTENT_TWIPS: u32 = 12240 - 2 * 1120;

const LOGO_HEIGHT: f32 = 28.0;

/// Renderizador DOCX (WordprocessingML escrito a mano)
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxRenderer;

fn run(text: &str, bold: bool, color: Option<&str>) -> String {
    let mut props = String::new();
    if bold {
        props.push_str("<w:b/>");
    }
    if let Some(color) = color {
        props.push_str(&format!(r#"<w:color w:val="{}"/>"#, color));
    }
    let props = if props.is_empty() {
        String::new()
    } else {
        format!("<w:rPr>{}</w:rPr>", props)
    };
    format!(
        r#"<w:r>{}<w:t xml:space="preserve">{}</w:t></w:r>"#,
        props,
        xml_escape(text)
    )
}

fn paragraph(style: Option<&str>, extra_props: &str, runs: &str) -> String {
    let style = style
        .map(|s| format!(r#"<w:pStyle w:val="{}"/>"#, s))
        .unwrap_or_default();
    if style.is_empty() && extra_props.is_empty() {
        format!("<w:p>{}</w:p>", runs)
    } else {
        format!("<w:p><w:pPr>{}{}</w:pPr>{}</w:p>", style, extra_props, runs)
    }
}

fn heading_style(level: u8) -> &'static str {
    match level {
        0 => "Title",
        1 => "Heading1",
        2 => "Heading2",
        _ => "Heading3",
    }
}

struct BodyWriter<'a> {
    styles: &'a ResolvedStyles,
    xml: String,
}

impl<'a> BodyWriter<'a> {
    fn block(&mut self, block: &Block) {
        let xml = self.block_xml(block);
        self.xml.push_str(&xml);
    }

    fn block_xml(&self, block: &Block) -> String {
        match block {
            Block::Heading { text, level } => {
                paragraph(Some(heading_style(*level)), "", &run(text, false, None))
            }
            Block::Paragraph(text) => paragraph(None, "", &run(text, false, None)),
            Block::Lines(lines) => lines
                .iter()
                .map(|line| paragraph(Some("NoSpacing"), "", &run(line, false, None)))
                .collect(),
            Block::Bullets(items) => items
                .iter()
                .map(|item| list_item("\u{2022}", item))
                .collect(),
            Block::Numbered(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| list_item(&format!("{}.", i + 1), item))
                .collect(),
            Block::Fields(pairs) => pairs
                .iter()
                .map(|(label, cell)| {
                    let muted = self.styles.muted.hex();
                    let runs = format!(
                        "{}{}",
                        run(&format!("{}: ", label), true, Some(&muted)),
                        run(&cell.text, false, None)
                    );
                    paragraph(Some("NoSpacing"), "", &runs)
                })
                .collect(),
            Block::Table(table) => self.table(table),
            Block::Columns(left, right) => {
                let half = CONTENT_TWIPS / 2;
                let column = |blocks: &[Block]| -> String {
                    let inner: String = blocks.iter().map(|b| self.block_xml(b)).collect();
                    // toda celda debe terminar en un párrafo
                    format!(
                        r#"<w:tc><w:tcPr><w:tcW w:w="{half}" w:type="dxa"/></w:tcPr>{inner}<w:p/></w:tc>"#
                    )
                };
                format!(
                    r#"<w:tbl><w:tblPr><w:tblW w:w="{CONTENT_TWIPS}" w:type="dxa"/><w:tblLayout w:type="fixed"/></w:tblPr><w:tblGrid><w:gridCol w:w="{half}"/><w:gridCol w:w="{half}"/></w:tblGrid><w:tr>{}{}</w:tr></w:tbl><w:p/>"#,
                    column(left),
                    column(right)
                )
            }
            Block::Chart(chart) => self.chart(chart),
            Block::Signature(signature) => self.signature(signature),
            Block::Rule => paragraph(
                None,
                &format!(
                    r#"<w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="{}"/></w:pBdr>"#,
                    self.styles.muted.hex()
                ),
                "",
            ),
            Block::Spacer => "<w:p/>".to_string(),
        }
    }

    fn table(&self, table: &Table) -> String {
        let columns = table
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(table.headers.len()))
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return String::new();
        }
        let width = CONTENT_TWIPS / columns as u32;
        let border = self.styles.muted.hex();
        let accent = self.styles.accent.hex();

        let mut xml = format!(
            r#"<w:tbl><w:tblPr><w:tblW w:w="{CONTENT_TWIPS}" w:type="dxa"/><w:tblBorders><w:top w:val="single" w:sz="4" w:color="{border}"/><w:bottom w:val="single" w:sz="4" w:color="{border}"/><w:insideH w:val="single" w:sz="4" w:color="{border}"/></w:tblBorders><w:tblLayout w:type="fixed"/></w:tblPr><w:tblGrid>"#
        );
        for _ in 0..columns {
            xml.push_str(&format!(r#"<w:gridCol w:w="{}"/>"#, width));
        }
        xml.push_str("</w:tblGrid>");

        if !table.headers.is_empty() {
            xml.push_str(r#"<w:tr><w:trPr><w:tblHeader/></w:trPr>"#);
            for col in 0..columns {
                let text = table.headers.get(col).map(String::as_str).unwrap_or("");
                xml.push_str(&format!(
                    r#"<w:tc><w:tcPr><w:tcW w:w="{width}" w:type="dxa"/><w:shd w:val="clear" w:color="auto" w:fill="{accent}"/></w:tcPr>{}</w:tc>"#,
                    paragraph(Some("NoSpacing"), "", &run(text, true, Some("FFFFFF")))
                ));
            }
            xml.push_str("</w:tr>");
        }

        for row in &table.rows {
            xml.push_str("<w:tr>");
            for col in 0..columns {
                let cell = row.get(col);
                let text = cell.map(|c| c.text.as_str()).unwrap_or("");
                let align = if cell.map_or(false, |c| c.value.is_numeric()) {
                    r#"<w:jc w:val="right"/>"#
                } else {
                    ""
                };
                xml.push_str(&format!(
                    r#"<w:tc><w:tcPr><w:tcW w:w="{width}" w:type="dxa"/></w:tcPr>{}</w:tc>"#,
                    paragraph(Some("NoSpacing"), align, &run(text, false, None))
                ));
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl><w:p/>");
        xml
    }

    /// Sin gráficos nativos: tabla etiqueta/valor con barra de texto
    fn chart(&self, chart: &ChartData) -> String {
        let mut xml = String::new();
        if let Some(title) = &chart.title {
            xml.push_str(&paragraph(Some("Heading3"), "", &run(title, false, None)));
        }
        let max = chart.series.iter().map(|(_, v)| v.abs()).fold(0.0_f64, f64::max);
        let table = Table {
            headers: vec!["Label".to_string(), "Value".to_string(), String::new()],
            rows: chart
                .series
                .iter()
                .map(|(label, value)| {
                    let bar = if max > 0.0 {
                        "\u{2588}".repeat(((value.max(0.0) / max) * 30.0).round() as usize)
                    } else {
                        String::new()
                    };
                    vec![
                        super::layout::Cell::text(label.clone()),
                        super::layout::Cell::text(format_number(*value)),
                        super::layout::Cell::text(bar),
                    ]
                })
                .collect(),
        };
        xml.push_str(&self.table(&table));
        xml
    }

    fn signature(&self, signature: &Signature) -> String {
        let mut xml = String::from("<w:p/><w:p/>");
        xml.push_str(&paragraph(
            Some("NoSpacing"),
            "",
            &run("________________________________", false, None),
        ));
        xml.push_str(&paragraph(Some("NoSpacing"), "", &run(&signature.party, true, None)));
        for (label, value) in [("Name", &signature.name), ("Title", &signature.title)] {
            if let Some(value) = value {
                xml.push_str(&paragraph(
                    Some("NoSpacing"),
                    "",
                    &run(&format!("{}: {}", label, value), false, None),
                ));
            }
        }
        let date = signature.date.as_deref().unwrap_or("________________");
        xml.push_str(&paragraph(
            Some("NoSpacing"),
            "",
            &run(&format!("Date: {}", date), false, None),
        ));
        xml
    }

    fn page(&mut self, page: &Page, first: bool) {
        if !first {
            self.xml
                .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        }
        if page.kind == PageKind::Cover {
            self.xml.push_str(&"<w:p/>".repeat(8));
        }
        if let Some(title) = &page.title {
            let level = if page.kind == PageKind::Cover { 0 } else { 1 };
            self.block(&Block::heading(title.clone(), level));
        }
        for block in &page.blocks {
            self.block(block);
        }
    }
}

fn list_item(marker: &str, text: &str) -> String {
    paragraph(
        Some("ListParagraph"),
        r#"<w:ind w:left="720" w:hanging="360"/>"#,
        &format!("{}{}", run(&format!("{}\t", marker), false, None), run(text, false, None)),
    )
}

fn styles_xml(styles: &ResolvedStyles) -> String {
    let font = xml_escape(&styles.font_family);
    let body = (styles.body_font_size * 2.0).round() as u32;
    let heading = (styles.heading_font_size * 2.0).round() as u32;
    let title = (styles.heading_font_size * 2.8).round() as u32;
    let h2 = (styles.heading_font_size * 1.6).round() as u32;
    let h3 = (styles.body_font_size * 2.2).round() as u32;
    let text = styles.text.hex();
    let accent = styles.accent.hex();
    let muted = styles.muted.hex();

    let heading_style = |id: &str, name: &str, size: u32, color: &str| {
        format!(
            r#"<w:style w:type="paragraph" w:styleId="{id}"><w:name w:val="{name}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/></w:pPr><w:rPr><w:b/><w:color w:val="{color}"/><w:sz w:val="{size}"/></w:rPr></w:style>"#
        )
    };

    format!(
        r#"{XML_HEADER}
<w:styles {W_NS}><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/><w:color w:val="{text}"/><w:sz w:val="{body}"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="276" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="NoSpacing"><w:name w:val="No Spacing"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="0"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="60"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="Footer"><w:name w:val="footer"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="0"/></w:pPr><w:rPr><w:color w:val="{muted}"/><w:sz w:val="16"/></w:rPr></w:style>{}{}{}{}</w:styles>"#,
        heading_style("Title", "Title", title, &accent),
        heading_style("Heading1", "heading 1", heading, &accent),
        heading_style("Heading2", "heading 2", h2, &accent),
        heading_style("Heading3", "heading 3", h3, &text),
    )
}

fn logo_drawing(logo: &Logo) -> String {
    let cy = emu(LOGO_HEIGHT);
    let cx = emu(logo.scaled_width(LOGO_HEIGHT));
    format!(
        r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="1" name="Logo"/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture"><pic:pic><pic:nvPicPr><pic:cNvPr id="1" name="logo.{ext}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="rIdLogo"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r><w:r><w:t xml:space="preserve">  </w:t></w:r>"#,
        ext = logo.extension()
    )
}

fn header_xml(branding: &AppliedBranding) -> String {
    let logo = branding.logo.as_ref().map(logo_drawing).unwrap_or_default();
    let company = run(&branding.company_name, true, Some(&branding.styles.accent.hex()));
    format!(
        r#"{XML_HEADER}
<w:hdr {W_NS}><w:p><w:pPr><w:pBdr><w:bottom w:val="single" w:sz="4" w:space="4" w:color="{}"/></w:pBdr></w:pPr>{logo}{company}</w:p></w:hdr>"#,
        branding.styles.muted.hex()
    )
}

fn footer_xml(branding: &AppliedBranding) -> String {
    let disclosure = paragraph(Some("Footer"), "", &run(&branding.disclosure, false, None));
    let page_number = format!(
        r#"<w:p><w:pPr><w:pStyle w:val="Footer"/><w:jc w:val="right"/></w:pPr>{}<w:fldSimple w:instr=" PAGE "><w:r><w:t>1</w:t></w:r></w:fldSimple>{}<w:fldSimple w:instr=" NUMPAGES "><w:r><w:t>1</w:t></w:r></w:fldSimple></w:p>"#,
        run("Page ", false, None),
        run(" of ", false, None)
    );
    format!(r#"{XML_HEADER}
<w:ftr {W_NS}>{disclosure}{page_number}</w:ftr>"#)
}

fn document_xml(body: &str) -> String {
    format!(
        r#"{XML_HEADER}
<w:document {W_NS}><w:body>{body}<w:sectPr><w:headerReference w:type="default" r:id="rId2"/><w:footerReference w:type="default" r:id="rId3"/><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1120" w:bottom="1440" w:left="1120" w:header="560" w:footer="560" w:gutter="0"/></w:sectPr></w:body></w:document>"#
    )
}

fn content_types(logo: Option<&Logo>) -> String {
    let image = logo
        .map(|l| {
            format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                l.extension(),
                l.content_type()
            )
        })
        .unwrap_or_default();
    format!(
        r#"{XML_HEADER}
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{image}<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/><Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#
    )
}

impl FormatRenderer for DocxRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Docx
    }

    fn render(&self, layout: &Layout, branding: &AppliedBranding) -> DocumentResult<GeneratedBuffer> {
        let mut body = BodyWriter {
            styles: &branding.styles,
            xml: String::new(),
        };
        for (i, page) in layout.pages.iter().enumerate() {
            body.page(page, i == 0);
        }

        let logo = branding.logo.as_ref();
        let mut package = Package::new();
        package.add_xml("[Content_Types].xml", &content_types(logo))?;
        package.add_xml("_rels/.rels", &ooxml::package_rels("word/document.xml"))?;
        package.add_xml(
            "docProps/core.xml",
            &ooxml::core_properties(&layout.title, &branding.company_name),
        )?;
        package.add_xml("docProps/app.xml", &ooxml::app_properties("document-service"))?;
        package.add_xml("word/document.xml", &document_xml(&body.xml))?;
        package.add_xml(
            "word/_rels/document.xml.rels",
            &relationships(&[
                relationship("rId1", "styles", "styles.xml"),
                relationship("rId2", "header", "header1.xml"),
                relationship("rId3", "footer", "footer1.xml"),
            ]),
        )?;
        package.add_xml("word/styles.xml", &styles_xml(&branding.styles))?;
        package.add_xml("word/header1.xml", &header_xml(branding))?;
        package.add_xml("word/footer1.xml", &footer_xml(branding))?;

        if let Some(logo) = logo {
            let media = format!("media/logo.{}", logo.extension());
            package.add(&format!("word/{}", media), &logo.bytes)?;
            package.add_xml(
                "word/_rels/header1.xml.rels",
                &relationships(&[relationship("rIdLogo", "image", &media)]),
            )?;
        }

        let bytes = package.finish()?;
        tracing::debug!(size = bytes.len(), "DOCX rendered");
        Ok(GeneratedBuffer {
            bytes,
            page_count: None,
        })
    }
}
