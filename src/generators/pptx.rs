//! Renderizador PPTX: una diapositiva por página del layout sobre un patrón en blanco.
//!
//! El texto va en cuadros de posición absoluta y las gráficas de barras se
//! dibujan con rectángulos, sin partes de gráfico incrustadas.

use super::layout::{Block, ChartData, Layout, Page, PageKind, SlideLayout};
use super::ooxml::{self, emu, relationship, relationships, xml_escape, Package, XML_HEADER};
use super::{FormatRenderer, GeneratedBuffer};
use crate::branding::{AppliedBranding, Logo, ResolvedStyles, Rgb};
use crate::core::{format_number, DocumentResult};
use crate::models::OutputFormat;

const P_NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

const SLIDE_WIDTH: f32 = 960.0;
const SLIDE_HEIGHT: f32 = 540.0;
const MARGIN: f32 = 40.0;
const TITLE_TOP: f32 = 56.0;
const BODY_TOP: f32 = 120.0;
const FOOTER_TOP: f32 = 500.0;
const LOGO_HEIGHT: f32 = 28.0;

/// Máximo de párrafos por diapositiva antes de continuar en otra
const MAX_PARAGRAPHS: usize = 14;

#[derive(Debug, Clone, Copy, Default)]
pub struct PptxRenderer;

/// Párrafo de un cuadro de texto
struct TextLine {
    text: String,
    bullet: Option<String>,
    bold: bool,
    size: f32,
    color: Rgb,
}

struct Frame {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

/// Construye el árbol de formas de una diapositiva
struct SlideBuilder<'a> {
    branding: &'a AppliedBranding,
    shapes: String,
    next_id: u32,
}

impl<'a> SlideBuilder<'a> {
    fn new(branding: &'a AppliedBranding) -> Self {
        SlideBuilder {
            branding,
            shapes: String::new(),
            next_id: 2,
        }
    }

    fn id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn styles(&self) -> &ResolvedStyles {
        &self.branding.styles
    }

    fn line(&self, text: impl Into<String>) -> TextLine {
        TextLine {
            text: text.into(),
            bullet: None,
            bold: false,
            size: self.styles().body_font_size,
            color: self.styles().text,
        }
    }

    fn paragraph_xml(&self, line: &TextLine) -> String {
        let ppr = match &line.bullet {
            Some(marker) => format!(
                r#"<a:pPr marL="342900" indent="-342900"><a:buFont typeface="Arial"/><a:buChar char="{}"/></a:pPr>"#,
                xml_escape(marker)
            ),
            None => "<a:pPr><a:buNone/></a:pPr>".to_string(),
        };
        let size = (line.size * 100.0).round() as u32;
        let bold = if line.bold { r#" b="1""# } else { "" };
        format!(
            r#"<a:p>{ppr}<a:r><a:rPr lang="en-US" sz="{size}"{bold} dirty="0"><a:solidFill><a:srgbClr val="{color}"/></a:solidFill><a:latin typeface="{font}"/></a:rPr><a:t>{text}</a:t></a:r></a:p>"#,
            color = line.color.hex(),
            font = xml_escape(&self.styles().font_family),
            text = xml_escape(&line.text),
        )
    }

    fn text_box(&mut self, name: &str, frame: Frame, lines: &[TextLine], anchor: &str) {
        let id = self.id();
        let paragraphs: String = if lines.is_empty() {
            "<a:p><a:endParaRPr lang=\"en-US\"/></a:p>".to_string()
        } else {
            lines.iter().map(|l| self.paragraph_xml(l)).collect()
        };
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name} {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" lIns="0" tIns="0" rIns="0" bIns="0" anchor="{anchor}"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
            x = emu(frame.x),
            y = emu(frame.y),
            cx = emu(frame.w),
            cy = emu(frame.h),
        ));
    }

    fn rect(&mut self, frame: Frame, color: Rgb) {
        let id = self.id();
        self.shapes.push_str(&format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Bar {id}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:solidFill><a:srgbClr val="{color}"/></a:solidFill><a:ln><a:noFill/></a:ln></p:spPr></p:sp>"#,
            x = emu(frame.x),
            y = emu(frame.y),
            cx = emu(frame.w),
            cy = emu(frame.h),
            color = color.hex(),
        ));
    }

    fn logo(&mut self, logo: &Logo) {
        let id = self.id();
        let width = logo.scaled_width(LOGO_HEIGHT);
        self.shapes.push_str(&format!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Logo"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
            x = emu(SLIDE_WIDTH - MARGIN - width),
            y = emu(14.0),
            cx = emu(width),
            cy = emu(LOGO_HEIGHT),
        ));
    }

    /// Marca en cada diapositiva: empresa, logotipo y pie de divulgación
    fn chrome(&mut self, slide_number: usize, total: usize) {
        let styles = self.styles().clone();
        let company = TextLine {
            text: self.branding.company_name.clone(),
            bullet: None,
            bold: true,
            size: 12.0,
            color: styles.accent,
        };
        self.text_box(
            "Company",
            Frame { x: MARGIN, y: 18.0, w: 500.0, h: 20.0 },
            &[company],
            "t",
        );
        let branding = self.branding;
        if let Some(logo) = &branding.logo {
            self.logo(logo);
        }

        self.rect(
            Frame { x: MARGIN, y: FOOTER_TOP - 6.0, w: SLIDE_WIDTH - 2.0 * MARGIN, h: 0.75 },
            styles.muted,
        );
        let disclosure = TextLine {
            text: self.branding.disclosure.clone(),
            bullet: None,
            bold: false,
            size: 9.0,
            color: styles.muted,
        };
        self.text_box(
            "Footer",
            Frame { x: MARGIN, y: FOOTER_TOP, w: SLIDE_WIDTH - 2.0 * MARGIN - 80.0, h: 30.0 },
            &[disclosure],
            "t",
        );
        let number = TextLine {
            text: format!("{} / {}", slide_number, total),
            bullet: None,
            bold: false,
            size: 9.0,
            color: styles.muted,
        };
        self.text_box(
            "Slide Number",
            Frame { x: SLIDE_WIDTH - MARGIN - 70.0, y: FOOTER_TOP, w: 70.0, h: 20.0 },
            &[number],
            "t",
        );
    }

    fn title(&mut self, text: &str, centered: bool) {
        let styles = self.styles().clone();
        let line = TextLine {
            text: text.to_string(),
            bullet: None,
            bold: true,
            size: if centered { styles.heading_font_size * 1.4 } else { styles.heading_font_size },
            color: styles.accent,
        };
        let frame = if centered {
            Frame { x: MARGIN, y: 190.0, w: SLIDE_WIDTH - 2.0 * MARGIN, h: 90.0 }
        } else {
            Frame { x: MARGIN, y: TITLE_TOP, w: SLIDE_WIDTH - 2.0 * MARGIN, h: 50.0 }
        };
        self.text_box("Title", frame, &[line], if centered { "b" } else { "t" });
    }

    /// Convierte bloques a párrafos de texto
    fn lines(&self, blocks: &[Block]) -> Vec<TextLine> {
        let styles = self.styles();
        let mut lines = Vec::new();
        for block in blocks {
            match block {
                Block::Heading { text, .. } => lines.push(TextLine {
                    bold: true,
                    color: styles.accent,
                    ..self.line(text.clone())
                }),
                Block::Paragraph(text) => lines.push(self.line(text.clone())),
                Block::Lines(items) => lines.extend(items.iter().map(|t| self.line(t.clone()))),
                Block::Bullets(items) => lines.extend(items.iter().map(|t| TextLine {
                    bullet: Some("\u{2022}".to_string()),
                    ..self.line(t.clone())
                })),
                Block::Numbered(items) => lines.extend(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, t)| self.line(format!("{}. {}", i + 1, t))),
                ),
                Block::Fields(pairs) => lines.extend(
                    pairs
                        .iter()
                        .map(|(label, cell)| self.line(format!("{}: {}", label, cell.text))),
                ),
                Block::Table(table) => {
                    if !table.headers.is_empty() {
                        lines.push(TextLine {
                            bold: true,
                            ..self.line(table.headers.join(" | "))
                        });
                    }
                    for row in &table.rows {
                        let text: Vec<&str> = row.iter().map(|c| c.text.as_str()).collect();
                        lines.push(self.line(text.join(" | ")));
                    }
                }
                Block::Columns(left, right) => {
                    lines.extend(self.lines(left));
                    lines.extend(self.lines(right));
                }
                Block::Chart(chart) => lines.extend(
                    chart
                        .series
                        .iter()
                        .map(|(label, value)| self.line(format!("{}: {}", label, format_number(*value)))),
                ),
                Block::Signature(signature) => lines.push(self.line(signature.party.clone())),
                Block::Rule | Block::Spacer => {}
            }
        }
        lines
    }

    fn chart(&mut self, chart: &ChartData) {
        let styles = self.styles().clone();
        let area = Frame {
            x: MARGIN + 20.0,
            y: BODY_TOP,
            w: SLIDE_WIDTH - 2.0 * MARGIN - 40.0,
            h: FOOTER_TOP - BODY_TOP - 40.0,
        };
        let mut top = area.y;
        if let Some(title) = &chart.title {
            let line = TextLine {
                bold: true,
                ..self.line(title.clone())
            };
            self.text_box("Chart Title", Frame { x: area.x, y: top, w: area.w, h: 24.0 }, &[line], "t");
            top += 30.0;
        }
        if chart.series.is_empty() {
            return;
        }

        let max = chart
            .series
            .iter()
            .map(|(_, v)| v.abs())
            .fold(0.0_f64, f64::max);
        let max = if max > 0.0 { max } else { 1.0 };
        let base = area.y + area.h;
        let plot_height = base - top - 24.0;
        let slot = area.w / chart.series.len() as f32;

        self.rect(Frame { x: area.x, y: base, w: area.w, h: 1.0 }, styles.muted);
        for (i, (label, value)) in chart.series.iter().enumerate() {
            let height = (value.max(0.0) / max) as f32 * plot_height;
            let x = area.x + i as f32 * slot + slot * 0.2;
            let width = slot * 0.6;
            if height > 0.0 {
                self.rect(Frame { x, y: base - height, w: width, h: height }, styles.accent);
            }
            let value_line = TextLine {
                size: 11.0,
                ..self.line(format_number(*value))
            };
            self.text_box(
                "Value",
                Frame { x: x - slot * 0.2, y: base - height - 18.0, w: slot, h: 16.0 },
                &[value_line],
                "b",
            );
            let label_line = TextLine {
                size: 11.0,
                ..self.line(label.clone())
            };
            self.text_box(
                "Label",
                Frame { x: x - slot * 0.2, y: base + 4.0, w: slot, h: 18.0 },
                &[label_line],
                "t",
            );
        }
    }

    fn finish(self) -> String {
        format!(
            r#"{XML_HEADER}
<p:sld {P_NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
            self.shapes
        )
    }
}

/// Diapositiva lógica ya paginada
struct SlidePlan<'p> {
    page: &'p Page,
    layout: SlideLayout,
    title: Option<String>,
    lines: Option<Vec<usize>>,
}

fn slide_layout(page: &Page) -> SlideLayout {
    match page.kind {
        PageKind::Slide(layout) => layout,
        PageKind::Cover => SlideLayout::Title,
        _ => SlideLayout::Content,
    }
}

fn plan<'p>(layout: &'p Layout, branding: &AppliedBranding) -> Vec<SlidePlan<'p>> {
    let builder = SlideBuilder::new(branding);
    let mut plans = Vec::new();

    for page in &layout.pages {
        let kind = slide_layout(page);
        if kind != SlideLayout::Content {
            plans.push(SlidePlan {
                page,
                layout: kind,
                title: page.title.clone(),
                lines: None,
            });
            continue;
        }

        let count = builder.lines(&page.blocks).len();
        let chunks = ((count + MAX_PARAGRAPHS - 1) / MAX_PARAGRAPHS).max(1);
        for chunk in 0..chunks {
            let start = chunk * MAX_PARAGRAPHS;
            let end = (start + MAX_PARAGRAPHS).min(count);
            let title = match (&page.title, chunk) {
                (Some(t), 0) => Some(t.clone()),
                (Some(t), _) => Some(format!("{} (cont.)", t)),
                (None, _) => None,
            };
            plans.push(SlidePlan {
                page,
                layout: kind,
                title,
                lines: Some((start..end).collect()),
            });
        }
    }
    plans
}

fn render_slide(plan: &SlidePlan<'_>, branding: &AppliedBranding, number: usize, total: usize) -> String {
    let mut slide = SlideBuilder::new(branding);
    slide.chrome(number, total);

    let width = SLIDE_WIDTH - 2.0 * MARGIN;
    let body_height = FOOTER_TOP - BODY_TOP - 16.0;

    match plan.layout {
        SlideLayout::Title => {
            slide.title(plan.title.as_deref().unwrap_or_default(), true);
            let mut lines = slide.lines(&plan.page.blocks);
            for line in &mut lines {
                line.color = branding.styles.muted;
            }
            slide.text_box("Subtitle", Frame { x: MARGIN, y: 290.0, w: width, h: 80.0 }, &lines, "t");
        }
        SlideLayout::TwoColumn => {
            slide.title(plan.title.as_deref().unwrap_or_default(), false);
            let gap = 24.0;
            let half = (width - gap) / 2.0;
            for block in &plan.page.blocks {
                match block {
                    Block::Columns(left, right) => {
                        let left = slide.lines(left);
                        let right = slide.lines(right);
                        slide.text_box("Left", Frame { x: MARGIN, y: BODY_TOP, w: half, h: body_height }, &left, "t");
                        slide.text_box(
                            "Right",
                            Frame { x: MARGIN + half + gap, y: BODY_TOP, w: half, h: body_height },
                            &right,
                            "t",
                        );
                    }
                    other => {
                        let lines = slide.lines(std::slice::from_ref(other));
                        slide.text_box("Body", Frame { x: MARGIN, y: BODY_TOP, w: width, h: body_height }, &lines, "t");
                    }
                }
            }
        }
        SlideLayout::Chart => {
            slide.title(plan.title.as_deref().unwrap_or_default(), false);
            for block in &plan.page.blocks {
                if let Block::Chart(chart) = block {
                    slide.chart(chart);
                }
            }
        }
        SlideLayout::Content => {
            if let Some(title) = &plan.title {
                slide.title(title, false);
            }
            let all = slide.lines(&plan.page.blocks);
            let selected: Vec<TextLine> = match &plan.lines {
                Some(indexes) => all
                    .into_iter()
                    .enumerate()
                    .filter(|(i, _)| indexes.contains(i))
                    .map(|(_, l)| l)
                    .collect(),
                None => all,
            };
            slide.text_box("Body", Frame { x: MARGIN, y: BODY_TOP, w: width, h: body_height }, &selected, "t");
        }
    }

    slide.finish()
}

fn presentation_xml(slides: usize) -> String {
    let ids: String = (0..slides)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 3))
        .collect();
    format!(
        r#"{XML_HEADER}
<p:presentation {P_NS} saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{cx}" cy="{cy}"/><p:notesSz cx="6858000" cy="9144000"/><p:defaultTextStyle><a:defPPr><a:defRPr lang="en-US"/></a:defPPr></p:defaultTextStyle></p:presentation>"#,
        cx = emu(SLIDE_WIDTH),
        cy = emu(SLIDE_HEIGHT),
    )
}

const EMPTY_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree>"#;

fn slide_master_xml() -> String {
    format!(
        r#"{XML_HEADER}
<p:sldMaster {P_NS}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>{EMPTY_TREE}</p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst><p:txStyles><p:titleStyle><a:lvl1pPr><a:defRPr sz="3200"/></a:lvl1pPr></p:titleStyle><p:bodyStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:bodyStyle><p:otherStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></p:otherStyle></p:txStyles></p:sldMaster>"#
    )
}

fn slide_layout_xml() -> String {
    format!(
        r#"{XML_HEADER}
<p:sldLayout {P_NS} type="blank" preserve="1"><p:cSld name="Blank">{EMPTY_TREE}</p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn theme_xml(styles: &ResolvedStyles) -> String {
    let font = xml_escape(&styles.font_family);
    let accent = styles.accent.hex();
    let text = styles.text.hex();
    let muted = styles.muted.hex();
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#;
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    format!(
        r#"{XML_HEADER}
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Branded"><a:themeElements><a:clrScheme name="Branded"><a:dk1><a:srgbClr val="{text}"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="{muted}"/></a:dk2><a:lt2><a:srgbClr val="F2F2F2"/></a:lt2><a:accent1><a:srgbClr val="{accent}"/></a:accent1><a:accent2><a:srgbClr val="{muted}"/></a:accent2><a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4><a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6><a:hlink><a:srgbClr val="{accent}"/></a:hlink><a:folHlink><a:srgbClr val="{muted}"/></a:folHlink></a:clrScheme><a:fontScheme name="Branded"><a:majorFont><a:latin typeface="{font}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="{font}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Branded"><a:fillStyleLst>{solid}{solid}{solid}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{solid}{solid}{solid}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

fn content_types(slides: usize, logo: Option<&Logo>) -> String {
    let image = logo
        .map(|l| {
            format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                l.extension(),
                l.content_type()
            )
        })
        .unwrap_or_default();
    let slide_overrides: String = (1..=slides)
        .map(|n| format!(r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#))
        .collect();
    format!(
        r#"{XML_HEADER}
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{image}<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>{slide_overrides}<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#
    )
}

impl FormatRenderer for PptxRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pptx
    }

    fn render(&self, layout: &Layout, branding: &AppliedBranding) -> DocumentResult<GeneratedBuffer> {
        let fallback = Page::titled(PageKind::Slide(SlideLayout::Title), layout.title.clone());
        let mut plans = plan(layout, branding);
        if plans.is_empty() {
            plans.push(SlidePlan {
                page: &fallback,
                layout: SlideLayout::Title,
                title: fallback.title.clone(),
                lines: None,
            });
        }
        let total = plans.len();
        let logo = branding.logo.as_ref();

        let mut package = Package::new();
        package.add_xml("[Content_Types].xml", &content_types(total, logo))?;
        package.add_xml("_rels/.rels", &ooxml::package_rels("ppt/presentation.xml"))?;
        package.add_xml(
            "docProps/core.xml",
            &ooxml::core_properties(&layout.title, &branding.company_name),
        )?;
        package.add_xml("docProps/app.xml", &ooxml::app_properties("document-service"))?;
        package.add_xml("ppt/presentation.xml", &presentation_xml(total))?;

        let mut presentation_rels = vec![
            relationship("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
            relationship("rId2", "theme", "theme/theme1.xml"),
        ];
        for n in 1..=total {
            presentation_rels.push(relationship(
                &format!("rId{}", n + 2),
                "slide",
                &format!("slides/slide{}.xml", n),
            ));
        }
        package.add_xml("ppt/_rels/presentation.xml.rels", &relationships(&presentation_rels))?;

        package.add_xml("ppt/slideMasters/slideMaster1.xml", &slide_master_xml())?;
        package.add_xml(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            &relationships(&[
                relationship("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                relationship("rId2", "theme", "../theme/theme1.xml"),
            ]),
        )?;
        package.add_xml("ppt/slideLayouts/slideLayout1.xml", &slide_layout_xml())?;
        package.add_xml(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            &relationships(&[relationship("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        )?;
        package.add_xml("ppt/theme/theme1.xml", &theme_xml(&branding.styles))?;

        let media = logo.map(|l| format!("logo.{}", l.extension()));
        if let (Some(logo), Some(media)) = (logo, &media) {
            package.add(&format!("ppt/media/{}", media), &logo.bytes)?;
        }

        for (i, slide_plan) in plans.iter().enumerate() {
            let number = i + 1;
            package.add_xml(
                &format!("ppt/slides/slide{}.xml", number),
                &render_slide(slide_plan, branding, number, total),
            )?;

            let mut rels = vec![relationship("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")];
            if let Some(media) = &media {
                rels.push(relationship("rId2", "image", &format!("../media/{}", media)));
            }
            package.add_xml(
                &format!("ppt/slides/_rels/slide{}.xml.rels", number),
                &relationships(&rels),
            )?;
        }

        let bytes = package.finish()?;
        tracing::debug!(slides = total, size = bytes.len(), "PPTX rendered");
        Ok(GeneratedBuffer {
            bytes,
            page_count: Some(total as u32),
        })
    }
}
