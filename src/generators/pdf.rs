//! Renderizador PDF construido sobre `pdf-writer`.
//!
//! El texto Latin-1 usa las fuentes Type1 estándar con WinAnsi, sin incrustar
//! nada. El resto de caracteres se escribe con fuentes TrueType incrustadas
//! como Type0/Identity-H con `ToUnicode`, de modo que el texto sigue siendo
//! extraíble. Las métricas de las fuentes estándar son aproximadas y los
//! flujos de contenido quedan sin comprimir.

use flate2::{write::ZlibEncoder, Compression};
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, TextRenderingMode, UnicodeCmap};
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Write;
use ttf_parser::{Face, GlyphId};

use super::fonts::{FontChain, FontProgram};
use super::layout::{Block, ChartData, Layout, Page, PageKind, Signature, Table};
use super::{FormatRenderer, GeneratedBuffer};
use crate::branding::{AppliedBranding, Rgb};
use crate::core::{DocumentError, DocumentResult, PageGeometry};
use crate::models::OutputFormat;

const REGULAR: Name<'static> = Name(b"F1");
const BOLD: Name<'static> = Name(b"F2");
const LOGO: Name<'static> = Name(b"Im1");

const HEADER_GAP: f32 = 14.0;
const LOGO_HEIGHT: f32 = 26.0;
const FOOTER_SIZE: f32 = 8.0;
const FOOTER_LEADING: f32 = 10.0;
const FOOTER_PADDING: f32 = 18.0;
/// Fracción máxima de la altura de página que ocupa el aviso del pie
const FOOTER_SHARE: f32 = 0.25;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq)]
enum FontFace {
    Helvetica,
    Times,
    Courier,
}

impl FontFace {
    fn from_family(family: &str) -> Self {
        let family = family.to_ascii_lowercase();
        if family.contains("courier") || family.contains("mono") {
            FontFace::Courier
        } else if family.contains("times")
            || family.contains("georgia")
            || family.contains("garamond")
            || (family.contains("serif") && !family.contains("sans"))
        {
            FontFace::Times
        } else {
            FontFace::Helvetica
        }
    }

    fn base_font(&self, bold: bool) -> &'static [u8] {
        match (self, bold) {
            (FontFace::Helvetica, false) => b"Helvetica",
            (FontFace::Helvetica, true) => b"Helvetica-Bold",
            (FontFace::Times, false) => b"Times-Roman",
            (FontFace::Times, true) => b"Times-Bold",
            (FontFace::Courier, false) => b"Courier",
            (FontFace::Courier, true) => b"Courier-Bold",
        }
    }

    /// Ancho medio de un carácter como fracción del tamaño de fuente
    fn width_factor(&self, bold: bool) -> f32 {
        match (self, bold) {
            (FontFace::Courier, _) => 0.6,
            (FontFace::Times, false) => 0.45,
            (FontFace::Times, true) => 0.5,
            (FontFace::Helvetica, false) => 0.5,
            (FontFace::Helvetica, true) => 0.55,
        }
    }
}

/// Byte WinAnsi de un carácter, si las fuentes estándar lo pueden mostrar
fn win_ansi_byte(c: char) -> Option<u8> {
    match c {
        ' '..='~' => Some(c as u8),
        '\u{A0}'..='\u{FF}' => Some(c as u32 as u8),
        '\u{20AC}' => Some(0x80),
        '\u{2026}' => Some(0x85),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '\u{2022}' => Some(0x95),
        '\u{2013}' => Some(0x96),
        '\u{2014}' => Some(0x97),
        '\t' => Some(b' '),
        _ => None,
    }
}

/// Nombre del recurso de página para la fuente incrustada `index`
fn embedded_name(index: usize) -> String {
    format!("U{}", index + 1)
}

/// Glifos usados de las fuentes incrustadas. Los CID son únicos en todo el
/// documento y cada fuente traduce los suyos con su propio CIDToGIDMap.
struct EmbeddedFonts<'a> {
    faces: Vec<(&'a FontProgram, Face<'a>)>,
    /// Por fuente: CID -> (glifo, carácter)
    used: Vec<BTreeMap<u16, (u16, char)>>,
    cids: HashMap<(usize, char), u16>,
    next_cid: u16,
    /// Caracteres sin glifo en ninguna fuente de la cadena, dibujados como `.notdef`
    missing: BTreeSet<char>,
}

impl<'a> EmbeddedFonts<'a> {
    fn new(chain: &'a FontChain) -> Self {
        let faces: Vec<(&'a FontProgram, Face<'a>)> = chain
            .programs()
            .iter()
            .filter_map(|program| {
                let program: &'a FontProgram = program;
                program.face().map(|face| (program, face))
            })
            .collect();
        EmbeddedFonts {
            used: vec![BTreeMap::new(); faces.len()],
            faces,
            cids: HashMap::new(),
            next_cid: 1,
            missing: BTreeSet::new(),
        }
    }

    /// Primera fuente con glifo para `c`; sin ninguna, la primera de la cadena
    fn pick(&self, c: char) -> Option<usize> {
        if self.faces.is_empty() {
            return None;
        }
        Some(
            self.faces
                .iter()
                .position(|(_, face)| face.glyph_index(c).is_some())
                .unwrap_or(0),
        )
    }

    /// Avance horizontal como fracción del cuerpo
    fn advance(&self, index: usize, c: char) -> f32 {
        let face = &self.faces[index].1;
        let glyph = face.glyph_index(c).unwrap_or(GlyphId(0));
        let units_per_em = face.units_per_em().max(1);
        let advance = face.glyph_hor_advance(glyph).unwrap_or(units_per_em / 2);
        advance as f32 / units_per_em as f32
    }

    fn encode(&mut self, index: usize, c: char) -> u16 {
        if let Some(cid) = self.cids.get(&(index, c)) {
            return *cid;
        }
        // agotados los CID, el resto cae en .notdef
        if self.next_cid == u16::MAX {
            return 0;
        }
        let cid = self.next_cid;
        self.next_cid += 1;
        let glyph = match self.faces[index].1.glyph_index(c) {
            Some(glyph) => glyph.0,
            None => {
                self.missing.insert(c);
                0
            }
        };
        self.used[index].insert(cid, (glyph, c));
        self.cids.insert((index, c), cid);
        cid
    }

    fn used_faces(&self) -> Vec<usize> {
        (0..self.faces.len()).filter(|i| !self.used[*i].is_empty()).collect()
    }
}

/// Tramo de texto con una sola fuente: `None` es la estándar, `Some(i)` la incrustada `i`
type Run = (Option<usize>, Vec<u8>);

#[derive(Debug, Clone, Default)]
struct Footer {
    lines: Vec<String>,
    truncated: bool,
}

struct PhysicalPage {
    geometry: PageGeometry,
    content: Content,
}

fn same_shape(a: &PageGeometry, b: &PageGeometry) -> bool {
    a.dimensions() == b.dimensions() && a.content_width() == b.content_width()
}

/// Estado de pintado: páginas físicas abiertas y cursor vertical
struct Painter<'a> {
    branding: &'a AppliedBranding,
    face: FontFace,
    fonts: EmbeddedFonts<'a>,
    has_logo: bool,
    portrait: PageGeometry,
    slide: PageGeometry,
    portrait_footer: Footer,
    slide_footer: Footer,
    geometry: PageGeometry,
    pages: Vec<PhysicalPage>,
    current: usize,
    y: f32,
    /// Caracteres sustituidos por `?` al no haber fuente incrustable
    replaced: usize,
}

impl<'a> Painter<'a> {
    fn new(
        branding: &'a AppliedBranding,
        fonts: &'a FontChain,
        has_logo: bool,
        portrait: PageGeometry,
        slide: PageGeometry,
    ) -> Self {
        let mut painter = Painter {
            branding,
            face: FontFace::from_family(&branding.styles.font_family),
            fonts: EmbeddedFonts::new(fonts),
            has_logo,
            portrait,
            slide,
            portrait_footer: Footer::default(),
            slide_footer: Footer::default(),
            geometry: portrait,
            pages: Vec::new(),
            current: 0,
            y: 0.0,
            replaced: 0,
        };
        painter.portrait_footer = painter.layout_footer(&portrait);
        painter.slide_footer = painter.layout_footer(&slide);
        painter
    }

    fn body_size(&self) -> f32 {
        self.branding.styles.body_font_size
    }

    fn char_width(&self, c: char, size: f32, bold: bool) -> f32 {
        if win_ansi_byte(c).is_none() {
            if let Some(index) = self.fonts.pick(c) {
                return size * self.fonts.advance(index, c);
            }
        }
        size * self.face.width_factor(bold)
    }

    fn text_width(&self, text: &str, size: f32, bold: bool) -> f32 {
        text.chars().map(|c| self.char_width(c, size, bold)).sum()
    }

    fn wrap(&self, text: &str, width: f32, size: f32, bold: bool) -> Vec<String> {
        let space = self.char_width(' ', size, bold);
        let mut lines = Vec::new();

        for raw_line in text.lines() {
            let mut line = String::new();
            let mut line_width = 0.0;
            for word in raw_line.split_whitespace() {
                let mut word = word.to_string();
                let mut word_width = self.text_width(&word, size, bold);
                // las palabras más anchas que la línea se parten por caracteres
                while word_width > width && !word.is_empty() {
                    if !line.is_empty() {
                        lines.push(std::mem::take(&mut line));
                        line_width = 0.0;
                    }
                    let mut head = String::new();
                    let mut head_width = 0.0;
                    for c in word.chars() {
                        let w = self.char_width(c, size, bold);
                        if head_width + w > width && !head.is_empty() {
                            break;
                        }
                        head.push(c);
                        head_width += w;
                    }
                    word = word[head.len()..].to_string();
                    word_width = self.text_width(&word, size, bold);
                    lines.push(head);
                }
                if word.is_empty() {
                    continue;
                }
                if !line.is_empty() && line_width + space + word_width > width {
                    lines.push(std::mem::take(&mut line));
                    line_width = 0.0;
                }
                if !line.is_empty() {
                    line.push(' ');
                    line_width += space;
                }
                line.push_str(&word);
                line_width += word_width;
            }
            lines.push(line);
        }

        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }

    /// El aviso ocupa como mucho `FOOTER_SHARE` de la página; si no cabe se
    /// corta con puntos suspensivos y el texto completo va al final del cuerpo
    fn layout_footer(&self, geometry: &PageGeometry) -> Footer {
        let width = geometry.content_width();
        let mut lines = self.wrap(&self.branding.disclosure, width, FOOTER_SIZE, false);
        let (_, height) = geometry.dimensions();
        let max_lines = ((height * FOOTER_SHARE - FOOTER_PADDING) / FOOTER_LEADING)
            .floor()
            .max(1.0) as usize;
        if lines.len() <= max_lines {
            return Footer { lines, truncated: false };
        }

        lines.truncate(max_lines);
        let ellipsis = self.text_width(ELLIPSIS, FOOTER_SIZE, false);
        if let Some(last) = lines.last_mut() {
            while !last.is_empty() && self.text_width(last, FOOTER_SIZE, false) + ellipsis > width {
                last.pop();
            }
            last.push_str(ELLIPSIS);
        }
        Footer { lines, truncated: true }
    }

    fn footer(&self, geometry: &PageGeometry) -> &Footer {
        if same_shape(geometry, &self.slide) && !same_shape(geometry, &self.portrait) {
            &self.slide_footer
        } else {
            &self.portrait_footer
        }
    }

    fn footer_height(&self, geometry: &PageGeometry) -> f32 {
        self.footer(geometry).lines.len() as f32 * FOOTER_LEADING + FOOTER_PADDING
    }

    fn top(&self) -> f32 {
        let (_, height) = self.geometry.dimensions();
        height - self.geometry.margin.top - HEADER_GAP
    }

    fn bottom(&self) -> f32 {
        self.geometry.margin.bottom + self.footer_height(&self.geometry)
    }

    fn content(&mut self) -> &mut Content {
        &mut self.pages[self.current].content
    }

    /// Parte el texto en tramos por fuente y lo codifica
    fn runs(&mut self, text: &str) -> Vec<Run> {
        let mut runs: Vec<Run> = Vec::new();
        for c in text.chars() {
            if c.is_control() && c != '\t' {
                continue;
            }
            let (slot, bytes) = match win_ansi_byte(c) {
                Some(byte) => (None, vec![byte]),
                None => match self.fonts.pick(c) {
                    Some(index) => (Some(index), self.fonts.encode(index, c).to_be_bytes().to_vec()),
                    None => {
                        self.replaced += 1;
                        (None, vec![b'?'])
                    }
                },
            };
            match runs.last_mut() {
                Some((last, buffer)) if *last == slot => buffer.extend(bytes),
                _ => runs.push((slot, bytes)),
            }
        }
        runs
    }

    fn text(&mut self, x: f32, baseline: f32, size: f32, bold: bool, color: Rgb, text: &str) {
        let (r, g, b) = color.to_unit();
        let runs = self.runs(text);
        let content = self.content();
        content.set_fill_rgb(r, g, b);
        content.begin_text();
        content.next_line(x, baseline);
        for (slot, bytes) in &runs {
            match slot {
                None => {
                    content.set_font(if bold { BOLD } else { REGULAR }, size);
                    content.show(Str(bytes));
                }
                Some(index) => {
                    let name = embedded_name(*index);
                    content.set_font(Name(name.as_bytes()), size);
                    if bold {
                        // negrita sintética: relleno más un trazo fino del mismo color
                        content.set_stroke_rgb(r, g, b);
                        content.set_line_width(size * 0.03);
                        content.set_text_rendering_mode(TextRenderingMode::FillStroke);
                        content.show(Str(bytes));
                        content.set_text_rendering_mode(TextRenderingMode::Fill);
                    } else {
                        content.show(Str(bytes));
                    }
                }
            }
        }
        content.end_text();
    }
    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgb, width: f32) {
        let (r, g, b) = color.to_unit();
        let content = self.content();
        content.set_stroke_rgb(r, g, b);
        content.set_line_width(width);
        content.move_to(from.0, from.1);
        content.line_to(to.0, to.1);
        content.stroke();
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) {
        let (r, g, b) = color.to_unit();
        let content = self.content();
        content.set_fill_rgb(r, g, b);
        content.rect(x, y, w, h);
        content.fill_nonzero();
    }

    /// Abre una página física nueva con la cabecera de marca
    fn start_page(&mut self) {
        self.pages.push(PhysicalPage {
            geometry: self.geometry,
            content: Content::new(),
        });
        self.current = self.pages.len() - 1;
        self.y = self.top();
        self.draw_header();
    }

    fn next_page(&mut self) {
        if self.current + 1 < self.pages.len() {
            self.current += 1;
            self.geometry = self.pages[self.current].geometry;
            self.y = self.top();
        } else {
            self.start_page();
        }
    }

    /// En una página recién abierta no se salta: lo que no cabe se dibuja igualmente
    fn ensure(&mut self, height: f32) {
        if self.y - height < self.bottom() && self.y < self.top() {
            self.next_page();
        }
    }

    fn draw_header(&mut self) {
        let (width, height) = self.geometry.dimensions();
        let margin = self.geometry.margin;
        let styles = &self.branding.styles;
        let (accent, muted) = (styles.accent, styles.muted);
        let company = self.branding.company_name.clone();

        self.text(margin.left, height - margin.top + 8.0, 10.0, true, accent, &company);

        if let Some(logo) = self.branding.logo.as_ref().filter(|_| self.has_logo) {
            let logo_width = logo.scaled_width(LOGO_HEIGHT);
            let x = width - margin.right - logo_width;
            let y = height - margin.top + 4.0;
            let content = self.content();
            content.save_state();
            content.transform([logo_width, 0.0, 0.0, LOGO_HEIGHT, x, y]);
            content.x_object(LOGO);
            content.restore_state();
        }

        self.line(
            (margin.left, height - margin.top),
            (width - margin.right, height - margin.top),
            muted,
            0.5,
        );
    }

    fn draw_footer(&mut self, index: usize, total: usize) {
        self.current = index;
        self.geometry = self.pages[index].geometry;
        let geometry = self.geometry;
        let (width, _) = geometry.dimensions();
        let margin = geometry.margin;
        let muted = self.branding.styles.muted;

        let lines = self.footer(&geometry).lines.clone();
        let footer_top = margin.bottom + self.footer_height(&geometry);
        self.line(
            (margin.left, footer_top - 4.0),
            (width - margin.right, footer_top - 4.0),
            muted,
            0.5,
        );

        for (i, line) in lines.iter().enumerate() {
            let baseline = footer_top - 14.0 - i as f32 * FOOTER_LEADING;
            self.text(margin.left, baseline, FOOTER_SIZE, false, muted, line);
        }

        let label = format!("Page {} of {}", index + 1, total);
        let label_width = self.text_width(&label, FOOTER_SIZE, false);
        self.text(
            width - margin.right - label_width,
            margin.bottom,
            FOOTER_SIZE,
            false,
            muted,
            &label,
        );
    }

    /// Escribe una línea y avanza el cursor
    fn write_line(&mut self, x: f32, text: &str, size: f32, bold: bool, color: Rgb) {
        let leading = size * 1.35;
        self.ensure(leading);
        let baseline = self.y - size;
        self.text(x, baseline, size, bold, color, text);
        self.y -= leading;
    }

    fn render_page(&mut self, page: &Page) {
        self.geometry = match page.kind {
            PageKind::Slide(_) => self.slide,
            _ => self.portrait,
        };
        self.start_page();

        let width = self.geometry.content_width();
        let x = self.geometry.margin.left;

        if page.kind == PageKind::Cover {
            let (_, height) = self.geometry.dimensions();
            self.y -= height * 0.22;
        }

        if let Some(title) = &page.title {
            let level = if matches!(page.kind, PageKind::Slide(_)) { 0 } else { 1 };
            self.heading(x, width, title, level);
        }

        self.render_blocks(&page.blocks, x, width);
    }

    /// Con el pie recortado en alguna página, el aviso completo cierra el documento
    fn append_full_disclosure(&mut self) {
        let truncated = self
            .pages
            .iter()
            .any(|page| self.footer(&page.geometry).truncated);
        if !truncated {
            return;
        }

        self.geometry = self.portrait;
        self.start_page();
        let x = self.geometry.margin.left;
        let width = self.geometry.content_width();
        let muted = self.branding.styles.muted;
        self.heading(x, width, "Disclosures", 2);
        let disclosure = self.branding.disclosure.clone();
        for line in self.wrap(&disclosure, width, FOOTER_SIZE, false) {
            self.write_line(x, &line, FOOTER_SIZE, false, muted);
        }
    }

    fn render_blocks(&mut self, blocks: &[Block], x: f32, width: f32) {
        for block in blocks {
            self.render_block(block, x, width);
        }
    }

    fn heading(&mut self, x: f32, width: f32, text: &str, level: u8) {
        let styles = &self.branding.styles;
        let size = match level {
            0 => styles.heading_font_size * 1.4,
            1 => styles.heading_font_size,
            2 => styles.heading_font_size * 0.8,
            _ => styles.body_font_size * 1.1,
        };
        let accent = styles.accent;

        if self.y < self.top() {
            self.y -= size * 0.4;
        }
        // el título no queda solo: al menos dos líneas detrás
        self.ensure(size * 1.35 + self.body_size() * 2.7);
        for line in self.wrap(text, width, size, true) {
            self.write_line(x, &line, size, true, accent);
        }
        self.y -= size * 0.2;
    }

    fn render_block(&mut self, block: &Block, x: f32, width: f32) {
        let size = self.body_size();
        let text_color = self.branding.styles.text;
        let muted = self.branding.styles.muted;

        match block {
            Block::Heading { text, level } => self.heading(x, width, text, *level),
            Block::Paragraph(text) => {
                for line in self.wrap(text, width, size, false) {
                    self.write_line(x, &line, size, false, text_color);
                }
                self.y -= size * 0.6;
            }
            Block::Lines(lines) => {
                for line in lines {
                    if line.is_empty() {
                        self.y -= size * 1.35;
                        continue;
                    }
                    for wrapped in self.wrap(line, width, size, false) {
                        self.write_line(x, &wrapped, size, false, text_color);
                    }
                }
                self.y -= size * 0.6;
            }
            Block::Bullets(items) => self.list(items, x, width, |_| "\u{2022}".to_string()),
            Block::Numbered(items) => self.list(items, x, width, |i| format!("{}.", i + 1)),
            Block::Fields(pairs) => {
                for (label, cell) in pairs {
                    self.field(x, width, label, &cell.text);
                }
                self.y -= size * 0.6;
            }
            Block::Table(table) => self.table(table, x, width),
            Block::Columns(left, right) => {
                let gap = 18.0;
                let half = (width - gap) / 2.0;
                let (start_page, start_y) = (self.current, self.y);

                self.render_blocks(left, x, half);
                let left_end = (self.current, self.y);

                self.current = start_page;
                self.geometry = self.pages[start_page].geometry;
                self.y = start_y;
                self.render_blocks(right, x + half + gap, half);
                let right_end = (self.current, self.y);

                let (page, y) = match left_end.0.cmp(&right_end.0) {
                    std::cmp::Ordering::Greater => left_end,
                    std::cmp::Ordering::Less => right_end,
                    std::cmp::Ordering::Equal => (left_end.0, left_end.1.min(right_end.1)),
                };
                self.current = page;
                self.geometry = self.pages[page].geometry;
                self.y = y;
            }
            Block::Chart(chart) => self.chart(chart, x, width),
            Block::Signature(signature) => self.signature(signature, x),
            Block::Rule => {
                self.ensure(12.0);
                let y = self.y - 6.0;
                self.line((x, y), (x + width, y), muted, 0.75);
                self.y -= 12.0;
            }
            Block::Spacer => self.y -= size,
        }
    }

    fn list(&mut self, items: &[String], x: f32, width: f32, marker: impl Fn(usize) -> String) {
        let size = self.body_size();
        let color = self.branding.styles.text;
        let indent = 18.0;

        for (i, item) in items.iter().enumerate() {
            let lines = self.wrap(item, width - indent, size, false);
            for (n, line) in lines.iter().enumerate() {
                if n == 0 {
                    let leading = size * 1.35;
                    self.ensure(leading);
                    let baseline = self.y - size;
                    let mark = marker(i);
                    self.text(x + 4.0, baseline, size, false, color, &mark);
                    self.text(x + indent, baseline, size, false, color, line);
                    self.y -= leading;
                } else {
                    self.write_line(x + indent, line, size, false, color);
                }
            }
        }
        self.y -= size * 0.6;
    }

    fn field(&mut self, x: f32, width: f32, label: &str, value: &str) {
        let size = self.body_size();
        let styles = &self.branding.styles;
        let (text_color, label_color) = (styles.text, styles.muted);
        let label = format!("{}: ", label);
        let label_width = self.text_width(&label, size, true);

        if label_width > width * 0.4 {
            self.write_line(x, label.trim_end(), size, true, label_color);
            for line in self.wrap(value, width - 12.0, size, false) {
                self.write_line(x + 12.0, &line, size, false, text_color);
            }
            return;
        }

        let lines = self.wrap(value, width - label_width, size, false);
        for (n, line) in lines.iter().enumerate() {
            if n == 0 {
                let leading = size * 1.35;
                self.ensure(leading);
                let baseline = self.y - size;
                self.text(x, baseline, size, true, label_color, &label);
                self.text(x + label_width, baseline, size, false, text_color, line);
                self.y -= leading;
            } else {
                self.write_line(x + label_width, line, size, false, text_color);
            }
        }
    }

    fn table(&mut self, table: &Table, x: f32, width: f32) {
        let columns = table
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(table.headers.len()))
            .max()
            .unwrap_or(0);
        if columns == 0 {
            return;
        }

        let size = self.body_size() * 0.9;
        let leading = size * 1.35;
        let column_width = width / columns as f32;
        let styles = &self.branding.styles;
        let (accent, text_color, muted) = (styles.accent, styles.text, styles.muted);

        if !table.headers.is_empty() {
            let wrapped: Vec<Vec<String>> = table
                .headers
                .iter()
                .map(|h| self.wrap(h, column_width - 6.0, size, true))
                .collect();
            let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1);
            let row_height = lines as f32 * leading + 6.0;
            self.ensure(row_height);
            let top = self.y;
            self.fill_rect(x, top - row_height, width, row_height, accent);
            for (col, cell_lines) in wrapped.iter().enumerate() {
                for (n, line) in cell_lines.iter().enumerate() {
                    let baseline = top - 3.0 - size - n as f32 * leading;
                    let cx = x + col as f32 * column_width + 3.0;
                    self.text(cx, baseline, size, true, Rgb(0xFF, 0xFF, 0xFF), line);
                }
            }
            self.y -= row_height;
        }

        for row in &table.rows {
            let wrapped: Vec<Vec<String>> = row
                .iter()
                .map(|cell| self.wrap(&cell.text, column_width - 6.0, size, false))
                .collect();
            let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1);
            let row_height = lines as f32 * leading + 6.0;
            self.ensure(row_height);
            let top = self.y;
            for (col, cell_lines) in wrapped.iter().enumerate() {
                for (n, line) in cell_lines.iter().enumerate() {
                    let baseline = top - 3.0 - size - n as f32 * leading;
                    let cx = x + col as f32 * column_width + 3.0;
                    self.text(cx, baseline, size, false, text_color, line);
                }
            }
            self.y -= row_height;
            let y = self.y;
            self.line((x, y), (x + width, y), muted, 0.25);
        }
        self.y -= self.body_size() * 0.8;
    }

    fn chart(&mut self, chart: &ChartData, x: f32, width: f32) {
        let size = self.body_size() * 0.8;
        let styles = &self.branding.styles;
        let (accent, text_color, muted) = (styles.accent, styles.text, styles.muted);
        let plot_height = 160.0;

        if let Some(title) = &chart.title {
            self.heading(x, width, title, 3);
        }
        if chart.series.is_empty() {
            return;
        }

        self.ensure(plot_height + size * 3.0);
        let max = chart
            .series
            .iter()
            .map(|(_, v)| v.abs())
            .fold(0.0_f32, |acc, v| acc.max(v as f32));
        let max = if max > 0.0 { max } else { 1.0 };

        let slot = width / chart.series.len() as f32;
        let base = self.y - plot_height;
        let bar_area = plot_height - size * 2.0;

        self.line((x, base), (x + width, base), muted, 0.75);
        for (i, (label, value)) in chart.series.iter().enumerate() {
            let bar_height = (value.max(0.0) as f32 / max) * bar_area;
            let bar_x = x + i as f32 * slot + slot * 0.2;
            let bar_width = slot * 0.6;
            if bar_height > 0.0 {
                self.fill_rect(bar_x, base, bar_width, bar_height, accent);
            }
            let value_text = crate::core::format_number(*value);
            self.text(bar_x, base + bar_height + 3.0, size, false, text_color, &value_text);
            let label = self
                .wrap(label, slot, size, false)
                .into_iter()
                .next()
                .unwrap_or_default();
            self.text(bar_x, base - size - 3.0, size, false, text_color, &label);
        }
        self.y = base - size * 2.5;
    }

    fn signature(&mut self, signature: &Signature, x: f32) {
        let size = self.body_size();
        let styles = &self.branding.styles;
        let (text_color, muted) = (styles.text, styles.muted);

        self.ensure(size * 8.0);
        self.y -= size * 2.5;
        let y = self.y;
        self.line((x, y), (x + 220.0, y), text_color, 0.75);
        self.y -= 4.0;

        self.write_line(x, &signature.party, size, true, text_color);
        if let Some(name) = &signature.name {
            self.write_line(x, &format!("Name: {}", name), size * 0.9, false, text_color);
        }
        if let Some(title) = &signature.title {
            self.write_line(x, &format!("Title: {}", title), size * 0.9, false, text_color);
        }
        let date = signature.date.as_deref().unwrap_or("________________");
        self.write_line(x, &format!("Date: {}", date), size * 0.9, false, muted);
    }
}

/// Referencias de los objetos de una fuente incrustada
#[derive(Debug, Clone, Copy)]
struct EmbeddedRefs {
    type0: Ref,
    cid: Ref,
    descriptor: Ref,
    file: Ref,
    to_unicode: Ref,
    cid_to_gid: Ref,
}

impl EmbeddedRefs {
    fn alloc(next: &mut i32) -> Self {
        let mut take = || {
            let id = Ref::new(*next);
            *next += 1;
            id
        };
        EmbeddedRefs {
            type0: take(),
            cid: take(),
            descriptor: take(),
            file: take(),
            to_unicode: take(),
            cid_to_gid: take(),
        }
    }
}

/// Renderizador PDF
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    portrait: PageGeometry,
    slide: PageGeometry,
    fonts: FontChain,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfRenderer {
    /// Usa las fuentes TrueType del sistema para el texto fuera de Latin-1
    pub fn new() -> Self {
        PdfRenderer {
            portrait: PageGeometry::default(),
            slide: PageGeometry::landscape(),
            fonts: FontChain::system(),
        }
    }

    pub fn with_geometry(mut self, portrait: PageGeometry) -> Self {
        self.portrait = portrait;
        self
    }

    pub fn with_fonts(mut self, fonts: FontChain) -> Self {
        self.fonts = fonts;
        self
    }

    fn compress(data: &[u8]) -> DocumentResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).map_err(DocumentError::generation)?;
        encoder.finish().map_err(DocumentError::generation)
    }

    /// Escribe Type0 + CIDFontType2 con el programa completo, anchos, CIDToGIDMap y ToUnicode
    fn write_embedded_font(
        pdf: &mut Pdf,
        ids: EmbeddedRefs,
        program: &FontProgram,
        face: &Face<'_>,
        used: &BTreeMap<u16, (u16, char)>,
    ) -> DocumentResult<()> {
        let scale = 1000.0 / face.units_per_em().max(1) as f32;
        let advance = |glyph: u16| face.glyph_hor_advance(GlyphId(glyph)).unwrap_or(0) as f32 * scale;
        let base_font = Name(program.name().as_bytes());
        let system_info = SystemInfo {
            registry: Str(b"Adobe"),
            ordering: Str(b"Identity"),
            supplement: 0,
        };

        pdf.type0_font(ids.type0)
            .base_font(base_font)
            .encoding_predefined(Name(b"Identity-H"))
            .descendant_font(ids.cid)
            .to_unicode(ids.to_unicode);

        let mut cid_font = pdf.cid_font(ids.cid);
        cid_font
            .subtype(CidFontType::Type2)
            .base_font(base_font)
            .system_info(system_info)
            .font_descriptor(ids.descriptor)
            .default_width(advance(0))
            .cid_to_gid_map_stream(ids.cid_to_gid);
        let mut widths = cid_font.widths();
        for (cid, (glyph, _)) in used {
            widths.consecutive(*cid, [advance(*glyph)]);
        }
        widths.finish();
        cid_font.finish();

        let bbox = face.global_bounding_box();
        let ascender = face.ascender();
        pdf.font_descriptor(ids.descriptor)
            .name(base_font)
            .flags(FontFlags::SYMBOLIC)
            .bbox(Rect::new(
                bbox.x_min as f32 * scale,
                bbox.y_min as f32 * scale,
                bbox.x_max as f32 * scale,
                bbox.y_max as f32 * scale,
            ))
            .italic_angle(0.0)
            .ascent(ascender as f32 * scale)
            .descent(face.descender() as f32 * scale)
            .cap_height(face.capital_height().unwrap_or(ascender) as f32 * scale)
            .stem_v(80.0)
            .font_file2(ids.file);

        let program_data = Self::compress(program.data())?;
        let mut file = pdf.stream(ids.file, &program_data);
        file.filter(Filter::FlateDecode);
        file.pair(Name(b"Length1"), program.data().len() as i32);
        file.finish();

        // dos bytes big-endian por CID; los CID de otras fuentes quedan en 0
        let max_cid = used.keys().next_back().copied().unwrap_or(0) as usize;
        let mut map = vec![0u8; 2 * (max_cid + 1)];
        for (cid, (glyph, _)) in used {
            let at = 2 * *cid as usize;
            map[at..at + 2].copy_from_slice(&glyph.to_be_bytes());
        }
        let map = Self::compress(&map)?;
        pdf.stream(ids.cid_to_gid, &map).filter(Filter::FlateDecode);

        let mut cmap = UnicodeCmap::new(Name(b"Custom"), system_info);
        for (cid, (_, c)) in used {
            cmap.pair(*cid, *c);
        }
        let cmap = cmap.finish();
        pdf.cmap(ids.to_unicode, &cmap)
            .name(Name(b"Custom"))
            .system_info(system_info);
        Ok(())
    }
}

impl FormatRenderer for PdfRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn render(&self, layout: &Layout, branding: &AppliedBranding) -> DocumentResult<GeneratedBuffer> {
        let logo_pixels = match &branding.logo {
            Some(logo) => Some((logo, Self::compress(&logo.rgb_pixels()?)?)),
            None => None,
        };

        let mut painter = Painter::new(
            branding,
            &self.fonts,
            logo_pixels.is_some(),
            self.portrait,
            self.slide,
        );
        for page in &layout.pages {
            painter.render_page(page);
        }
        if painter.pages.is_empty() {
            painter.geometry = self.portrait;
            painter.start_page();
        }
        painter.append_full_disclosure();
        let total = painter.pages.len();
        for index in 0..total {
            painter.draw_footer(index, total);
        }

        if painter.replaced > 0 {
            tracing::warn!(
                characters = painter.replaced,
                "No TrueType font available, text outside Latin-1 was replaced"
            );
        }

        if !painter.fonts.missing.is_empty() {
            let characters: String = painter.fonts.missing.iter().collect();
            tracing::warn!(
                count = painter.fonts.missing.len(),
                characters = %characters,
                "No configured font has a glyph for these characters, add one to pdf.font_paths"
            );
        }

        let Painter { face, fonts, pages, .. } = painter;

        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let regular_id = Ref::new(3);
        let bold_id = Ref::new(4);
        let logo_id = Ref::new(5);
        let info_id = Ref::new(6);
        let first_page = 10;

        let page_ids: Vec<Ref> = (0..total).map(|i| Ref::new(first_page + 2 * i as i32)).collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id)
            .kids(page_ids.iter().copied())
            .count(total as i32);

        pdf.type1_font(regular_id)
            .base_font(Name(face.base_font(false)))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_id)
            .base_font(Name(face.base_font(true)))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        // las fuentes incrustadas van tras las páginas y sólo si se usaron
        let mut next_id = first_page + 2 * total as i32;
        let mut embedded = Vec::new();
        for index in fonts.used_faces() {
            let ids = EmbeddedRefs::alloc(&mut next_id);
            let (program, face) = &fonts.faces[index];
            Self::write_embedded_font(&mut pdf, ids, program, face, &fonts.used[index])?;
            embedded.push((embedded_name(index), ids.type0));
        }

        if let Some((logo, data)) = &logo_pixels {
            let mut image = pdf.image_xobject(logo_id, data);
            image.filter(Filter::FlateDecode);
            image.width(logo.width as i32);
            image.height(logo.height as i32);
            image.color_space().device_rgb();
            image.bits_per_component(8);
            image.finish();
        }

        for (page, page_id) in pages.into_iter().zip(page_ids.iter().copied()) {
            let content_id = Ref::new(page_id.get() + 1);
            let (width, height) = page.geometry.dimensions();

            let mut writer = pdf.page(page_id);
            writer.media_box(Rect::new(0.0, 0.0, width, height));
            writer.parent(tree_id);
            writer.contents(content_id);
            let mut resources = writer.resources();
            let mut page_fonts = resources.fonts();
            page_fonts.pair(REGULAR, regular_id).pair(BOLD, bold_id);
            for (name, id) in &embedded {
                page_fonts.pair(Name(name.as_bytes()), *id);
            }
            page_fonts.finish();
            if logo_pixels.is_some() {
                resources.x_objects().pair(LOGO, logo_id);
            }
            resources.finish();
            writer.finish();

            pdf.stream(content_id, &page.content.finish());
        }

        pdf.document_info(info_id)
            .title(TextStr(&layout.title))
            .author(TextStr(&branding.company_name))
            .producer(TextStr("document-service"));

        let bytes = pdf.finish();
        tracing::debug!(
            pages = total,
            embedded_fonts = embedded.len(),
            size = bytes.len(),
            "PDF rendered"
        );

        Ok(GeneratedBuffer {
            bytes,
            page_count: Some(total as u32),
        })
    }
}
