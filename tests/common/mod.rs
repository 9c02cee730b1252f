#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use document_service::branding::{AppliedBranding, BrandingResolver, BrandingStore, MemoryBrandingStore, TenantBranding};
use document_service::generators::{DocumentGenerator, GeneratedBuffer, GeneratorSet, StrategyTable};
use document_service::models::{GenerateRequest, OutputFormat};
use document_service::storage::{DocumentStorage, MemoryMetadataStore, MemoryObjectStore};
use document_service::templates::{Template, TemplateRegistry};
use document_service::{DocumentResult, DocumentService};

pub const DISCLOSURE: &str = "Acme Confidential";

/// Counts calls and delegates to the real generator.
pub struct CountingGenerator {
    inner: Arc<dyn DocumentGenerator>,
    calls: Arc<AtomicUsize>,
}

impl DocumentGenerator for CountingGenerator {
    fn format(&self) -> OutputFormat {
        self.inner.format()
    }

    fn generate(&self, template: &Template, content: &Value, branding: &AppliedBranding) -> DocumentResult<GeneratedBuffer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate(template, content, branding)
    }
}

pub struct Harness {
    pub service: DocumentService,
    pub objects: Arc<MemoryObjectStore>,
    pub metadata: Arc<MemoryMetadataStore>,
    pub branding: Arc<MemoryBrandingStore>,
    pub generator_calls: Arc<AtomicUsize>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_metadata(Arc::new(MemoryMetadataStore::new())).await
    }

    pub async fn with_metadata(metadata: Arc<MemoryMetadataStore>) -> Self {
        let objects = Arc::new(MemoryObjectStore::new());
        let branding = Arc::new(MemoryBrandingStore::new());
        branding
            .save(
                "t1",
                &TenantBranding {
                    company_name: Some("Acme".into()),
                    footer_text: Some(DISCLOSURE.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let standard = GeneratorSet::standard(Arc::new(StrategyTable::builtin()));
        let mut generators = GeneratorSet::new();
        for format in OutputFormat::ALL {
            generators = generators.with(Arc::new(CountingGenerator {
                inner: standard.get(format).unwrap(),
                calls: calls.clone(),
            }));
        }

        let service = DocumentService::new(
            Arc::new(TemplateRegistry::builtin()),
            generators,
            BrandingResolver::new(branding.clone()),
            DocumentStorage::new(objects.clone(), metadata.clone(), Duration::from_secs(300)),
        );

        Harness {
            service,
            objects,
            metadata,
            branding,
            generator_calls: calls,
        }
    }

    pub fn calls(&self) -> usize {
        self.generator_calls.load(Ordering::SeqCst)
    }
}

pub fn request(tenant_id: &str, template_id: &str, format: Option<OutputFormat>, content: Value) -> GenerateRequest {
    GenerateRequest {
        tenant_id: tenant_id.into(),
        user_id: "u1".into(),
        template_id: template_id.into(),
        format,
        content,
        title: None,
        metadata: None,
    }
}

/// Smallest content that satisfies each built-in template.
pub fn minimal_content(template_id: &str) -> Value {
    match template_id {
        "report-standard" => json!({
            "executiveSummary": "Revenue grew.",
            "sections": [{"title": "Results", "content": "Strong quarter."}]
        }),
        "memo-executive" => json!({
            "header": {"to": "Board", "from": "CEO", "date": "2026-01-01"},
            "body": "Status update."
        }),
        "agreement-standard" => json!({
            "header": {"title": "Services Agreement"},
            "parties": [{"name": "Acme"}, {"name": "Globex"}],
            "terms": [{"title": "Scope", "text": "Consulting services."}],
            "signatures": [{"party": "Acme"}, {"party": "Globex"}]
        }),
        "letter-formal" => json!({
            "sender": {"name": "Ana Ruiz"},
            "recipient": {"name": "Mr. Smith"},
            "body": "Thank you for your order."
        }),
        "deck-standard" => json!({
            "slides": [{"title": "Agenda", "bullets": ["Intro", "Plan"]}]
        }),
        "model-cashflow" => json!({
            "assumptions": {"Growth": "5%", "Starting cash": "$1,234.56"},
            "projections": {"Revenue": ["$100", "$120"]}
        }),
        "model-proforma" => json!({
            "assumptions": {"Tax rate": "21%"},
            "incomeStatement": {"Revenue": [100, 200], "Costs": [40, 90]}
        }),
        other => panic!("no fixture for {}", other),
    }
}

/// Readable text of a generated binary: every part of an OOXML package, or the text drawn in a PDF.
pub fn binary_text(bytes: &[u8]) -> String {
    if bytes.starts_with(b"%PDF") {
        return pdf_text(bytes);
    }
    if !bytes.starts_with(b"PK") {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut out = String::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut raw = Vec::new();
        file.read_to_end(&mut raw).unwrap();
        out.push_str(&String::from_utf8_lossy(&raw));
        out.push('\n');
    }
    out
}

/// Text shown by the uncompressed content streams of a PDF, one line per text
/// object. Strings in embedded `U*` fonts are two-byte CIDs decoded through the
/// document's ToUnicode maps; the standard fonts are read as Latin-1.
pub fn pdf_text(bytes: &[u8]) -> String {
    let cids = to_unicode_entries(bytes);
    let mut out = String::new();
    for stream in plain_streams(bytes) {
        decode_content(stream, &cids, &mut out);
    }
    out
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|at| at + from)
}

/// Bodies of streams without a filter, skipping CMaps.
fn plain_streams(bytes: &[u8]) -> Vec<&[u8]> {
    let mut streams = Vec::new();
    let mut pos = 0;
    while let Some(marker) = find(bytes, b">>\nstream\n", pos) {
        let start = marker + b">>\nstream\n".len();
        let end = find(bytes, b"\nendstream", start).unwrap_or(bytes.len());
        let header_start = bytes[..marker]
            .windows(4)
            .rposition(|w| w == b" obj")
            .unwrap_or(0);
        let header = &bytes[header_start..marker];
        if find(header, b"/Filter", 0).is_none() && find(header, b"/CMap", 0).is_none() {
            streams.push(&bytes[start..end]);
        }
        pos = end;
    }
    streams
}

/// `<cid> <utf16be>` pairs of every ToUnicode map in the file.
fn to_unicode_entries(bytes: &[u8]) -> HashMap<u16, String> {
    let text = String::from_utf8_lossy(bytes);
    let mut map = HashMap::new();
    for section in text.split("beginbfchar").skip(1) {
        let body = section.split("endbfchar").next().unwrap_or("");
        for line in body.lines() {
            let mut parts = line.split_whitespace();
            let (Some(code), Some(unicode)) = (parts.next(), parts.next()) else {
                continue;
            };
            let trim = |s: &str| s.trim_matches(|c| c == '<' || c == '>').to_string();
            let (code, unicode) = (trim(code), trim(unicode));
            let Ok(cid) = u16::from_str_radix(&code, 16) else {
                continue;
            };
            let units: Vec<u16> = (0..unicode.len() / 4)
                .filter_map(|k| u16::from_str_radix(&unicode[4 * k..4 * k + 4], 16).ok())
                .collect();
            map.insert(cid, String::from_utf16_lossy(&units));
        }
    }
    map
}

fn is_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || b"()<>[]{}/%".contains(&byte)
}

fn decode_content(data: &[u8], cids: &HashMap<u16, String>, out: &mut String) {
    let mut font: Vec<u8> = Vec::new();
    let mut last_name: Vec<u8> = Vec::new();
    let mut pending: Option<Vec<u8>> = None;
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'/' => {
                let start = i + 1;
                i = start;
                while i < data.len() && !is_delimiter(data[i]) {
                    i += 1;
                }
                last_name = data[start..i].to_vec();
            }
            b'(' => {
                let (string, next) = literal_string(data, i + 1);
                pending = Some(string);
                i = next;
            }
            b'<' if data.get(i + 1) != Some(&b'<') => {
                let end = find(data, b">", i).unwrap_or(data.len());
                pending = Some(hex_string(&data[i + 1..end]));
                i = end + 1;
            }
            byte if byte.is_ascii_alphabetic() => {
                let start = i;
                while i < data.len() && (data[i].is_ascii_alphabetic() || data[i] == b'*') {
                    i += 1;
                }
                match &data[start..i] {
                    b"Tf" => font = last_name.clone(),
                    b"Tj" => {
                        if let Some(string) = pending.take() {
                            decode_string(&font, &string, cids, out);
                        }
                    }
                    b"ET" => out.push('\n'),
                    _ => {}
                }
            }
            _ => i += 1,
        }
    }
}

fn decode_string(font: &[u8], string: &[u8], cids: &HashMap<u16, String>, out: &mut String) {
    if font.starts_with(b"U") {
        for pair in string.chunks(2) {
            let cid = u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]);
            match cids.get(&cid) {
                Some(text) => out.push_str(text),
                None => out.push('\u{FFFD}'),
            }
        }
    } else {
        out.extend(string.iter().map(|&b| char::from(b)));
    }
}

fn literal_string(data: &[u8], mut i: usize) -> (Vec<u8>, usize) {
    let mut out = Vec::new();
    let mut depth = 1;
    while i < data.len() {
        let byte = data[i];
        i += 1;
        match byte {
            b'\\' => {
                let Some(&escaped) = data.get(i) else { break };
                i += 1;
                match escaped {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'0'..=b'7' => {
                        let mut value = u32::from(escaped - b'0');
                        for _ in 0..2 {
                            match data.get(i) {
                                Some(digit) if (b'0'..=b'7').contains(digit) => {
                                    value = value * 8 + u32::from(digit - b'0');
                                    i += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push(value as u8);
                    }
                    other => out.push(other),
                }
            }
            b'(' => {
                depth += 1;
                out.push(byte);
            }
            b')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
                out.push(byte);
            }
            _ => out.push(byte),
        }
    }
    (out, i)
}

fn hex_string(hex: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .iter()
        .filter_map(|b| (*b as char).to_digit(16).map(|d| d as u8))
        .collect();
    digits
        .chunks(2)
        .map(|pair| pair[0] << 4 | pair.get(1).copied().unwrap_or(0))
        .collect()
}
