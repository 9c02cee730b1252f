//! Empaquetado zip compartido por los renderizadores DOCX y PPTX.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::core::{DocumentError, DocumentResult};

pub const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// 1 pt = 12700 EMU
pub const EMU_PER_POINT: i64 = 12_700;

pub fn emu(points: f32) -> i64 {
    (points as f64 * EMU_PER_POINT as f64).round() as i64
}

/// Escapa texto para contenido de elementos y valores de atributos.
///
/// Se descartan los caracteres de control que XML 1.0 no admite.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 => {}
            c => out.push(c),
        }
    }
    out
}

/// Paquete OPC en construcción
pub struct Package {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: FileOptions,
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

impl Package {
    pub fn new() -> Self {
        Package {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    pub fn add(&mut self, path: &str, data: &[u8]) -> DocumentResult<()> {
        self.writer.start_file(path, self.options)?;
        self.writer
            .write_all(data)
            .map_err(|e| DocumentError::Generation(format!("writing {}: {}", path, e)))
    }

    pub fn add_xml(&mut self, path: &str, xml: &str) -> DocumentResult<()> {
        self.add(path, xml.as_bytes())
    }

    pub fn finish(mut self) -> DocumentResult<Vec<u8>> {
        let cursor = self.writer.finish()?;
        Ok(cursor.into_inner())
    }
}

/// `docProps/core.xml`
pub fn core_properties(title: &str, creator: &str) -> String {
    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"{XML_HEADER}
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{title}</dc:title><dc:creator>{creator}</dc:creator><cp:lastModifiedBy>{creator}</cp:lastModifiedBy><dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified></cp:coreProperties>"#,
        title = xml_escape(title),
        creator = xml_escape(creator),
    )
}

/// `docProps/app.xml`
pub fn app_properties(application: &str) -> String {
    format!(
        r#"{XML_HEADER}
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>{}</Application></Properties>"#,
        xml_escape(application)
    )
}

/// Relaciones de nivel de paquete hacia la parte principal y las propiedades
pub fn package_rels(main_part: &str) -> String {
    format!(
        r#"{XML_HEADER}
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="{main_part}"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#
    )
}

/// Una relación `<Relationship>` individual
pub fn relationship(id: &str, kind: &str, target: &str) -> String {
    format!(
        r#"<Relationship Id="{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/{kind}" Target="{target}"/>"#
    )
}

pub fn relationships(entries: &[String]) -> String {
    format!(
        r#"{XML_HEADER}
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        entries.concat()
    )
}

/// Lee una parte de un paquete ya generado
#[cfg(test)]
pub(crate) fn read_part(bytes: &[u8], name: &str) -> String {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    let mut file = archive.by_name(name).expect("part present");
    let mut out = String::new();
    file.read_to_string(&mut out).expect("utf-8 part");
    out
}

#[cfg(test)]
pub(crate) fn part_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
    archive.file_names().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_and_drops_control_chars() {
        assert_eq!(xml_escape("A & B <c> \"d\""), "A &amp; B &lt;c&gt; &quot;d&quot;");
        assert_eq!(xml_escape("bell\u{7}"), "bell");
    }

    #[test]
    fn package_round_trips_parts() {
        let mut package = Package::new();
        package.add_xml("a/b.xml", "<x/>").unwrap();
        package.add("c.bin", &[1, 2, 3]).unwrap();
        let bytes = package.finish().unwrap();

        assert_eq!(read_part(&bytes, "a/b.xml"), "<x/>");
        assert_eq!(part_names(&bytes).len(), 2);
    }

    #[test]
    fn points_convert_to_emu() {
        assert_eq!(emu(1.0), 12_700);
        assert_eq!(emu(960.0), 12_192_000);
    }
}
