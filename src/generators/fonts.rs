//! Fuentes TrueType para el texto que las fuentes estándar del PDF no cubren.
//!
//! Helvetica, Times y Courier sólo conocen WinAnsi (Latin-1 ampliado). Los
//! caracteres de otros alfabetos se escriben con una fuente Type0 cuyo
//! programa TrueType se incrusta completo en el documento.

use once_cell::sync::Lazy;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ttf_parser::{name_id, Face};

use crate::core::{DocumentError, DocumentResult};

/// Rutas donde suelen instalarse fuentes con cobertura Unicode amplia
const SYSTEM_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\arialuni.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static SYSTEM_FONTS: Lazy<FontChain> = Lazy::new(|| {
    let paths: Vec<PathBuf> = SYSTEM_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .filter(|path| path.is_file())
        .collect();
    let chain = FontChain::load(&paths);
    if chain.is_empty() {
        tracing::warn!("No TrueType font found, PDF text outside Latin-1 will be replaced with '?'");
    } else {
        tracing::debug!(fonts = chain.len(), "System fonts loaded for PDF output");
    }
    chain
});

/// Programa TrueType validado y listo para incrustar
pub struct FontProgram {
    name: String,
    data: Vec<u8>,
}

impl FontProgram {
    pub fn from_bytes(data: Vec<u8>) -> DocumentResult<Self> {
        if ttf_parser::fonts_in_collection(&data).is_some() {
            return Err(DocumentError::Generation(
                "font collections (.ttc) cannot be embedded".into(),
            ));
        }
        let name = {
            let face = Face::parse(&data, 0)
                .map_err(|e| DocumentError::Generation(format!("invalid font: {}", e)))?;
            // CIDFontType2 exige contornos glyf; las fuentes CFF no sirven
            if face.tables().glyf.is_none() {
                return Err(DocumentError::Generation(
                    "only TrueType (glyf) fonts can be embedded".into(),
                ));
            }
            postscript_name(&face).unwrap_or_else(|| "EmbeddedSans".to_string())
        };
        Ok(FontProgram { name, data })
    }

    pub fn load(path: &Path) -> DocumentResult<Self> {
        let data = std::fs::read(path).map_err(|e| {
            DocumentError::Generation(format!("failed to read font {}: {}", path.display(), e))
        })?;
        Self::from_bytes(data)
    }

    /// Nombre PostScript, usado como BaseFont
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Validada al cargar, así que sólo falla si los bytes cambian
    pub fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, 0).ok()
    }
}

impl fmt::Debug for FontProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontProgram")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// El nombre PostScript admite sólo ASCII imprimible sin delimitadores
fn postscript_name(face: &Face<'_>) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == name_id::POST_SCRIPT_NAME)
        .find_map(|name| name.to_string())
        .map(|name| {
            name.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
}

/// Fuentes de respaldo en orden de preferencia. Cada carácter usa la primera que tenga su glifo.
#[derive(Debug, Clone, Default)]
pub struct FontChain {
    programs: Vec<Arc<FontProgram>>,
}

impl FontChain {
    /// Carga las rutas dadas; las que fallan se registran y se omiten
    pub fn load(paths: &[PathBuf]) -> Self {
        let mut programs = Vec::new();
        for path in paths {
            match FontProgram::load(path) {
                Ok(program) => programs.push(Arc::new(program)),
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping font"),
            }
        }
        FontChain { programs }
    }

    /// Fuentes del sistema, detectadas una sola vez por proceso
    pub fn system() -> Self {
        SYSTEM_FONTS.clone()
    }

    /// Las rutas configuradas primero y después las del sistema
    pub fn configured(paths: &[PathBuf]) -> Self {
        let mut chain = Self::load(paths);
        chain.programs.extend(SYSTEM_FONTS.programs.iter().cloned());
        chain
    }

    pub fn push(mut self, program: FontProgram) -> Self {
        self.programs.push(Arc::new(program));
        self
    }

    pub fn programs(&self) -> &[Arc<FontProgram>] {
        &self.programs
    }

    /// Alguna fuente de la cadena tiene glifo para `c`
    pub fn covers(&self, c: char) -> bool {
        self.programs
            .iter()
            .any(|program| program.face().map_or(false, |face| face.glyph_index(c).is_some()))
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_not_a_font() {
        let err = FontProgram::from_bytes(b"definitely not a font".to_vec()).unwrap_err();
        assert!(matches!(err, DocumentError::Generation(_)));
    }

    #[test]
    fn missing_paths_are_skipped() {
        let chain = FontChain::load(&[PathBuf::from("/nonexistent/font.ttf")]);
        assert!(chain.is_empty());
    }

    #[test]
    fn empty_chain_covers_nothing() {
        assert!(!FontChain::default().covers('a'));
    }

    #[test]
    fn system_fonts_expose_a_postscript_name() {
        for program in FontChain::system().programs() {
            assert!(!program.name().is_empty());
            assert!(program.name().chars().all(|c| c.is_ascii_graphic()));
            assert!(program.face().is_some());
        }
    }
}
