use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSize {
    A4,
    Letter,
    Legal,
    Custom(f32, f32), // width, height in points
}

impl PageSize {
    /// Dimensiones en puntos PDF (1/72 pulgada), orientación vertical
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.0, 842.0),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom(w, h) => (*w, *h),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Margin {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margin {
    fn default() -> Self {
        Margin::uniform(56.0)
    }
}

impl Margin {
    pub fn uniform(size: f32) -> Self {
        Margin {
            top: size,
            bottom: size,
            left: size,
            right: size,
        }
    }
}

/// Geometría de página usada por el renderizador PDF
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margin: Margin,
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry {
            page_size: PageSize::Letter,
            orientation: Orientation::Portrait,
            margin: Margin::default(),
        }
    }
}

impl PageGeometry {
    pub fn landscape() -> Self {
        PageGeometry {
            page_size: PageSize::Custom(540.0, 960.0),
            orientation: Orientation::Landscape,
            margin: Margin::uniform(40.0),
        }
    }

    pub fn dimensions(&self) -> (f32, f32) {
        let (w, h) = self.page_size.dimensions();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn content_width(&self) -> f32 {
        let (w, _) = self.dimensions();
        w - self.margin.left - self.margin.right
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub pdf: PdfSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Token bearer aceptado por la API
    pub api_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    S3,
    Local,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub bucket: String,
    pub endpoint: Option<String>,
    pub local_root: String,
    pub public_base_url: String,
    pub signing_secret: String,
    pub url_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PdfSettings {
    /// Fuentes TrueType para texto fuera de Latin-1, antes que las del sistema
    #[serde(default)]
    pub font_paths: Vec<String>,
}

impl Settings {
    /// Valores por defecto, luego `docgen.toml` si existe, luego variables `DOCGEN__*`
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("auth.api_token", "")?
            .set_default("storage.backend", "local")?
            .set_default("storage.bucket", "documents")?
            .set_default("storage.local_root", "./data/objects")?
            .set_default("storage.public_base_url", "http://localhost:8080")?
            .set_default("storage.signing_secret", "change-me")?
            .set_default("storage.url_ttl_seconds", 3600)?
            .set_default("database.url", "sqlite://data/documents.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .add_source(config::File::with_name("docgen").required(false))
            .add_source(
                config::Environment::with_prefix("DOCGEN")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("pdf.font_paths")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_swaps_dimensions() {
        let geometry = PageGeometry::landscape();
        let (w, h) = geometry.dimensions();
        assert!(w > h);
    }

    #[test]
    fn content_width_subtracts_margins() {
        let geometry = PageGeometry::default();
        assert_eq!(geometry.content_width(), 612.0 - 112.0);
    }

    #[test]
    fn settings_load_with_defaults() {
        let settings = Settings::load().unwrap();
        assert_eq!(settings.storage.url_ttl_seconds, 3600);
        assert!(!settings.storage.bucket.is_empty());
        assert!(settings.pdf.font_paths.is_empty());
    }
}
