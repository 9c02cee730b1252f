//! Identidad visual del tenant y su combinación con los valores de plantilla y sistema.
//!
//! La precedencia de cada token es estrictamente tenant → plantilla → sistema.
//! [`merge_styles`] recorre las capas en ese orden y toma el primer valor
//! válido, de modo que el resultado siempre queda completo.

pub mod store;

use image::GenericImageView;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::core::{DocumentError, DocumentResult};

pub use store::{BrandingStore, MemoryBrandingStore, SqliteBrandingStore};

pub const DEFAULT_COMPANY_NAME: &str = "Document Service";
pub const DEFAULT_DISCLAIMER: &str =
    "This document was generated automatically and is provided for informational purposes only.";

/// Conjunto parcial de tokens de estilo (una capa de la cascada)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleTokens {
    pub accent_color: Option<String>,
    pub text_color: Option<String>,
    pub muted_color: Option<String>,
    pub font_family: Option<String>,
    pub body_font_size: Option<f32>,
    pub heading_font_size: Option<f32>,
}

impl StyleTokens {
    pub fn with_accent(mut self, color: &str) -> Self {
        self.accent_color = Some(color.to_string());
        self
    }

    pub fn with_font(mut self, font: &str) -> Self {
        self.font_family = Some(font.to_string());
        self
    }

    pub fn with_sizes(mut self, body: f32, heading: f32) -> Self {
        self.body_font_size = Some(body);
        self.heading_font_size = Some(heading);
        self
    }
}

/// Última capa de la cascada; todos los tokens están definidos
pub static SYSTEM_STYLES: Lazy<StyleTokens> = Lazy::new(|| StyleTokens {
    accent_color: Some("#1F4E79".to_string()),
    text_color: Some("#222222".to_string()),
    muted_color: Some("#6B7280".to_string()),
    font_family: Some("Helvetica".to_string()),
    body_font_size: Some(11.0),
    heading_font_size: Some(18.0),
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Acepta `#RRGGBB` o `RRGGBB`
    pub fn parse(raw: &str) -> Option<Rgb> {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        Some(Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8))
    }

    /// `RRGGBB` en mayúsculas, como lo esperan los formatos OOXML
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    pub fn to_u32(&self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }

    pub fn to_unit(&self) -> (f32, f32, f32) {
        (
            self.0 as f32 / 255.0,
            self.1 as f32 / 255.0,
            self.2 as f32 / 255.0,
        )
    }
}

/// Estilos completamente resueltos tras la cascada
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyles {
    pub accent: Rgb,
    pub text: Rgb,
    pub muted: Rgb,
    pub font_family: String,
    pub body_font_size: f32,
    pub heading_font_size: f32,
}

fn first_color(layers: &[&StyleTokens], pick: fn(&StyleTokens) -> &Option<String>, fallback: Rgb) -> Rgb {
    for layer in layers {
        if let Some(raw) = pick(layer) {
            match Rgb::parse(raw) {
                Some(color) => return color,
                None => tracing::warn!(value = %raw, "Ignoring invalid color token"),
            }
        }
    }
    fallback
}

fn first_size(layers: &[&StyleTokens], pick: fn(&StyleTokens) -> Option<f32>, fallback: f32) -> f32 {
    for layer in layers {
        if let Some(size) = pick(layer) {
            if size.is_finite() && size > 0.0 {
                return size;
            }
            tracing::warn!(value = size, "Ignoring invalid font size token");
        }
    }
    fallback
}

/// Combinación ordenada de capas parciales; gana el primer valor válido.
///
/// Se llama con `[tenant, plantilla, sistema]`. Los valores fijos de respaldo
/// completan el resultado aunque ninguna capa aporte un token utilizable.
pub fn merge_styles(layers: &[&StyleTokens]) -> ResolvedStyles {
    let font_family = layers
        .iter()
        .filter_map(|layer| layer.font_family.as_deref())
        .map(str::trim)
        .find(|font| !font.is_empty())
        .unwrap_or("Helvetica")
        .to_string();

    ResolvedStyles {
        accent: first_color(layers, |l| &l.accent_color, Rgb(0x1F, 0x4E, 0x79)),
        text: first_color(layers, |l| &l.text_color, Rgb(0x22, 0x22, 0x22)),
        muted: first_color(layers, |l| &l.muted_color, Rgb(0x6B, 0x72, 0x80)),
        font_family,
        body_font_size: first_size(layers, |l| l.body_font_size, 11.0),
        heading_font_size: first_size(layers, |l| l.heading_font_size, 18.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoKind {
    Png,
    Jpeg,
}

/// Logotipo ya decodificado y validado
#[derive(Debug, Clone)]
pub struct Logo {
    pub bytes: Vec<u8>,
    pub kind: LogoKind,
    pub width: u32,
    pub height: u32,
}

impl Logo {
    pub fn decode(bytes: &[u8]) -> Option<Logo> {
        let kind = match image::guess_format(bytes).ok()? {
            image::ImageFormat::Png => LogoKind::Png,
            image::ImageFormat::Jpeg => LogoKind::Jpeg,
            other => {
                tracing::warn!(format = ?other, "Unsupported logo format");
                return None;
            }
        };
        let decoded = match image::load_from_memory(bytes) {
            Ok(img) => img,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode tenant logo");
                return None;
            }
        };
        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        Some(Logo {
            bytes: bytes.to_vec(),
            kind,
            width,
            height,
        })
    }

    pub fn extension(&self) -> &'static str {
        match self.kind {
            LogoKind::Png => "png",
            LogoKind::Jpeg => "jpeg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self.kind {
            LogoKind::Png => "image/png",
            LogoKind::Jpeg => "image/jpeg",
        }
    }

    /// Ancho para una altura dada, conservando la proporción
    pub fn scaled_width(&self, height: f32) -> f32 {
        height * self.width as f32 / self.height as f32
    }

    /// Píxeles RGB de 8 bits, para incrustar en PDF
    pub fn rgb_pixels(&self) -> DocumentResult<Vec<u8>> {
        let img = image::load_from_memory(&self.bytes).map_err(DocumentError::generation)?;
        Ok(img.to_rgb8().into_raw())
    }
}

/// Perfil de marca de un tenant tal como se almacena (todo opcional)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantBranding {
    #[serde(flatten)]
    pub styles: StyleTokens,
    pub logo_base64: Option<String>,
    pub company_name: Option<String>,
    pub footer_text: Option<String>,
    pub disclaimer: Option<String>,
}

/// Perfil de marca cargado: identidad con valores por defecto, estilos parciales
#[derive(Debug, Clone)]
pub struct BrandingProfile {
    pub styles: StyleTokens,
    pub logo_bytes: Option<Vec<u8>>,
    pub company_name: String,
    pub footer_text: Option<String>,
    pub disclaimer: String,
}

impl Default for BrandingProfile {
    fn default() -> Self {
        BrandingProfile {
            styles: StyleTokens::default(),
            logo_bytes: None,
            company_name: DEFAULT_COMPANY_NAME.to_string(),
            footer_text: None,
            disclaimer: DEFAULT_DISCLAIMER.to_string(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl BrandingProfile {
    pub fn from_tenant(branding: TenantBranding) -> Self {
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

        let logo_bytes = non_blank(branding.logo_base64).and_then(|encoded| {
            match BASE64.decode(encoded.trim()) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring logo with invalid base64");
                    None
                }
            }
        });

        BrandingProfile {
            styles: branding.styles,
            logo_bytes,
            company_name: non_blank(branding.company_name)
                .unwrap_or_else(|| DEFAULT_COMPANY_NAME.to_string()),
            footer_text: non_blank(branding.footer_text),
            disclaimer: non_blank(branding.disclaimer)
                .unwrap_or_else(|| DEFAULT_DISCLAIMER.to_string()),
        }
    }

    /// Texto de divulgación obligatorio en cada documento
    pub fn disclosure_text(&self) -> &str {
        self.footer_text.as_deref().unwrap_or(&self.disclaimer)
    }
}

/// Marca aplicada que reciben los renderizadores
#[derive(Debug, Clone)]
pub struct AppliedBranding {
    pub styles: ResolvedStyles,
    pub company_name: String,
    pub logo: Option<Logo>,
    pub disclosure: String,
}

pub fn apply_branding(template_defaults: &StyleTokens, profile: &BrandingProfile) -> AppliedBranding {
    let styles = merge_styles(&[&profile.styles, template_defaults, &SYSTEM_STYLES]);
    let logo = profile.logo_bytes.as_deref().and_then(Logo::decode);

    AppliedBranding {
        styles,
        company_name: profile.company_name.clone(),
        logo,
        disclosure: profile.disclosure_text().to_string(),
    }
}

/// Carga perfiles de marca desde el almacén configurado
#[derive(Clone)]
pub struct BrandingResolver {
    store: Arc<dyn BrandingStore>,
}

impl BrandingResolver {
    pub fn new(store: Arc<dyn BrandingStore>) -> Self {
        BrandingResolver { store }
    }

    pub async fn load_branding(&self, tenant_id: &str) -> DocumentResult<BrandingProfile> {
        match self.store.load(tenant_id).await? {
            Some(branding) => Ok(BrandingProfile::from_tenant(branding)),
            None => {
                tracing::debug!(tenant_id, "No branding configured, using system defaults");
                Ok(BrandingProfile::default())
            }
        }
    }
}
