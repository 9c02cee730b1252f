use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::branding::StyleTokens;
use crate::models::OutputFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateCategory {
    Report,
    Memo,
    Contract,
    Letter,
    Presentation,
    Financial,
}

impl TemplateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::Report => "report",
            TemplateCategory::Memo => "memo",
            TemplateCategory::Contract => "contract",
            TemplateCategory::Letter => "letter",
            TemplateCategory::Presentation => "presentation",
            TemplateCategory::Financial => "financial",
        }
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(TemplateCategory::Report),
            "memo" => Ok(TemplateCategory::Memo),
            "contract" => Ok(TemplateCategory::Contract),
            "letter" => Ok(TemplateCategory::Letter),
            "presentation" => Ok(TemplateCategory::Presentation),
            "financial" => Ok(TemplateCategory::Financial),
            other => Err(format!("unknown template category: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub id: String,
    pub required: bool,
}

impl SectionSpec {
    pub fn required(id: &str) -> Self {
        SectionSpec {
            id: id.to_string(),
            required: true,
        }
    }

    pub fn optional(id: &str) -> Self {
        SectionSpec {
            id: id.to_string(),
            required: false,
        }
    }
}

/// Plano inmutable de un documento
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: TemplateCategory,
    pub supported_formats: Vec<OutputFormat>,
    pub default_format: OutputFormat,
    pub sections: Vec<SectionSpec>,
    pub default_styles: StyleTokens,
}

impl Template {
    pub fn supports(&self, format: OutputFormat) -> bool {
        self.supported_formats.contains(&format)
    }

    pub fn required_sections(&self) -> impl Iterator<Item = &SectionSpec> {
        self.sections.iter().filter(|s| s.required)
    }

    pub fn summary(&self) -> TemplateSummary {
        TemplateSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            supported_formats: self.supported_formats.clone(),
            default_format: self.default_format,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: TemplateCategory,
    pub supported_formats: Vec<OutputFormat>,
    pub default_format: OutputFormat,
}

/// Resultado de validar contenido contra una plantilla
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentValidation {
    pub valid: bool,
    pub missing: Vec<String>,
    pub error: Option<String>,
}
