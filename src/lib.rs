pub mod api;
pub mod branding;
pub mod core;
pub mod generators;
pub mod metrics;
pub mod models;
pub mod service;
pub mod storage;
pub mod templates;

pub use crate::core::{DocumentError, DocumentResult, ErrorKind, Settings};
pub use branding::{BrandingProfile, BrandingResolver, TenantBranding};
pub use generators::{DocumentGenerator, GeneratorSet, StrategyTable};
pub use models::{DocumentPage, DocumentRecord, GenerateRequest, GeneratedDocument, ListOptions, OutputFormat};
pub use service::DocumentService;
pub use storage::DocumentStorage;
pub use templates::{Template, TemplateRegistry};
