pub mod registry;
pub mod template_models;
pub mod templates;

pub use registry::{check_content, missing_sections, TemplateRegistry};
pub use template_models::*;
