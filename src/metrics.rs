//! Prometheus metrics registered in the default registry.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec, TextEncoder,
};

use crate::core::ErrorKind;
use crate::models::OutputFormat;

pub static DOCUMENTS_GENERATED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "documents_generated_total",
        "Documents generated and stored",
        &["template", "format"]
    )
    .expect("documents_generated_total is registered once")
});

pub static GENERATION_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "document_generation_failures_total",
        "Failed generation requests by error kind",
        &["kind"]
    )
    .expect("document_generation_failures_total is registered once")
});

pub static GENERATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "document_generation_seconds",
        "Time spent rendering a document",
        &["format"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("document_generation_seconds is registered once")
});

pub static DOCUMENT_SIZE_BYTES: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "document_size_bytes",
        "Size of generated documents",
        &["format"],
        vec![4096.0, 16384.0, 65536.0, 262144.0, 1048576.0, 4194304.0, 16777216.0]
    )
    .expect("document_size_bytes is registered once")
});

pub fn observe_render(format: OutputFormat, seconds: f64) {
    GENERATION_SECONDS
        .with_label_values(&[format.as_str()])
        .observe(seconds);
}

pub fn record_success(template_id: &str, format: OutputFormat, size_bytes: u64) {
    DOCUMENTS_GENERATED
        .with_label_values(&[template_id, format.as_str()])
        .inc();
    DOCUMENT_SIZE_BYTES
        .with_label_values(&[format.as_str()])
        .observe(size_bytes as f64);
}

pub fn record_failure(kind: ErrorKind) {
    GENERATION_FAILURES
        .with_label_values(&[&kind.to_string()])
        .inc();
}

/// Default registry in the text exposition format.
pub fn render() -> prometheus::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_metrics_are_exported() {
        record_success("memo-executive", OutputFormat::Pdf, 1200);
        observe_render(OutputFormat::Pdf, 0.02);
        record_failure(ErrorKind::Validation);

        let text = String::from_utf8(render().unwrap()).unwrap();
        assert!(text.contains(r#"documents_generated_total{format="pdf",template="memo-executive"}"#));
        assert!(text.contains(r#"document_generation_failures_total{kind="validation"}"#));
        assert!(text.contains("document_generation_seconds_bucket"));
        assert!(text.contains("document_size_bytes_count"));
    }
}
