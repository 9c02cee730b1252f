mod common;

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

use common::{binary_text, minimal_content, request, Harness, DISCLOSURE};
use document_service::models::{ListOptions, OutputFormat};
use document_service::storage::{MemoryMetadataStore, MetadataStore, ObjectStore};
use document_service::templates::TemplateRegistry;
use document_service::branding::{BrandingStore, TenantBranding};
use document_service::DocumentError;

#[test]
fn every_template_declares_consistent_formats() {
    let registry = TemplateRegistry::builtin();
    let templates = registry.list(None);
    assert_eq!(templates.len(), 7);
    for template in templates {
        assert!(!template.supported_formats.is_empty(), "{}", template.id);
        assert!(template.supported_formats.contains(&template.default_format), "{}", template.id);
    }
}

#[tokio::test]
async fn every_template_renders_in_every_supported_format() {
    let harness = Harness::new().await;
    let registry = TemplateRegistry::builtin();

    for summary in registry.list(None) {
        for format in summary.supported_formats.iter().copied() {
            let content = minimal_content(&summary.id);
            let document = harness
                .service
                .generate_document(request("t1", &summary.id, Some(format), content))
                .await
                .unwrap_or_else(|e| panic!("{} as {}: {}", summary.id, format, e));

            assert_eq!(document.format, format);
            assert!(document.size_bytes > 0);
            assert!(document.filename.ends_with(&format!(".{}", format.extension())));
            assert!(!document.download_url.is_empty());

            let view = harness.service.get_document(&document.doc_id, "t1").await.unwrap();
            let bytes = harness.objects.get(&view.record.storage_path).await.unwrap();
            assert_eq!(bytes.len() as u64, document.size_bytes);
            assert!(
                binary_text(&bytes).contains(DISCLOSURE),
                "{} as {} is missing the disclosure",
                summary.id,
                format
            );
        }
    }
}

#[tokio::test]
async fn non_latin_disclosure_survives_every_format() {
    const FOOTER: &str = "本文件仅供参考 Конфиденциально";
    let harness = Harness::new().await;
    harness
        .branding
        .save(
            "t7",
            &TenantBranding {
                company_name: Some("Globex".into()),
                footer_text: Some(FOOTER.into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let registry = TemplateRegistry::builtin();

    for summary in registry.list(None) {
        for format in summary.supported_formats.iter().copied() {
            let document = harness
                .service
                .generate_document(request("t7", &summary.id, Some(format), minimal_content(&summary.id)))
                .await
                .unwrap_or_else(|e| panic!("{} as {}: {}", summary.id, format, e));

            let view = harness.service.get_document(&document.doc_id, "t7").await.unwrap();
            let bytes = harness.objects.get(&view.record.storage_path).await.unwrap();
            assert!(
                binary_text(&bytes).contains(FOOTER),
                "{} as {} lost the non-Latin disclosure",
                summary.id,
                format
            );
        }
    }
}

#[tokio::test]
async fn generic_pdf_keeps_non_latin_content() {
    let harness = Harness::new().await;
    let content = json!({
        "assumptions": {"Рост выручки": "12%"},
        "projections": {"收入": ["$100", "$120"]}
    });
    let document = harness
        .service
        .generate_document(request("t1", "model-cashflow", Some(OutputFormat::Pdf), content))
        .await
        .unwrap();

    let view = harness.service.get_document(&document.doc_id, "t1").await.unwrap();
    let text = binary_text(&harness.objects.get(&view.record.storage_path).await.unwrap());
    assert!(text.contains("Рост выручки"), "{}", text);
    assert!(text.contains("收入"), "{}", text);
}

#[tokio::test]
async fn memo_uses_default_format_and_fresh_ids() {
    let harness = Harness::new().await;
    let content = json!({
        "header": {"to": "Board", "from": "CEO", "date": "2026-01-01"},
        "body": "Status update."
    });

    let first = harness
        .service
        .generate_document(request("t1", "memo-executive", None, content.clone()))
        .await
        .unwrap();
    let second = harness
        .service
        .generate_document(request("t1", "memo-executive", None, content))
        .await
        .unwrap();

    assert_eq!(first.format, OutputFormat::Pdf);
    assert!(!first.download_url.is_empty());
    assert_ne!(first.doc_id, second.doc_id);
    assert!(uuid::Uuid::parse_str(&first.doc_id).is_ok());
    assert!(first.page_count.unwrap_or(0) >= 1);
}

#[tokio::test]
async fn empty_agreement_lists_every_missing_section_without_side_effects() {
    let harness = Harness::new().await;

    let err = harness
        .service
        .generate_document(request("t1", "agreement-standard", None, json!({})))
        .await
        .unwrap_err();

    match err {
        DocumentError::MissingSections(missing) => {
            assert_eq!(missing, vec!["header", "parties", "terms", "signatures"]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(harness.objects.write_count(), 0);
    assert_eq!(harness.metadata.write_count(), 0);
    assert_eq!(harness.calls(), 0);

    let page = harness.service.list_documents("t1", ListOptions::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn null_section_counts_as_missing() {
    let harness = Harness::new().await;
    let mut content = minimal_content("memo-executive");
    content["body"] = serde_json::Value::Null;

    let err = harness
        .service
        .generate_document(request("t1", "memo-executive", None, content))
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::MissingSections(ref m) if m == &vec!["body".to_string()]));
    assert_eq!(harness.objects.write_count(), 0);
}

#[tokio::test]
async fn unsupported_format_never_reaches_a_generator() {
    let harness = Harness::new().await;

    let err = harness
        .service
        .generate_document(request(
            "t1",
            "model-cashflow",
            Some(OutputFormat::Pptx),
            minimal_content("model-cashflow"),
        ))
        .await
        .unwrap_err();

    match err {
        DocumentError::FormatNotSupported { format, supported, .. } => {
            assert_eq!(format, OutputFormat::Pptx);
            assert_eq!(supported, vec![OutputFormat::Xlsx, OutputFormat::Pdf]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(harness.calls(), 0);
    assert_eq!(harness.objects.write_count(), 0);
}

#[tokio::test]
async fn unknown_template_is_not_found() {
    let harness = Harness::new().await;
    let err = harness
        .service
        .generate_document(request("t1", "nope", None, json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::TemplateNotFound(_)));
}

#[tokio::test]
async fn other_tenants_cannot_read_a_document() {
    let harness = Harness::new().await;
    let document = harness
        .service
        .generate_document(request("t1", "memo-executive", None, minimal_content("memo-executive")))
        .await
        .unwrap();

    let err = harness.service.get_document(&document.doc_id, "t2").await.unwrap_err();
    assert!(matches!(err, DocumentError::DocumentNotFound(_)));

    let page = harness.service.list_documents("t2", ListOptions::default()).await.unwrap();
    assert!(page.documents.is_empty());

    let view = harness.service.get_document(&document.doc_id, "t1").await.unwrap();
    assert_eq!(view.record.tenant_id, "t1");
    assert!(view.record.storage_path.starts_with("documents/t1/"));
    assert!(view.record.storage_path.ends_with(&format!("/{}/{}", document.doc_id, document.filename)));
}

#[tokio::test]
async fn paging_returns_disjoint_newest_first_pages() {
    let harness = Harness::new().await;
    for i in 0..15 {
        let mut req = request("t1", "memo-executive", None, minimal_content("memo-executive"));
        req.title = Some(format!("Memo {}", i));
        harness.service.generate_document(req).await.unwrap();
    }

    let first = harness.service.list_documents("t1", ListOptions::new(10, 0)).await.unwrap();
    let second = harness.service.list_documents("t1", ListOptions::new(10, 10)).await.unwrap();

    assert_eq!(first.total, 15);
    assert_eq!(first.documents.len(), 10);
    assert_eq!(second.documents.len(), 5);

    let ids: HashSet<_> = first.documents.iter().map(|d| d.doc_id.clone()).collect();
    assert!(second.documents.iter().all(|d| !ids.contains(&d.doc_id)));

    let all: Vec<_> = first.documents.iter().chain(second.documents.iter()).collect();
    for pair in all.windows(2) {
        assert!(
            (pair[0].created_at, &pair[0].doc_id) >= (pair[1].created_at, &pair[1].doc_id),
            "pages are not newest first"
        );
    }
}

#[tokio::test]
async fn title_drives_filename_and_record() {
    let harness = Harness::new().await;
    let mut req = request("t1", "report-standard", Some(OutputFormat::Docx), minimal_content("report-standard"));
    req.title = Some("Q3 Board Report / Final".into());
    req.metadata = Some(json!({"source": "dashboard"}));

    let document = harness.service.generate_document(req).await.unwrap();
    assert_eq!(document.filename, "Q3-Board-Report-Final.docx");

    let view = harness.service.get_document(&document.doc_id, "t1").await.unwrap();
    assert_eq!(view.record.title, "Q3 Board Report / Final");
    assert_eq!(view.record.metadata["source"], "dashboard");
    assert_eq!(view.record.created_by, "u1");
}

#[tokio::test]
async fn failed_metadata_write_leaves_no_blob_behind() {
    let harness = Harness::with_metadata(Arc::new(MemoryMetadataStore::failing())).await;

    let err = harness
        .service
        .generate_document(request("t1", "memo-executive", None, minimal_content("memo-executive")))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::Storage(_)));
    assert_eq!(harness.objects.write_count(), 1);
    assert_eq!(harness.objects.len().await, 0);
    assert!(harness.service.find_orphaned_blobs("t1").await.unwrap().is_empty());
}

#[tokio::test]
async fn orphan_sweep_finds_blobs_without_records() {
    let harness = Harness::new().await;
    harness
        .service
        .generate_document(request("t1", "memo-executive", None, minimal_content("memo-executive")))
        .await
        .unwrap();
    harness
        .objects
        .put("documents/t1/2026/01/lost/Memo.pdf", vec![1, 2, 3], "application/pdf")
        .await
        .unwrap();

    let orphans = harness.service.find_orphaned_blobs("t1").await.unwrap();
    assert_eq!(orphans, vec!["documents/t1/2026/01/lost/Memo.pdf".to_string()]);
    assert_eq!(harness.metadata.storage_paths("t1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn unsafe_tenant_ids_are_rejected_before_any_work() {
    let harness = Harness::new().await;
    let err = harness
        .service
        .generate_document(request("../t1", "memo-executive", None, minimal_content("memo-executive")))
        .await
        .unwrap_err();
    assert!(matches!(err, DocumentError::InvalidRequest(_)));
    assert_eq!(harness.calls(), 0);
}

#[tokio::test]
async fn tenant_without_branding_gets_default_disclaimer() {
    let harness = Harness::new().await;
    let document = harness
        .service
        .generate_document(request("t9", "memo-executive", None, minimal_content("memo-executive")))
        .await
        .unwrap();

    let view = harness.service.get_document(&document.doc_id, "t9").await.unwrap();
    let bytes = harness.objects.get(&view.record.storage_path).await.unwrap();
    let text = binary_text(&bytes);
    assert!(!text.contains(DISCLOSURE));
    assert!(text.contains("informational purposes only"));
}
