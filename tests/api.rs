mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use common::{minimal_content, Harness};
use document_service::api::{configure_routes, ApiState};
use document_service::branding::{BrandingResolver, MemoryBrandingStore};
use document_service::generators::{GeneratorSet, StrategyTable};
use document_service::storage::{DocumentStorage, LocalObjectStore, MemoryMetadataStore, UrlSigner};
use document_service::templates::TemplateRegistry;
use document_service::DocumentService;

const TOKEN: &str = "test-token";

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let (status, body) = match test::try_call_service(&$app, $req).await {
            Ok(resp) => {
                let status = resp.status();
                (status, test::read_body(resp).await)
            }
            Err(err) => {
                let resp = err.error_response();
                let status = resp.status();
                (status, actix_web::body::to_bytes(resp.into_body()).await.unwrap_or_default())
            }
        };
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json, body)
    }};
}

fn authed(req: test::TestRequest, workspace: &str) -> test::TestRequest {
    req.insert_header(("Authorization", format!("Bearer {}", TOKEN)))
        .insert_header(("X-Workspace-Id", workspace.to_string()))
        .insert_header(("X-User-Id", "u1"))
}

async fn state() -> ApiState {
    ApiState::new(Harness::new().await.service, TOKEN)
}

#[actix_web::test]
async fn health_is_public() {
    let app = test::init_service(App::new().app_data(web::Data::new(state().await)).configure(configure_routes)).await;

    let (status, json, _) = send!(app, test::TestRequest::get().uri("/health").to_request());
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
}

#[actix_web::test]
async fn api_requires_bearer_token() {
    let app = test::init_service(App::new().app_data(web::Data::new(state().await)).configure(configure_routes)).await;

    let (status, _, _) = send!(app, test::TestRequest::get().uri("/api/v1/templates").to_request());
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/templates")
        .insert_header(("Authorization", "Bearer wrong"))
        .insert_header(("X-Workspace-Id", "t1"))
        .insert_header(("X-User-Id", "u1"))
        .to_request();
    let (status, _, _) = send!(app, req);
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn identity_headers_are_required() {
    let app = test::init_service(App::new().app_data(web::Data::new(state().await)).configure(configure_routes)).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/documents")
        .insert_header(("Authorization", format!("Bearer {}", TOKEN)))
        .to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);
    assert_eq!(json["error"]["kind"], "validation");
}

#[actix_web::test]
async fn generate_then_fetch_document() {
    let app = test::init_service(App::new().app_data(web::Data::new(state().await)).configure(configure_routes)).await;

    let req = authed(test::TestRequest::post().uri("/api/v1/documents"), "t1")
        .set_json(json!({
            "templateId": "memo-executive",
            "content": minimal_content("memo-executive"),
            "title": "Weekly Status"
        }))
        .to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    assert_eq!(json["ok"], true);
    assert_eq!(json["document"]["format"], "pdf");
    assert_eq!(json["document"]["filename"], "Weekly-Status.pdf");
    let doc_id = json["document"]["docId"].as_str().unwrap().to_string();

    let req = authed(test::TestRequest::get().uri(&format!("/api/v1/documents/{}", doc_id)), "t1").to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["document"]["docId"], doc_id.as_str());
    assert_eq!(json["document"]["tenantId"], "t1");
    assert!(json["document"]["downloadUrl"].as_str().unwrap().len() > 0);

    let req = authed(test::TestRequest::get().uri(&format!("/api/v1/documents/{}", doc_id)), "t2").to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["kind"], "not_found");

    let req = authed(test::TestRequest::get().uri("/api/v1/documents?limit=5&offset=0"), "t1").to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 1);
    assert_eq!(json["limit"], 5);
}

#[actix_web::test]
async fn validation_errors_use_the_envelope() {
    let app = test::init_service(App::new().app_data(web::Data::new(state().await)).configure(configure_routes)).await;

    let req = authed(test::TestRequest::post().uri("/api/v1/documents"), "t1")
        .set_json(json!({"templateId": "agreement-standard", "content": {}}))
        .to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "validation");
    assert_eq!(
        json["error"]["message"],
        "missing required sections: header, parties, terms, signatures"
    );

    let req = authed(test::TestRequest::post().uri("/api/v1/documents"), "t1")
        .set_json(json!({"templateId": "model-cashflow", "format": "pptx", "content": minimal_content("model-cashflow")}))
        .to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["kind"], "validation");

    let req = authed(test::TestRequest::post().uri("/api/v1/documents"), "t1")
        .set_json(json!({"templateId": "memo-executive", "format": "odt", "content": {}}))
        .to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["ok"], false);

    let req = authed(test::TestRequest::post().uri("/api/v1/documents"), "t1")
        .set_json(json!({"templateId": "missing", "content": {}}))
        .to_request();
    let (status, _, _) = send!(app, req);
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn templates_filter_by_category() {
    let app = test::init_service(App::new().app_data(web::Data::new(state().await)).configure(configure_routes)).await;

    let req = authed(test::TestRequest::get().uri("/api/v1/templates?category=financial"), "t1").to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json["templates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["model-cashflow", "model-proforma"]);

    let req = authed(test::TestRequest::get().uri("/api/v1/templates?category=poetry"), "t1").to_request();
    let (status, _, _) = send!(app, req);
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = authed(test::TestRequest::post().uri("/api/v1/templates/memo-executive/validate"), "t1")
        .set_json(json!({"header": {"to": "Board"}}))
        .to_request();
    let (status, json, _) = send!(app, req);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["validation"]["valid"], false);
    assert_eq!(json["validation"]["missing"], json!(["body"]));
}

#[actix_web::test]
async fn metrics_are_exposed() {
    let app = test::init_service(App::new().app_data(web::Data::new(state().await)).configure(configure_routes)).await;

    let req = authed(test::TestRequest::post().uri("/api/v1/documents"), "t1")
        .set_json(json!({"templateId": "memo-executive", "content": minimal_content("memo-executive")}))
        .to_request();
    let (status, _, _) = send!(app, req);
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send!(app, test::TestRequest::get().uri("/metrics").to_request());
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8_lossy(&body);
    assert!(text.contains("documents_generated_total"));
    assert!(text.contains("document_generation_seconds"));
}

#[actix_web::test]
async fn local_files_are_served_behind_signed_links() {
    let dir = tempfile::tempdir().unwrap();
    let files = Arc::new(LocalObjectStore::new(
        dir.path(),
        "http://localhost:8080",
        UrlSigner::new("secret"),
    ));
    let service = DocumentService::new(
        Arc::new(TemplateRegistry::builtin()),
        GeneratorSet::standard(Arc::new(StrategyTable::builtin())),
        BrandingResolver::new(Arc::new(MemoryBrandingStore::new())),
        DocumentStorage::new(files.clone(), Arc::new(MemoryMetadataStore::new()), Duration::from_secs(60)),
    );
    let state = ApiState::new(service.clone(), TOKEN).with_files(files);
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_routes)).await;

    let document = service
        .generate_document(common::request("t1", "memo-executive", None, minimal_content("memo-executive")))
        .await
        .unwrap();
    let path_and_query = document
        .download_url
        .strip_prefix("http://localhost:8080")
        .unwrap()
        .to_string();

    let (status, _, body) = send!(app, test::TestRequest::get().uri(&path_and_query).to_request());
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with(b"%PDF"));

    let tampered = path_and_query.replace("/t1/", "/t2/");
    let (status, _, _) = send!(app, test::TestRequest::get().uri(&tampered).to_request());
    assert_eq!(status, StatusCode::FORBIDDEN);
}
