use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::error::{ApiError, ApiResult};
use super::middleware::auth::Caller;
use super::state::ApiState;
use crate::core::DocumentError;
use crate::metrics;
use crate::models::{GenerateRequest, ListOptions, OutputFormat};
use crate::templates::TemplateCategory;

/// Request body for `POST /api/v1/documents`; tenant and user come from headers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub template_id: String,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    pub content: serde_json::Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct TemplateQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub expires: i64,
    pub signature: String,
}

pub async fn generate_document(
    caller: Caller,
    body: web::Json<GenerateBody>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let request = GenerateRequest {
        tenant_id: caller.tenant_id,
        user_id: caller.user_id,
        template_id: body.template_id,
        format: body.format,
        content: body.content,
        title: body.title,
        metadata: body.metadata,
    };

    let document = state.service.generate_document(request).await?;

    Ok(HttpResponse::Created().json(json!({
        "ok": true,
        "document": document,
    })))
}

pub async fn list_documents(
    caller: Caller,
    query: web::Query<ListOptions>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let options = query.into_inner();
    let page = state
        .service
        .list_documents(&caller.tenant_id, options)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "ok": true,
        "documents": page.documents,
        "total": page.total,
        "limit": options.effective_limit(),
        "offset": options.offset,
    })))
}

pub async fn get_document(
    caller: Caller,
    path: web::Path<String>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let doc_id = path.into_inner();
    let document = state.service.get_document(&doc_id, &caller.tenant_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "ok": true,
        "document": document,
    })))
}

pub async fn list_templates(
    query: web::Query<TemplateQuery>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let category = match query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => Some(raw.parse::<TemplateCategory>().map_err(ApiError::bad_request)?),
        None => None,
    };

    Ok(HttpResponse::Ok().json(json!({
        "ok": true,
        "templates": state.service.get_templates(category),
    })))
}

pub async fn validate_content(
    path: web::Path<String>,
    content: web::Json<serde_json::Value>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let validation = state
        .service
        .validate_content(&path.into_inner(), &content)?;

    Ok(HttpResponse::Ok().json(json!({
        "ok": true,
        "validation": validation,
    })))
}

/// Serves local-backend blobs behind signed links.
pub async fn serve_file(
    path: web::Path<String>,
    query: web::Query<FileQuery>,
    state: web::Data<ApiState>,
) -> ApiResult<HttpResponse> {
    let key = path.into_inner();
    let files = state
        .files
        .as_ref()
        .ok_or_else(|| ApiError::not_found("file serving is not enabled"))?;

    if !files
        .signer()
        .verify(&key, query.expires, &query.signature, Utc::now().timestamp())
    {
        tracing::debug!(key = %key, "Rejected invalid or expired download link");
        return Err(ApiError::new(
            "forbidden",
            "invalid or expired link",
            actix_web::http::StatusCode::FORBIDDEN,
        ));
    }

    let bytes = crate::storage::ObjectStore::get(files.as_ref(), &key)
        .await
        .map_err(|e| match e {
            DocumentError::DocumentNotFound(_) => ApiError::not_found("file not found"),
            other => other.into(),
        })?;

    let filename = key.rsplit('/').next().unwrap_or("document");
    let content_type = filename
        .rsplit_once('.')
        .and_then(|(_, ext)| ext.parse::<OutputFormat>().ok())
        .map(|f| f.content_type())
        .unwrap_or("application/octet-stream");

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(bytes))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "ok": true,
        "status": "healthy"
    }))
}

pub async fn metrics_endpoint() -> ApiResult<HttpResponse> {
    let buffer = metrics::render()?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(buffer))
}
