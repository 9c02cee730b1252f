use actix_cors::Cors;
use actix_web::web;

use super::error::ApiError;
use super::handlers;
use super::middleware::auth::create_auth_middleware;

/// Largest accepted JSON body.
const MAX_JSON_BYTES: usize = 4 * 1024 * 1024;

fn cors() -> Cors {
    Cors::default()
        .allowed_origin_fn(|origin, _req_head| {
            origin.as_bytes().starts_with(b"http://localhost") || origin.as_bytes().starts_with(b"https://")
        })
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec!["Content-Type", "Authorization", "X-Workspace-Id", "X-User-Id"])
        .max_age(3600)
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_JSON_BYTES)
            .error_handler(|err, _req| ApiError::bad_request(err.to_string()).into()),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, _req| ApiError::bad_request(err.to_string()).into()))
    .route("/health", web::get().to(handlers::health_check))
    .route("/metrics", web::get().to(handlers::metrics_endpoint))
    .route("/files/{path:.*}", web::get().to(handlers::serve_file))
    .service(
        web::scope("/api/v1")
            .wrap(create_auth_middleware())
            .wrap(cors())
            .service(
                web::scope("/documents")
                    .route("", web::post().to(handlers::generate_document))
                    .route("", web::get().to(handlers::list_documents))
                    .route("/{doc_id}", web::get().to(handlers::get_document)),
            )
            .service(
                web::scope("/templates")
                    .route("", web::get().to(handlers::list_templates))
                    .route("/{template_id}/validate", web::post().to(handlers::validate_content)),
            ),
    );
}
