use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use document_service::api::{configure_routes, ApiState};
use document_service::core::Settings;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting document service");

    prometheus::default_registry()
        .register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

    let settings = Settings::load()?;
    if settings.auth.api_token.is_empty() {
        tracing::warn!("DOCGEN__AUTH__API_TOKEN is empty, every /api/v1 request will be rejected");
    }

    let state = web::Data::new(ApiState::from_settings(&settings).await?);

    let host = settings.server.host.clone();
    let port = settings.server.port;
    tracing::info!("Starting server on {}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
