use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;
use paperclip::actix::{web, OpenApiExt};
use tracing_actix_web::TracingLogger;

use book_mgt_api::app_config::config_app;
use book_mgt_api::books_repository::{
    InMemoryBookRepository, PostgresBooksRepository, SharedBookRepository,
};
use book_mgt_api::settings::Settings;
use book_mgt_api::telemetry::{init_telemetry, shutdown_telemetry};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_telemetry(settings.jaeger_enabled)?;

    let books_repository: SharedBookRepository = if settings.use_in_memory_db {
        tracing::info!("Using in-memory book repository");
        Arc::new(InMemoryBookRepository::default())
    } else {
        Arc::new(
            PostgresBooksRepository::init(settings.postgres_config())
                .await
                .context("Failed to init postgres")?,
        )
    };
    let books_repository = web::Data::new(books_repository);
    let admin_credentials = web::Data::new(settings.admin_credentials());

    tracing::info!(
        host = %settings.api_host,
        port = settings.api_port,
        "Starting HTTP server"
    );

    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(books_repository.clone())
            .app_data(admin_credentials.clone())
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((settings.api_host.as_str(), settings.api_port))
    .with_context(|| {
        format!(
            "Failed to bind {}:{}",
            settings.api_host, settings.api_port
        )
    })?
    .run()
    .await?;

    shutdown_telemetry();
    Ok(())
}
