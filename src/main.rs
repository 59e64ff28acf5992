mod ai_provider;
mod ai_service;
mod api;
mod auth;
mod config;
mod database;
mod errors;
mod logging;
mod material_service;
mod models;
mod pdf_text;
mod response_parser;

use anyhow::Result;
use axum::{http::StatusCode, response::Html, routing::get, Router};
use tokio::fs;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    ai_service::AiService,
    api::{create_router, AppState},
    auth::SessionStore,
    config::{Config, LoggingConfig},
    database::Database,
    material_service::MaterialService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logging goes up first so configuration loading is visible
    let logging_config = LoggingConfig::from_env()?;
    let _guard = setup_logging(&logging_config)?;

    let config = Config::from_env()?;
    config.validate()?;

    log_system_event!(startup, component = "server", "Starting Intellexa server");

    // Ensure the upload directory exists before accepting files
    fs::create_dir_all(&config.upload.directory).await?;

    // Initialize database
    let db = Database::new(&config.database.url).await?;
    info!("Database initialized successfully");

    // Initialize services
    let material_service = MaterialService::new(db);
    let ai_service = AiService::new(&config.ai);

    let state = AppState {
        material_service,
        ai_service,
        sessions: SessionStore::new(),
        upload: config.upload.clone(),
    };

    // Build the application router
    let app = Router::new()
        // Serve the static frontend shell
        .route("/", get(serve_index))
        .route("/index.html", get(serve_index))
        .route("/styles.css", get(serve_css))
        .route("/app.js", get(serve_js))
        // API routes
        .merge(create_router(state))
        // CORS middleware
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_index() -> Result<Html<String>, StatusCode> {
    match fs::read_to_string("static/index.html").await {
        Ok(content) => Ok(Html(content)),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

async fn serve_css() -> Result<(StatusCode, [(&'static str, &'static str); 1], String), StatusCode> {
    match fs::read_to_string("static/styles.css").await {
        Ok(content) => Ok((StatusCode::OK, [("content-type", "text/css")], content)),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

async fn serve_js() -> Result<(StatusCode, [(&'static str, &'static str); 1], String), StatusCode> {
    match fs::read_to_string("static/app.js").await {
        Ok(content) => Ok((
            StatusCode::OK,
            [("content-type", "application/javascript")],
            content,
        )),
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::fmt;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true);

    if !config.file_enabled {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
        return Ok(None);
    }

    std::fs::create_dir_all(&config.log_directory).unwrap_or_else(|e| {
        eprintln!("Warning: Could not create logs directory: {}", e);
    });

    // Daily-rotated file output without ANSI colors
    let file_appender = tracing_appender::rolling::daily(&config.log_directory, "intellexa.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(non_blocking_file);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!(
        "Logging initialized - writing to {}/intellexa.log with daily rotation",
        config.log_directory
    );

    Ok(Some(guard))
}
