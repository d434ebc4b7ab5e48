//! services/api/src/bin/api.rs

use async_openai::{config::OpenAIConfig, Client};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::{routing::get, Router};
use quiz_api_lib::{
    adapters::{
        tts::{parse_speech_model, parse_voice},
        OpenAiContentAdapter, OpenAiTtsAdapter,
    },
    config::{Config, ConfigError},
    error::ApiError,
    web::{device_progress_handler, list_topics_handler, rest::ApiDoc, state::AppState, ws_handler},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Prepare Storage ---
    std::fs::create_dir_all(&config.data_dir)?;
    info!("Saving device progress under {}", config.data_dir.display());

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(config.require_openai_key()?);
    let openai_client = Client::with_config(openai_config);

    let content_adapter = Arc::new(OpenAiContentAdapter::new(
        openai_client.clone(),
        config.question_model.clone(),
        config.summary_model.clone(),
    ));

    let tts_voice = parse_voice(&config.tts_voice).ok_or_else(|| {
        ConfigError::InvalidValue(
            "TTS_VOICE".to_string(),
            format!("'{}' is not a supported voice", config.tts_voice),
        )
    })?;
    let tts_adapter = Arc::new(OpenAiTtsAdapter::new(
        openai_client.clone(),
        parse_speech_model(&config.tts_model),
        tts_voice,
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        content_adapter,
        tts_adapter,
    });

    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ConfigError::InvalidValue("ALLOWED_ORIGIN".to_string(), e.to_string())
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/topics", get(list_topics_handler))
        .route("/devices/{device_id}/progress", get(device_progress_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
