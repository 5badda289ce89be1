//! Main Entrypoint for the Sikho API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Building the content generator for the configured provider.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use sikho_api::{
    config::{Config, Provider},
    router::create_router,
    state::AppState,
};
use sikho_core::{
    ContentGenerator,
    generation::{LLMContentGenerator, StubContentGenerator},
    llm_client::OpenAICompatibleClient,
};
use std::{collections::HashMap, fs, net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// Loads every `*.md` prompt template in a directory, keyed by file stem.
fn load_prompts(prompts_path: &std::path::Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path)
        .with_context(|| format!("Cannot read prompts from {}", prompts_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

fn build_generator(config: &Config) -> anyhow::Result<Arc<dyn ContentGenerator>> {
    let (api_key, api_base) = match config.provider {
        Provider::Stub => {
            info!("Using stub content generator.");
            return Ok(Arc::new(StubContentGenerator));
        }
        Provider::Gemini => {
            info!("Using Gemini provider.");
            (
                config.gemini_api_key.as_ref(),
                "https://generativelanguage.googleapis.com/v1beta/openai",
            )
        }
        Provider::OpenAI => {
            info!("Using OpenAI provider.");
            (config.openai_api_key.as_ref(), "https://api.openai.com/v1/")
        }
    };
    let api_key = api_key.context("API key missing for the configured provider")?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(api_base);
    let prompts = load_prompts(&config.prompts_path)?;
    let client = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));
    Ok(Arc::new(LLMContentGenerator::new(client, prompts)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Initialize Shared Services ---
    let generator = build_generator(&config)?;
    let app_state = Arc::new(AppState::new(generator));

    // --- 4. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 5. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
