use std::process::ExitCode;

use tracing::{error, info};

use prepboard::{notify, Assistant, Config, Database, WebServer};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = prepboard::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        prepboard::logging::init_console_only(&config.logging.level);
    }

    info!("Prepboard - interview experience board");

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {e}", config.database.path);
            return ExitCode::FAILURE;
        }
    };

    let notifier = match notify::from_config(&config.mail, config.auth.code_ttl_minutes) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!("Failed to set up mail delivery: {e}");
            return ExitCode::FAILURE;
        }
    };

    let assistant = match Assistant::from_config(&config.assistant) {
        Ok(assistant) => assistant,
        Err(e) => {
            error!("Failed to set up assistant: {e}");
            return ExitCode::FAILURE;
        }
    };
    if config.assistant.api_key.is_empty() {
        info!("Assistant API key not set; summary and question endpoints will return 502");
    }

    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    let server = match WebServer::new(config, db, notifier, assistant) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to create web server: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run().await {
        error!("Web server error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
