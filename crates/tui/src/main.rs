mod app;
mod input;
mod nav;
mod views;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Arc,
};

use kisan_core::{
    config::{self, AppConfig},
    ApiClient, FileStore, SessionContext, SessionStore,
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let store = SessionStore::new(Arc::new(FileStore::new(config.session_path())));
    let session = SessionContext::load(store);
    let client = ApiClient::from_config(&config, session.clone())
        .with_context(|| format!("invalid API base URL {}", config.api_base_url))?;
    info!(api_base_url = %config.api_base_url, signed_in = session.is_authenticated(), "starting");

    let mut app = app::KisanApp::new(Arc::new(client), session, config);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("kisan.log");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal UI owns stdout, so events only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
