//! ApniSec - Security Issue Tracker API
//! Mission: Let every tenant manage their own security findings, and nobody else's

use anyhow::{Context, Result};
use apnisec_backend::{
    app::{create_router, AppState},
    config::AppConfig,
    db::Database,
    notify::{LogMailer, Mailer, Notifier, ResendMailer},
};
use clap::Parser;
use dotenv::dotenv;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    let config = AppConfig::parse();

    info!("🚀 ApniSec API starting (v{})", env!("CARGO_PKG_VERSION"));

    if config.uses_dev_secrets() {
        warn!("⚠️  JWT_SECRET / REFRESH_SECRET not set - using development secrets");
    }

    let db = Database::open(&config.database_path)?;
    info!("📊 Database initialized at: {}", config.database_path);

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    let mailer: Arc<dyn Mailer> = match &config.resend_api_key {
        Some(key) => {
            info!("📧 Email delivery via Resend ({})", config.email_from);
            Arc::new(ResendMailer::new(
                http_client,
                config.resend_api_url.clone(),
                key.clone(),
                config.email_from.clone(),
            ))
        }
        None => {
            warn!("⚠️  RESEND_API_KEY not set - emails will only be logged");
            Arc::new(LogMailer)
        }
    };
    let notifier = Notifier::spawn(mailer, config.email_queue_capacity);

    let state = AppState::new(&config, db, notifier);
    state.guard.limiter().spawn_sweeper(config.rate_limit_sweep());
    info!(
        "🔐 Rate limit: {} requests per {}s per client",
        config.rate_limit_max, config.rate_limit_window_secs
    );

    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🎯 API server listening on {}", config.bind_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apnisec_backend=debug,apnisec=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Fall back to the crate root when launched from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
