//! joingate - group join gate.
//!
//! Receives updates on a webhook, asks every join applicant to share their
//! own phone number in a private chat, and approves the request once they do.
//! Pending verifications live in memory only.

mod bot_api;
mod config;
mod webhook;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use joingate::EngineBuilder;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::bot_api::BotApi;
use crate::config::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let settings = Cli::parse().into_settings();

    let bot = Arc::new(
        BotApi::new(&settings.api_url, &settings.bot_token, settings.send_timeout)
            .context("failed to build Bot API client")?,
    );

    if settings.register_webhook {
        bot.set_webhook(&settings.webhook_url)
            .await
            .with_context(|| format!("failed to register webhook {}", settings.webhook_url))?;
        info!(webhook_url = %settings.webhook_url, "Webhook registered");
    } else {
        warn!(
            webhook_url = %settings.webhook_url,
            "Webhook not registered automatically; make sure it is set"
        );
    }

    let engine = EngineBuilder::from_shared(bot)
        .with_admin_chat(settings.admin_chat)
        .with_send_timeout(settings.send_timeout)
        .build()
        .start();

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening for updates");

    axum::serve(listener, webhook::router(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down");
    Ok(())
}

/// Respects `RUST_LOG`; defaults to `info` with the HTTP stack quietened.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
