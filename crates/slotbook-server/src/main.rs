//! Slotbook Server
//!
//! Serves the booking API and runs the reminder dispatcher against one store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use slotbook_core::tracing_init::init_tracing;
use slotbook_server::api::{AppState, build_router};
use slotbook_server::ledger::BookingLedger;
use slotbook_server::notifications::TelegramClient;
use slotbook_server::reminders::{ReminderConfig, ReminderDispatcher};
use slotbook_server::storage::BookingDatabase;

const MAX_LOOKAHEAD_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Parser, Debug)]
#[command(name = "slotbook-server")]
#[command(version, about = "Slotbook server - slot booking API and reminder dispatcher")]
struct Args {
    /// Store connection string.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:slotbook.db")]
    database_url: String,

    /// Address to listen on.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// Port to listen on; overrides the port part of --addr.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Telegram bot token used to send reminders. Reminders are disabled without it.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_bot_token: Option<String>,

    /// Seconds between reminder sweeps.
    #[arg(
        long,
        env = "REMINDER_INTERVAL_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    reminder_interval: u64,

    /// Seconds before an event's start at which its reminders become due (at most 30 days).
    #[arg(
        long,
        env = "REMINDER_LOOKAHEAD_SECS",
        default_value_t = 900,
        value_parser = clap::value_parser!(u64).range(1..=MAX_LOOKAHEAD_SECS)
    )]
    reminder_lookahead: u64,

    /// Per-message send timeout in seconds.
    #[arg(
        long,
        env = "REMINDER_SEND_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    send_timeout: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn listen_addr(&self) -> SocketAddr {
        let mut addr = self.addr;
        if let Some(port) = self.port {
            addr.set_port(port);
        }
        addr
    }

    const fn reminder_config(&self) -> ReminderConfig {
        ReminderConfig {
            interval: Duration::from_secs(self.reminder_interval),
            lookahead: Duration::from_secs(self.reminder_lookahead),
            send_timeout: Duration::from_secs(self.send_timeout),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing("slotbook_server=info,tower_http=info", args.log_json);

    // reqwest is built without a bundled crypto provider.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let addr = args.listen_addr();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        "Starting slotbook-server"
    );

    let db = BookingDatabase::open(&args.database_url).await?;
    let ledger = BookingLedger::new(db.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let dispatcher_handle = match args.telegram_bot_token.as_deref() {
        Some(token) if !token.trim().is_empty() => {
            let config = args.reminder_config();
            let telegram = TelegramClient::new(token, config.send_timeout)?;
            let dispatcher = Arc::new(ReminderDispatcher::new(db.clone(), telegram, config));
            Some(dispatcher.spawn(shutdown_rx))
        }
        _ => {
            warn!("TELEGRAM_BOT_TOKEN is not set; reminders are disabled");
            drop(shutdown_rx);
            None
        }
    };

    let app = build_router(AppState { ledger });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "HTTP server ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the dispatcher before draining the pool it uses.
    let _ = shutdown_tx.send(true);
    if let Some(handle) = dispatcher_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "Reminder dispatcher task failed");
        }
    }
    db.close().await;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C shutdown signal");
        }
        () = sigterm => {
            info!("Received SIGTERM shutdown signal");
        }
    }
}
