use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{PollingView, Refresh, SellerDashboard, ViewEvent};
use serde::Serialize;
use shared::domain::StoreId;
use tokio::{signal, sync::broadcast::error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(author, version, about = "Seller dashboard for the cafeteria ordering API")]
struct Args {
    /// TOML config file (defaults to ./dashboard.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    store_id: Option<String>,
    /// Seconds between refreshes of the order queues.
    #[arg(long)]
    interval: Option<u64>,
    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
    /// Refresh once, print, and exit.
    #[arg(long)]
    once: bool,
    /// Print view models as JSON instead of tables.
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    view: ViewCommand,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum ViewCommand {
    /// Kitchen order queue.
    Back,
    /// Counter order queue, newest first.
    Front,
    /// Product catalog.
    Menu,
}

impl Args {
    fn apply_overrides(&self, settings: &mut config::Settings) {
        if let Some(v) = &self.api_url {
            settings.api_base_url = v.clone();
        }
        if let Some(v) = &self.store_id {
            settings.store_id = v.clone();
        }
        if let Some(v) = self.interval {
            settings.poll_interval_secs = v;
        }
        if let Some(v) = self.timeout {
            settings.request_timeout_secs = Some(v);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Output {
    once: bool,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let stderr_log = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        );
    tracing_subscriber::registry().with(stderr_log).init();

    let args = Args::parse();
    let mut settings = config::load_settings(args.config.as_deref())?;
    args.apply_overrides(&mut settings);
    settings.validate()?;

    let dashboard = SellerDashboard::connect(
        &settings.api_base_url,
        StoreId::new(settings.store_id.clone()),
        settings.request_timeout(),
    )?
    .with_poll_interval(settings.poll_interval())?;
    info!(
        api = %settings.api_base_url,
        store_id = %settings.store_id,
        view = ?args.view,
        "dashboard: starting"
    );

    let output = Output {
        once: args.once,
        json: args.json,
    };
    match args.view {
        ViewCommand::Back => run_view(dashboard.back_store(), render::back_store, output).await,
        ViewCommand::Front => run_view(dashboard.front_store(), render::front_store, output).await,
        ViewCommand::Menu => run_view(dashboard.menu(), render::menu, output).await,
    }
}

async fn run_view<R>(
    mut view: PollingView<R>,
    render_table: fn(&[R::Item]) -> String,
    output: Output,
) -> Result<()>
where
    R: Refresh,
    R::Item: Serialize,
{
    if output.once {
        let entries = view
            .refresher()
            .refresh()
            .await
            .with_context(|| format!("{} refresh failed", view.name()))?;
        return print_entries(&entries, render_table, output);
    }

    let mut events = view.subscribe();
    view.start();

    let shutdown = wait_shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ViewEvent::Committed { .. }) => {
                    print_entries(&view.entries(), render_table, output)?;
                }
                // Failures are logged by the poller; the last table stays on screen.
                Ok(ViewEvent::Failed(_)) | Ok(ViewEvent::Discarded { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "dashboard: view events lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                info!("dashboard: shutdown requested");
                break;
            }
        }
    }

    view.stop();
    Ok(())
}

fn print_entries<T: Serialize>(
    entries: &[T],
    render_table: fn(&[T]) -> String,
    output: Output,
) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(entries)?);
    } else {
        println!("{}", render_table(entries));
    }
    Ok(())
}

async fn wait_shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!("dashboard: unable to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
