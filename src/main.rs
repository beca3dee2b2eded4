mod app;
mod billing;
mod chat;
mod config;
mod debounce;
mod event;
mod theme;
mod views;

use anyhow::Context as _;
use app::ParceldeskApp;
use billing::client::BillingClient;
use chat::api::SupportApi;
use chat::connection::ChatClient;
use config::AppConfig;
use eframe::egui;
use std::sync::mpsc;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parceldesk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load();
    tracing::info!(api_base = %config.api_base, socket_url = %config.socket_url, "starting parceldesk");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("parceldesk-runtime")
        .build()
        .context("failed to build the async runtime")?;

    let (tx, rx) = mpsc::channel();
    let chat = ChatClient::new(&config, tx.clone(), runtime.handle().clone());
    let api = SupportApi::new(&config, tx.clone(), runtime.handle().clone());
    let billing_client = BillingClient::new(&config, tx, runtime.handle().clone());

    let app = ParceldeskApp::new(rx, &config, chat, api, billing_client);
    let _runtime = runtime;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([1024.0, 640.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Parceldesk",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow::anyhow!("failed to start the UI: {err}"))?;

    Ok(())
}
