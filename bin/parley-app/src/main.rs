//! parley-app – entry point.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing.
//! 3. Build the background tokio runtime (hub downloads, indexing,
//!    generation forwarding).
//! 4. Open the chat window and hand control to the egui event loop.

mod app;
mod config;

use eframe::egui;
use tracing::info;

use crate::app::ParleyApp;
use crate::config::AppConfig;

fn main() -> eframe::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = AppConfig::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
            Ok(f) => f,
            Err(e) => {
                eprintln!(
                    "WARN: PARLEY_LOG='{}' is not a valid tracing filter ({}); \
                     falling back to 'info'",
                    cfg.log_level, e
                );
                tracing_subscriber::EnvFilter::new("info")
            }
        },
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "parley-app starting");

    // ── 3. Background runtime ──────────────────────────────────────────────────
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    // ── 4. Chat window ─────────────────────────────────────────────────────────
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 680.0])
            .with_title("Parley — Llama 3.1 chat"),
        ..Default::default()
    };

    eframe::run_native(
        "Parley",
        options,
        Box::new(move |_cc| Ok(Box::new(ParleyApp::new(cfg, runtime)))),
    )
}
