pub mod board;
pub mod config;
pub mod input;
pub mod layout;
pub mod protocol;
pub mod session;
pub mod timer;
pub mod ui;
pub mod widget;

use crate::ui::ControlSurfaceUI;
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    // Optional config path as the only argument
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = config::load(config_path).await?;

    let runtime = tokio::runtime::Handle::current();

    info!("Starting UI, connecting to {}", config.connection.url);
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = egui::ViewportBuilder::default()
        .with_title("WebController")
        .with_inner_size([1024.0, 600.0]);

    eframe::run_native(
        "WebController",
        native_options,
        Box::new(move |cc| Ok(Box::new(ControlSurfaceUI::new(cc, config, runtime)))),
    )
    .map_err(|e| eyre!("UI exited with an error: {}", e))?;

    info!("UI closed");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
