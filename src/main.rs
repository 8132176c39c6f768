mod api;
mod app;
mod config;
mod debounce;
mod fetcher;
mod models;
mod state;
mod table;
mod thumbnails;

use app::PhotosApp;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::load();

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([config.window.width, config.window.height])
            .with_min_inner_size([640.0, 480.0])
            .with_resizable(true)
            .with_title("The Photos Table"),
        ..Default::default()
    };

    eframe::run_native(
        "The Photos Table",
        native_options,
        Box::new(move |cc| Box::new(PhotosApp::new(&cc.egui_ctx, config))),
    )
}
