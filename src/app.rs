use std::sync::Arc;

use eframe::{App, egui};

use crate::api::{HttpPhotoSource, PhotoSource};
use crate::config::{AppConfig, Palette};
use crate::table::TableView;

/// Share of the window the table region takes up.
const REGION_WIDTH_RATIO: f32 = 0.8;
const REGION_HEIGHT_RATIO: f32 = 0.9;

/// Window shell: paints the background and centres the one table view.
pub struct PhotosApp {
    table: TableView,
    palette: Palette,
}

impl PhotosApp {
    pub fn new(ctx: &egui::Context, config: AppConfig) -> Self {
        let source: Arc<dyn PhotoSource> = Arc::new(HttpPhotoSource::new(
            config.api.endpoint.clone(),
            config.api.timeout(),
        ));
        tracing::info!(
            event = "photos.app.started",
            endpoint = %config.api.endpoint,
            page_size = config.table.page_size,
        );

        Self {
            table: TableView::new(ctx, &config, source),
            palette: config.palette,
        }
    }

    fn apply_theme(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::light();
        visuals.panel_fill = self.palette.background.into();
        visuals.window_fill = self.palette.surface.into();
        visuals.override_text_color = Some(self.palette.text.into());
        visuals.extreme_bg_color = self.palette.header.into();
        ctx.set_visuals(visuals);

        let mut style = (*ctx.style()).clone();
        style
            .text_styles
            .insert(egui::TextStyle::Body, egui::FontId::proportional(15.0));
        style
            .text_styles
            .insert(egui::TextStyle::Button, egui::FontId::proportional(15.0));
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        ctx.set_style(style);
    }
}

impl App for PhotosApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_theme(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(self.palette.background.into()))
            .show(ctx, |ui| {
                let bounds = ui.max_rect();
                let region = egui::Rect::from_center_size(
                    bounds.center(),
                    egui::vec2(
                        bounds.width() * REGION_WIDTH_RATIO,
                        bounds.height() * REGION_HEIGHT_RATIO,
                    ),
                );
                ui.allocate_ui_at_rect(region, |ui| {
                    self.table.show(ui);
                });
            });
    }
}
