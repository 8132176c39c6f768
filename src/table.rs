use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::time::Instant;

use eframe::egui;
use egui::{Color32, RichText, TextEdit};

use crate::api::PhotoSource;
use crate::config::{AppConfig, Palette};
use crate::debounce::Debouncer;
use crate::fetcher::spawn_fetch_worker;
use crate::models::Photo;
use crate::state::{FetchRequest, FetchResponse, Pagination, TableState, View};
use crate::thumbnails::ThumbnailCache;

const HEADER_HEIGHT: f32 = 70.0;
const CARD_ROUNDING: f32 = 5.0;
const PAGINATION_HEIGHT: f32 = 44.0;
const ROW_PADDING: f32 = 6.0;
const PLACEHOLDER_SIZE: egui::Vec2 = egui::vec2(160.0, 120.0);
const ROW_HOVER_FILL: Color32 = Color32::from_black_alpha(10);

/// Things the user did during one frame. Applied after drawing so the row
/// list is not mutated while it is borrowed for rendering.
#[derive(Default)]
struct FrameActions {
    delete: Option<i64>,
    page: Option<usize>,
}

pub struct TableView {
    state: TableState,
    search_input: String,
    search_debounce: Debouncer<String>,
    fetch_tx: Sender<FetchRequest>,
    fetch_rx: Receiver<FetchResponse>,
    thumbnails: ThumbnailCache,
    palette: Palette,
    thumbnail_size: f32,
}

impl TableView {
    pub fn new(ctx: &egui::Context, config: &AppConfig, source: Arc<dyn PhotoSource>) -> Self {
        let fetch_ctx = ctx.clone();
        let (fetch_tx, fetch_rx) =
            spawn_fetch_worker(source.clone(), move || fetch_ctx.request_repaint());
        let thumb_ctx = ctx.clone();
        let thumbnails = ThumbnailCache::new(
            source,
            config.thumbnails.workers,
            config.thumbnails.cache_limit,
            move || thumb_ctx.request_repaint(),
        );

        let mut view = Self {
            state: TableState::new(&config.table),
            search_input: String::new(),
            search_debounce: Debouncer::new(config.table.debounce()),
            fetch_tx,
            fetch_rx,
            thumbnails,
            palette: config.palette,
            thumbnail_size: config.thumbnails.size,
        };
        let request = view.state.mount();
        view.dispatch(request);
        view
    }

    fn dispatch(&mut self, request: FetchRequest) {
        tracing::info!(event = "photos.fetch.dispatched", seq = request.seq, query = %request.query);
        let seq = request.seq;
        if let Err(err) = self.fetch_tx.send(request) {
            self.state
                .dispatch_failed(seq, format!("Failed to queue request: {err}"));
        }
    }

    fn apply_fetch_responses(&mut self) {
        loop {
            match self.fetch_rx.try_recv() {
                Ok(response) => {
                    self.state.apply_response(response);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::error!(event = "photos.fetch.worker_disconnected");
                    break;
                }
            }
        }
    }

    fn dispatch_due_search(&mut self, ctx: &egui::Context) {
        if !self.search_debounce.is_pending() {
            return;
        }
        let now = Instant::now();
        if let Some(text) = self.search_debounce.poll(now) {
            tracing::debug!(event = "photos.search.settled", text = %text);
            if let Some(request) = self.state.set_search_text(text) {
                self.dispatch(request);
            }
        } else if let Some(due) = self.search_debounce.deadline() {
            ctx.request_repaint_after(due.saturating_duration_since(now));
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        self.apply_fetch_responses();
        self.thumbnails.apply_responses(&ctx);

        self.render_header(ui);
        ui.add_space(20.0);

        let actions = self.render_body(ui);
        if let Some(id) = actions.delete {
            if self.state.delete(id) {
                tracing::info!(event = "photos.row.deleted", id);
            }
        }
        if let Some(page) = actions.page {
            tracing::debug!(event = "photos.page.changed", from = self.state.page(), to = page);
            if let Some(request) = self.state.set_page(page) {
                self.dispatch(request);
            }
        }

        self.dispatch_due_search(&ctx);
    }

    fn card(&self) -> egui::Frame {
        egui::Frame::none()
            .fill(self.palette.surface.into())
            .rounding(egui::Rounding::same(CARD_ROUNDING))
            .shadow(egui::epaint::Shadow {
                offset: egui::vec2(0.0, 0.0),
                blur: 10.0,
                spread: 1.0,
                color: self.palette.shadow.into(),
            })
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        let header_fill: Color32 = self.palette.header.into();
        let text: Color32 = self.palette.text.into();
        self.card()
            .fill(header_fill)
            .inner_margin(egui::Margin::symmetric(30.0, 0.0))
            .show(ui, |ui| {
                ui.set_height(HEADER_HEIGHT);
                ui.set_width(ui.available_width());
                ui.horizontal_centered(|ui| {
                    ui.label(
                        RichText::new("🚀 The Photos Table")
                            .size(24.0)
                            .strong()
                            .color(text),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let response = ui.add(
                            TextEdit::singleline(&mut self.search_input)
                                .id_source("photos_search_input")
                                .hint_text("Search...")
                                .frame(false)
                                .desired_width(220.0),
                        );
                        if response.changed() {
                            self.search_debounce
                                .push(self.search_input.clone(), Instant::now());
                        }
                    });
                });
            });
    }

    fn render_body(&mut self, ui: &mut egui::Ui) -> FrameActions {
        let mut actions = FrameActions::default();
        let height = ui.available_height();
        let palette = self.palette;
        let thumbnail_size = self.thumbnail_size;
        let card = self.card();
        let Self {
            state, thumbnails, ..
        } = self;

        card.show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.set_height(height);
            match state.view() {
                View::Loading => {
                    ui.centered_and_justified(|ui| {
                        ui.add(egui::Spinner::new().size(48.0));
                    });
                }
                View::Empty { error } => render_empty(ui, &palette, error),
                View::Table { rows, pagination } => {
                    render_column_headers(ui, &palette);
                    let body_height = (ui.available_height() - PAGINATION_HEIGHT).max(0.0);
                    egui::ScrollArea::vertical()
                        .max_height(body_height)
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            let wanted = rows.iter().map(|photo| photo.thumbnail_url.as_str());
                            thumbnails.retain_queued(wanted);
                            if pagination.is_past_end() {
                                ui.add_space(24.0);
                                ui.vertical_centered(|ui| {
                                    ui.label(
                                        RichText::new(format!(
                                            "Nothing on page {}. Go back to see results.",
                                            pagination.page + 1
                                        ))
                                        .color(palette.muted),
                                    );
                                });
                            }
                            for photo in rows {
                                let texture = thumbnails.get(&photo.thumbnail_url);
                                if render_row(ui, &palette, photo, texture, thumbnail_size) {
                                    actions.delete = Some(photo.id);
                                }
                            }
                        });
                    actions.page = render_pagination(ui, &palette, pagination);
                }
            }
        });

        actions
    }
}

fn render_empty(ui: &mut egui::Ui, palette: &Palette, error: Option<&str>) {
    let text: Color32 = palette.text.into();
    let muted: Color32 = palette.muted.into();
    ui.vertical_centered(|ui| {
        let top = ((ui.available_height() - PLACEHOLDER_SIZE.y - 60.0) / 2.0).max(0.0);
        ui.add_space(top);
        paint_placeholder(ui, muted);
        ui.add_space(12.0);
        ui.label(RichText::new("No Data To Display").strong().size(18.0).color(text));
        if let Some(error) = error {
            ui.add_space(6.0);
            ui.label(RichText::new(error).size(13.0).color(palette.danger));
        }
    });
}

fn paint_placeholder(ui: &mut egui::Ui, colour: Color32) {
    let (rect, _) = ui.allocate_exact_size(PLACEHOLDER_SIZE, egui::Sense::hover());
    let painter = ui.painter();
    let stroke = egui::Stroke::new(3.0, colour);

    let tray = egui::Rect::from_min_max(
        egui::pos2(rect.left() + 10.0, rect.center().y),
        egui::pos2(rect.right() - 10.0, rect.bottom() - 10.0),
    );
    painter.rect_stroke(tray, egui::Rounding::same(6.0), stroke);

    let slot_y = tray.top() + tray.height() * 0.45;
    painter.line_segment(
        [
            egui::pos2(tray.center().x - 25.0, slot_y),
            egui::pos2(tray.center().x + 25.0, slot_y),
        ],
        stroke,
    );
    for dx in [-40.0, 0.0, 40.0] {
        painter.line_segment(
            [
                egui::pos2(rect.center().x + dx * 0.5, rect.top() + 12.0),
                egui::pos2(rect.center().x + dx, rect.center().y - 10.0),
            ],
            egui::Stroke::new(2.0, colour.gamma_multiply(0.6)),
        );
    }
}

fn render_column_headers(ui: &mut egui::Ui, palette: &Palette) {
    let text: Color32 = palette.text.into();
    egui::Frame::none()
        .fill(palette.header.into())
        .inner_margin(egui::Margin::symmetric(20.0, 8.0))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(RichText::new("Photo").strong().color(text));
                ui.add_space(40.0);
                ui.label(RichText::new("Title").strong().color(text));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(RichText::new("Remove").strong().color(text));
                });
            });
        });
}

/// Draw one photo row. Returns true when its delete button was clicked.
fn render_row(
    ui: &mut egui::Ui,
    palette: &Palette,
    photo: &Photo,
    texture: Option<egui::TextureHandle>,
    thumbnail_size: f32,
) -> bool {
    let mut delete = false;
    let text: Color32 = palette.text.into();
    // Reserved before the contents so the hover fill lands underneath them.
    let background = ui.painter().add(egui::Shape::Noop);

    let row = egui::Frame::none()
        .inner_margin(egui::Margin::symmetric(20.0, ROW_PADDING))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                let avatar = render_avatar(ui, palette, photo, texture, thumbnail_size);
                let _ = avatar.on_hover_text(format!("Album {} · {}", photo.album_id, photo.url));
                ui.add_space(16.0);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let button = ui
                        .add(egui::Button::new(RichText::new("🗑").size(18.0)).frame(false))
                        .on_hover_text("Delete");
                    if button.clicked() {
                        delete = true;
                    }
                    ui.add_space(16.0);
                    ui.with_layout(egui::Layout::left_to_right(egui::Align::Center), |ui| {
                        ui.add(egui::Label::new(RichText::new(&photo.title).color(text)).wrap(true));
                    });
                });
            });
        });

    if row.response.hovered() {
        ui.painter().set(
            background,
            egui::Shape::rect_filled(row.response.rect, 0.0, ROW_HOVER_FILL),
        );
    }
    ui.separator();
    delete
}

fn render_avatar(
    ui: &mut egui::Ui,
    palette: &Palette,
    photo: &Photo,
    texture: Option<egui::TextureHandle>,
    size: f32,
) -> egui::Response {
    match texture {
        Some(texture) => ui.add(
            egui::Image::new(egui::load::SizedTexture::new(
                texture.id(),
                egui::vec2(size, size),
            ))
            .rounding(egui::Rounding::same(size / 2.0)),
        ),
        None => {
            let (rect, response) =
                ui.allocate_exact_size(egui::vec2(size, size), egui::Sense::hover());
            let painter = ui.painter();
            painter.circle_filled(rect.center(), size / 2.0, palette.header);
            let initial = photo
                .title
                .chars()
                .next()
                .map(|c| c.to_uppercase().to_string())
                .unwrap_or_default();
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                initial,
                egui::FontId::proportional(size * 0.45),
                palette.muted.into(),
            );
            response
        }
    }
}

fn render_pagination(ui: &mut egui::Ui, palette: &Palette, pagination: Pagination) -> Option<usize> {
    let mut requested = None;
    let text: Color32 = palette.text.into();
    ui.allocate_ui_with_layout(
        egui::vec2(ui.available_width(), PAGINATION_HEIGHT),
        egui::Layout::right_to_left(egui::Align::Center),
        |ui| {
            ui.add_space(20.0);
            if ui
                .add_enabled(pagination.has_next(), egui::Button::new("▶").frame(false))
                .on_hover_text("Next page")
                .clicked()
            {
                requested = Some(pagination.page + 1);
            }
            if ui
                .add_enabled(pagination.has_previous(), egui::Button::new("◀").frame(false))
                .on_hover_text("Previous page")
                .clicked()
            {
                requested = pagination.page.checked_sub(1);
            }
            ui.add_space(12.0);
            ui.label(RichText::new(pagination.label()).color(text));
        },
    );
    requested
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hovered_row_shapes(pointer: egui::Pos2) -> Vec<egui::Shape> {
        let ctx = egui::Context::default();
        let photo = Photo::new(7, 1, "accusamus beatae ad facilis");
        let palette = Palette::default();
        let input = || egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(800.0, 600.0),
            )),
            events: vec![egui::Event::PointerMoved(pointer)],
            ..Default::default()
        };
        let mut frame = |ctx: &egui::Context| {
            egui::CentralPanel::default()
                .frame(egui::Frame::none())
                .show(ctx, |ui| {
                    render_row(ui, &palette, &photo, None, 40.0);
                });
        };

        // Hover state settles on the second pass.
        let _ = ctx.run(input(), &mut frame);
        let output = ctx.run(input(), &mut frame);
        output.shapes.into_iter().map(|clipped| clipped.shape).collect()
    }

    fn is_hover_fill(shape: &egui::Shape) -> bool {
        matches!(shape, egui::Shape::Rect(rect) if rect.fill == ROW_HOVER_FILL)
    }

    #[test]
    fn hovered_row_fill_is_painted_under_its_contents() {
        let shapes = hovered_row_shapes(egui::pos2(200.0, 20.0));

        let fill = shapes
            .iter()
            .position(is_hover_fill)
            .expect("hovered row should be filled");
        let first_text = shapes
            .iter()
            .position(|shape| matches!(shape, egui::Shape::Text(_)))
            .expect("row should draw its title");
        assert!(fill < first_text, "fill at {fill} covers text at {first_text}");
    }

    #[test]
    fn row_without_pointer_has_no_fill() {
        let shapes = hovered_row_shapes(egui::pos2(200.0, 500.0));
        assert!(!shapes.iter().any(is_hover_fill));
    }
}
