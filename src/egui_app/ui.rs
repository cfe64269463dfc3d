//! egui renderer for the application UI.

mod charts;
mod pages;

use eframe::egui::{
    self, Color32, ColorImage, RichText, Sense, TextureHandle, TextureOptions, Ui, Vec2,
};
use image::RgbaImage;

use crate::config::AppConfig;
use crate::egui_app::controller::AppController;
use crate::egui_app::state::{ImageView, Page};
use crate::live::LiveStatus;
use crate::log_queue::Severity;

/// Smallest window size that keeps forms and the log panel usable.
pub const MIN_VIEWPORT_SIZE: Vec2 = Vec2::new(900.0, 600.0);

/// A GPU texture mirroring an [`ImageView`], re-uploaded when its revision changes.
#[derive(Default)]
struct TextureSlot {
    texture: Option<TextureHandle>,
    revision: u64,
}

impl TextureSlot {
    fn sync(&mut self, ctx: &egui::Context, name: &str, view: &ImageView) -> Option<&TextureHandle> {
        if view.revision() != self.revision {
            self.revision = view.revision();
            match view.image() {
                Some(image) => {
                    let color = to_color_image(image);
                    match self.texture.as_mut() {
                        Some(texture) => texture.set(color, TextureOptions::LINEAR),
                        None => {
                            self.texture = Some(ctx.load_texture(name, color, TextureOptions::LINEAR))
                        }
                    }
                }
                None => self.texture = None,
            }
        }
        self.texture.as_ref()
    }
}

fn to_color_image(image: &RgbaImage) -> ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    ColorImage::from_rgba_unmultiplied(size, image.as_raw())
}

/// Renders the egui UI using the shared controller state.
pub struct EguiApp {
    controller: AppController,
    visuals_set: bool,
    predict_tex: TextureSlot,
    live_tex: TextureSlot,
}

impl EguiApp {
    pub fn new(config: AppConfig) -> Self {
        Self {
            controller: AppController::new(config),
            visuals_set: false,
            predict_tex: TextureSlot::default(),
            live_tex: TextureSlot::default(),
        }
    }

    fn apply_visuals(&mut self, ctx: &egui::Context) {
        if self.visuals_set {
            return;
        }
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = Color32::from_rgb(14, 16, 20);
        visuals.panel_fill = Color32::from_rgb(18, 20, 24);
        ctx.set_visuals(visuals);
        self.visuals_set = true;
    }

    fn render_tabs(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Steel Defect Detection").strong());
                ui.separator();
                for page in Page::ALL {
                    ui.selectable_value(&mut self.controller.page, page, page.title());
                }
            });
        });
    }

    fn render_status(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if self.controller.any_job_running() {
                    ui.add(egui::Spinner::new());
                    ui.label("Job running");
                } else {
                    ui.label("Ready");
                }
                ui.separator();
                let live = self.controller.live.status;
                let color = match live {
                    LiveStatus::Idle => Color32::GRAY,
                    LiveStatus::Running => Color32::from_rgb(220, 80, 60),
                    LiveStatus::Stopping => Color32::from_rgb(230, 180, 60),
                };
                ui.colored_label(color, format!("Live: {live}"));
            });
        });
    }

    fn render_log(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .default_height(180.0)
            .show(ctx, |ui| {
                ui.label(RichText::new("Log").strong());
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        for entry in self.controller.log_view.entries() {
                            ui.colored_label(severity_color(entry.severity), entry.to_string());
                        }
                    });
            });
    }

    fn render_page(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| match self.controller.page {
            Page::Predict => {
                pages::predict_form(ui, &mut self.controller);
                ui.separator();
                ui.columns(2, |columns| {
                    let texture = self
                        .predict_tex
                        .sync(ctx, "predict_result", &self.controller.predict.result);
                    show_texture(&mut columns[0], texture);
                    egui::ScrollArea::vertical()
                        .id_salt("predict_report")
                        .show(&mut columns[1], |ui| {
                            ui.monospace(&self.controller.predict.report);
                        });
                });
            }
            Page::Batch => {
                pages::batch_form(ui, &mut self.controller);
                ui.separator();
                ui.columns(2, |columns| {
                    egui::ScrollArea::vertical()
                        .id_salt("batch_report")
                        .show(&mut columns[0], |ui| {
                            ui.monospace(&self.controller.batch.report);
                        });
                    charts::class_shares(&mut columns[1], &self.controller.batch.shares);
                    columns[1].add_space(12.0);
                    charts::confidence_histogram(&mut columns[1], &self.controller.batch.histogram);
                });
            }
            Page::Live => {
                pages::live_form(ui, &mut self.controller);
                ui.separator();
                let texture = self.live_tex.sync(ctx, "live_frame", &self.controller.live.frame);
                show_texture(ui, texture);
            }
            Page::Train => pages::train_form(ui, &mut self.controller),
            Page::Validate => pages::validate_form(ui, &mut self.controller),
        });
    }
}

fn severity_color(severity: Severity) -> Color32 {
    match severity {
        Severity::Info => Color32::LIGHT_GRAY,
        Severity::Warning => Color32::from_rgb(230, 180, 60),
        Severity::Error => Color32::from_rgb(230, 80, 70),
        Severity::System => Color32::from_rgb(110, 170, 240),
    }
}

/// Paint `texture` scaled to fit the available width, keeping its aspect ratio.
fn show_texture(ui: &mut Ui, texture: Option<&TextureHandle>) {
    let Some(texture) = texture else {
        ui.weak("No image");
        return;
    };
    let [w, h] = texture.size();
    if w == 0 || h == 0 {
        return;
    }
    let available = ui.available_size();
    let scale = (available.x / w as f32)
        .min(available.y.max(120.0) / h as f32)
        .min(1.0);
    let size = egui::vec2(w as f32 * scale, h as f32 * scale);
    let (rect, _) = ui.allocate_exact_size(size, Sense::hover());
    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
    ui.painter().image(texture.id(), rect, uv, Color32::WHITE);
}

impl eframe::App for EguiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_visuals(ctx);
        self.controller.poll();
        if ctx.input(|i| i.viewport().close_requested()) {
            self.controller.shutdown();
        }
        self.render_tabs(ctx);
        self.render_status(ctx);
        self.render_log(ctx);
        self.render_page(ctx);
        ctx.request_repaint_after(self.controller.poll_interval());
    }
}
