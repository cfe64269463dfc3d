use eframe::egui::{self, Ui};

use crate::egui_app::controller::AppController;
use crate::egui_app::state::JobForm;
use crate::live::LiveStatus;

fn path_row(ui: &mut Ui, label: &str, value: &mut String, hint: &str) {
    ui.label(label);
    ui.add(
        egui::TextEdit::singleline(value)
            .hint_text(hint)
            .desired_width(420.0),
    );
    ui.end_row();
}

fn confidence_row(ui: &mut Ui, confidence: &mut f32) {
    ui.label("Confidence");
    ui.add(egui::Slider::new(confidence, 0.0..=1.0));
    ui.end_row();
}

fn prediction_fields(ui: &mut Ui, id: &str, form: &mut JobForm, input_label: &str, input_hint: &str) {
    egui::Grid::new(id).num_columns(2).show(ui, |ui| {
        path_row(ui, "Model", &mut form.model, "weights .pt");
        path_row(ui, input_label, &mut form.input, input_hint);
        confidence_row(ui, &mut form.confidence);
    });
}

pub(super) fn predict_form(ui: &mut Ui, controller: &mut AppController) {
    prediction_fields(ui, "predict_form", &mut controller.predict.form, "Image", "image file");
    ui.horizontal(|ui| {
        let idle = !controller.predict.running;
        if ui.add_enabled(idle, egui::Button::new("Detect")).clicked() {
            controller.run_prediction();
        }
        if !idle {
            ui.spinner();
        }
    });
}

pub(super) fn batch_form(ui: &mut Ui, controller: &mut AppController) {
    prediction_fields(ui, "batch_form", &mut controller.batch.form, "Images", "image directory");
    ui.horizontal(|ui| {
        let idle = !controller.batch.running;
        if ui.add_enabled(idle, egui::Button::new("Run batch")).clicked() {
            controller.run_batch_prediction();
        }
        if !idle {
            ui.spinner();
        }
    });
}

pub(super) fn live_form(ui: &mut Ui, controller: &mut AppController) {
    let live = &mut controller.live;
    egui::Grid::new("live_form").num_columns(2).show(ui, |ui| {
        path_row(ui, "Model", &mut live.model, "weights .pt");
        path_row(ui, "Source", &mut live.source, "video, frame directory or camera index");
        confidence_row(ui, &mut live.confidence);
    });
    let status = controller.live.status;
    ui.horizontal(|ui| {
        if ui
            .add_enabled(status == LiveStatus::Idle, egui::Button::new("Start"))
            .clicked()
        {
            controller.start_live();
        }
        if ui.button("Camera 0").clicked() && status == LiveStatus::Idle {
            controller.live.source = "0".to_string();
            controller.start_live();
        }
        if ui
            .add_enabled(status == LiveStatus::Running, egui::Button::new("Stop"))
            .clicked()
        {
            controller.stop_live();
        }
        ui.separator();
        ui.label(format!(
            "{} frames, {} detections in last frame",
            controller.live_frames_processed(),
            controller.live.last_detection_count
        ));
    });
}

pub(super) fn train_form(ui: &mut Ui, controller: &mut AppController) {
    let form = &mut controller.train.form;
    egui::Grid::new("train_form").num_columns(2).show(ui, |ui| {
        path_row(ui, "Model", &mut form.model, "pretrained weights .pt");
        path_row(ui, "Dataset", &mut form.input, "dataset .yaml");
        ui.label("Epochs");
        ui.add(egui::DragValue::new(&mut form.epochs).range(1..=10_000));
        ui.end_row();
        ui.label("Batch size");
        ui.add(egui::DragValue::new(&mut form.batch_size).range(1..=1024));
        ui.end_row();
        ui.label("Image size");
        ui.add(egui::DragValue::new(&mut form.image_size).range(32..=4096));
        ui.end_row();
    });
    ui.horizontal(|ui| {
        let idle = !controller.train.running;
        if ui.add_enabled(idle, egui::Button::new("Start training")).clicked() {
            controller.run_training();
        }
        if !idle {
            ui.spinner();
        }
        if let Some(status) = &controller.train.status {
            ui.label(status);
        }
    });
}

pub(super) fn validate_form(ui: &mut Ui, controller: &mut AppController) {
    let form = &mut controller.validate.form;
    egui::Grid::new("validate_form").num_columns(2).show(ui, |ui| {
        path_row(ui, "Model", &mut form.model, "weights .pt");
        path_row(ui, "Dataset", &mut form.input, "dataset .yaml");
    });
    let idle = !controller.validate.running;
    if ui.add_enabled(idle, egui::Button::new("Validate")).clicked() {
        controller.run_validation();
    }
    ui.separator();
    egui::ScrollArea::vertical()
        .id_salt("validation_transcript")
        .stick_to_bottom(true)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for line in &controller.validate.transcript {
                ui.monospace(line);
            }
        });
}
