use eframe::egui::{self, Color32, RichText, Sense, Ui};

use crate::batch::{ClassShare, HISTOGRAM_BINS};

const BAR_COLOR: Color32 = Color32::from_rgb(90, 150, 220);
const HISTOGRAM_HEIGHT: f32 = 120.0;

/// Class share of the defect total, one bar per class in ranking order.
pub(super) fn class_shares(ui: &mut Ui, shares: &[ClassShare]) {
    ui.label(RichText::new("Defect classes").strong());
    if shares.is_empty() {
        ui.weak("No data");
        return;
    }
    for share in shares {
        ui.add(
            egui::ProgressBar::new(share.fraction as f32)
                .fill(BAR_COLOR)
                .text(format!(
                    "{}: {} ({:.1}%)",
                    share.label,
                    share.count,
                    share.fraction * 100.0
                )),
        );
    }
}

/// Confidence histogram over [0, 1].
pub(super) fn confidence_histogram(ui: &mut Ui, bins: &[usize; HISTOGRAM_BINS]) {
    ui.label(RichText::new("Confidence distribution").strong());
    let peak = bins.iter().copied().max().unwrap_or(0);
    if peak == 0 {
        ui.weak("No data");
        return;
    }
    let width = ui.available_width().max(100.0);
    let (rect, _) = ui.allocate_exact_size(egui::vec2(width, HISTOGRAM_HEIGHT), Sense::hover());
    let painter = ui.painter_at(rect);
    let bar_width = rect.width() / HISTOGRAM_BINS as f32;
    for (index, count) in bins.iter().enumerate() {
        let height = rect.height() * (*count as f32 / peak as f32);
        let left = rect.left() + bar_width * index as f32;
        let bar = egui::Rect::from_min_max(
            egui::pos2(left + 1.0, rect.bottom() - height),
            egui::pos2(left + bar_width - 1.0, rect.bottom()),
        );
        painter.rect_filled(bar, 0.0, BAR_COLOR);
    }
    ui.horizontal(|ui| {
        ui.small("0.0");
        ui.add_space((width - 40.0).max(0.0));
        ui.small("1.0");
    });
}
