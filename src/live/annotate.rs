use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detection::{ClassLabel, DefectClass, DetectionRecord};

const OUTLINE_THICKNESS: i32 = 2;

fn class_color(label: ClassLabel) -> Rgba<u8> {
    match label {
        ClassLabel::Known(DefectClass::Crack) => Rgba([230, 57, 70, 255]),
        ClassLabel::Known(DefectClass::Inclusion) => Rgba([244, 162, 97, 255]),
        ClassLabel::Known(DefectClass::Porosity) => Rgba([233, 196, 106, 255]),
        ClassLabel::Known(DefectClass::Scratch) => Rgba([42, 157, 143, 255]),
        ClassLabel::Known(DefectClass::Oxidation) => Rgba([69, 123, 157, 255]),
        ClassLabel::Known(DefectClass::Decarburization) => Rgba([157, 78, 221, 255]),
        ClassLabel::Unknown(_) => Rgba([255, 255, 255, 255]),
    }
}

/// Outline every detection on `image`, converting normalized boxes to pixels.
///
/// Boxes are clipped to the image; boxes that end up empty are skipped.
pub fn draw_detections(image: &mut RgbaImage, detections: &[DetectionRecord]) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    for detection in detections {
        let Some(rect) = pixel_rect(detection, width, height) else {
            continue;
        };
        let color = class_color(detection.label());
        for inset in 0..OUTLINE_THICKNESS {
            let w = rect.width() as i32 - 2 * inset;
            let h = rect.height() as i32 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let ring = Rect::at(rect.left() + inset, rect.top() + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(image, ring, color);
        }
    }
}

fn pixel_rect(detection: &DetectionRecord, width: u32, height: u32) -> Option<Rect> {
    let (w, h) = (f64::from(width), f64::from(height));
    let left = ((detection.center_x - detection.width / 2.0) * w).round().max(0.0);
    let top = ((detection.center_y - detection.height / 2.0) * h).round().max(0.0);
    let right = ((detection.center_x + detection.width / 2.0) * w).round().min(w);
    let bottom = ((detection.center_y + detection.height / 2.0) * h).round().min(h);
    if right - left < 1.0 || bottom - top < 1.0 {
        return None;
    }
    Some(Rect::at(left as i32, top as i32).of_size((right - left) as u32, (bottom - top) as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::parse_line;

    #[test]
    fn outlines_box_edges_and_leaves_interior() {
        let mut image = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let detection = parse_line("0 0.5 0.5 0.4 0.4 0.9").unwrap();
        draw_detections(&mut image, &[detection]);

        let crack = class_color(ClassLabel::Known(DefectClass::Crack));
        assert_eq!(*image.get_pixel(30, 50), crack);
        assert_eq!(*image.get_pixel(31, 50), crack);
        assert_eq!(*image.get_pixel(50, 30), crack);
        assert_eq!(*image.get_pixel(50, 50), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn boxes_outside_the_frame_are_clipped_or_skipped() {
        let mut image = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255]));
        let outside = parse_line("2 1.5 1.5 0.2 0.2").unwrap();
        let partial = parse_line("9 0.95 0.95 0.3 0.3").unwrap();
        draw_detections(&mut image, &[outside, partial]);
        assert_eq!(*image.get_pixel(9, 9), Rgba([255, 255, 255, 255]));
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }
}
