use crate::postprocessing::Detection;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

const BOX_THICKNESS: i32 = 3;

// Cycled by class id so the same class always gets the same color
const PALETTE: [Rgb<u8>; 10] = [
    Rgb([4, 42, 255]),
    Rgb([11, 219, 235]),
    Rgb([243, 243, 243]),
    Rgb([0, 223, 183]),
    Rgb([17, 31, 104]),
    Rgb([255, 111, 221]),
    Rgb([255, 68, 79]),
    Rgb([204, 237, 0]),
    Rgb([0, 243, 68]),
    Rgb([189, 0, 255]),
];

pub fn color_for_class(class_id: u16) -> Rgb<u8> {
    PALETTE[class_id as usize % PALETTE.len()]
}

/// Draw every detection onto the image as a hollow rectangle.
pub fn draw_detections(image: &mut RgbImage, detections: &[Detection]) {
    for detection in detections {
        draw_box(image, detection);
    }
}

fn draw_box(image: &mut RgbImage, detection: &Detection) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let x1 = (detection.bbox.x1.round() as i32).clamp(0, width as i32 - 1);
    let y1 = (detection.bbox.y1.round() as i32).clamp(0, height as i32 - 1);
    let x2 = (detection.bbox.x2.round() as i32).clamp(0, width as i32 - 1);
    let y2 = (detection.bbox.y2.round() as i32).clamp(0, height as i32 - 1);

    if x2 <= x1 || y2 <= y1 {
        return;
    }

    let color = color_for_class(detection.class_id);

    // Nested hollow rects give the border its thickness
    for inset in 0..BOX_THICKNESS {
        let rect_w = x2 - x1 - 2 * inset;
        let rect_h = y2 - y1 - 2 * inset;
        if rect_w <= 0 || rect_h <= 0 {
            break;
        }
        let rect = Rect::at(x1 + inset, y1 + inset).of_size(rect_w as u32, rect_h as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}
