//! Pure overlay rendering for detection indicators.
//!
//! Draws an indicator dot on every detection and a highlighted border
//! plus label on the selected one. Animation phase is derived from the
//! wall-clock timestamp passed in, never from frame count, so rendering
//! the same inputs at the same timestamp yields identical pixels.

use crate::detect::Detection;
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_hollow_rect_mut,
    draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const GREEN_DARK: Rgb<u8> = Rgb([0, 200, 0]);
const ORANGE: Rgb<u8> = Rgb([255, 165, 0]);

const DOT_RADIUS: i32 = 6;
const SELECTED_DOT_RADIUS: i32 = 12;
const BORDER_BASE_THICKNESS: i32 = 8;
const CORNER_LENGTH: i32 = 25;
const CORNER_THICKNESS: i32 = 6;
const SELECTED_LABEL: &str = "SELECTED";

/// Animated pulse offset: |sin(t * rate)| * amplitude.
///
/// A pure function of wall-clock seconds, so geometry is reproducible
/// given a timestamp and independent of frame rate.
pub fn pulse_phase(t_secs: f64, rate: f64, amplitude: f64) -> f64 {
    (t_secs * rate).sin().abs() * amplitude
}

/// Draw all detection overlays onto the frame.
///
/// Every detection gets an indicator dot; the selected detection (when
/// its index is within the list) additionally gets the highlighted
/// border. Out-of-range selections silently draw dots only.
pub fn render_overlay(
    frame: &mut RgbImage,
    detections: &[Detection],
    selected: Option<i64>,
    t_secs: f64,
    font: Option<&Font<'_>>,
) {
    if detections.is_empty() {
        return;
    }

    let selected_idx = match selected {
        Some(idx) if idx >= 0 && (idx as usize) < detections.len() => Some(idx as usize),
        _ => None,
    };

    draw_detection_dots(frame, detections, selected_idx, t_secs);

    if let Some(idx) = selected_idx {
        draw_selection_border(frame, &detections[idx], t_secs, font);
    }
}

/// Draw indicator dots at every detection center.
pub fn draw_detection_dots(
    frame: &mut RgbImage,
    detections: &[Detection],
    selected_idx: Option<usize>,
    t_secs: f64,
) {
    for (i, det) in detections.iter().enumerate() {
        let (cx, cy) = (det.center.0 as i32, det.center.1 as i32);

        if selected_idx == Some(i) {
            let pulse_radius = SELECTED_DOT_RADIUS + pulse_phase(t_secs, 4.0, 3.0) as i32;

            // Layered for visibility: white pulse ring, green outer ring,
            // green core, white center
            draw_thick_circle(frame, cx, cy, pulse_radius, 3, WHITE);
            draw_thick_circle(frame, cx, cy, SELECTED_DOT_RADIUS + 3, 3, GREEN);
            draw_filled_circle_mut(frame, (cx, cy), SELECTED_DOT_RADIUS, GREEN);
            draw_filled_circle_mut(frame, (cx, cy), SELECTED_DOT_RADIUS - 4, WHITE);
        } else {
            draw_filled_circle_mut(frame, (cx, cy), DOT_RADIUS, ORANGE);
            draw_thick_circle(frame, cx, cy, DOT_RADIUS, 2, WHITE);
        }
    }
}

/// Draw the highlighted border around the selected detection's box.
pub fn draw_selection_border(
    frame: &mut RgbImage,
    detection: &Detection,
    t_secs: f64,
    font: Option<&Font<'_>>,
) {
    let bbox = detection.bounding_box;
    let (x1, y1) = (bbox.x1 as i32, bbox.y1 as i32);
    let (x2, y2) = (bbox.x2 as i32, bbox.y2 as i32);

    let pulse_thickness = BORDER_BASE_THICKNESS + pulse_phase(t_secs, 3.0, 3.0) as i32;

    // Fixed white contrast frame outside the pulsing border
    draw_thick_rect(frame, x1 - 4, y1 - 4, x2 + 4, y2 + 4, 4, WHITE);
    draw_thick_rect(frame, x1 - 1, y1 - 1, x2 + 1, y2 + 1, pulse_thickness, GREEN);
    draw_thick_rect(frame, x1 + 2, y1 + 2, x2 - 2, y2 - 2, 2, GREEN_DARK);

    // Corner accent marks at all four corners
    draw_corner(frame, x1 - 6, y1 - 6, 1, 1);
    draw_corner(frame, x2 + 6, y1 - 6, -1, 1);
    draw_corner(frame, x1 - 6, y2 + 6, 1, -1);
    draw_corner(frame, x2 + 6, y2 + 6, -1, -1);

    if let Some(font) = font {
        draw_selection_label(frame, x1, y1, x2, y2, font);
    }
}

/// Draw the selection marker text above the box, moved below it when it
/// would clip the top edge.
fn draw_selection_label(frame: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, font: &Font<'_>) {
    let scale = Scale::uniform(20.0);
    let (text_width, text_height) = text_size(scale, font, SELECTED_LABEL);

    let label_x = x1 + (x2 - x1 - text_width) / 2;
    let mut label_y = y1 - 20 - text_height;
    if label_y < 10 {
        label_y = y2 + 20;
    }

    let padding = 8;
    let bg = Rect::at(label_x - padding, label_y - padding / 2).of_size(
        (text_width + 2 * padding).max(1) as u32,
        (text_height + padding).max(1) as u32,
    );
    draw_filled_rect_mut(frame, bg, GREEN);
    draw_thick_rect(
        frame,
        label_x - padding,
        label_y - padding / 2,
        label_x + text_width + padding,
        label_y + text_height + padding / 2,
        2,
        WHITE,
    );

    draw_text_mut(frame, WHITE, label_x, label_y, scale, font, SELECTED_LABEL);
}

/// Draw a fixed-position status label identifying the active camera,
/// white shadow behind the accent color for contrast.
pub fn draw_status_label(
    frame: &mut RgbImage,
    text: &str,
    color: Rgb<u8>,
    font: Option<&Font<'_>>,
) {
    let Some(font) = font else {
        return;
    };
    let scale = Scale::uniform(18.0);
    draw_text_mut(frame, WHITE, 11, 11, scale, font, text);
    draw_text_mut(frame, color, 10, 10, scale, font, text);
}

/// Hollow circle with an outline thickness, grown outward.
fn draw_thick_circle(frame: &mut RgbImage, cx: i32, cy: i32, radius: i32, thickness: i32, color: Rgb<u8>) {
    for i in 0..thickness {
        draw_hollow_circle_mut(frame, (cx, cy), (radius + i).max(1), color);
    }
}

/// Hollow rectangle with a border thickness, grown inward so layered
/// borders do not overdraw the frame outside them.
fn draw_thick_rect(
    frame: &mut RgbImage,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    thickness: i32,
    color: Rgb<u8>,
) {
    for i in 0..thickness {
        let width = (x2 - x1) - 2 * i;
        let height = (y2 - y1) - 2 * i;
        if width <= 0 || height <= 0 {
            break;
        }
        let rect = Rect::at(x1 + i, y1 + i).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(frame, rect, color);
    }
}

/// L-shaped corner accent; `dx`/`dy` give the inward direction.
fn draw_corner(frame: &mut RgbImage, x: i32, y: i32, dx: i32, dy: i32) {
    let half = CORNER_THICKNESS / 2;
    // Horizontal arm
    let hx1 = x.min(x + dx * CORNER_LENGTH);
    let hx2 = x.max(x + dx * CORNER_LENGTH);
    fill_rect_clipped(frame, hx1, y - half, hx2 - hx1, CORNER_THICKNESS, WHITE);
    // Vertical arm
    let vy1 = y.min(y + dy * CORNER_LENGTH);
    let vy2 = y.max(y + dy * CORNER_LENGTH);
    fill_rect_clipped(frame, x - half, vy1, CORNER_THICKNESS, vy2 - vy1, WHITE);
}

fn fill_rect_clipped(frame: &mut RgbImage, x: i32, y: i32, w: i32, h: i32, color: Rgb<u8>) {
    if w <= 0 || h <= 0 {
        return;
    }
    let rect = Rect::at(x, y).of_size(w as u32, h as u32);
    draw_filled_rect_mut(frame, rect, color);
}
