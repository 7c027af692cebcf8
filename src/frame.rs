use crate::error::{CameraError, VisionError};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};
use rusttype::{Font, Scale};
use std::sync::Arc;
use std::time::SystemTime;

/// Error message rendered on synthesized placeholder frames.
pub const PLACEHOLDER_MESSAGE: &str = "Camera Error - Check Connection";

/// Compiled-in fallback face so the placeholder message and text
/// overlays stay visible on hosts without the configured font file.
const FALLBACK_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// One encoded output frame, ready for the multipart stream.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when the frame was produced
    pub timestamp: SystemTime,
    /// JPEG bytes (shared ownership for fan-out to stream clients)
    pub jpeg: Arc<Vec<u8>>,
}

impl EncodedFrame {
    pub fn new(id: u64, jpeg: Vec<u8>) -> Self {
        Self {
            id,
            timestamp: SystemTime::now(),
            jpeg: Arc::new(jpeg),
        }
    }

    /// Milliseconds since the Unix epoch, for stream part headers.
    pub fn timestamp_millis(&self) -> u128 {
        self.timestamp
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    }
}

/// Encode an RGB frame as JPEG at the given quality.
pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> Result<Vec<u8>, VisionError> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(frame).map_err(|e| {
        VisionError::component("frame", &format!("JPEG encode failed: {}", e))
    })?;
    Ok(buf)
}

/// Decode arbitrary uploaded image bytes into an RGB frame.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, CameraError> {
    let img = image::load_from_memory(bytes).map_err(|e| CameraError::Decode {
        details: e.to_string(),
    })?;
    Ok(img.to_rgb8())
}

/// Normalize a frame to the working resolution. Returns the input
/// untouched when it already matches.
pub fn resize_to(frame: RgbImage, width: u32, height: u32) -> RgbImage {
    if frame.width() == width && frame.height() == height {
        frame
    } else {
        imageops::resize(&frame, width, height, imageops::FilterType::Triangle)
    }
}

/// Synthesize a placeholder frame carrying a visible error message.
///
/// Emitted whenever the active source cannot produce a frame; the
/// pipeline never terminates on a read failure. Callers get a font from
/// `load_font`, which always yields one; the `None` path only drops the
/// text and keeps the red banner.
pub fn placeholder_frame(
    width: u32,
    height: u32,
    message: &str,
    font: Option<&Font<'_>>,
) -> RgbImage {
    let mut frame = RgbImage::from_pixel(width, height, Rgb([16, 16, 16]));

    // Red banner across the vertical center
    let banner_top = height / 2 - height / 12;
    let banner_bottom = height / 2 + height / 12;
    for y in banner_top..banner_bottom {
        for x in 0..width {
            frame.put_pixel(x, y, Rgb([96, 16, 16]));
        }
    }

    if let Some(font) = font {
        let scale = Scale::uniform(22.0);
        let (text_width, _) = imageproc::drawing::text_size(scale, font, message);
        let x = (width as i32 - text_width) / 2;
        let y = height as i32 / 2 - 12;
        imageproc::drawing::draw_text_mut(
            &mut frame,
            Rgb([255, 64, 64]),
            x.max(0),
            y.max(0),
            scale,
            font,
            message,
        );
    }

    frame
}

/// Load the overlay font from disk, falling back to the compiled-in
/// face when the file is missing or unparsable.
pub fn load_font(path: &str) -> Option<Font<'static>> {
    match std::fs::read(path) {
        Ok(data) => match Font::try_from_vec(data) {
            Some(font) => return Some(font),
            None => {
                tracing::warn!("Failed to parse font file '{}'; using built-in font", path);
            }
        },
        Err(e) => {
            tracing::warn!(
                "Failed to read font file '{}' ({}); using built-in font",
                path,
                e
            );
        }
    }
    Font::try_from_bytes(FALLBACK_FONT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_produces_jpeg_magic() {
        let frame = RgbImage::from_pixel(64, 48, Rgb([128, 64, 32]));
        let jpeg = encode_jpeg(&frame, 90).unwrap();
        assert!(jpeg.len() > 4);
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn decode_roundtrips_encoded_frame() {
        let frame = RgbImage::from_pixel(64, 48, Rgb([10, 20, 30]));
        let jpeg = encode_jpeg(&frame, 95).unwrap();
        let decoded = decode_image(&jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (64, 48));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_image(b"not an image at all").is_err());
    }

    #[test]
    fn resize_normalizes_dimensions() {
        let frame = RgbImage::from_pixel(320, 240, Rgb([0, 0, 0]));
        let resized = resize_to(frame, 640, 480);
        assert_eq!(resized.dimensions(), (640, 480));
    }

    #[test]
    fn resize_is_noop_at_target_resolution() {
        let frame = RgbImage::from_pixel(640, 480, Rgb([1, 2, 3]));
        let resized = resize_to(frame, 640, 480);
        assert_eq!(resized.get_pixel(0, 0), &Rgb([1, 2, 3]));
    }

    #[test]
    fn placeholder_has_banner_without_font() {
        let frame = placeholder_frame(640, 480, PLACEHOLDER_MESSAGE, None);
        assert_eq!(frame.dimensions(), (640, 480));
        // Banner row is reddish, corners stay dark
        assert_eq!(frame.get_pixel(0, 240), &Rgb([96, 16, 16]));
        assert_eq!(frame.get_pixel(0, 0), &Rgb([16, 16, 16]));
    }

    #[test]
    fn load_font_falls_back_to_builtin_face() {
        assert!(load_font("/definitely/not/a/font.ttf").is_some());
    }

    #[test]
    fn placeholder_message_is_visible_with_fallback_font() {
        let font = load_font("/definitely/not/a/font.ttf").unwrap();
        let with_message = placeholder_frame(640, 480, PLACEHOLDER_MESSAGE, Some(&font));
        let without_message = placeholder_frame(640, 480, "", Some(&font));
        assert_ne!(with_message.as_raw(), without_message.as_raw());
    }

    #[test]
    fn encoded_frame_timestamp_is_recent() {
        let frame = EncodedFrame::new(7, vec![0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(frame.id, 7);
        assert!(frame.timestamp_millis() > 0);
    }
}
