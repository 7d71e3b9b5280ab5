//! Watermark overlay for free-tier images.
//!
//! Free-tier results carry a semi-transparent rotated "GENBOX FREE TRIAL"
//! band across the image plus a small corner brand mark, both sized
//! proportionally to the image dimensions, re-encoded as JPEG.
//!
//! The watermark is a nicety, not a delivery requirement: if anything in
//! here fails (undecodable bytes, unsupported format), the original image
//! is returned unchanged and a warning is logged.

use image::{ExtendedColorType, Rgba, RgbaImage, codecs::jpeg::JpegEncoder};

const LABEL: &str = "GENBOX FREE TRIAL";
const CORNER_MARK: &str = "GENBOX";

const LABEL_OPACITY: f32 = 0.30;
const CORNER_OPACITY: f32 = 0.50;
const ROTATION_DEGREES: f32 = -30.0;
const JPEG_QUALITY: u8 = 90;

/// Built-in 5x7 glyphs, one bit row per byte (MSB-first in the low 5 bits).
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

fn glyph_rows(c: char) -> [u8; 7] {
    match c {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01110],
        'I' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b11111],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        // Space and anything unmapped render as blank cells.
        _ => [0; 7],
    }
}

/// Width of rendered text in unscaled glyph columns (one spacer column
/// between glyphs).
fn text_columns(text: &str) -> u32 {
    text.chars().count() as u32 * (GLYPH_WIDTH + 1)
}

/// Whether the unscaled text bitmap has an inked pixel at (col, row).
fn text_mask(text: &str, col: u32, row: u32) -> bool {
    if row >= GLYPH_HEIGHT {
        return false;
    }
    let cell = GLYPH_WIDTH + 1;
    let index = (col / cell) as usize;
    let gx = col % cell;
    if gx >= GLYPH_WIDTH {
        // Spacer column between glyphs.
        return false;
    }
    let Some(c) = text.chars().nth(index) else {
        return false;
    };
    let rows = glyph_rows(c);
    rows[row as usize] >> (GLYPH_WIDTH - 1 - gx) & 1 == 1
}

fn blend_white(pixel: &mut Rgba<u8>, opacity: f32) {
    for channel in pixel.0.iter_mut().take(3) {
        let base = f32::from(*channel);
        *channel = (base + (255.0 - base) * opacity).round() as u8;
    }
}

/// Stamp a diagonal band of `text`, repeated along the rotated baseline,
/// centered on the image.
///
/// Works by inverse-mapping every canvas pixel into the rotated text plane
/// and sampling the glyph mask, which avoids the hole artifacts of
/// forward-rotating individual pixels.
fn draw_rotated_band(canvas: &mut RgbaImage, text: &str, scale: u32, opacity: f32) {
    let (width, height) = canvas.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let angle = ROTATION_DEGREES.to_radians();
    let (sin, cos) = angle.sin_cos();

    let text_width = (text_columns(text) * scale) as f32;
    let text_height = (GLYPH_HEIGHT * scale) as f32;
    // Gap of four glyph cells between repetitions.
    let step = text_width + (4 * (GLYPH_WIDTH + 1) * scale) as f32;

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            // Inverse rotation into the text plane.
            let u = dx * cos + dy * sin;
            let v = -dx * sin + dy * cos;

            if v < -text_height / 2.0 || v >= text_height / 2.0 {
                continue;
            }
            let tu = (u + text_width / 2.0).rem_euclid(step);
            if tu >= text_width {
                continue;
            }

            let col = (tu / scale as f32) as u32;
            let row = ((v + text_height / 2.0) / scale as f32) as u32;
            if text_mask(text, col, row) {
                blend_white(canvas.get_pixel_mut(x, y), opacity);
            }
        }
    }
}

/// Stamp unrotated `text` near the bottom-right corner.
fn draw_corner_mark(canvas: &mut RgbaImage, text: &str, scale: u32, opacity: f32) {
    let (width, height) = canvas.dimensions();
    let text_width = text_columns(text) * scale;
    let text_height = GLYPH_HEIGHT * scale;
    let margin = text_height;

    let x0 = width.saturating_sub(text_width + margin);
    let y0 = height.saturating_sub(text_height + margin);

    for row in 0..text_height {
        for col in 0..text_width {
            let x = x0 + col;
            let y = y0 + row;
            if x >= width || y >= height {
                continue;
            }
            if text_mask(text, col / scale, row / scale) {
                blend_white(canvas.get_pixel_mut(x, y), opacity);
            }
        }
    }
}

fn overlay_watermark(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let mut canvas = decoded.to_rgba8();
    let (width, _height) = canvas.dimensions();

    // Main label height targets ~5% of the image width, corner mark 40% of that.
    let main_scale = ((width as f32 * 0.05) / GLYPH_HEIGHT as f32).round().max(1.0) as u32;
    let corner_scale = ((main_scale as f32) * 0.4).round().max(1.0) as u32;

    draw_rotated_band(&mut canvas, LABEL, main_scale, LABEL_OPACITY);
    draw_corner_mark(&mut canvas, CORNER_MARK, corner_scale, CORNER_OPACITY);

    let rgb = image::DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    image::ImageEncoder::write_image(
        encoder,
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// Apply the free-tier watermark to downloaded image bytes.
///
/// Never fails: on any decode or encode error the original bytes are
/// returned unmodified.
pub fn apply_watermark(bytes: &[u8]) -> Vec<u8> {
    match overlay_watermark(bytes) {
        Ok(out) => out,
        Err(err) => {
            tracing::warn!("Watermark failed, returning original image: {}", err);
            bytes.to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::png::PngEncoder;

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let canvas = RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255]));
        let mut out = Vec::new();
        let encoder = PngEncoder::new(&mut out);
        image::ImageEncoder::write_image(
            encoder,
            canvas.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        )
        .unwrap();
        out
    }

    #[test]
    fn undecodable_bytes_are_returned_unchanged() {
        let garbage = b"definitely not an image".to_vec();
        assert_eq!(apply_watermark(&garbage), garbage);
    }

    #[test]
    fn watermarked_image_is_jpeg_with_same_dimensions() {
        let original = solid_png(320, 240);
        let marked = apply_watermark(&original);

        assert_ne!(marked, original);
        let decoded = image::load_from_memory(&marked).unwrap();
        assert_eq!(decoded.width(), 320);
        assert_eq!(decoded.height(), 240);
        assert_eq!(
            image::guess_format(&marked).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn overlay_brightens_pixels_on_a_dark_canvas() {
        let original = solid_png(200, 200);
        let marked = apply_watermark(&original);
        let decoded = image::load_from_memory(&marked).unwrap().to_rgb8();

        let brightened = decoded.pixels().filter(|p| p.0[0] > 60).count();
        assert!(brightened > 0, "expected some watermark pixels");
        // The mark is an overlay, not a fill: most of the image stays dark.
        let total = (decoded.width() * decoded.height()) as usize;
        assert!(brightened < total / 2);
    }

    #[test]
    fn glyph_mask_covers_the_label_alphabet() {
        for c in "GENBOX FREE TRIAL".chars() {
            if c != ' ' {
                assert_ne!(glyph_rows(c), [0; 7], "missing glyph for {c:?}");
            }
        }
        assert_eq!(glyph_rows(' '), [0; 7]);
    }
}
