//! Colour palette, bitmap font and frame annotation helpers

use crate::error::{Result, TrackingError};
use crate::types::Color;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use siamtrack::PixelBox;

/// Channel levels combined by the palette
const PALETTE_LEVELS: [u8; 3] = [0, 127, 255];

/// Largest number of objects the palette can colour
pub const MAX_OBJECTS: usize = 26;

/// Box outline thickness in pixels
pub const BOX_THICKNESS: i32 = 3;

/// Font scale used to measure labels
pub const MEASURE_SCALE: u32 = 2;

/// Font scale used to render labels (1.5x the measure scale)
pub const LABEL_SCALE: u32 = 3;

const LABEL_BACKGROUND: Rgb<u8> = Rgb([255, 0, 0]);
const LABEL_FOREGROUND: Rgb<u8> = Rgb([0, 0, 0]);

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Glyph width plus one column of spacing
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;

/// Generate one colour per object, in object index order
///
/// Colour `i` (1-based) takes the base-3 digits of `i` as indices into
/// `[0, 127, 255]`, giving `(B, G, R)`.
pub fn generate_colors(n: usize) -> Result<Vec<Color>> {
    if n > MAX_OBJECTS {
        return Err(TrackingError::TooManyObjects {
            count: n,
            max: MAX_OBJECTS,
        });
    }

    Ok((1..=n)
        .map(|i| {
            let a = i / 9;
            let b = (i - a * 9) / 3;
            let c = i % 3;
            Color([PALETTE_LEVELS[a], PALETTE_LEVELS[b], PALETTE_LEVELS[c]])
        })
        .collect())
}

/// Get 5x7 bitmap pattern for a character
fn get_char_pattern(ch: char) -> [u8; 7] {
    match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b11011, 0b10001],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ' ' => [0; 7],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

/// Size of a rendered label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSize {
    pub width: u32,
    pub height: u32,
    /// Space reserved below the baseline
    pub baseline: u32,
}

/// Measure `text` in the bitmap font at an integer `scale`
pub fn text_size(text: &str, scale: u32) -> TextSize {
    let chars = text.chars().count() as u32;
    TextSize {
        width: chars * GLYPH_ADVANCE * scale,
        height: GLYPH_HEIGHT * scale,
        baseline: scale,
    }
}

/// Draw text with its baseline at `baseline_y`, starting at column `x`
///
/// Each font pixel becomes a `scale x scale` block. Text is upper-cased.
pub fn draw_text(img: &mut RgbImage, text: &str, x: i32, baseline_y: i32, scale: u32, color: Rgb<u8>) {
    if scale == 0 {
        return;
    }
    let scale_i = scale as i32;
    let top = baseline_y - (GLYPH_HEIGHT * scale) as i32;

    for (i, ch) in text.to_uppercase().chars().enumerate() {
        let char_x = x + i as i32 * (GLYPH_ADVANCE * scale) as i32;
        let pattern = get_char_pattern(ch);

        for (row, &bits) in pattern.iter().enumerate() {
            for col in 0..GLYPH_WIDTH as i32 {
                if (bits >> (GLYPH_WIDTH as i32 - 1 - col)) & 1 == 1 {
                    let px = char_x + col * scale_i;
                    let py = top + row as i32 * scale_i;
                    draw_filled_rect_mut(img, Rect::at(px, py).of_size(scale, scale), color);
                }
            }
        }
    }
}

/// Draw a rectangle outline through the inclusive corners of `bbox`
///
/// The stroke is centred on the box edges, so a thickness of 3 covers one
/// pixel on each side of every edge.
pub fn draw_rect(img: &mut RgbImage, bbox: PixelBox, color: Rgb<u8>, thickness: i32) {
    let half = thickness / 2;
    for layer in 0..thickness {
        let grow = layer - half;
        let width = bbox.right - bbox.left + 1 + 2 * grow;
        let height = bbox.bottom - bbox.top + 1 + 2 * grow;
        if width <= 0 || height <= 0 {
            continue;
        }
        let rect =
            Rect::at(bbox.left - grow, bbox.top - grow).of_size(width as u32, height as u32);
        draw_hollow_rect_mut(img, rect, color);
    }
}

/// Fill the inclusive corner range `(x1, y1) .. (x2, y2)`
fn fill_rect(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, color: Rgb<u8>) {
    let (width, height) = (x2 - x1 + 1, y2 - y1 + 1);
    if width > 0 && height > 0 {
        draw_filled_rect_mut(
            img,
            Rect::at(x1, y1).of_size(width as u32, height as u32),
            color,
        );
    }
}

/// Return a copy of `frame` with `bbox` outlined and `label` drawn above it
pub fn annotate(frame: &RgbImage, label: &str, bbox: PixelBox, color: Color) -> RgbImage {
    let mut canvas = frame.clone();
    draw_rect(&mut canvas, bbox, color.to_rgb(), BOX_THICKNESS);

    if !label.is_empty() {
        let size = text_size(label, MEASURE_SCALE);
        let label_height = (1.5 * size.height as f32).round() as i32;
        let label_width = (1.5 * size.width as f32).round() as i32;
        let top = bbox.top.max(label_height);

        fill_rect(
            &mut canvas,
            bbox.left,
            top - label_height,
            bbox.left + label_width,
            top + size.baseline as i32,
            LABEL_BACKGROUND,
        );
        draw_text(&mut canvas, label, bbox.left, top, LABEL_SCALE, LABEL_FOREGROUND);
    }

    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_colors_sequence() {
        let colors = generate_colors(5).unwrap();
        assert_eq!(
            colors,
            vec![
                Color([0, 0, 127]),
                Color([0, 0, 255]),
                Color([0, 127, 0]),
                Color([0, 127, 127]),
                Color([0, 127, 255]),
            ]
        );
    }

    #[test]
    fn test_generate_colors_distinct() {
        for n in 1..=MAX_OBJECTS {
            let colors = generate_colors(n).unwrap();
            assert_eq!(colors.len(), n);
            let unique: HashSet<_> = colors.iter().collect();
            assert_eq!(unique.len(), n);
        }
        assert_eq!(generate_colors(26).unwrap()[25], Color([255, 255, 255]));
    }

    #[test]
    fn test_generate_colors_too_many() {
        for n in [27, 28, 100] {
            match generate_colors(n) {
                Err(TrackingError::TooManyObjects { count, max }) => {
                    assert_eq!(count, n);
                    assert_eq!(max, MAX_OBJECTS);
                }
                other => panic!("expected TooManyObjects, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_generate_colors_empty() {
        assert!(generate_colors(0).unwrap().is_empty());
    }

    #[test]
    fn test_text_size_scales() {
        let size = text_size("object_0", MEASURE_SCALE);
        assert_eq!(size, TextSize { width: 96, height: 14, baseline: 2 });
        assert_eq!(text_size("", 3).width, 0);
    }

    #[test]
    fn test_draw_rect_is_centred_on_edges() {
        let mut img = RgbImage::new(60, 60);
        let red = Rgb([255, 0, 0]);
        draw_rect(&mut img, PixelBox::new(10, 10, 50, 50), red, 3);

        for (x, y) in [(9, 30), (10, 30), (11, 30), (30, 49), (30, 50), (30, 51)] {
            assert_eq!(*img.get_pixel(x, y), red, "({x}, {y})");
        }
        assert_eq!(*img.get_pixel(8, 30), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(12, 30), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(30, 30), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_rect_degenerate_box() {
        let mut img = RgbImage::new(20, 20);
        draw_rect(&mut img, PixelBox::new(5, 5, 5, 5), Rgb([0, 255, 0]), 3);
        assert_eq!(*img.get_pixel(5, 5), Rgb([0, 255, 0]));
        assert_eq!(*img.get_pixel(4, 4), Rgb([0, 255, 0]));
    }

    #[test]
    fn test_draw_rect_outside_frame() {
        let mut img = RgbImage::new(20, 20);
        draw_rect(&mut img, PixelBox::new(-50, -50, -30, -30), Rgb([0, 255, 0]), 3);
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_annotate_leaves_input_untouched() {
        let frame = RgbImage::from_pixel(100, 100, Rgb([200, 200, 200]));
        let out = annotate(&frame, "object_0", PixelBox::new(10, 40, 50, 80), Color([0, 0, 127]));
        assert!(frame.pixels().all(|p| *p == Rgb([200, 200, 200])));
        assert_eq!(*out.get_pixel(30, 80), Rgb([127, 0, 0]));
    }

    #[test]
    fn test_annotate_label_clamped_to_frame_top() {
        let frame = RgbImage::from_pixel(200, 100, Rgb([200, 200, 200]));
        let out = annotate(&frame, "object_0", PixelBox::new(10, 5, 50, 60), Color([0, 255, 0]));

        // label height 21 pushes the baseline down to y = 21; background spans y 0..=23
        assert_eq!(*out.get_pixel(154, 0), LABEL_BACKGROUND);
        assert_eq!(*out.get_pixel(154, 23), LABEL_BACKGROUND);
        assert_eq!(*out.get_pixel(155, 10), Rgb([200, 200, 200]));
        assert_eq!(*out.get_pixel(154, 24), Rgb([200, 200, 200]));
    }

    #[test]
    fn test_annotate_label_sits_above_box() {
        let frame = RgbImage::from_pixel(200, 200, Rgb([200, 200, 200]));
        let out = annotate(&frame, "ab", PixelBox::new(20, 100, 80, 150), Color([0, 255, 0]));

        // 'A' top row is 0b01110: column 1 of the glyph is lit at scale 3
        let glyph_top = 100 - 21;
        assert_eq!(*out.get_pixel(20 + 3, glyph_top as u32), LABEL_FOREGROUND);
        assert_eq!(*out.get_pixel(20, glyph_top as u32), LABEL_BACKGROUND);
        // nothing drawn above the background
        assert_eq!(*out.get_pixel(20, 78), Rgb([200, 200, 200]));
    }

    #[test]
    fn test_annotate_without_label() {
        let frame = RgbImage::from_pixel(100, 100, Rgb([200, 200, 200]));
        let out = annotate(&frame, "", PixelBox::new(40, 40, 60, 60), Color([255, 0, 0]));
        assert_eq!(*out.get_pixel(40, 5), Rgb([200, 200, 200]));
        assert_eq!(*out.get_pixel(40, 50), Rgb([0, 0, 255]));
    }
}
