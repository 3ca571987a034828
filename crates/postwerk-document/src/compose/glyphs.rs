// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Built-in 5x7 bitmap glyphs for the code alphabet (0-9, a-f). Used when no
// TrueType font can be loaded so that stamping a code never fails.

use image::{Rgb, RgbImage};

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;

/// Rows top to bottom, bit 4 is the leftmost column.
fn rows(c: char) -> [u8; 7] {
    match c.to_ascii_lowercase() {
        '0' => [0x0e, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0e],
        '1' => [0x04, 0x0c, 0x04, 0x04, 0x04, 0x04, 0x0e],
        '2' => [0x0e, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1f],
        '3' => [0x1f, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0e],
        '4' => [0x02, 0x06, 0x0a, 0x12, 0x1f, 0x02, 0x02],
        '5' => [0x1f, 0x10, 0x1e, 0x01, 0x01, 0x11, 0x0e],
        '6' => [0x06, 0x08, 0x10, 0x1e, 0x11, 0x11, 0x0e],
        '7' => [0x1f, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0e, 0x11, 0x11, 0x0e, 0x11, 0x11, 0x0e],
        '9' => [0x0e, 0x11, 0x11, 0x0f, 0x01, 0x02, 0x0c],
        'a' => [0x00, 0x00, 0x0e, 0x01, 0x0f, 0x11, 0x0f],
        'b' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x1e],
        'c' => [0x00, 0x00, 0x0e, 0x10, 0x10, 0x11, 0x0e],
        'd' => [0x01, 0x01, 0x0d, 0x13, 0x11, 0x11, 0x0f],
        'e' => [0x00, 0x00, 0x0e, 0x11, 0x1f, 0x10, 0x0e],
        'f' => [0x06, 0x09, 0x08, 0x1c, 0x08, 0x08, 0x08],
        ' ' => [0; 7],
        _ => [0x1f; 7],
    }
}

/// Size of one glyph cell for a requested pixel height.
fn cell(px: f32) -> u32 {
    ((px / 10.0).round() as u32).max(1)
}

/// Rendered size of `text` as `(width, height)`.
pub fn measure(text: &str, px: f32) -> (u32, u32) {
    let s = cell(px);
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, GLYPH_H * s);
    }
    (n * (GLYPH_W + 1) * s - s, GLYPH_H * s)
}

/// Draw `text` with its top-left corner at (`x`, `y`). Pixels outside the
/// canvas are skipped.
pub fn draw(canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, px: f32, text: &str) {
    let s = cell(px) as i32;
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);
    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as i32 * (GLYPH_W as i32 + 1) * s;
        for (row, bits) in rows(c).iter().enumerate() {
            for col in 0..GLYPH_W as i32 {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let x0 = origin_x + col * s;
                let y0 = y + row as i32 * s;
                for dy in y0.max(0)..(y0 + s).min(ch) {
                    for dx in x0.max(0)..(x0 + s).min(cw) {
                        canvas.put_pixel(dx as u32, dy as u32, color);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_scales_with_size() {
        let (w_small, h_small) = measure("deadbeef", 46.0);
        let (w_big, h_big) = measure("deadbeef", 72.0);
        assert!(w_big > w_small && h_big > h_small);
        assert_eq!(measure("0", 10.0), (5, 7));
    }

    #[test]
    fn draw_marks_pixels_and_clips() {
        let mut canvas = RgbImage::from_pixel(20, 10, Rgb([255, 255, 255]));
        draw(&mut canvas, Rgb([0, 0, 0]), 15, 5, 10.0, "8");
        let dark = canvas.pixels().filter(|p| p.0 == [0, 0, 0]).count();
        assert!(dark > 0);
    }
}
