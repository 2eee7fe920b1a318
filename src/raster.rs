//! Text rasterization for image-format outputs
//!
//! Draws placement text directly onto the decoded template bitmap using
//! ab_glyph outlines: glyphs are laid out along a caret, rasterized into
//! an anti-aliased coverage buffer, and coverage-blended into the target
//! image with the placement color. Raster outputs keep the editor's
//! top-left, y-down orientation, so no vertical flip is involved.

use ab_glyph::{Font, FontArc, ScaleFont};
use image::RgbaImage;

use crate::types::{Color, TextAlign};

/// Advance width of `text` at `px_size`, in pixels
pub fn text_width(font: &FontArc, text: &str, px_size: f32) -> f32 {
    let scaled = font.as_scaled(px_size);
    text.chars()
        .map(|ch| scaled.h_advance(font.glyph_id(ch)))
        .sum()
}

/// Anti-aliased coverage buffer for one line of text
struct Coverage {
    width: usize,
    height: usize,
    /// Baseline offset from the buffer top, in pixels
    ascent: f32,
    data: Vec<f32>,
}

fn render_coverage(font: &FontArc, text: &str, px_size: f32) -> Coverage {
    let scaled = font.as_scaled(px_size);

    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        glyphs.push((glyph_id, caret_x));
        caret_x += scaled.h_advance(glyph_id);
    }

    let width = (caret_x.ceil() as usize).max(1);
    let ascent = scaled.ascent();
    let descent = scaled.descent();
    let height = ((ascent - descent).ceil() as usize).max(1);

    let mut data = vec![0.0f32; width * height];

    for &(glyph_id, glyph_x) in &glyphs {
        let glyph = glyph_id.with_scale_and_position(px_size, ab_glyph::point(glyph_x, ascent));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = px as i32 + bounds.min.x as i32;
                let y = py as i32 + bounds.min.y as i32;
                if x >= 0 && x < width as i32 && y >= 0 && y < height as i32 {
                    let idx = y as usize * width + x as usize;
                    data[idx] = (data[idx] + coverage).min(1.0);
                }
            });
        }
    }

    Coverage { width, height, ascent, data }
}

/// Rotate `point` around `center` by `degrees`, clockwise in a y-down
/// pixel space.
fn rotate_point(point: (f64, f64), center: (f64, f64), degrees: f64) -> (f64, f64) {
    let rad = degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    let dx = point.0 - center.0;
    let dy = point.1 - center.1;
    (
        center.0 + dx * cos - dy * sin,
        center.1 + dx * sin + dy * cos,
    )
}

/// Draw one line of text onto the image.
///
/// `anchor_x` is the left edge of the placement box, `baseline_y` the
/// baseline row, both in image pixels. Alignment offsets the text within
/// `box_width`. Rotation (editor clockwise degrees) pivots around the
/// box's left baseline point.
#[allow(clippy::too_many_arguments)]
pub fn draw_text(
    img: &mut RgbaImage,
    font: &FontArc,
    text: &str,
    anchor_x: f64,
    baseline_y: f64,
    px_size: f64,
    color: Color,
    align: TextAlign,
    box_width: f64,
    rotation_deg: f64,
) {
    let coverage = render_coverage(font, text, px_size as f32);

    let dx = match align {
        TextAlign::Left => 0.0,
        TextAlign::Center => (box_width - coverage.width as f64) / 2.0,
        TextAlign::Right => box_width - coverage.width as f64,
    };

    // Buffer top-left in image space before rotation
    let origin_x = anchor_x + dx;
    let origin_y = baseline_y - f64::from(coverage.ascent);

    if rotation_deg == 0.0 {
        blit(img, &coverage, origin_x, origin_y, color);
    } else {
        blit_rotated(
            img,
            &coverage,
            origin_x,
            origin_y,
            (anchor_x, baseline_y),
            rotation_deg,
            color,
        );
    }
}

fn blend(img: &mut RgbaImage, x: i64, y: i64, coverage: f32, color: Color) {
    if coverage <= 0.0 || x < 0 || y < 0 || x >= i64::from(img.width()) || y >= i64::from(img.height()) {
        return;
    }
    let pixel = img.get_pixel_mut(x as u32, y as u32);
    let rgb = [color.r, color.g, color.b];
    for (channel, target) in pixel.0.iter_mut().take(3).zip(rgb) {
        let old = f32::from(*channel);
        let new = old * (1.0 - coverage) + (target as f32) * 255.0 * coverage;
        *channel = new.round().clamp(0.0, 255.0) as u8;
    }
    let alpha = f32::from(pixel.0[3]).max(coverage * 255.0);
    pixel.0[3] = alpha.round() as u8;
}

fn blit(img: &mut RgbaImage, coverage: &Coverage, origin_x: f64, origin_y: f64, color: Color) {
    for cy in 0..coverage.height {
        for cx in 0..coverage.width {
            let value = coverage.data[cy * coverage.width + cx];
            blend(
                img,
                (origin_x + cx as f64).round() as i64,
                (origin_y + cy as f64).round() as i64,
                value,
                color,
            );
        }
    }
}

/// Inverse-mapped nearest-neighbor blit of the coverage buffer rotated
/// around `pivot`
fn blit_rotated(
    img: &mut RgbaImage,
    coverage: &Coverage,
    origin_x: f64,
    origin_y: f64,
    pivot: (f64, f64),
    degrees: f64,
    color: Color,
) {
    // Destination bounding box from the rotated buffer corners
    let corners = [
        (origin_x, origin_y),
        (origin_x + coverage.width as f64, origin_y),
        (origin_x, origin_y + coverage.height as f64),
        (
            origin_x + coverage.width as f64,
            origin_y + coverage.height as f64,
        ),
    ]
    .map(|corner| rotate_point(corner, pivot, degrees));

    let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min).floor() as i64;
    let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max).ceil() as i64;
    let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min).floor() as i64;
    let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max).ceil() as i64;

    for ty in min_y..=max_y {
        for tx in min_x..=max_x {
            let (sx, sy) = rotate_point((tx as f64, ty as f64), pivot, -degrees);
            let cx = (sx - origin_x).floor() as i64;
            let cy = (sy - origin_y).floor() as i64;
            if cx >= 0 && cy >= 0 && (cx as usize) < coverage.width && (cy as usize) < coverage.height
            {
                let value = coverage.data[cy as usize * coverage.width + cx as usize];
                blend(img, tx, ty, value, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_rotate_point_identity() {
        let p = rotate_point((10.0, 5.0), (0.0, 0.0), 0.0);
        assert!((p.0 - 10.0).abs() < 1e-9);
        assert!((p.1 - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotate_point_quarter_turn_clockwise() {
        // y-down space: (1, 0) rotated 90 degrees clockwise lands at (0, 1)
        let p = rotate_point((1.0, 0.0), (0.0, 0.0), 90.0);
        assert!(p.0.abs() < 1e-9);
        assert!((p.1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_blend_full_coverage_replaces_color() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        blend(&mut img, 1, 1, 1.0, Color::black());
        assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 255]);
        // Out-of-bounds writes are ignored
        blend(&mut img, -1, 99, 1.0, Color::black());
    }

    #[test]
    fn test_blit_places_coverage_at_origin() {
        let coverage = Coverage {
            width: 2,
            height: 1,
            ascent: 1.0,
            data: vec![1.0, 0.0],
        };
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        blit(&mut img, &coverage, 1.0, 2.0, Color::black());
        assert_eq!(img.get_pixel(1, 2).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(2, 2).0, [255, 255, 255, 255]);
    }
}
