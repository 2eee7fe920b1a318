//! Coordinate-space conversion between the editor canvas and output pages
//!
//! Editor space has a top-left origin with Y growing downward (screen
//! pixels); PDF page space has a bottom-left origin with Y growing upward
//! (points). A per-axis scale pair converts between them, and placements
//! get a vertical flip on top of the scaling.

use crate::types::Size;

/// Default empirical baseline offset: fraction of the scaled placement
/// height added above the flipped box bottom to approximate where the
/// text baseline sits. This is a heuristic, not a font-metrics
/// computation; see `RendererConfig::baseline_factor`.
pub const BASELINE_FACTOR: f64 = 0.8;

/// Scale pair between editor space and output space
#[derive(Debug, Clone, Copy)]
pub struct SpaceScale {
    pub sx: f64,
    pub sy: f64,
}

impl SpaceScale {
    pub fn new(editor: Size, output: Size) -> Self {
        Self {
            sx: output.width / editor.width,
            sy: output.height / editor.height,
        }
    }
}

/// Editor X to output X
pub fn output_x(editor_x: f64, scale: SpaceScale) -> f64 {
    editor_x * scale.sx
}

/// Bottom edge of a placement box in output space.
///
/// `out_y = output_height - editor_y * sy - height * sy`: the flip
/// accounts for the differing Y directions of the two spaces.
pub fn box_bottom_y(output_height: f64, editor_y: f64, editor_height: f64, scale: SpaceScale) -> f64 {
    output_height - editor_y * scale.sy - editor_height * scale.sy
}

/// Output-space font size. Scaling uses the Y axis consistently; when
/// sx != sy this is a documented approximation, not a bug.
pub fn output_font_size(editor_font_size: f64, scale: SpaceScale) -> f64 {
    editor_font_size * scale.sy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_scale_reduces_to_simple_flip() {
        let scale = SpaceScale::new(Size::new(300.0, 400.0), Size::new(300.0, 400.0));
        assert_eq!(scale.sx, 1.0);
        assert_eq!(scale.sy, 1.0);
        // y' = outputHeight - y - h
        assert_eq!(box_bottom_y(400.0, 50.0, 20.0, scale), 330.0);
    }

    #[test]
    fn test_double_scale() {
        let scale = SpaceScale::new(Size::new(300.0, 400.0), Size::new(600.0, 800.0));
        assert_eq!(output_x(50.0, scale), 100.0);
        assert_eq!(box_bottom_y(800.0, 50.0, 20.0, scale), 800.0 - 100.0 - 40.0);
        assert_eq!(output_font_size(16.0, scale), 32.0);
    }

    #[test]
    fn test_font_size_uses_y_axis() {
        let scale = SpaceScale::new(Size::new(300.0, 400.0), Size::new(900.0, 800.0));
        assert_eq!(output_font_size(10.0, scale), 20.0);
    }
}
