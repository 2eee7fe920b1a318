//! Content-stream wrapper for page drawing
//!
//! Thin canvas over `pdf_writer::Content` carrying the current fill
//! color and font state, with the text and image operations the
//! generation pipeline needs.

use pdf_writer::{Content, Name, Str};

use crate::types::Color;
use crate::unicode::unicode_to_winansi;

/// Canvas state for graphics operations
#[derive(Clone)]
struct CanvasState {
    fill_color: Color,
    font_resource: String,
    font_size: f64,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            fill_color: Color::black(),
            font_resource: "F1".to_string(),
            font_size: 12.0,
        }
    }
}

/// Per-page drawing surface
pub struct PdfCanvas {
    content: Content,
    state: CanvasState,
    state_stack: Vec<CanvasState>,
}

impl PdfCanvas {
    pub fn new() -> Self {
        Self {
            content: Content::new(),
            state: CanvasState::default(),
            state_stack: Vec::new(),
        }
    }

    /// Finalize into content-stream bytes
    pub fn finish(self) -> Vec<u8> {
        self.content.finish()
    }

    pub fn save_state(&mut self) {
        self.state_stack.push(self.state.clone());
        self.content.save_state();
    }

    pub fn restore_state(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.state = state;
            self.content.restore_state();
        }
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.state.fill_color = color;
        self.content
            .set_fill_rgb(color.r as f32, color.g as f32, color.b as f32);
    }

    pub fn set_font(&mut self, resource_name: &str, size: f64) {
        self.state.font_resource = resource_name.to_string();
        self.state.font_size = size;
    }

    /// Draw pre-encoded glyph IDs (Type0 fonts, Identity-H)
    pub fn draw_glyphs(&mut self, x: f64, y: f64, encoded: &[u8]) {
        self.content.begin_text();
        self.content.set_font(
            Name(self.state.font_resource.as_bytes()),
            self.state.font_size as f32,
        );
        self.content.next_line(x as f32, y as f32);
        self.content.show(Str(encoded));
        self.content.end_text();
    }

    /// Draw text through WinAnsi encoding (builtin Type1 fonts)
    pub fn draw_winansi(&mut self, x: f64, y: f64, text: &str) {
        self.content.begin_text();
        self.content.set_font(
            Name(self.state.font_resource.as_bytes()),
            self.state.font_size as f32,
        );
        self.content.next_line(x as f32, y as f32);
        self.content.show(Str(&unicode_to_winansi(text)));
        self.content.end_text();
    }

    pub fn translate(&mut self, x: f64, y: f64) {
        self.content
            .transform([1.0, 0.0, 0.0, 1.0, x as f32, y as f32]);
    }

    /// Counter-clockwise rotation in page space
    pub fn rotate(&mut self, angle_degrees: f64) {
        let angle_rad = angle_degrees.to_radians();
        let cos_a = angle_rad.cos() as f32;
        let sin_a = angle_rad.sin() as f32;
        self.content
            .transform([cos_a, sin_a, -sin_a, cos_a, 0.0, 0.0]);
    }

    /// Place an image XObject scaled to width x height with its
    /// bottom-left corner at (x, y)
    pub fn draw_image(&mut self, resource_name: &str, x: f64, y: f64, width: f64, height: f64) {
        self.content.save_state();
        self.content.transform([
            width as f32,
            0.0,
            0.0,
            height as f32,
            x as f32,
            y as f32,
        ]);
        self.content.x_object(Name(resource_name.as_bytes()));
        self.content.restore_state();
    }
}

impl Default for PdfCanvas {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winansi_text_appears_in_stream() {
        let mut canvas = PdfCanvas::new();
        canvas.set_font("F1", 12.0);
        canvas.draw_winansi(100.0, 200.0, "Ana");
        let bytes = canvas.finish();
        let stream = String::from_utf8_lossy(&bytes);
        assert!(stream.contains("(Ana)"));
        assert!(stream.contains("/F1"));
    }

    #[test]
    fn test_state_stack_restores_font() {
        let mut canvas = PdfCanvas::new();
        canvas.set_font("F2", 20.0);
        canvas.save_state();
        canvas.set_font("F3", 8.0);
        canvas.restore_state();
        assert_eq!(canvas.state.font_resource, "F2");
        assert_eq!(canvas.state.font_size, 20.0);
    }
}
