//! Type definitions for certificate generation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Point in editor coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size with width and height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Color representation, channels normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#rrggbb` hex string into normalized RGB
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return Err(format!("invalid hex color: {hex}"));
        }

        let r = u8::from_str_radix(&hex[0..2], 16)
            .map_err(|_| "invalid hex color")? as f64 / 255.0;
        let g = u8::from_str_radix(&hex[2..4], 16)
            .map_err(|_| "invalid hex color")? as f64 / 255.0;
        let b = u8::from_str_radix(&hex[4..6], 16)
            .map_err(|_| "invalid hex color")? as f64 / 255.0;

        Ok(Self { r, g, b })
    }

    pub fn black() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0 }
    }
}

/// How a node's anchor point relates to its bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginMode {
    #[default]
    TopLeft,
    Center,
}

/// Horizontal text alignment within the placement box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Output document format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Document,
    Image,
}

/// How per-row outputs are bundled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackagingMode {
    Individual,
    Merged,
}

/// Output format and packaging selector
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutputSpec {
    pub format: OutputFormat,
    pub structure: PackagingMode,
}

/// Raw editor node descriptor as snapshotted by the hosting application.
///
/// Only text nodes contribute to generation; other node types are part of
/// the template background and are ignored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub origin_mode: OriginMode,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_scale")]
    pub scale_x: f64,
    #[serde(default = "default_scale")]
    pub scale_y: f64,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub text_align: TextAlign,
    #[serde(default)]
    pub binding: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

fn default_scale() -> f64 {
    1.0
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

fn default_font_size() -> f64 {
    16.0
}

fn default_color() -> String {
    "#000000".to_string()
}

/// Resolved text style of a placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextStyle {
    pub family: String,
    pub size: f64,
    pub color: Color,
    pub align: TextAlign,
}

/// What a placement renders for a given row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlacementContent {
    /// Literal string, identical for every row
    Static(String),
    /// Column name resolved against each row
    Bound(String),
}

impl PlacementContent {
    /// Resolve the text to draw for one row.
    ///
    /// A bound column that is missing or empty yields `None`: the
    /// placement is skipped for that row, not drawn as an empty string.
    pub fn resolve<'a>(&'a self, row: &'a DataRow) -> Option<&'a str> {
        match self {
            PlacementContent::Static(text) => Some(text.as_str()),
            PlacementContent::Bound(column) => row
                .get(column)
                .map(String::as_str)
                .filter(|value| !value.is_empty()),
        }
    }
}

/// Resolution-independent placement record produced by the normalizer.
///
/// The anchor is always top-left relative in editor space; origin mode
/// and object scale have already been folded in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementRecord {
    pub id: String,
    pub anchor: Point,
    pub size: Size,
    pub rotation: f64,
    pub style: TextStyle,
    pub content: PlacementContent,
}

/// One data row: column name to string value
pub type DataRow = HashMap<String, String>;

/// The unit of work for one export action. Fully consumed by a single
/// generation run; nothing is persisted across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationJob {
    pub template_url: String,
    pub nodes: Vec<EditorNode>,
    pub rows: Vec<DataRow>,
    /// Pixel dimensions of the on-screen editor canvas
    pub editor_size: Size,
    /// Natural page size of the output document (points). Defaults to the
    /// template's pixel dimensions when absent.
    #[serde(default)]
    pub output_size: Option<Size>,
    pub output: OutputSpec,
}

impl GenerationJob {
    /// Parse a job from the host application's JSON snapshot
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// A failure affecting a single row or a placement within it
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub row: usize,
    pub reason: String,
}

/// Kind of deliverable returned to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Pdf,
}

/// Result of a generation run: the packaged deliverable plus a report of
/// what rendered and what was skipped.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub kind: ArchiveKind,
    pub rendered: usize,
    pub skipped: usize,
    pub failures: Vec<RowFailure>,
    /// Set when a cancellation stopped the run before all rows were
    /// processed; the archive then only holds completed rows.
    pub partial: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        let c = Color::from_hex("#ff0000").unwrap();
        assert_eq!(c, Color::rgb(1.0, 0.0, 0.0));

        let c = Color::from_hex("000000").unwrap();
        assert_eq!(c, Color::black());

        assert!(Color::from_hex("#fff").is_err());
        assert!(Color::from_hex("#zzzzzz").is_err());
    }

    #[test]
    fn test_bound_content_skips_empty_values() {
        let content = PlacementContent::Bound("Name".to_string());

        let mut row = DataRow::new();
        assert_eq!(content.resolve(&row), None);

        row.insert("Name".to_string(), String::new());
        assert_eq!(content.resolve(&row), None);

        row.insert("Name".to_string(), "Ana".to_string());
        assert_eq!(content.resolve(&row), Some("Ana"));
    }

    #[test]
    fn test_static_content_ignores_row() {
        let content = PlacementContent::Static("Certificate".to_string());
        let mut row = DataRow::new();
        row.insert("Certificate".to_string(), "other".to_string());
        assert_eq!(content.resolve(&row), Some("Certificate"));
    }

    #[test]
    fn test_job_from_json() {
        let payload = r#"{
            "templateUrl": "https://example.com/tpl.png",
            "nodes": [{
                "id": "n1", "type": "text",
                "x": 50, "y": 50, "width": 100, "height": 20,
                "binding": "Name"
            }],
            "rows": [{"Name": "Ana"}],
            "editorSize": {"width": 300, "height": 400},
            "output": {"format": "document", "structure": "individual"}
        }"#;
        let job = GenerationJob::from_json(payload).unwrap();
        assert_eq!(job.nodes.len(), 1);
        assert_eq!(job.nodes[0].font_family, "Helvetica");
        assert_eq!(job.nodes[0].scale_x, 1.0);
        assert!(job.output_size.is_none());
    }
}
