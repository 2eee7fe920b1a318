//! Layout Normalizer
//!
//! Converts the editor-space node snapshot into resolution-independent
//! placement records plus the set of font families that need resolving.
//! All origin-mode and object-scale handling happens here, once, so the
//! renderer never re-derives anchors.

use log::{debug, warn};
use std::collections::BTreeSet;

use crate::fonts::is_standard_family;
use crate::types::{
    Color, EditorNode, OriginMode, PlacementContent, PlacementRecord, Point, Size, TextStyle,
};

/// Normalizer output: ordered placements and the distinct non-standard
/// font families they reference.
#[derive(Debug)]
pub struct NormalizedLayout {
    pub placements: Vec<PlacementRecord>,
    pub families: BTreeSet<String>,
}

/// Normalize editor nodes into placement records.
///
/// Only text nodes contribute. Nodes with non-finite geometry are skipped
/// and logged; they never abort the batch. Input order is preserved.
pub fn normalize(nodes: &[EditorNode]) -> NormalizedLayout {
    let mut placements = Vec::new();
    let mut families = BTreeSet::new();

    for node in nodes {
        if node.node_type != "text" {
            continue;
        }

        if !has_finite_geometry(node) {
            warn!("node {}: non-finite geometry, skipping", node.id);
            continue;
        }

        let Some(content) = node_content(node) else {
            debug!("node {}: no binding and no static text, skipping", node.id);
            continue;
        };

        // Fold object scale into the effective box and font size
        let size = Size::new(node.width * node.scale_x, node.height * node.scale_y);
        let font_size = node.font_size * node.scale_y;

        // Center origins become top-left anchors before any space conversion
        let anchor = match node.origin_mode {
            OriginMode::TopLeft => Point::new(node.x, node.y),
            OriginMode::Center => {
                Point::new(node.x - size.width / 2.0, node.y - size.height / 2.0)
            }
        };

        let color = Color::from_hex(&node.color).unwrap_or_else(|err| {
            warn!("node {}: {err}, using black", node.id);
            Color::black()
        });

        if !is_standard_family(&node.font_family) {
            families.insert(node.font_family.clone());
        }

        placements.push(PlacementRecord {
            id: node.id.clone(),
            anchor,
            size,
            rotation: node.rotation,
            style: TextStyle {
                family: node.font_family.clone(),
                size: font_size,
                color,
                align: node.text_align,
            },
            content,
        });
    }

    NormalizedLayout { placements, families }
}

/// A binding always wins over static text; an empty binding name counts
/// as absent. A text node with neither contributes nothing.
fn node_content(node: &EditorNode) -> Option<PlacementContent> {
    if let Some(column) = node.binding.as_deref().filter(|c| !c.is_empty()) {
        return Some(PlacementContent::Bound(column.to_string()));
    }
    node.text
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| PlacementContent::Static(t.to_string()))
}

fn has_finite_geometry(node: &EditorNode) -> bool {
    [
        node.x,
        node.y,
        node.width,
        node.height,
        node.rotation,
        node.scale_x,
        node.scale_y,
        node.font_size,
    ]
    .iter()
    .all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TextAlign;

    fn text_node(id: &str) -> EditorNode {
        EditorNode {
            id: id.to_string(),
            node_type: "text".to_string(),
            x: 50.0,
            y: 50.0,
            origin_mode: OriginMode::TopLeft,
            width: 100.0,
            height: 20.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            font_family: "Great Vibes".to_string(),
            font_size: 16.0,
            color: "#000000".to_string(),
            text_align: TextAlign::Left,
            binding: Some("Name".to_string()),
            text: None,
        }
    }

    #[test]
    fn test_center_origin_shifts_anchor() {
        let mut node = text_node("n1");
        node.origin_mode = OriginMode::Center;
        let layout = normalize(&[node]);
        assert_eq!(layout.placements[0].anchor, Point::new(0.0, 40.0));
    }

    #[test]
    fn test_object_scale_folded_into_size_and_font() {
        let mut node = text_node("n1");
        node.scale_x = 2.0;
        node.scale_y = 3.0;
        let layout = normalize(&[node]);
        let p = &layout.placements[0];
        assert_eq!(p.size, Size::new(200.0, 60.0));
        assert_eq!(p.style.size, 48.0);
    }

    #[test]
    fn test_center_origin_uses_scaled_size() {
        let mut node = text_node("n1");
        node.origin_mode = OriginMode::Center;
        node.scale_x = 2.0;
        let layout = normalize(&[node]);
        assert_eq!(layout.placements[0].anchor.x, 50.0 - 100.0);
    }

    #[test]
    fn test_non_finite_geometry_skipped() {
        let mut bad = text_node("bad");
        bad.y = f64::NAN;
        let good = text_node("good");
        let layout = normalize(&[bad, good]);
        assert_eq!(layout.placements.len(), 1);
        assert_eq!(layout.placements[0].id, "good");
    }

    #[test]
    fn test_non_text_nodes_ignored() {
        let mut node = text_node("n1");
        node.node_type = "image".to_string();
        let layout = normalize(&[node]);
        assert!(layout.placements.is_empty());
        assert!(layout.families.is_empty());
    }

    #[test]
    fn test_families_deduplicated_and_standard_excluded() {
        let a = text_node("a");
        let b = text_node("b");
        let mut c = text_node("c");
        c.font_family = "Helvetica".to_string();
        let layout = normalize(&[a, b, c]);
        assert_eq!(layout.families.len(), 1);
        assert!(layout.families.contains("Great Vibes"));
    }

    #[test]
    fn test_binding_wins_over_static_text() {
        let mut node = text_node("n1");
        node.text = Some("literal".to_string());
        let layout = normalize(&[node]);
        assert_eq!(
            layout.placements[0].content,
            PlacementContent::Bound("Name".to_string())
        );
    }

    #[test]
    fn test_node_without_content_dropped() {
        let mut node = text_node("n1");
        node.binding = None;
        node.text = None;
        let layout = normalize(&[node]);
        assert!(layout.placements.is_empty());
    }

    #[test]
    fn test_invalid_color_falls_back_to_black() {
        let mut node = text_node("n1");
        node.color = "#nope".to_string();
        let layout = normalize(&[node]);
        assert_eq!(layout.placements[0].style.color, Color::black());
    }
}
