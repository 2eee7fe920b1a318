//! Per-document font registry
//!
//! Each output document instance carries its own registry: most PDF
//! libraries scope font objects per document, so embedding happens once
//! per row per font even though resolution is cached job-wide. An
//! embedding failure falls back to a builtin Type1 font for that
//! document only and never aborts the run.

use log::warn;
use pdf_writer::writers::Resources;
use pdf_writer::{Name, Pdf, Ref};
use std::collections::HashMap;
use std::sync::Arc;

use crate::font_embed::{embed_truetype, EmbeddedFace};

/// Monotonic indirect-object id allocator for one document
pub struct RefAllocator {
    next_id: i32,
}

impl RefAllocator {
    pub fn new(start: i32) -> Self {
        Self { next_id: start }
    }

    pub fn next(&mut self) -> Ref {
        let r = Ref::new(self.next_id);
        self.next_id += 1;
        r
    }
}

/// A font available for drawing in one document
pub enum DocFont {
    Embedded(EmbeddedFace),
    Builtin { font_ref: Ref, resource_name: String },
}

impl DocFont {
    pub fn resource_name(&self) -> &str {
        match self {
            DocFont::Embedded(face) => &face.resource_name,
            DocFont::Builtin { resource_name, .. } => resource_name,
        }
    }

    fn font_ref(&self) -> Ref {
        match self {
            DocFont::Embedded(face) => face.font_ref,
            DocFont::Builtin { font_ref, .. } => *font_ref,
        }
    }

    /// Advance width of `text` at `font_size`. Builtin fonts have no
    /// parsed metrics here, so their width uses the 0.6-per-character
    /// approximation.
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        match self {
            DocFont::Embedded(face) => face.text_width(text, font_size),
            DocFont::Builtin { .. } => text.chars().count() as f64 * font_size * 0.6,
        }
    }
}

/// Map logical family names to PDF builtin base fonts
pub fn builtin_base(family: &str) -> &'static [u8] {
    match family {
        "Helvetica" | "Arial" => b"Helvetica",
        "Helvetica-Bold" | "Arial-Bold" => b"Helvetica-Bold",
        "Helvetica-Oblique" | "Arial-Italic" => b"Helvetica-Oblique",
        "Times-Roman" | "Times" => b"Times-Roman",
        "Courier" => b"Courier",
        _ => b"Helvetica", // Default to Helvetica
    }
}

/// Fonts registered into one document, keyed by family name
#[derive(Default)]
pub struct FontRegistry {
    fonts: HashMap<String, DocFont>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the document font for a family, embedding it on first use.
    ///
    /// `resolved` carries the job-cached font program, if any; without
    /// one (or when embedding fails) the family maps to a builtin font.
    pub fn get_or_embed(
        &mut self,
        pdf: &mut Pdf,
        alloc: &mut RefAllocator,
        family: &str,
        resolved: Option<&Arc<Vec<u8>>>,
    ) -> &DocFont {
        if !self.fonts.contains_key(family) {
            let font = match resolved {
                Some(data) => match embed_truetype(pdf, Arc::clone(data), alloc) {
                    Ok(face) => DocFont::Embedded(face),
                    Err(err) => {
                        warn!("embedding font {family} failed: {err}, falling back to builtin");
                        register_builtin(pdf, alloc, family)
                    }
                },
                None => register_builtin(pdf, alloc, family),
            };
            self.fonts.insert(family.to_string(), font);
        }
        &self.fonts[family]
    }

    /// Write all registered fonts into page Resources
    pub fn write_resources(&self, resources: &mut Resources) {
        if self.fonts.is_empty() {
            return;
        }
        let mut dict = resources.fonts();
        for font in self.fonts.values() {
            dict.pair(Name(font.resource_name().as_bytes()), font.font_ref());
        }
    }
}

fn register_builtin(pdf: &mut Pdf, alloc: &mut RefAllocator, family: &str) -> DocFont {
    let font_ref = alloc.next();
    pdf.type1_font(font_ref).base_font(Name(builtin_base(family)));
    DocFont::Builtin {
        font_ref,
        resource_name: format!("F{}", font_ref.get()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_mapping() {
        assert_eq!(builtin_base("Arial"), b"Helvetica");
        assert_eq!(builtin_base("Times"), b"Times-Roman");
        assert_eq!(builtin_base("Great Vibes"), b"Helvetica");
    }

    #[test]
    fn test_unresolved_family_registers_builtin_once() {
        let mut pdf = Pdf::new();
        let mut alloc = RefAllocator::new(10);
        let mut registry = FontRegistry::new();

        let name = registry
            .get_or_embed(&mut pdf, &mut alloc, "Great Vibes", None)
            .resource_name()
            .to_string();
        let again = registry
            .get_or_embed(&mut pdf, &mut alloc, "Great Vibes", None)
            .resource_name()
            .to_string();

        assert_eq!(name, "F10");
        assert_eq!(name, again);
    }

    #[test]
    fn test_builtin_width_approximation() {
        let font = DocFont::Builtin {
            font_ref: Ref::new(1),
            resource_name: "F1".to_string(),
        };
        assert_eq!(font.text_width("abcd", 10.0), 24.0);
    }
}
