//! TrueType font embedding
//!
//! Embeds a TrueType/OpenType font program into a PDF document as a
//! Type0 font (CIDFontType2 descendant) with Identity-H encoding: text
//! is encoded as 2-byte glyph IDs, glyph widths come from the font's
//! horizontal advances normalized to 1000 units per em, and a ToUnicode
//! CMap keeps the drawn text extractable.

use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Finish, Name, Pdf, Rect, Ref, Str};
use std::sync::Arc;
use ttf_parser::{Face, GlyphId};

use crate::error::{RenderError, RenderResult};
use crate::font_registry::RefAllocator;

/// ToUnicode coverage: Basic Latin through Latin Extended-B is enough
/// for certificate text; glyphs outside the range still draw, they just
/// don't copy out of the PDF.
const UNICODE_MAP_RANGE: std::ops::RangeInclusive<u32> = 0x20..=0x24F;

/// A font embedded into one specific document instance
pub struct EmbeddedFace {
    pub font_ref: Ref,
    pub resource_name: String,
    data: Arc<Vec<u8>>,
}

impl EmbeddedFace {
    /// Encode text as big-endian 2-byte glyph IDs for Identity-H
    pub fn encode_text(&self, text: &str) -> Vec<u8> {
        let face = match Face::parse(&self.data, 0) {
            Ok(face) => face,
            Err(_) => return Vec::new(),
        };
        let mut bytes = Vec::with_capacity(text.len() * 2);
        for ch in text.chars() {
            let gid = face.glyph_index(ch).unwrap_or(GlyphId(0));
            bytes.extend_from_slice(&gid.0.to_be_bytes());
        }
        bytes
    }

    /// Advance width of the text at the given size, in output units
    pub fn text_width(&self, text: &str, font_size: f64) -> f64 {
        let face = match Face::parse(&self.data, 0) {
            Ok(face) => face,
            Err(_) => return 0.0,
        };
        let units_per_em = f64::from(face.units_per_em());
        let total: f64 = text
            .chars()
            .map(|ch| {
                let gid = face.glyph_index(ch).unwrap_or(GlyphId(0));
                face.glyph_hor_advance(gid)
                    .map(f64::from)
                    .unwrap_or(units_per_em / 2.0)
            })
            .sum();
        total * font_size / units_per_em
    }
}

/// Embed a TrueType font into `pdf` and return its handles.
///
/// Allocates five objects: Type0 font, CIDFont, FontDescriptor, the font
/// file stream, and the ToUnicode CMap.
pub fn embed_truetype(
    pdf: &mut Pdf,
    data: Arc<Vec<u8>>,
    alloc: &mut RefAllocator,
) -> RenderResult<EmbeddedFace> {
    let face = Face::parse(&data, 0)
        .map_err(|err| RenderError::Font(format!("invalid font program: {err}")))?;

    let type0_id = alloc.next();
    let cid_id = alloc.next();
    let descriptor_id = alloc.next();
    let file_id = alloc.next();
    let cmap_id = alloc.next();

    let units_per_em = f64::from(face.units_per_em());
    // PDF font metrics are expressed in a 1000-units-per-em space
    let scale = 1000.0 / units_per_em;

    let base_font = base_font_name(&face, type0_id);

    pdf.stream(file_id, &data)
        .pair(Name(b"Length1"), data.len() as i32);

    let bbox = face.global_bounding_box();
    let ascent = (f64::from(face.ascender()) * scale) as f32;
    let descent = (f64::from(face.descender()) * scale) as f32;

    let mut descriptor = pdf.font_descriptor(descriptor_id);
    descriptor
        .name(Name(base_font.as_bytes()))
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(
            (f64::from(bbox.x_min) * scale) as f32,
            (f64::from(bbox.y_min) * scale) as f32,
            (f64::from(bbox.x_max) * scale) as f32,
            (f64::from(bbox.y_max) * scale) as f32,
        ))
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(ascent)
        .stem_v(80.0)
        .font_file2(file_id);
    descriptor.finish();

    let glyph_count = face.number_of_glyphs();
    let widths: Vec<f32> = (0..glyph_count)
        .map(|gid| {
            face.glyph_hor_advance(GlyphId(gid))
                .map(|adv| (f64::from(adv) * scale) as f32)
                .unwrap_or(0.0)
        })
        .collect();

    let system_info = SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    };

    let mut cid = pdf.cid_font(cid_id);
    cid.subtype(CidFontType::Type2)
        .base_font(Name(base_font.as_bytes()))
        .system_info(system_info)
        .font_descriptor(descriptor_id)
        .default_width(500.0);
    cid.widths().consecutive(0, widths.iter().copied());
    // CIDs are glyph IDs, so the CID-to-glyph mapping is the identity
    cid.cid_to_gid_map_predefined(Name(b"Identity"));
    cid.finish();

    let mut cmap = UnicodeCmap::new(Name(b"Custom"), system_info);
    for code in UNICODE_MAP_RANGE {
        if let Some(ch) = char::from_u32(code) {
            if let Some(gid) = face.glyph_index(ch) {
                cmap.pair(gid.0, ch);
            }
        }
    }
    pdf.cmap(cmap_id, &cmap.finish());

    pdf.type0_font(type0_id)
        .base_font(Name(base_font.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_id)
        .to_unicode(cmap_id);

    let resource_name = format!("F{}", type0_id.get());

    Ok(EmbeddedFace {
        font_ref: type0_id,
        resource_name,
        data,
    })
}

/// PostScript-safe base font name derived from the face's family name
fn base_font_name(face: &Face, font_id: Ref) -> String {
    let family = face
        .names()
        .into_iter()
        .find(|name| name.name_id == ttf_parser::name_id::FAMILY)
        .and_then(|name| name.to_string());

    let sanitized: String = family
        .unwrap_or_default()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect();

    if sanitized.is_empty() {
        format!("Font{}", font_id.get())
    } else {
        sanitized
    }
}
