//! Batch renderer
//!
//! Drives one generation job: fatal validation up front, template fetch
//! and font resolution once, then a strictly sequential per-row loop.
//! Every row gets a fresh document instance built from the cached
//! template bytes, so no drawn text can bleed between rows. Row-level
//! failures are recorded in the outcome report and skipped; the batch
//! always delivers whatever could be generated.

use ab_glyph::FontArc;
use log::{debug, info, warn};
use pdf_writer::{Name, Pdf, Rect};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::canvas::PdfCanvas;
use crate::error::{RenderError, RenderResult};
use crate::font_registry::{DocFont, FontRegistry, RefAllocator};
use crate::fonts::{FontSource, ResolvedFonts};
use crate::geometry::{box_bottom_y, output_font_size, output_x, SpaceScale, BASELINE_FACTOR};
use crate::normalizer::{normalize, NormalizedLayout};
use crate::packaging::{build_zip, row_file_name, RowFile};
use crate::raster;
use crate::template::{embed_template_image, Template, TemplateSource};
use crate::types::{
    ArchiveKind, DataRow, GenerationJob, GenerationOutcome, OutputFormat, PackagingMode,
    PlacementRecord, RowFailure, Size, TextAlign,
};

/// Tunable knobs for a generation run
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererConfig {
    /// Upper bound on rows per job; the archive is held in memory, so
    /// this caps peak memory for bulk runs
    pub max_rows: usize,
    /// Baseline placement heuristic, fraction of the scaled placement
    /// height above the box bottom. Changing it changes visual output.
    pub baseline_factor: f64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_rows: 5000,
            baseline_factor: BASELINE_FACTOR,
        }
    }
}

/// Cooperative cancellation signal, checked between rows (never mid-row)
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Main batch renderer
pub struct BatchRenderer {
    config: RendererConfig,
}

impl BatchRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(RendererConfig::default())
    }

    /// Run one generation job to completion.
    ///
    /// Fatal conditions (unreachable/malformed template, zero rows, row
    /// limit, merged-image combination) return `Err` before any per-row
    /// work; everything else is reported in the outcome.
    pub async fn generate(
        &self,
        job: &GenerationJob,
        templates: &dyn TemplateSource,
        fonts: &dyn FontSource,
        cancel: &CancelToken,
    ) -> RenderResult<GenerationOutcome> {
        if job.rows.is_empty() {
            return Err(RenderError::NoRows);
        }
        if job.rows.len() > self.config.max_rows {
            return Err(RenderError::TooManyRows {
                got: job.rows.len(),
                limit: self.config.max_rows,
            });
        }
        if job.output.format == OutputFormat::Image
            && job.output.structure == PackagingMode::Merged
        {
            return Err(RenderError::MergedImageOutput);
        }

        let layout = normalize(&job.nodes);
        info!(
            "generation job: {} rows, {} placements, {} font families to resolve",
            job.rows.len(),
            layout.placements.len(),
            layout.families.len()
        );

        let template_bytes = templates.fetch(&job.template_url).await?;
        let template = Template::decode(&template_bytes)?;

        // Resolution happens exactly once per family, before the row
        // loop; the cache is read-only from here on.
        let resolved = ResolvedFonts::resolve_all(fonts, &layout.families).await;

        match job.output.format {
            OutputFormat::Document => {
                let output_size = job.output_size.unwrap_or(template.pixel_size);
                let scale = SpaceScale::new(job.editor_size, output_size);
                match job.output.structure {
                    PackagingMode::Individual => self.individual_documents(
                        job, &template, output_size, scale, &layout, &resolved, cancel,
                    ),
                    PackagingMode::Merged => self.merged_document(
                        job, &template, output_size, scale, &layout, &resolved, cancel,
                    ),
                }
            }
            OutputFormat::Image => self.individual_images(job, &template, &layout, &resolved, cancel),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn individual_documents(
        &self,
        job: &GenerationJob,
        template: &Template,
        output_size: Size,
        scale: SpaceScale,
        layout: &NormalizedLayout,
        resolved: &ResolvedFonts,
        cancel: &CancelToken,
    ) -> RenderResult<GenerationOutcome> {
        let mut files = Vec::new();
        let mut failures = Vec::new();
        let mut partial = false;

        for (index, row) in job.rows.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("job cancelled after {} of {} rows", index, job.rows.len());
                partial = true;
                break;
            }

            match self.render_row_document(template, output_size, scale, &layout.placements, row, resolved)
            {
                Ok(bytes) => files.push(RowFile {
                    name: row_file_name(index, "pdf"),
                    bytes,
                }),
                Err(err) => {
                    warn!("row {index} failed: {err}");
                    failures.push(RowFailure {
                        row: index,
                        reason: err.to_string(),
                    });
                }
            }
        }

        let rendered = files.len();
        let bytes = build_zip(&files)?;
        Ok(GenerationOutcome {
            file_name: "certificates.zip".to_string(),
            bytes,
            kind: ArchiveKind::Zip,
            rendered,
            skipped: job.rows.len() - rendered,
            failures,
            partial,
        })
    }

    /// One fresh document per row: catalog, page tree, a single page
    /// with the template drawn full-bleed behind the placements.
    fn render_row_document(
        &self,
        template: &Template,
        output_size: Size,
        scale: SpaceScale,
        placements: &[PlacementRecord],
        row: &DataRow,
        resolved: &ResolvedFonts,
    ) -> RenderResult<Vec<u8>> {
        let mut pdf = Pdf::new();
        let mut alloc = RefAllocator::new(1);
        let catalog_id = alloc.next();
        let tree_id = alloc.next();
        let page_id = alloc.next();
        let content_id = alloc.next();

        pdf.catalog(catalog_id).pages(tree_id);

        let (image_id, image_name) = embed_template_image(&mut pdf, &mut alloc, &template.image);

        let mut registry = FontRegistry::new();
        let mut canvas = PdfCanvas::new();
        canvas.draw_image(&image_name, 0.0, 0.0, output_size.width, output_size.height);

        self.draw_row(
            &mut pdf,
            &mut alloc,
            &mut registry,
            &mut canvas,
            placements,
            row,
            resolved,
            scale,
            output_size.height,
        );

        pdf.stream(content_id, &canvas.finish());

        {
            let mut page = pdf.page(page_id);
            page.media_box(Rect::new(
                0.0,
                0.0,
                output_size.width as f32,
                output_size.height as f32,
            ));
            page.parent(tree_id);
            page.contents(content_id);
            let mut resources = page.resources();
            registry.write_resources(&mut resources);
            resources
                .x_objects()
                .pair(Name(image_name.as_bytes()), image_id);
        }

        pdf.pages(tree_id).kids([page_id]).count(1);

        Ok(pdf.finish())
    }

    #[allow(clippy::too_many_arguments)]
    fn merged_document(
        &self,
        job: &GenerationJob,
        template: &Template,
        output_size: Size,
        scale: SpaceScale,
        layout: &NormalizedLayout,
        resolved: &ResolvedFonts,
        cancel: &CancelToken,
    ) -> RenderResult<GenerationOutcome> {
        let mut pdf = Pdf::new();
        let mut alloc = RefAllocator::new(1);
        let catalog_id = alloc.next();
        let tree_id = alloc.next();
        pdf.catalog(catalog_id).pages(tree_id);

        // One document instance for the whole merged output, so the
        // template and each font embed exactly once
        let (image_id, image_name) = embed_template_image(&mut pdf, &mut alloc, &template.image);
        let mut registry = FontRegistry::new();

        let mut page_refs = Vec::new();
        let mut partial = false;

        for (index, row) in job.rows.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("job cancelled after {} of {} rows", index, job.rows.len());
                partial = true;
                break;
            }

            let mut canvas = PdfCanvas::new();
            canvas.draw_image(&image_name, 0.0, 0.0, output_size.width, output_size.height);
            self.draw_row(
                &mut pdf,
                &mut alloc,
                &mut registry,
                &mut canvas,
                &layout.placements,
                row,
                resolved,
                scale,
                output_size.height,
            );

            let content_id = alloc.next();
            let page_id = alloc.next();
            pdf.stream(content_id, &canvas.finish());

            {
                let mut page = pdf.page(page_id);
                page.media_box(Rect::new(
                    0.0,
                    0.0,
                    output_size.width as f32,
                    output_size.height as f32,
                ));
                page.parent(tree_id);
                page.contents(content_id);
                let mut resources = page.resources();
                registry.write_resources(&mut resources);
                resources
                    .x_objects()
                    .pair(Name(image_name.as_bytes()), image_id);
            }

            page_refs.push(page_id);
        }

        let rendered = page_refs.len();
        pdf.pages(tree_id)
            .kids(page_refs.iter().copied())
            .count(rendered as i32);

        Ok(GenerationOutcome {
            file_name: "certificates.pdf".to_string(),
            bytes: pdf.finish(),
            kind: ArchiveKind::Pdf,
            rendered,
            skipped: job.rows.len() - rendered,
            failures: Vec::new(),
            partial,
        })
    }

    /// Draw every placement of one row into the canvas
    #[allow(clippy::too_many_arguments)]
    fn draw_row(
        &self,
        pdf: &mut Pdf,
        alloc: &mut RefAllocator,
        registry: &mut FontRegistry,
        canvas: &mut PdfCanvas,
        placements: &[PlacementRecord],
        row: &DataRow,
        resolved: &ResolvedFonts,
        scale: SpaceScale,
        output_height: f64,
    ) {
        for placement in placements {
            let Some(text) = placement.content.resolve(row) else {
                debug!("placement {}: no content for this row, skipping", placement.id);
                continue;
            };

            let font_size = output_font_size(placement.style.size, scale);
            let font = registry.get_or_embed(
                pdf,
                alloc,
                &placement.style.family,
                resolved.get(&placement.style.family),
            );

            let x = output_x(placement.anchor.x, scale);
            let bottom = box_bottom_y(output_height, placement.anchor.y, placement.size.height, scale);
            // Empirical baseline placement within the box, not a font
            // metrics computation; see RendererConfig::baseline_factor
            let baseline = bottom + self.config.baseline_factor * placement.size.height * scale.sy;

            let box_width = placement.size.width * scale.sx;
            let text_w = font.text_width(text, font_size);
            let dx = match placement.style.align {
                TextAlign::Left => 0.0,
                TextAlign::Center => (box_width - text_w) / 2.0,
                TextAlign::Right => box_width - text_w,
            };

            canvas.set_fill_color(placement.style.color);
            canvas.set_font(font.resource_name(), font_size);

            if placement.rotation != 0.0 {
                canvas.save_state();
                canvas.translate(x, baseline);
                // Editor rotation is clockwise in a y-down space; page
                // space is y-up, so the sign flips
                canvas.rotate(-placement.rotation);
                draw_text_op(canvas, font, dx, 0.0, text);
                canvas.restore_state();
            } else {
                draw_text_op(canvas, font, x + dx, baseline, text);
            }
        }
    }

    /// Per-row PNG composition over the template at its natural pixel
    /// size. Raster output keeps the editor orientation, so the baseline
    /// heuristic mirrors the PDF one measured from the box top instead.
    fn individual_images(
        &self,
        job: &GenerationJob,
        template: &Template,
        layout: &NormalizedLayout,
        resolved: &ResolvedFonts,
        cancel: &CancelToken,
    ) -> RenderResult<GenerationOutcome> {
        let scale = SpaceScale::new(job.editor_size, template.pixel_size);
        let base = template.image.to_rgba8();

        // Parse each resolved program into a rasterizable face once per
        // job. There are no builtin raster fonts: families without
        // resolved bytes fall back to the source's default, or skip.
        let mut raster_fonts: HashMap<String, FontArc> = HashMap::new();
        for family in &layout.families {
            if let Some(data) = resolved.get(family) {
                match FontArc::try_from_vec(data.as_ref().clone()) {
                    Ok(font) => {
                        raster_fonts.insert(family.clone(), font);
                    }
                    Err(err) => warn!("font {family}: {err}, treating as unresolved"),
                }
            }
        }
        let fallback_font = resolved
            .fallback()
            .and_then(|data| FontArc::try_from_vec(data.as_ref().clone()).ok());

        let mut files = Vec::new();
        let mut failures = Vec::new();
        let mut partial = false;

        for (index, row) in job.rows.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("job cancelled after {} of {} rows", index, job.rows.len());
                partial = true;
                break;
            }

            let mut img = base.clone();

            for placement in &layout.placements {
                let Some(text) = placement.content.resolve(row) else {
                    continue;
                };

                let font = raster_fonts
                    .get(&placement.style.family)
                    .or(fallback_font.as_ref());
                let Some(font) = font else {
                    warn!(
                        "placement {}: no raster font for family {:?}, skipping",
                        placement.id, placement.style.family
                    );
                    failures.push(RowFailure {
                        row: index,
                        reason: format!(
                            "placement {}: no font available for family {:?}",
                            placement.id, placement.style.family
                        ),
                    });
                    continue;
                };

                let px_size = output_font_size(placement.style.size, scale);
                let x = output_x(placement.anchor.x, scale);
                let scaled_height = placement.size.height * scale.sy;
                let top = placement.anchor.y * scale.sy;
                let baseline = top + (1.0 - self.config.baseline_factor) * scaled_height;

                raster::draw_text(
                    &mut img,
                    font,
                    text,
                    x,
                    baseline,
                    px_size,
                    placement.style.color,
                    placement.style.align,
                    placement.size.width * scale.sx,
                    placement.rotation,
                );
            }

            let mut out = Vec::new();
            match image::DynamicImage::ImageRgba8(img)
                .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
            {
                Ok(()) => files.push(RowFile {
                    name: row_file_name(index, "png"),
                    bytes: out,
                }),
                Err(err) => {
                    warn!("row {index} failed: {err}");
                    failures.push(RowFailure {
                        row: index,
                        reason: format!("image encode failed: {err}"),
                    });
                }
            }
        }

        let rendered = files.len();
        let bytes = build_zip(&files)?;
        Ok(GenerationOutcome {
            file_name: "certificates.zip".to_string(),
            bytes,
            kind: ArchiveKind::Zip,
            rendered,
            skipped: job.rows.len() - rendered,
            failures,
            partial,
        })
    }
}

fn draw_text_op(canvas: &mut PdfCanvas, font: &DocFont, x: f64, y: f64, text: &str) {
    match font {
        DocFont::Embedded(face) => {
            let encoded = face.encode_text(text);
            canvas.draw_glyphs(x, y, &encoded);
        }
        DocFont::Builtin { .. } => canvas.draw_winansi(x, y, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RendererConfig::default();
        assert_eq!(config.max_rows, 5000);
        assert_eq!(config.baseline_factor, BASELINE_FACTOR);
    }

    #[test]
    fn test_config_from_json() {
        let config: RendererConfig = serde_json::from_str(r#"{"maxRows": 100}"#).unwrap();
        assert_eq!(config.max_rows, 100);
        assert_eq!(config.baseline_factor, BASELINE_FACTOR);
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
