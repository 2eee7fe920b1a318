//! Certificate batch rendering core.
//!
//! Takes a saved editor design (a background template plus positioned
//! text placements, some bound to spreadsheet columns) and a table of
//! data rows, and produces one personalized output per row, packaged
//! into a single downloadable archive.
//!
//! The pipeline has two stages:
//!
//! - [`normalize`] folds editor-space node state (origin mode, element
//!   scale, binding precedence) into flat placement records.
//! - [`BatchRenderer::generate`] maps placements into output space and
//!   renders every row, as per-row PDFs or PNGs zipped together, or as
//!   one merged multi-page PDF.
//!
//! Template bytes and font programs come from injectable sources
//! ([`TemplateSource`], [`FontSource`]) so hosts decide how resources
//! are stored and tests run without network access.

mod canvas;
mod error;
mod font_embed;
mod font_registry;
mod fonts;
mod geometry;
mod normalizer;
mod packaging;
mod raster;
mod renderer;
mod template;
mod types;
mod unicode;

pub use error::{RenderError, RenderResult};
pub use fonts::{FontSource, HttpFontSource, StaticFontSource};
pub use geometry::SpaceScale;
pub use normalizer::{normalize, NormalizedLayout};
pub use renderer::{BatchRenderer, CancelToken, RendererConfig};
pub use template::{HttpTemplateSource, StaticTemplateSource, Template, TemplateSource};
pub use types::{
    ArchiveKind, Color, DataRow, EditorNode, GenerationJob, GenerationOutcome, OriginMode,
    OutputFormat, OutputSpec, PackagingMode, PlacementContent, PlacementRecord, Point, RowFailure,
    Size, TextAlign, TextStyle,
};
