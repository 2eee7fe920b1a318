//! Error types for the generation pipeline
//!
//! Only job-fatal conditions surface as `RenderError`. Row-level and
//! placement-level problems are accumulated into the outcome report so
//! a batch still delivers whatever could be generated.

use thiserror::Error;

/// Fatal error for a generation job
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template unreachable: {0}")]
    TemplateUnreachable(String),

    #[error("template malformed: {0}")]
    TemplateMalformed(String),

    #[error("no data rows supplied")]
    NoRows,

    #[error("row count {got} exceeds configured limit {limit}")]
    TooManyRows { got: usize, limit: usize },

    #[error("merged packaging is not supported for image output")]
    MergedImageOutput,

    #[error("font error: {0}")]
    Font(String),

    #[error("PDF generation error: {0}")]
    Pdf(String),

    #[error("JSON parsing error: {0}")]
    Json(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for generation operations
pub type RenderResult<T> = Result<T, RenderError>;

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Json(err.to_string())
    }
}
