//! Template resource handling
//!
//! The template is an opaque fetchable resource owned by the hosting
//! application: the core only needs its bytes. Fetching is an injectable
//! capability so tests run without network access. Decoded templates are
//! raster images; the decoded form is embedded as a full-page XObject
//! into every generated document.

use async_trait::async_trait;
use image::io::Reader as ImageReader;
use image::{DynamicImage, GenericImageView};
use pdf_writer::{Name, Pdf, Ref};
use std::io::Cursor;

use crate::error::{RenderError, RenderResult};
use crate::font_registry::RefAllocator;
use crate::types::Size;

/// Source of template bytes, addressed by URL
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn fetch(&self, url: &str) -> RenderResult<Vec<u8>>;
}

/// Fetches templates over HTTP
pub struct HttpTemplateSource {
    client: reqwest::Client,
}

impl HttpTemplateSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTemplateSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TemplateSource for HttpTemplateSource {
    async fn fetch(&self, url: &str) -> RenderResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| RenderError::TemplateUnreachable(err.to_string()))?
            .error_for_status()
            .map_err(|err| RenderError::TemplateUnreachable(err.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| RenderError::TemplateUnreachable(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// In-memory template source for tests and hosts that preload bytes
pub struct StaticTemplateSource {
    bytes: Vec<u8>,
}

impl StaticTemplateSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl TemplateSource for StaticTemplateSource {
    async fn fetch(&self, _url: &str) -> RenderResult<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// A decoded template ready for per-row embedding
#[derive(Debug)]
pub struct Template {
    pub image: DynamicImage,
    /// Natural pixel dimensions, used as the output page size when the
    /// job does not specify one
    pub pixel_size: Size,
}

impl Template {
    /// Decode template bytes. Failure here is fatal for the whole job;
    /// the distinction between unreachable and malformed is preserved by
    /// the error variant.
    pub fn decode(bytes: &[u8]) -> RenderResult<Self> {
        if bytes.starts_with(b"%PDF") {
            return Err(RenderError::TemplateMalformed(
                "PDF template bytes are not supported by the renderer; supply the rasterized preview image".to_string(),
            ));
        }

        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|err| RenderError::TemplateMalformed(err.to_string()))?
            .decode()
            .map_err(|err| RenderError::TemplateMalformed(err.to_string()))?;

        let (width, height) = image.dimensions();
        Ok(Self {
            image,
            pixel_size: Size::new(f64::from(width), f64::from(height)),
        })
    }
}

/// Embed the template image into a document as an RGB XObject, with the
/// alpha channel split into an SMask when present.
///
/// Returns the XObject id and its resource name.
pub fn embed_template_image(
    pdf: &mut Pdf,
    alloc: &mut RefAllocator,
    image: &DynamicImage,
) -> (Ref, String) {
    let has_alpha = matches!(
        image,
        DynamicImage::ImageRgba8(_) | DynamicImage::ImageRgba16(_)
    );

    let (rgb, width, height, alpha) = if has_alpha {
        let rgba = image.to_rgba8();
        let (w, h) = rgba.dimensions();
        let bytes = rgba.into_raw();
        let mut rgb: Vec<u8> = Vec::with_capacity((w * h * 3) as usize);
        let mut alpha: Vec<u8> = Vec::with_capacity((w * h) as usize);
        for chunk in bytes.chunks_exact(4) {
            rgb.push(chunk[0]);
            rgb.push(chunk[1]);
            rgb.push(chunk[2]);
            alpha.push(chunk[3]);
        }
        (rgb, w, h, Some(alpha))
    } else {
        let rgb = image.to_rgb8();
        let (w, h) = rgb.dimensions();
        (rgb.into_raw(), w, h, None)
    };

    let smask_id = alpha.map(|alpha_data| {
        let smask_id = alloc.next();
        let mut smask = pdf.image_xobject(smask_id, &alpha_data);
        smask.width(width as i32);
        smask.height(height as i32);
        smask.color_space().device_gray();
        smask.bits_per_component(8);
        smask_id
    });

    let image_id = alloc.next();
    {
        let mut xobject = pdf.image_xobject(image_id, &rgb);
        xobject.width(width as i32);
        xobject.height(height as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        if let Some(smask_id) = smask_id {
            xobject.s_mask(smask_id);
        }
    }

    (image_id, format!("I{}", image_id.get()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_decode_reads_pixel_size() {
        let template = Template::decode(&png_bytes(600, 800)).unwrap();
        assert_eq!(template.pixel_size, Size::new(600.0, 800.0));
    }

    #[test]
    fn test_garbage_bytes_are_malformed() {
        let err = Template::decode(b"not an image").unwrap_err();
        assert!(matches!(err, RenderError::TemplateMalformed(_)));
    }

    #[test]
    fn test_pdf_bytes_rejected_with_clear_reason() {
        let err = Template::decode(b"%PDF-1.7 rest").unwrap_err();
        match err {
            RenderError::TemplateMalformed(reason) => assert!(reason.contains("PDF")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_static_source_returns_bytes() {
        let source = StaticTemplateSource::new(vec![1, 2, 3]);
        assert_eq!(source.fetch("ignored").await.unwrap(), vec![1, 2, 3]);
    }
}
