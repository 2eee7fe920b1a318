//! Font resolution and per-job caching
//!
//! Resolution (locating the binary font program for a family name) is an
//! injectable capability so tests can substitute an in-memory registry
//! without network access. The resolved bytes are cached once per
//! generation job, before the row loop: resolution cost must not scale
//! with row count. Embedding into individual output documents is a
//! separate per-document step handled by `FontRegistry`.

use async_trait::async_trait;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use ttf_parser::Face;

/// Families served by the PDF builtin Type1 fonts; these never need a
/// fetch. Matching is case-sensitive and exact.
const STANDARD_FAMILIES: &[&str] = &[
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Arial",
    "Arial-Bold",
    "Arial-Italic",
    "Times-Roman",
    "Times",
    "Courier",
];

pub fn is_standard_family(family: &str) -> bool {
    STANDARD_FAMILIES.contains(&family)
}

/// Source of binary font programs, keyed by family name.
///
/// `resolve` returns `None` (not an error) when no source is registered
/// for the family; callers fall back to a default font instead of
/// failing the job.
#[async_trait]
pub trait FontSource: Send + Sync {
    async fn resolve(&self, family: &str) -> Option<Vec<u8>>;

    /// Optional default font program used where no builtin fallback
    /// exists (raster outputs).
    async fn fallback(&self) -> Option<Vec<u8>> {
        None
    }
}

/// In-memory font source for tests and hosts that preload fonts
#[derive(Default)]
pub struct StaticFontSource {
    fonts: HashMap<String, Vec<u8>>,
    fallback: Option<Vec<u8>>,
}

impl StaticFontSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(mut self, family: &str, bytes: Vec<u8>) -> Self {
        self.fonts.insert(family.to_string(), bytes);
        self
    }

    pub fn with_fallback(mut self, bytes: Vec<u8>) -> Self {
        self.fallback = Some(bytes);
        self
    }
}

#[async_trait]
impl FontSource for StaticFontSource {
    async fn resolve(&self, family: &str) -> Option<Vec<u8>> {
        self.fonts.get(family).cloned()
    }

    async fn fallback(&self) -> Option<Vec<u8>> {
        self.fallback.clone()
    }
}

/// Font source backed by a table of hosted font file URLs
pub struct HttpFontSource {
    client: reqwest::Client,
    urls: HashMap<String, String>,
    fallback_url: Option<String>,
}

impl HttpFontSource {
    pub fn new(urls: HashMap<String, String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            urls,
            fallback_url: None,
        }
    }

    pub fn with_fallback_url(mut self, url: &str) -> Self {
        self.fallback_url = Some(url.to_string());
        self
    }

    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(err) => {
                warn!("font fetch failed for {url}: {err}");
                return None;
            }
        };
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(err) => {
                warn!("font fetch failed for {url}: {err}");
                return None;
            }
        };
        match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(err) => {
                warn!("font fetch failed for {url}: {err}");
                None
            }
        }
    }
}

#[async_trait]
impl FontSource for HttpFontSource {
    async fn resolve(&self, family: &str) -> Option<Vec<u8>> {
        let url = self.urls.get(family)?;
        self.fetch(url).await
    }

    async fn fallback(&self) -> Option<Vec<u8>> {
        let url = self.fallback_url.as_deref()?;
        self.fetch(url).await
    }
}

/// Per-job cache of resolved font programs.
///
/// Populated once before the row loop and read-only afterwards, so a
/// future parallel row loop could share it without locking.
pub struct ResolvedFonts {
    fonts: HashMap<String, Arc<Vec<u8>>>,
    fallback: Option<Arc<Vec<u8>>>,
}

impl ResolvedFonts {
    /// Resolve every family exactly once. Unparseable font programs are
    /// treated as unresolved rather than failing the job.
    pub async fn resolve_all(source: &dyn FontSource, families: &BTreeSet<String>) -> Self {
        let mut fonts = HashMap::new();

        for family in families {
            match source.resolve(family).await {
                Some(bytes) => {
                    if Face::parse(&bytes, 0).is_ok() {
                        debug!("resolved font {family} ({} bytes)", bytes.len());
                        fonts.insert(family.clone(), Arc::new(bytes));
                    } else {
                        warn!("font {family}: unparseable font program, treating as unresolved");
                    }
                }
                None => debug!("no font source for family {family}, will use fallback"),
            }
        }

        let fallback = match source.fallback().await {
            Some(bytes) if Face::parse(&bytes, 0).is_ok() => Some(Arc::new(bytes)),
            Some(_) => {
                warn!("fallback font is unparseable, ignoring");
                None
            }
            None => None,
        };

        Self { fonts, fallback }
    }

    pub fn get(&self, family: &str) -> Option<&Arc<Vec<u8>>> {
        self.fonts.get(family)
    }

    pub fn fallback(&self) -> Option<&Arc<Vec<u8>>> {
        self.fallback.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FontSource for CountingSource {
        async fn resolve(&self, _family: &str) -> Option<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    #[test]
    fn test_standard_families_are_case_sensitive() {
        assert!(is_standard_family("Helvetica"));
        assert!(is_standard_family("Times-Roman"));
        assert!(!is_standard_family("helvetica"));
        assert!(!is_standard_family("Great Vibes"));
    }

    #[tokio::test]
    async fn test_resolution_called_once_per_family() {
        let source = CountingSource { calls: AtomicUsize::new(0) };
        let families: BTreeSet<String> =
            ["Great Vibes", "Lobster"].iter().map(|s| s.to_string()).collect();

        let resolved = ResolvedFonts::resolve_all(&source, &families).await;

        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert!(resolved.get("Great Vibes").is_none());
        assert!(resolved.fallback().is_none());
    }

    #[tokio::test]
    async fn test_unparseable_bytes_treated_as_unresolved() {
        let source = StaticFontSource::new().with_font("Broken", vec![0, 1, 2, 3]);
        let families: BTreeSet<String> = [String::from("Broken")].into_iter().collect();

        let resolved = ResolvedFonts::resolve_all(&source, &families).await;
        assert!(resolved.get("Broken").is_none());
    }
}
