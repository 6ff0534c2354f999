//! Page previews
//!
//! Rendering itself is delegated to a [`PageRenderer`]; this module renders
//! every page of a document one at a time, in page order, and caches the
//! results so reordering never triggers a re-render.

mod cache;
mod renderer;

pub use cache::PreviewCache;
pub use renderer::{PageRenderer, PdfiumRenderer, RenderedPage};

use crate::error::{Error, Result, ValidationError};
use crate::session::{resolve_point, PreviewOffset, SelectedPoint};
use std::sync::Arc;

/// Preview rendering configuration
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Thumbnail scale relative to native page size (default: 0.2)
    pub scale: f32,
    /// Largest accepted scale (default: 10.0)
    pub max_scale: f32,
    /// Maximum number of cached thumbnails (default: 256)
    pub cache_max_entries: usize,
    /// Maximum total bytes of cached thumbnails (default: 64MB)
    pub cache_max_bytes: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            scale: 0.2,
            max_scale: 10.0,
            cache_max_entries: 256,
            cache_max_bytes: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// One page preview and the scale it was rendered at
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    /// Page index (0-indexed)
    pub page_index: u32,
    pub scale: f32,
    pub image: RenderedPage,
}

impl Thumbnail {
    /// Document-space point under a pointer offset on this thumbnail
    pub fn resolve(&self, offset: PreviewOffset) -> std::result::Result<SelectedPoint, ValidationError> {
        resolve_point(self.page_index, offset, f64::from(self.scale))
    }
}

/// Sequential, cached page preview generation
pub struct Previewer<R> {
    renderer: R,
    cache: PreviewCache,
    config: PreviewConfig,
}

impl<R> Previewer<R>
where
    R: PageRenderer + Clone + Send + 'static,
{
    pub fn new(renderer: R) -> Result<Self> {
        Self::with_config(renderer, PreviewConfig::default())
    }

    pub fn with_config(renderer: R, config: PreviewConfig) -> Result<Self> {
        if !config.scale.is_finite() || config.scale <= 0.0 || config.scale > config.max_scale {
            return Err(ValidationError::InvalidScale {
                scale: f64::from(config.scale),
            }
            .into());
        }
        Ok(Self {
            renderer,
            cache: PreviewCache::new(config.cache_max_entries, config.cache_max_bytes),
            config,
        })
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    /// Drop every cached thumbnail of a document
    pub fn release(&self, document: &str) {
        self.cache.evict_document(document);
    }

    /// Count the document's pages on the blocking pool
    pub async fn page_count(&self, data: Arc<[u8]>) -> Result<u32> {
        let renderer = self.renderer.clone();
        tokio::task::spawn_blocking(move || renderer.page_count(&data))
            .await
            .map_err(|e| Error::Render {
                reason: format!("Task join error: {}", e),
            })?
    }

    /// Render every page in document order.
    ///
    /// Each page finishes before the next one starts, so the returned
    /// thumbnails are in page order.
    pub async fn render_document(&self, document: &str, data: Arc<[u8]>) -> Result<Vec<Thumbnail>> {
        let page_count = self.page_count(Arc::clone(&data)).await?;
        let mut thumbnails = Vec::with_capacity(page_count as usize);
        for page_index in 0..page_count {
            thumbnails.push(self.thumbnail(document, Arc::clone(&data), page_index).await?);
        }
        tracing::debug!(document = %document, pages = page_count, "previews rendered");
        Ok(thumbnails)
    }

    /// Preview of one page (0-indexed), from cache when available
    pub async fn thumbnail(
        &self,
        document: &str,
        data: Arc<[u8]>,
        page_index: u32,
    ) -> Result<Thumbnail> {
        let scale = self.config.scale;
        let page_number = page_index + 1;
        let key = PreviewCache::key(document, page_number, scale);

        let image = match self.cache.get(&key) {
            Some(image) => image,
            None => {
                let renderer = self.renderer.clone();
                let image = tokio::task::spawn_blocking(move || {
                    renderer.render_page(&data, page_number, scale)
                })
                .await
                .map_err(|e| Error::Render {
                    reason: format!("Task join error: {}", e),
                })??;
                self.cache.put(key, image.clone());
                image
            }
        };

        Ok(Thumbnail {
            page_index,
            scale,
            image,
        })
    }
}
