//! Rendered preview cache

use crate::preview::renderer::RenderedPage;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

struct CacheInner {
    lru: LruCache<String, RenderedPage>,
    total_bytes: usize,
}

/// LRU cache of rendered pages with entry count and byte budget limits.
///
/// Keys identify a document, page and scale, so a thumbnail shown again
/// after a reorder is served without re-rendering.
pub struct PreviewCache {
    inner: Mutex<CacheInner>,
    max_bytes: usize,
}

fn entry_size(page: &RenderedPage) -> usize {
    page.data_base64.len()
}

impl PreviewCache {
    /// Create a cache with the specified entry capacity and byte budget
    pub fn new(capacity: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                lru: LruCache::new(capacity),
                total_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Cache key for one page of a document at a given scale
    pub fn key(document: &str, page_number: u32, scale: f32) -> String {
        format!("{}:{}@{}", document, page_number, scale)
    }

    /// Store a rendered page.
    /// Rejects entries larger than max_bytes entirely.
    /// Evicts LRU entries until byte budget is satisfied.
    pub fn put(&self, key: String, page: RenderedPage) {
        let new_size = entry_size(&page);

        if new_size > self.max_bytes {
            return;
        }

        let mut inner = self.inner.lock();

        if let Some(old) = inner.lru.pop(&key) {
            inner.total_bytes = inner.total_bytes.saturating_sub(entry_size(&old));
        }

        while inner.total_bytes + new_size > self.max_bytes {
            if let Some((_evicted_key, evicted)) = inner.lru.pop_lru() {
                inner.total_bytes = inner.total_bytes.saturating_sub(entry_size(&evicted));
            } else {
                break;
            }
        }

        // A full LruCache evicts silently on push; account for it
        if let Some((_evicted_key, evicted)) = inner.lru.push(key, page) {
            inner.total_bytes = inner.total_bytes.saturating_sub(entry_size(&evicted));
        }
        inner.total_bytes += new_size;
    }

    pub fn get(&self, key: &str) -> Option<RenderedPage> {
        self.inner.lock().lru.get(key).cloned()
    }

    /// Drop every cached page of one document
    pub fn evict_document(&self, document: &str) {
        let prefix = format!("{}:", document);
        let mut inner = self.inner.lock();
        let keys: Vec<String> = inner
            .lru
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            if let Some(page) = inner.lru.pop(&key) {
                inner.total_bytes = inner.total_bytes.saturating_sub(entry_size(&page));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }
}
