//! Async image fetching from URLs, backed by an [`ImageCache`].

use std::sync::Arc;

use image::DynamicImage;
use thiserror::Error;

use crate::cache::{ImageCache, ImageStore};

/// Why a fetch produced no image. Never surfaced to callers, only logged.
#[derive(Debug, Error)]
enum FetchError {
    #[error("not a fetchable url: {0:?}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("undecodable payload: {0}")]
    Decode(#[from] image::ImageError),
}

/// Fetches images over HTTP and stores the decoded results in a cache.
///
/// The cache is injected at construction and shared; clone the fetcher
/// freely, all clones use the same client and cache. Every
/// [`fetch`](ImageFetcher::fetch) hits the network — callers wanting
/// cache-first behavior check [`get_cached`](ImageFetcher::get_cached)
/// before fetching. Concurrent fetches for the same locator are not
/// deduplicated; each downloads independently and the last decode wins.
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    cache: ImageCache,
}

impl ImageFetcher {
    /// Create a fetcher writing into the given cache.
    #[must_use]
    pub fn new(cache: ImageCache) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache,
        }
    }

    /// Download and decode the image at `locator`, caching the result under
    /// the raw locator string.
    ///
    /// A malformed locator, a failed request, and an undecodable payload all
    /// complete with `None`; none of them writes to the cache. There is no
    /// retry — callers may simply fetch again.
    pub async fn fetch(&self, locator: &str) -> Option<Arc<DynamicImage>> {
        match self.download_and_decode(locator).await {
            Ok(decoded) => {
                let image = Arc::new(decoded);
                self.cache.insert(locator, Arc::clone(&image));
                Some(image)
            }
            Err(e) => {
                tracing::warn!("failed to fetch image {locator}: {e}");
                None
            }
        }
    }

    /// Fetch `locator` on the tokio runtime and hand the outcome to
    /// `on_complete`, without blocking the caller.
    ///
    /// The callback runs on the spawned task, with no particular thread
    /// affinity; redirect UI-visible effects to your own executor. A caller
    /// that loses interest just drops whatever the callback feeds.
    pub fn retrieve_image<F>(&self, locator: &str, on_complete: F)
    where
        F: FnOnce(Option<Arc<DynamicImage>>) + Send + 'static,
    {
        let fetcher = self.clone();
        let locator = locator.to_string();
        tokio::spawn(async move {
            on_complete(fetcher.fetch(&locator).await);
        });
    }

    /// Best-effort synchronous lookup; no network access.
    pub fn get_cached(&self, locator: &str) -> Option<Arc<DynamicImage>> {
        self.cache.lookup(locator)
    }

    /// Store an already-decoded image in the cache under `locator`.
    pub fn cache(&self, image: DynamicImage, locator: &str) {
        self.cache.add(image, locator);
    }

    async fn download_and_decode(&self, locator: &str) -> Result<DynamicImage, FetchError> {
        let url = reqwest::Url::parse(locator)
            .map_err(|_| FetchError::InvalidUrl(locator.to_string()))?;
        tracing::debug!("downloading image: {url}");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        Ok(image::load_from_memory(&bytes)?)
    }
}
