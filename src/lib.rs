//! # Magpie 🐦‍⬛
//!
//! Fetch-once, in-memory image caching for list-rendering UIs.
//!
//! ## Overview
//!
//! Magpie is the image layer for applications that render lists of remote
//! images (timelines, tables, galleries): each URL is fetched at most once,
//! repeated requests are served from an in-memory cache, and a host can
//! empty the cache under memory pressure.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 ImageFetcher                │
//! │  fetch / retrieve_image / get_cached        │
//! └─────────────────────────────────────────────┘
//!                       │
//!                       ▼
//! ┌─────────────────────────────────────────────┐
//! │                 ImageCache                  │
//! │  add / lookup / remove / clear              │
//! │  keyed by locator [+ "-suffix"]             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`cache`] — Thread-safe image cache and the [`ImageStore`] trait
//! - [`fetcher`] — Async HTTP fetching and decoding
//!
//! ## Example
//!
//! ```no_run
//! use magpie::{ImageCache, ImageFetcher};
//!
//! # async fn demo() {
//! let cache = ImageCache::new();
//! let fetcher = ImageFetcher::new(cache.clone());
//!
//! // Cache-first: synchronous lookup, then fetch on miss
//! let url = "https://example.com/avatar.png";
//! let image = match fetcher.get_cached(url) {
//!     Some(image) => Some(image),
//!     None => fetcher.fetch(url).await,
//! };
//! # let _ = image;
//!
//! // Wire the host's low-memory signal to bulk eviction
//! let eviction = cache.eviction_handle();
//! eviction.signal();
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/magpie/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::uninlined_format_args)]

pub mod cache;
pub mod fetcher;

// Re-export main types for convenience
pub use cache::{EvictionHandle, ImageCache, ImageStore};
pub use fetcher::ImageFetcher;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
