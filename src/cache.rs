//! Thread-safe in-memory cache for decoded images.
//!
//! Entries are keyed by a string identifier, normally the image URL, with an
//! optional `-suffix` appended to distinguish variants of the same resource
//! (e.g. `"https://x/1.png-thumb"`). The cache never evicts on its own;
//! hosts clear it via [`ImageCache::clear`] or an [`EvictionHandle`] wired
//! to their own low-memory signal.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use image::DynamicImage;

/// Cache entry for a decoded image
struct CacheEntry {
    /// The decoded image, shared out to callers as cheap handles
    image: Arc<DynamicImage>,
    /// Refreshed on every lookup that hits this entry
    last_access: Instant,
}

/// The {add, lookup, remove} capability set, addressable either by a bare
/// identifier or by a locator plus optional disambiguating suffix.
///
/// The suffixed forms reduce to the bare form through key derivation:
/// `locator` alone, or `locator + "-" + suffix`.
pub trait ImageStore {
    /// Store an image under the given identifier, replacing any prior entry.
    fn add(&self, image: DynamicImage, identifier: &str);

    /// Store an image under the key derived from `locator` and `suffix`.
    fn add_for(&self, image: DynamicImage, locator: &str, suffix: Option<&str>);

    /// Return the image for `identifier`, refreshing its last-access time.
    fn lookup(&self, identifier: &str) -> Option<Arc<DynamicImage>>;

    /// Look up by the key derived from `locator` and `suffix`.
    fn lookup_for(&self, locator: &str, suffix: Option<&str>) -> Option<Arc<DynamicImage>>;

    /// Remove the entry for `identifier`. Returns whether one existed.
    fn remove(&self, identifier: &str) -> bool;

    /// Remove the entry for the exact key derived from `locator` and
    /// `suffix`. This is not a prefix match; omitting the suffix targets
    /// the bare-locator key only.
    fn remove_for(&self, locator: &str, suffix: Option<&str>) -> bool;
}

/// Thread-safe image cache
///
/// Cloning yields another handle to the same underlying map, so a cache can
/// be shared between a fetcher and the consuming UI. Each consumer creates
/// its own cache; there is no process-wide instance.
#[derive(Clone)]
pub struct ImageCache {
    images: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCache {
    /// Create a new, empty image cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            images: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub(crate) fn insert(&self, identifier: &str, image: Arc<DynamicImage>) {
        let mut images = self.images.write().unwrap();
        images.insert(
            identifier.to_string(),
            CacheEntry {
                image,
                last_access: Instant::now(),
            },
        );
    }

    /// Remove every entry whose key equals `locator` or starts with
    /// `locator + "-"` — the bare-locator entry plus all suffix variants.
    /// Returns whether any entry was removed.
    ///
    /// This scans all keys, O(n) in cache size.
    pub fn remove_all_matching(&self, locator: &str) -> bool {
        let prefix = format!("{locator}-");
        let mut images = self.images.write().unwrap();
        let before = images.len();
        images.retain(|key, _| key.as_str() != locator && !key.starts_with(&prefix));
        images.len() < before
    }

    /// Remove all entries. Returns whether the cache held anything.
    pub fn clear(&self) -> bool {
        let mut images = self.images.write().unwrap();
        let removed = !images.is_empty();
        images.clear();
        removed
    }

    /// Check if an image is cached without touching its access time.
    pub fn contains(&self, identifier: &str) -> bool {
        self.images.read().unwrap().contains_key(identifier)
    }

    /// Get the number of cached images.
    pub fn len(&self) -> usize {
        self.images.read().unwrap().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.images.read().unwrap().is_empty()
    }

    /// Create a handle a host can wire to its low-memory or shutdown
    /// notification to empty this cache.
    #[must_use]
    pub fn eviction_handle(&self) -> EvictionHandle {
        EvictionHandle {
            cache: self.clone(),
        }
    }
}

impl ImageStore for ImageCache {
    fn add(&self, image: DynamicImage, identifier: &str) {
        self.insert(identifier, Arc::new(image));
    }

    fn add_for(&self, image: DynamicImage, locator: &str, suffix: Option<&str>) {
        self.add(image, &derive_key(locator, suffix));
    }

    fn lookup(&self, identifier: &str) -> Option<Arc<DynamicImage>> {
        // The access-time bump mutates the entry, so a hit needs the write
        // lock even though it reads the image.
        let mut images = self.images.write().unwrap();
        let entry = images.get_mut(identifier)?;
        entry.last_access = Instant::now();
        Some(Arc::clone(&entry.image))
    }

    fn lookup_for(&self, locator: &str, suffix: Option<&str>) -> Option<Arc<DynamicImage>> {
        self.lookup(&derive_key(locator, suffix))
    }

    fn remove(&self, identifier: &str) -> bool {
        self.images.write().unwrap().remove(identifier).is_some()
    }

    fn remove_for(&self, locator: &str, suffix: Option<&str>) -> bool {
        self.remove(&derive_key(locator, suffix))
    }
}

/// Handle for host-triggered bulk eviction.
///
/// The cache does not subscribe to any platform notification itself; a host
/// obtains one of these via [`ImageCache::eviction_handle`] and calls
/// [`signal`](EvictionHandle::signal) from whatever memory-pressure or
/// shutdown hook it has.
#[derive(Clone)]
pub struct EvictionHandle {
    cache: ImageCache,
}

impl EvictionHandle {
    /// Empty the cache. Returns whether anything was evicted.
    pub fn signal(&self) -> bool {
        tracing::debug!("eviction signal received, clearing image cache");
        self.cache.clear()
    }
}

/// Build the cache key for a locator and optional suffix.
fn derive_key(locator: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{locator}-{suffix}"),
        None => locator.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Image whose dimensions encode its identity, so tests can tell
    /// entries apart without comparing pixels.
    fn img(width: u32, height: u32) -> DynamicImage {
        DynamicImage::new_rgb8(width, height)
    }

    fn dims(image: &Arc<DynamicImage>) -> (u32, u32) {
        (image.width(), image.height())
    }

    #[test]
    fn test_add_then_lookup() {
        let cache = ImageCache::new();
        cache.add(img(3, 5), "https://x/1.png");
        let hit = cache.lookup("https://x/1.png").unwrap();
        assert_eq!(dims(&hit), (3, 5));
    }

    #[test]
    fn test_add_replaces_existing() {
        let cache = ImageCache::new();
        cache.add(img(3, 5), "https://x/1.png");
        cache.add(img(7, 2), "https://x/1.png");
        let hit = cache.lookup("https://x/1.png").unwrap();
        assert_eq!(dims(&hit), (7, 2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lookup_miss_leaves_cache_unchanged() {
        let cache = ImageCache::new();
        cache.add(img(1, 1), "present");
        assert!(cache.lookup("absent").is_none());
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("present"));
    }

    #[test]
    fn test_remove() {
        let cache = ImageCache::new();
        cache.add(img(1, 1), "k");
        assert!(cache.remove("k"));
        assert!(cache.lookup("k").is_none());
        assert!(!cache.remove("k"));
    }

    #[test]
    fn test_remove_for_targets_exact_key() {
        let cache = ImageCache::new();
        cache.add_for(img(1, 1), "u", None);
        cache.add_for(img(2, 2), "u", Some("thumb"));
        // Bare locator removal must not touch the suffixed variant
        assert!(cache.remove_for("u", None));
        assert!(cache.lookup_for("u", Some("thumb")).is_some());
        assert!(cache.remove_for("u", Some("thumb")));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_suffix_key_derivation() {
        let cache = ImageCache::new();
        cache.add_for(img(4, 4), "https://x/1.png", Some("thumb"));
        let hit = cache.lookup("https://x/1.png-thumb").unwrap();
        assert_eq!(dims(&hit), (4, 4));
        assert!(cache.lookup("https://x/1.png").is_none());
    }

    #[test]
    fn test_remove_all_matching() {
        let cache = ImageCache::new();
        cache.add_for(img(1, 1), "u", None);
        cache.add_for(img(1, 1), "u", Some("thumb"));
        cache.add_for(img(1, 1), "u", Some("large"));
        // Shares the prefix "u" but is not a suffix variant of it
        cache.add(img(1, 1), "unrelated");
        // Contains "u" but not at the start
        cache.add(img(1, 1), "x-u");

        assert!(cache.remove_all_matching("u"));
        assert!(cache.lookup("u").is_none());
        assert!(cache.lookup_for("u", Some("thumb")).is_none());
        assert!(cache.lookup_for("u", Some("large")).is_none());
        assert!(cache.contains("unrelated"));
        assert!(cache.contains("x-u"));

        assert!(!cache.remove_all_matching("u"));
    }

    #[test]
    fn test_clear_twice() {
        let cache = ImageCache::new();
        cache.add(img(1, 1), "a");
        cache.add(img(1, 1), "b");
        assert!(cache.clear());
        assert!(cache.is_empty());
        assert!(!cache.clear());
    }

    #[test]
    fn test_lookup_refreshes_last_access() {
        let cache = ImageCache::new();
        cache.add(img(1, 1), "k");
        let first = cache.images.read().unwrap()["k"].last_access;
        std::thread::sleep(std::time::Duration::from_millis(5));
        cache.lookup("k").unwrap();
        let second = cache.images.read().unwrap()["k"].last_access;
        assert!(second > first);
    }

    #[test]
    fn test_eviction_handle_clears() {
        let cache = ImageCache::new();
        cache.add(img(1, 1), "k");
        let handle = cache.eviction_handle();
        assert!(handle.signal());
        assert!(cache.is_empty());
        assert!(!handle.signal());
    }

    #[test]
    fn test_concurrent_add_lookup_stress() {
        const WRITERS: u32 = 8;
        const KEYS_PER_WRITER: u32 = 100;

        let cache = ImageCache::new();
        let mut handles = Vec::new();

        for writer in 0..WRITERS {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for n in 0..KEYS_PER_WRITER {
                    cache.add(img(writer + 1, n + 1), &format!("w{writer}-k{n}"));
                }
            }));
        }
        for reader in 0..WRITERS {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for n in 0..KEYS_PER_WRITER {
                    // Misses are fine while writers race ahead; hits must
                    // never be torn.
                    if let Some(hit) = cache.lookup(&format!("w{reader}-k{n}")) {
                        assert_eq!(dims(&hit), (reader + 1, n + 1));
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), (WRITERS * KEYS_PER_WRITER) as usize);
        for writer in 0..WRITERS {
            for n in 0..KEYS_PER_WRITER {
                let hit = cache.lookup(&format!("w{writer}-k{n}")).unwrap();
                assert_eq!(dims(&hit), (writer + 1, n + 1));
            }
        }
    }
}
