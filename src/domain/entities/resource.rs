//! Resource identity: the network locator and its cache key.

/// Stable cache key for a logical image resource.
///
/// The key need not equal the URL; callers may derive their own as long as it
/// is deterministic for a given resource. [`CacheKey::from_url`] provides the
/// default derivation by hashing the URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from any string-like input.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives a key from a URL by hashing it.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..16]))
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A loadable resource: where to fetch it and where to cache it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResource {
    /// Network locator handed to the fetcher.
    pub url: String,
    /// Cache key used for both tiers.
    pub key: CacheKey,
}

impl ImageResource {
    /// Creates a resource with an explicit cache key.
    #[must_use]
    pub fn with_key(url: impl Into<String>, key: CacheKey) -> Self {
        Self {
            url: url.into(),
            key,
        }
    }

    /// Creates a resource whose key is derived from the URL.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let key = CacheKey::from_url(&url);
        Self { url, key }
    }
}
