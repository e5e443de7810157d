//! Per-request load options.

use serde::{Deserialize, Serialize};

/// Options evaluated once per load request.
///
/// Every field defaults to `false`; the common case is `LoadOptions::default()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Even on a memory hit, continue to the byte path so the result is
    /// verified or re-derived from raw data.
    pub query_disk_when_in_memory: bool,

    /// Skip the disk tier entirely; a memory miss goes straight to network.
    pub ignore_disk_cache: bool,

    /// Skip all cache lookups; always fetch from network and overwrite the
    /// cache with the result.
    pub refresh_cache: bool,

    /// Advisory, forwarded to the fetcher: honor the transport's own cache
    /// policy instead of forcing revalidation.
    pub use_protocol_cache_policy: bool,

    /// Advisory, forwarded to the fetcher: handle cookies for this request.
    pub handle_cookies: bool,

    /// Advisory, forwarded to the fetcher: report incremental download
    /// progress as bytes arrive.
    pub progressive_download: bool,

    /// Advisory, consumed by UI-facing layers embedding this crate; carried
    /// through untouched by the core.
    pub ignore_placeholder: bool,

    /// Skip the post-decode normalization step after a raw decode.
    pub skip_post_decode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_off() {
        let opts = LoadOptions::default();
        assert!(!opts.query_disk_when_in_memory);
        assert!(!opts.ignore_disk_cache);
        assert!(!opts.refresh_cache);
        assert!(!opts.use_protocol_cache_policy);
        assert!(!opts.handle_cookies);
        assert!(!opts.progressive_download);
        assert!(!opts.ignore_placeholder);
        assert!(!opts.skip_post_decode);
    }
}
