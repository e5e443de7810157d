//! Load error taxonomy.

use thiserror::Error;

use crate::domain::entities::CacheTier;

/// Terminal load errors.
///
/// Every variant ends the owning task; nothing is retried inside the core.
/// Retry, if desired, is the caller's responsibility via a new load.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// Bytes were retrieved but could not be decoded as an image.
    #[error("invalid image data: {reason}")]
    InvalidImageData {
        /// Decoder failure description.
        reason: String,
    },

    /// The requested editor produced no image.
    #[error("editor '{editor}' produced no image: {reason}")]
    EditFailed {
        /// Identity key of the failing editor.
        editor: String,
        /// Editor failure description.
        reason: String,
    },

    /// The network fetch failed; carries the fetcher's message verbatim.
    #[error("fetch failed: {message}")]
    FetchFailed {
        /// Fetcher failure description.
        message: String,
    },

    /// A cache collaborator answered a query with a result shape inconsistent
    /// with the requested tier. Treated as a contract violation: logged and
    /// the request fails closed.
    #[error("cache returned an illegal result for a {queried} query")]
    IllegalCacheResult {
        /// The tier that was queried.
        queried: CacheTier,
    },
}

impl LoadError {
    /// Creates an invalid-image-data error.
    #[must_use]
    pub fn invalid_data(reason: impl Into<String>) -> Self {
        Self::InvalidImageData {
            reason: reason.into(),
        }
    }

    /// Creates an edit-failed error.
    #[must_use]
    pub fn edit_failed(editor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EditFailed {
            editor: editor.into(),
            reason: reason.into(),
        }
    }

    /// Creates a fetch-failed error.
    #[must_use]
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_part() {
        let err = LoadError::edit_failed("grayscale", "empty output");
        assert!(err.to_string().contains("grayscale"));

        let err = LoadError::IllegalCacheResult {
            queried: CacheTier::Memory,
        };
        assert!(err.to_string().contains("memory"));
    }
}
