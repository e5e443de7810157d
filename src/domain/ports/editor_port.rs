//! Port definition for per-request image editors.

/// A keyed image transform applied before completion.
///
/// The key is stamped onto the produced image so a later request with the
/// same editor against the cached result can short-circuit without
/// re-editing. Editors that work on raw bytes (`needs_raw_bytes`) receive the
/// source bytes and own their whole decode+transform; all others receive the
/// decoded image. Exactly one of the two `apply` arguments is `Some`.
pub trait ImageEditor: Send + Sync {
    /// Stable identity key, recorded on produced images.
    fn key(&self) -> &str;

    /// True when the editor must be fed the original bytes rather than a
    /// decoded image.
    fn needs_raw_bytes(&self) -> bool {
        false
    }

    /// Produces the transformed image.
    ///
    /// # Errors
    /// Returns a description of the failure; the orchestrator reports it as
    /// an edit failure.
    fn apply(
        &self,
        image: Option<&image::DynamicImage>,
        bytes: Option<&[u8]>,
    ) -> Result<image::DynamicImage, String>;
}
